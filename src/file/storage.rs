//! File storage for FileHub.
//!
//! This module provides physical file storage functionality:
//! - Timestamp-based collision-resistant file naming
//! - Streaming writes with an incremental size limit
//! - Load and size operations keyed by stored name
//!
//! All filename sanitization lives here. Callers never build filesystem
//! paths from user-supplied names themselves.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{FileHubError, Result};

use super::MAX_FILENAME_LENGTH;

/// Result of a completed store operation.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// The unique name the file was saved under.
    pub stored_name: String,
    /// Number of bytes written to disk.
    pub size: u64,
    /// Creation instant in epoch milliseconds (also the stored-name prefix).
    pub timestamp_ms: u64,
}

/// File storage service for managing uploaded files on disk.
///
/// Files are stored in a single flat directory:
/// ```text
/// {base_path}/
/// ├── 1722470400123-report.pdf
/// ├── 1722470400124-report.pdf
/// └── ...
/// ```
///
/// Stored names combine a monotonic epoch-millisecond timestamp with the
/// sanitized display name. The timestamp is allocated through an atomic
/// counter clamped to `max(now, previous + 1)`, so concurrent uploads of
/// identically-named files still receive distinct stored names.
#[derive(Debug)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
    /// Last allocated stored-name timestamp.
    next_stamp: AtomicU64,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist. Creation is
    /// idempotent; a concurrent "directory already exists" race is not an
    /// error.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            next_stamp: AtomicU64::new(0),
        })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Begin a streaming upload.
    ///
    /// Sanitizes `display_name`, allocates a unique stored name, and opens
    /// the destination file. The returned [`PendingUpload`] enforces
    /// `max_size` incrementally as chunks arrive; if it is dropped without
    /// [`PendingUpload::commit`], the partial file is removed.
    pub async fn begin(&self, display_name: &str, max_size: u64) -> Result<PendingUpload> {
        let sanitized = sanitize_display_name(display_name)?;
        let timestamp_ms = self.next_timestamp();
        let stored_name = format!("{timestamp_ms}-{sanitized}");
        let path = self.file_path(&stored_name);

        let file = fs::File::create(&path).await?;

        Ok(PendingUpload {
            path,
            stored_name,
            timestamp_ms,
            file: Some(file),
            written: 0,
            max_size,
            committed: false,
        })
    }

    /// Store a byte stream under a new unique stored name.
    ///
    /// Consumes the stream chunk by chunk, enforcing `max_size` as bytes
    /// arrive rather than trusting any client-declared length. On any
    /// failure the partial file is discarded.
    pub async fn store_stream<S, B, E>(
        &self,
        display_name: &str,
        mut stream: S,
        max_size: u64,
    ) -> Result<StoredFile>
    where
        S: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut pending = self.begin(display_name, max_size).await?;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()))?;
            pending.write_chunk(chunk.as_ref()).await?;
        }

        pending.commit().await
    }

    /// Store an in-memory buffer under a new unique stored name.
    pub async fn save(
        &self,
        content: &[u8],
        display_name: &str,
        max_size: u64,
    ) -> Result<StoredFile> {
        let stream = futures::stream::iter([Ok::<_, std::convert::Infallible>(content)]);
        self.store_stream(display_name, stream, max_size).await
    }

    /// Load the content stored under `stored_name`.
    ///
    /// Rejects names containing path-traversal sequences before touching the
    /// filesystem. Fails with `NotFound` if no file exists.
    pub async fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        validate_stored_name(stored_name)?;
        let file_path = self.file_path(stored_name);

        match fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileHubError::NotFound(format!("file {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the on-disk size of a stored file.
    pub async fn file_size(&self, stored_name: &str) -> Result<u64> {
        validate_stored_name(stored_name)?;
        let file_path = self.file_path(stored_name);

        match fs::metadata(&file_path).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileHubError::NotFound(format!("file {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in storage.
    ///
    /// Names that fail validation are reported as absent rather than errors.
    pub async fn exists(&self, stored_name: &str) -> bool {
        if validate_stored_name(stored_name).is_err() {
            return false;
        }
        fs::metadata(self.file_path(stored_name)).await.is_ok()
    }

    /// Remove a stored file.
    ///
    /// Returns `true` if the file was removed, `false` if it didn't exist.
    /// Only used to clean up after a failed registry append; uploaded files
    /// are otherwise never deleted.
    pub async fn remove(&self, stored_name: &str) -> Result<bool> {
        validate_stored_name(stored_name)?;

        match fs::remove_file(self.file_path(stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the full file path for a stored name.
    fn file_path(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    /// Allocate the next stored-name timestamp.
    ///
    /// Clamped to `max(now_millis, previous + 1)` so allocations are
    /// strictly increasing even within a single millisecond.
    fn next_timestamp(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.next_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.next_stamp.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// An in-progress upload holding the destination file handle.
///
/// Write chunks with [`write_chunk`](Self::write_chunk) and finish with
/// [`commit`](Self::commit). If dropped before commit (error, client
/// disconnect), the partial file is removed from disk.
#[derive(Debug)]
pub struct PendingUpload {
    path: PathBuf,
    stored_name: String,
    timestamp_ms: u64,
    file: Option<fs::File>,
    written: u64,
    max_size: u64,
    committed: bool,
}

impl PendingUpload {
    /// The stored name this upload will be saved under.
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a chunk, failing with `SizeLimitExceeded` if the running total
    /// would pass the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let new_total = self.written + chunk.len() as u64;
        if new_total > self.max_size {
            return Err(FileHubError::SizeLimitExceeded { max: self.max_size });
        }

        let file = self.file.as_mut().ok_or_else(|| {
            FileHubError::Validation("upload already finalized".to_string())
        })?;
        file.write_all(chunk).await?;
        self.written = new_total;

        Ok(())
    }

    /// Flush and sync the file, making it durable and readable.
    pub async fn commit(mut self) -> Result<StoredFile> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.committed = true;

        Ok(StoredFile {
            stored_name: self.stored_name.clone(),
            size: self.written,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.file.take());
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Sanitize a user-supplied display name into a safe filename fragment.
///
/// Strips control characters and path separators, collapses `..` sequences,
/// and rejects names that sanitize to nothing or exceed
/// [`MAX_FILENAME_LENGTH`].
pub fn sanitize_display_name(name: &str) -> Result<String> {
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FileHubError::Validation(format!(
            "filename exceeds {MAX_FILENAME_LENGTH} characters"
        )));
    }

    let mut cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\'))
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(FileHubError::InvalidName(name.to_string()));
    }

    Ok(cleaned.to_string())
}

/// Validate a requested stored name before it is used in a filesystem path.
///
/// Rejects empty names and anything containing path separators, NUL bytes,
/// or `..` sequences, independent of registry state.
pub fn validate_stored_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains("..")
        || name.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
    {
        return Err(FileHubError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    const TEST_MAX: u64 = 10 * 1024 * 1024;

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    fn dir_entry_count(storage: &FileStorage) -> usize {
        std::fs::read_dir(storage.base_path()).unwrap().count()
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("storage");

        assert!(!storage_path.exists());

        let storage = FileStorage::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_new_existing_directory() {
        let temp_dir = TempDir::new().unwrap();

        // Second initialization over the same directory must not fail
        FileStorage::new(temp_dir.path()).unwrap();
        FileStorage::new(temp_dir.path()).unwrap();
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (_temp_dir, storage) = setup_storage();
        let content = b"Hello, World!";

        let stored = storage.save(content, "test.txt", TEST_MAX).await.unwrap();

        assert!(stored.stored_name.ends_with("-test.txt"));
        assert_eq!(stored.size, content.len() as u64);

        let loaded = storage.load(&stored.stored_name).await.unwrap();
        assert_eq!(loaded, content);
    }

    #[tokio::test]
    async fn test_stored_name_format() {
        let (_temp_dir, storage) = setup_storage();

        let stored = storage.save(b"data", "report.pdf", TEST_MAX).await.unwrap();

        let (prefix, rest) = stored.stored_name.split_once('-').unwrap();
        assert_eq!(prefix.parse::<u64>().unwrap(), stored.timestamp_ms);
        assert_eq!(rest, "report.pdf");
    }

    #[tokio::test]
    async fn test_same_name_gets_distinct_stored_names() {
        let (_temp_dir, storage) = setup_storage();

        let first = storage.save(b"one", "report.pdf", TEST_MAX).await.unwrap();
        let second = storage.save(b"two", "report.pdf", TEST_MAX).await.unwrap();

        assert_ne!(first.stored_name, second.stored_name);
        assert_eq!(storage.load(&first.stored_name).await.unwrap(), b"one");
        assert_eq!(storage.load(&second.stored_name).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_store_stream_chunked() {
        let (_temp_dir, storage) = setup_storage();

        let chunks: Vec<std::result::Result<&[u8], std::convert::Infallible>> =
            vec![Ok(b"hello "), Ok(b"chunked "), Ok(b"world")];
        let stored = storage
            .store_stream("chunked.txt", stream::iter(chunks), TEST_MAX)
            .await
            .unwrap();

        assert_eq!(stored.size, 19);
        assert_eq!(
            storage.load(&stored.stored_name).await.unwrap(),
            b"hello chunked world"
        );
    }

    #[tokio::test]
    async fn test_size_limit_exact_boundary() {
        let (_temp_dir, storage) = setup_storage();
        let max = 1024;

        let content = vec![0xAB; max as usize];
        let stored = storage.save(&content, "exact.bin", max).await.unwrap();
        assert_eq!(stored.size, max);
    }

    #[tokio::test]
    async fn test_size_limit_exceeded_leaves_no_file() {
        let (_temp_dir, storage) = setup_storage();
        let max = 1024;

        let content = vec![0xAB; max as usize + 1];
        let result = storage.save(&content, "big.bin", max).await;

        assert!(matches!(
            result,
            Err(FileHubError::SizeLimitExceeded { max: 1024 })
        ));
        assert_eq!(dir_entry_count(&storage), 0);
    }

    #[tokio::test]
    async fn test_size_limit_enforced_across_chunks() {
        let (_temp_dir, storage) = setup_storage();

        // Each chunk is under the limit; the running total is not
        let chunk = vec![0u8; 600];
        let chunks: Vec<std::result::Result<Vec<u8>, std::convert::Infallible>> =
            vec![Ok(chunk.clone()), Ok(chunk)];
        let result = storage
            .store_stream("split.bin", stream::iter(chunks), 1024)
            .await;

        assert!(matches!(result, Err(FileHubError::SizeLimitExceeded { .. })));
        assert_eq!(dir_entry_count(&storage), 0);
    }

    #[tokio::test]
    async fn test_pending_upload_drop_removes_partial_file() {
        let (_temp_dir, storage) = setup_storage();

        {
            let mut pending = storage.begin("aborted.txt", TEST_MAX).await.unwrap();
            pending.write_chunk(b"partial data").await.unwrap();
            // Dropped without commit, simulating a client disconnect
        }

        assert_eq!(dir_entry_count(&storage), 0);
    }

    #[tokio::test]
    async fn test_pending_upload_commit_keeps_file() {
        let (_temp_dir, storage) = setup_storage();

        let mut pending = storage.begin("kept.txt", TEST_MAX).await.unwrap();
        pending.write_chunk(b"kept").await.unwrap();
        let stored = pending.commit().await.unwrap();

        assert!(storage.exists(&stored.stored_name).await);
        assert_eq!(stored.size, 4);
    }

    #[tokio::test]
    async fn test_load_not_found() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.load("1722470400000-nonexistent.txt").await;

        assert!(matches!(result, Err(FileHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_traversal() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.load("../outside.txt").await;
        assert!(matches!(result, Err(FileHubError::InvalidName(_))));

        let result = storage.load("a/b.txt").await;
        assert!(matches!(result, Err(FileHubError::InvalidName(_))));

        let result = storage.load("/etc/passwd").await;
        assert!(matches!(result, Err(FileHubError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_file_size() {
        let (_temp_dir, storage) = setup_storage();
        let content = b"Hello, World!";

        let stored = storage.save(content, "test.txt", TEST_MAX).await.unwrap();

        let size = storage.file_size(&stored.stored_name).await.unwrap();
        assert_eq!(size, content.len() as u64);
    }

    #[tokio::test]
    async fn test_remove() {
        let (_temp_dir, storage) = setup_storage();

        let stored = storage.save(b"to remove", "rm.txt", TEST_MAX).await.unwrap();
        assert!(storage.exists(&stored.stored_name).await);

        assert!(storage.remove(&stored.stored_name).await.unwrap());
        assert!(!storage.exists(&stored.stored_name).await);

        assert!(!storage.remove(&stored.stored_name).await.unwrap());
    }

    #[tokio::test]
    async fn test_binary_content() {
        let (_temp_dir, storage) = setup_storage();

        let content: Vec<u8> = (0..=255).collect();

        let stored = storage.save(&content, "binary.bin", TEST_MAX).await.unwrap();
        let loaded = storage.load(&stored.stored_name).await.unwrap();

        assert_eq!(loaded, content);
    }

    #[tokio::test]
    async fn test_unicode_display_name() {
        let (_temp_dir, storage) = setup_storage();

        let stored = storage
            .save(b"data", "日本語ファイル.txt", TEST_MAX)
            .await
            .unwrap();
        assert!(stored.stored_name.ends_with("日本語ファイル.txt"));
        assert_eq!(storage.load(&stored.stored_name).await.unwrap(), b"data");
    }

    #[test]
    fn test_next_timestamp_monotonic() {
        let (_temp_dir, storage) = setup_storage();

        let mut last = 0;
        for _ in 0..1000 {
            let stamp = storage.next_timestamp();
            assert!(stamp > last);
            last = stamp;
        }
    }

    #[test]
    fn test_sanitize_display_name_passthrough() {
        assert_eq!(sanitize_display_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(
            sanitize_display_name("my document (2).txt").unwrap(),
            "my document (2).txt"
        );
    }

    #[test]
    fn test_sanitize_display_name_strips_separators() {
        assert_eq!(sanitize_display_name("a/b/c.txt").unwrap(), "abc.txt");
        assert_eq!(sanitize_display_name("a\\b.txt").unwrap(), "ab.txt");
    }

    #[test]
    fn test_sanitize_display_name_collapses_dot_dot() {
        assert_eq!(sanitize_display_name("../../etc/passwd").unwrap(), ".etcpasswd");
        assert_eq!(sanitize_display_name("a..b.txt").unwrap(), "a.b.txt");
        assert_eq!(sanitize_display_name("a....b").unwrap(), "a.b");
    }

    #[test]
    fn test_sanitize_display_name_strips_control_chars() {
        assert_eq!(
            sanitize_display_name("evil\r\nname.txt").unwrap(),
            "evilname.txt"
        );
    }

    #[test]
    fn test_sanitize_display_name_rejects_empty() {
        assert!(matches!(
            sanitize_display_name(""),
            Err(FileHubError::InvalidName(_))
        ));
        assert!(matches!(
            sanitize_display_name("///"),
            Err(FileHubError::InvalidName(_))
        ));
        assert!(matches!(
            sanitize_display_name(".."),
            Err(FileHubError::InvalidName(_))
        ));
        assert!(matches!(
            sanitize_display_name("   "),
            Err(FileHubError::InvalidName(_))
        ));
    }

    #[test]
    fn test_sanitize_display_name_rejects_too_long() {
        let long_name = "a".repeat(MAX_FILENAME_LENGTH + 1);
        assert!(matches!(
            sanitize_display_name(&long_name),
            Err(FileHubError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_stored_name() {
        assert!(validate_stored_name("1722470400000-report.pdf").is_ok());

        assert!(validate_stored_name("").is_err());
        assert!(validate_stored_name("../x").is_err());
        assert!(validate_stored_name("a/../b").is_err());
        assert!(validate_stored_name("a/b").is_err());
        assert!(validate_stored_name("a\\b").is_err());
        assert!(validate_stored_name("/absolute").is_err());
        assert!(validate_stored_name("nul\0byte").is_err());
    }
}
