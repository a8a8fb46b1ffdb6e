use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Public URL prefix under which the upload root is served.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// StoredFile
///
/// A file written by the upload layer. Its identity is its path: nothing in the database
/// refers to it unless a CV row or a page block stores `public_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// `/uploads/[<folder>/]<millis>-<name>`, as stored in the database and served statically.
    pub public_path: String,
    /// Location on disk (or a synthetic path for the mock).
    pub disk_path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for the file store. The real implementation writes under
/// the configured upload root; the mock keeps an in-memory ledger for handler tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the upload root if it does not exist yet. Called once at startup.
    async fn ensure_root_exists(&self) -> io::Result<()>;

    /// Writes `bytes` as `[<folder>/]<millis>-<original_name>`.
    ///
    /// `folder` is sanitized to `[A-Za-z0-9_-]`; it is ignored if nothing survives.
    /// `original_name` is reduced to its last path component.
    async fn store(
        &self,
        folder: Option<&str>,
        original_name: &str,
        bytes: &[u8],
    ) -> io::Result<StoredFile>;

    /// Removes a previously stored file. Failures are logged, never propagated.
    async fn discard(&self, file: &StoredFile);
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// sanitize_folder
///
/// Strips every character outside `[A-Za-z0-9_-]`. Returns None when the result is empty.
pub fn sanitize_folder(folder: &str) -> Option<String> {
    let safe: String = folder
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!safe.is_empty()).then_some(safe)
}

/// sanitize_file_name
///
/// Keeps the last path component of a client-supplied file name so it cannot escape
/// the target folder.
pub fn sanitize_file_name(original_name: &str) -> String {
    original_name
        .rsplit(&['/', '\\'][..])
        .find(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or("upload")
        .to_string()
}

/// Timestamped file name: `<millis>-<name>`.
fn stamped_name(millis: i64, file_name: &str) -> String {
    format!("{millis}-{file_name}")
}

fn public_path(folder: Option<&str>, file_name: &str) -> String {
    match folder {
        Some(folder) => format!("{UPLOADS_PREFIX}/{folder}/{file_name}"),
        None => format!("{UPLOADS_PREFIX}/{file_name}"),
    }
}

// 2. The Real Implementation (local disk)
/// DiskStorage
///
/// Writes uploads below `root` with `tokio::fs`. The same directory is mounted by the
/// router under `/uploads`.
#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for DiskStorage {
    async fn ensure_root_exists(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn store(
        &self,
        folder: Option<&str>,
        original_name: &str,
        bytes: &[u8],
    ) -> io::Result<StoredFile> {
        let folder = folder.and_then(sanitize_folder);
        let file_name = sanitize_file_name(original_name);

        let directory = match &folder {
            Some(folder) => self.root.join(folder),
            None => self.root.clone(),
        };
        tokio::fs::create_dir_all(&directory).await?;

        // Two uploads of the same name in the same millisecond must not overwrite each
        // other: the later one moves to the next free millisecond.
        let mut millis = Utc::now().timestamp_millis();
        let (disk_path, mut handle, stamped) = loop {
            let stamped = stamped_name(millis, &file_name);
            let disk_path = directory.join(&stamped);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&disk_path)
                .await
            {
                Ok(handle) => break (disk_path, handle, stamped),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(e),
            }
        };

        handle.write_all(bytes).await?;
        handle.flush().await?;

        tracing::debug!("Stored upload {} ({} bytes)", disk_path.display(), bytes.len());

        Ok(StoredFile {
            public_path: public_path(folder.as_deref(), &stamped),
            disk_path,
            size: bytes.len() as u64,
        })
    }

    async fn discard(&self, file: &StoredFile) {
        if let Err(e) = tokio::fs::remove_file(&file.disk_path).await {
            tracing::error!("Failed to remove upload {}: {}", file.disk_path.display(), e);
        }
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockStorageService
///
/// Keeps the public paths of "stored" files in memory so tests can assert on what
/// remains after a request.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, `store` returns a simulated I/O failure.
    pub should_fail: bool,
    files: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Public paths currently held.
    pub fn stored_paths(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_root_exists(&self) -> io::Result<()> {
        Ok(())
    }

    async fn store(
        &self,
        folder: Option<&str>,
        original_name: &str,
        bytes: &[u8],
    ) -> io::Result<StoredFile> {
        if self.should_fail {
            return Err(io::Error::other("Mock Storage Error: Simulation requested"));
        }

        let folder = folder.and_then(sanitize_folder);
        let file_name = sanitize_file_name(original_name);

        let Ok(mut files) = self.files.lock() else {
            return Err(io::Error::other("Mock Storage Error: ledger poisoned"));
        };
        let mut millis = Utc::now().timestamp_millis();
        let path = loop {
            let candidate = public_path(folder.as_deref(), &stamped_name(millis, &file_name));
            if !files.contains(&candidate) {
                break candidate;
            }
            millis += 1;
        };
        files.push(path.clone());
        drop(files);

        Ok(StoredFile {
            disk_path: PathBuf::from(path.trim_start_matches('/')),
            public_path: path,
            size: bytes.len() as u64,
        })
    }

    async fn discard(&self, file: &StoredFile) {
        if let Ok(mut files) = self.files.lock() {
            files.retain(|path| path != &file.public_path);
        }
    }
}
