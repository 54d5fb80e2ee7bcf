//! Sandboxed, versioned storage for recipe documents and their photos.
//!
//! Every path a client supplies goes through [`PathResolver`] first; the
//! resulting [`DocumentPath`] is the only path type the store, the attachment
//! linker and the directory index accept.

pub mod attachment;
pub mod local;
pub mod path;
mod versions;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub use attachment::AttachmentLinker;
pub use local::LocalStore;
pub use path::{DocumentPath, PathResolver};

/// File extension of recipe documents.
pub const DOCUMENT_EXTENSION: &str = "md";

/// File extension of recipe photos.
pub const PHOTO_EXTENSION: &str = "jpeg";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Version conflict: expected version {expected}, current version is {current}")]
    VersionConflict { expected: u64, current: u64 },

    #[error("Directory is not empty: {0}")]
    NotEmpty(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// True for errors caused by the request rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: Vec<u8>,
    pub version: u64,
    pub modified_at: DateTime<Utc>,
}

impl StoredDocument {
    /// The content as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Trait for versioned document stores.
pub trait DocumentStore: Send + Sync {
    /// Read a document with its current version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if absent, `StorageError::NotAFile`
    /// if the path names a directory.
    fn read(&self, path: &DocumentPath) -> Result<StoredDocument, StorageError>;

    /// Write a document, checking `expected_version` against the stored one
    /// when the document already exists. Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::VersionConflict` if the expected version is
    /// stale; the stored content is left untouched in that case.
    fn write(
        &self,
        path: &DocumentPath,
        content: &[u8],
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>;

    /// Create a document that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the path is taken.
    fn create(&self, path: &DocumentPath, content: &[u8]) -> Result<u64, StorageError>;

    /// Delete a document and forget its version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` or `StorageError::NotAFile`.
    fn delete(&self, path: &DocumentPath) -> Result<(), StorageError>;

    /// Move a document to a path that must not exist yet. Both paths stay
    /// locked for the whole move, so an edit of the source either lands
    /// before the move and travels with it, or after it and recreates the
    /// source. Returns the version of the moved document, always 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the source is missing,
    /// `StorageError::AlreadyExists` if the destination is taken.
    fn rename(&self, from: &DocumentPath, to: &DocumentPath) -> Result<u64, StorageError>;

    /// Last modification time of a document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` or `StorageError::NotAFile`.
    fn modified(&self, path: &DocumentPath) -> Result<DateTime<Utc>, StorageError>;

    /// Get the canonical root directory of this store.
    fn root(&self) -> &Path;
}

/// Returns `path` with its extension replaced by the photo extension.
pub(crate) fn photo_path_for(document: &Path) -> PathBuf {
    document.with_extension(PHOTO_EXTENSION)
}

/// Whether a file name carries the photo extension (case-insensitive).
#[must_use]
pub fn is_photo_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PHOTO_EXTENSION))
}

/// Whether a file name carries the document extension.
#[must_use]
pub fn is_document_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == DOCUMENT_EXTENSION)
}
