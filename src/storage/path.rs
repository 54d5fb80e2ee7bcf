//! Confinement of client-supplied paths to the store root.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::storage::{DOCUMENT_EXTENSION, StorageError};

/// A path that has been validated to lie inside the store root.
///
/// Only [`PathResolver::resolve`] constructs these, so holding one is proof
/// that the containment check passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    relative: String,
    absolute: PathBuf,
}

impl DocumentPath {
    /// Root-relative path with forward slashes (empty for the root itself).
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Absolute, canonical location on disk.
    #[must_use]
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Final path segment, or an empty string for the root.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or_default()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative)
    }
}

/// Validates raw paths and confines them to a root directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the root cannot be created or
    /// canonicalized.
    pub fn new(root: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(root).map_err(|e| StorageError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| StorageError::io(root, e))?;
        Ok(Self { root })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied path against the root.
    ///
    /// Leading and trailing slashes are ignored, so `/desserts/cake.md` and
    /// `desserts/cake.md` name the same document. The target does not need to
    /// exist; its nearest existing ancestor is canonicalized so that symlinks
    /// cannot lead outside the root.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the path contains `..`, a NUL
    /// byte, or resolves outside the root.
    pub fn resolve(&self, raw: &str) -> Result<DocumentPath, StorageError> {
        let invalid = || StorageError::InvalidPath(raw.to_string());

        if raw.contains('\0') {
            return Err(invalid());
        }

        let mut lexical = self.root.clone();
        for component in Path::new(raw.trim_matches('/')).components() {
            match component {
                Component::Normal(part) => lexical.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid());
                }
            }
        }

        let resolved = canonicalize_existing_prefix(&lexical)?.ok_or_else(invalid)?;

        let Ok(relative) = resolved.strip_prefix(&self.root) else {
            tracing::warn!(path = raw, "rejected path outside of root");
            return Err(invalid());
        };

        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(DocumentPath {
            relative,
            absolute: resolved,
        })
    }

    /// Resolve a recipe path, appending `.md` when it carries no such suffix.
    ///
    /// # Errors
    ///
    /// Same as [`PathResolver::resolve`].
    pub fn resolve_document(&self, raw: &str) -> Result<DocumentPath, StorageError> {
        let suffix = format!(".{DOCUMENT_EXTENSION}");
        let trimmed = raw.trim_end_matches('/');
        if trimmed.ends_with(&suffix) {
            self.resolve(trimmed)
        } else {
            self.resolve(&format!("{trimmed}{suffix}"))
        }
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// missing tail.
///
/// Returns `Ok(None)` when a dangling symlink sits on the path: its target
/// cannot be checked, so it must not be followed.
fn canonicalize_existing_prefix(path: &Path) -> Result<Option<PathBuf>, StorageError> {
    let mut existing = path;
    let mut tail: Vec<OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut canonical) => {
                for part in tail.iter().rev() {
                    canonical.push(part);
                }
                return Ok(Some(canonical));
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                if fs::symlink_metadata(existing).is_ok_and(|m| m.file_type().is_symlink()) {
                    return Ok(None);
                }
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(StorageError::io(path, e));
                };
                tail.push(name.to_os_string());
                existing = parent;
            }
            Err(e) => return Err(StorageError::io(path, e)),
        }
    }
}
