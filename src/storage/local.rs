//! Local filesystem document store with optimistic versioning.

use std::fs::{self, Metadata};
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::storage::versions::{self, UNTRACKED_VERSION, VersionTable};
use crate::storage::{DocumentPath, DocumentStore, PathResolver, StorageError, StoredDocument};

/// Document store backed by a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalStore {
    resolver: PathResolver,
    versions: VersionTable,
}

impl LocalStore {
    /// Create a store over the resolver's root.
    #[must_use]
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            versions: VersionTable::default(),
        }
    }

    /// The resolver confining this store's paths.
    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Metadata of an existing regular file, `None` if nothing is there.
    fn file_metadata(path: &DocumentPath) -> Result<Option<Metadata>, StorageError> {
        match fs::metadata(path.absolute()) {
            Ok(meta) if meta.is_dir() => Err(StorageError::NotAFile(path.to_string())),
            Ok(meta) => Ok(Some(meta)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(e) => Err(StorageError::io(path.absolute(), e)),
        }
    }

    fn existing_file(path: &DocumentPath) -> Result<Metadata, StorageError> {
        Self::file_metadata(path)?.ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn rename_locked(from: &DocumentPath, to: &DocumentPath) -> Result<(), StorageError> {
        Self::existing_file(from)?;
        if Self::file_metadata(to)?.is_some() {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }

        if let Some(parent) = to.absolute().parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        fs::rename(from.absolute(), to.absolute()).map_err(|e| StorageError::io(from.absolute(), e))
    }

    /// Run `op` with the version slot of `path` locked, then drop the slot
    /// if the path ended up without a version.
    fn with_slot<T>(
        &self,
        path: &DocumentPath,
        op: impl FnOnce(&mut Option<u64>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let slot = self.versions.slot(path.absolute());
        let result = op(&mut versions::lock(&slot));
        drop(slot);
        self.versions.release(path.absolute());
        result
    }
}

/// Replace the file at `target` with `content` via a sibling temp file.
///
/// The rename replaces whatever sits at `target`, including a symlink,
/// instead of writing through it.
pub(crate) fn persist(target: &Path, content: &[u8]) -> Result<(), StorageError> {
    let parent = target
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(target.display().to_string()))?;

    fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;

    let mut file = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| StorageError::io(parent, e))?;
    file.write_all(content)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| StorageError::io(target, e))?;

    persist_file(file, target)
}

fn persist_file(file: NamedTempFile, target: &Path) -> Result<(), StorageError> {
    file.persist(target)
        .map(drop)
        .map_err(|e| StorageError::io(target, e.error))
}

fn modified_at(meta: &Metadata, path: &DocumentPath) -> Result<DateTime<Utc>, StorageError> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| StorageError::io(path.absolute(), e))
}

impl DocumentStore for LocalStore {
    fn read(&self, path: &DocumentPath) -> Result<StoredDocument, StorageError> {
        let meta = Self::existing_file(path)?;

        // Sample the version before the bytes: a racing write can only make
        // the pair stale, never newer than the content.
        let version = {
            let slot = self.versions.slot(path.absolute());
            let mut guard = versions::lock(&slot);
            *guard.get_or_insert(UNTRACKED_VERSION)
        };

        let content = fs::read(path.absolute()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::io(path.absolute(), e),
        })?;

        Ok(StoredDocument {
            content,
            version,
            modified_at: modified_at(&meta, path)?,
        })
    }

    fn write(
        &self,
        path: &DocumentPath,
        content: &[u8],
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        self.with_slot(path, |slot| {
            let new_version = if Self::file_metadata(path)?.is_some() {
                let current = slot.unwrap_or(UNTRACKED_VERSION);
                if let Some(expected) = expected_version
                    && expected != current
                {
                    tracing::info!(path = %path, expected, current, "version conflict");
                    return Err(StorageError::VersionConflict { expected, current });
                }
                current + 1
            } else {
                1
            };

            persist(path.absolute(), content)?;
            *slot = Some(new_version);

            tracing::debug!(path = %path, version = new_version, bytes = content.len(), "document written");
            Ok(new_version)
        })
    }

    fn create(&self, path: &DocumentPath, content: &[u8]) -> Result<u64, StorageError> {
        self.with_slot(path, |slot| {
            if Self::file_metadata(path)?.is_some() {
                return Err(StorageError::AlreadyExists(path.to_string()));
            }

            persist(path.absolute(), content)?;
            *slot = Some(1);

            tracing::debug!(path = %path, "document created");
            Ok(1)
        })
    }

    fn delete(&self, path: &DocumentPath) -> Result<(), StorageError> {
        self.with_slot(path, |slot| {
            Self::existing_file(path)?;
            fs::remove_file(path.absolute()).map_err(|e| match e.kind() {
                ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
                _ => StorageError::io(path.absolute(), e),
            })?;
            *slot = None;

            tracing::debug!(path = %path, "document deleted");
            Ok(())
        })
    }

    fn rename(&self, from: &DocumentPath, to: &DocumentPath) -> Result<u64, StorageError> {
        if from.absolute() == to.absolute() {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }

        let source_slot = self.versions.slot(from.absolute());
        let target_slot = self.versions.slot(to.absolute());

        let result = {
            // Always lock in path order so opposite renames cannot deadlock.
            let (mut source, mut target) = if from.absolute() < to.absolute() {
                let source = versions::lock(&source_slot);
                (source, versions::lock(&target_slot))
            } else {
                let target = versions::lock(&target_slot);
                (versions::lock(&source_slot), target)
            };

            Self::rename_locked(from, to).map(|()| {
                *source = None;
                *target = Some(1);
                1
            })
        };

        drop(source_slot);
        drop(target_slot);
        self.versions.release(from.absolute());
        self.versions.release(to.absolute());

        if result.is_ok() {
            tracing::debug!(from = %from, to = %to, "document renamed");
        }
        result
    }

    fn modified(&self, path: &DocumentPath) -> Result<DateTime<Utc>, StorageError> {
        let meta = Self::existing_file(path)?;
        modified_at(&meta, path)
    }

    fn root(&self) -> &Path {
        self.resolver.root()
    }
}
