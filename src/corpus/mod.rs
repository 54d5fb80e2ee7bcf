//! The recipe tree: directory listings and recursive traversal.
//!
//! Listings are produced on demand from the filesystem and never cached.
//! Photo files are hidden so they never show up as editable items.

pub mod recipe;

use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::storage::{DocumentPath, PathResolver, StorageError, is_photo_name};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// A file or directory inside the recipe tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Path relative to the root, with forward slashes.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes, files only.
    pub size: Option<u64>,
}

impl DirectoryEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// A subtree that could not be read during a recursive listing.
#[derive(Debug, Clone)]
pub struct SkippedPath {
    pub path: Option<PathBuf>,
    pub reason: String,
}

/// Directory-first, then by-name ordering used by every listing.
fn listing_order(a_is_dir: bool, a_name: &str, b_is_dir: bool, b_name: &str) -> std::cmp::Ordering {
    b_is_dir.cmp(&a_is_dir).then_with(|| a_name.cmp(b_name))
}

/// Lists the recipe tree below a resolver's root.
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    resolver: PathResolver,
}

impl DirectoryIndex {
    #[must_use]
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Canonical root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Confine a root-relative path from a listing, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the entry leads outside the
    /// root.
    pub fn resolve(&self, relative: &str) -> Result<DocumentPath, StorageError> {
        self.resolver.resolve(relative)
    }

    fn relative(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(self.resolver.root())
            .unwrap_or(absolute)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// List the direct children of `dir`, directories first, then by name.
    ///
    /// A directory that does not exist lists as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotADirectory` if `dir` is a file.
    pub fn list(&self, dir: &DocumentPath) -> Result<Vec<DirectoryEntry>, StorageError> {
        let read_dir = match fs::read_dir(dir.absolute()) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) if e.kind() == ErrorKind::NotADirectory || dir.absolute().is_file() => {
                return Err(StorageError::NotADirectory(dir.to_string()));
            }
            Err(e) => return Err(StorageError::io(dir.absolute(), e)),
        };

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| StorageError::io(dir.absolute(), e))?;
            let name = item.file_name().to_string_lossy().into_owned();
            let path = self.relative(&item.path());

            // Symlinks count as what they point to, as long as that is
            // inside the root.
            let Ok(target) = self.resolver.resolve(&path) else {
                tracing::debug!(path = %path, "skipping entry that leads outside the root");
                continue;
            };
            let Ok(meta) = fs::metadata(target.absolute()) else {
                tracing::debug!(path = %path, "skipping unreadable entry");
                continue;
            };

            if meta.is_file() && is_photo_name(&name) {
                continue;
            }

            entries.push(DirectoryEntry {
                path,
                kind: if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: meta.is_file().then_some(meta.len()),
                name,
            });
        }

        entries.sort_by(|a, b| listing_order(a.is_dir(), &a.name, b.is_dir(), &b.name));
        Ok(entries)
    }

    /// Walk every file below `dir`, depth-first in listing order.
    ///
    /// Unreadable subtrees are skipped and recorded on the returned iterator
    /// instead of failing the traversal. Symlinked files are yielded only when
    /// their target is inside the root; symlinked directories are not
    /// descended.
    #[must_use]
    pub fn list_recursive(&self, dir: &DocumentPath) -> RecursiveListing {
        self.walk(dir.absolute())
    }

    /// Walk every file in the tree.
    #[must_use]
    pub fn list_all(&self) -> RecursiveListing {
        self.walk(self.resolver.root())
    }

    fn walk(&self, start: &Path) -> RecursiveListing {
        let walker = WalkDir::new(start)
            .min_depth(1)
            .follow_links(false)
            .sort_by(|a, b| {
                listing_order(
                    a.file_type().is_dir(),
                    &a.file_name().to_string_lossy(),
                    b.file_type().is_dir(),
                    &b.file_name().to_string_lossy(),
                )
            })
            .into_iter();

        RecursiveListing {
            index: self.clone(),
            walker,
            skipped: Vec::new(),
        }
    }

    /// Create a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotADirectory` if a file is in the way.
    pub fn create_directory(&self, dir: &DocumentPath) -> Result<(), StorageError> {
        if dir.absolute().is_file() {
            return Err(StorageError::NotADirectory(dir.to_string()));
        }
        fs::create_dir_all(dir.absolute()).map_err(|e| StorageError::io(dir.absolute(), e))?;
        tracing::debug!(path = %dir, "directory created");
        Ok(())
    }

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound`, `StorageError::NotADirectory`, or
    /// `StorageError::NotEmpty` if the directory has children (photos count).
    /// The root itself can never be removed.
    pub fn delete_directory(&self, dir: &DocumentPath) -> Result<(), StorageError> {
        if dir.is_root() {
            return Err(StorageError::InvalidPath("cannot delete the root".to_string()));
        }

        let meta = match fs::metadata(dir.absolute()) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(dir.to_string()));
            }
            Err(e) => return Err(StorageError::io(dir.absolute(), e)),
        };
        if !meta.is_dir() {
            return Err(StorageError::NotADirectory(dir.to_string()));
        }

        let mut children =
            fs::read_dir(dir.absolute()).map_err(|e| StorageError::io(dir.absolute(), e))?;
        if children.next().is_some() {
            return Err(StorageError::NotEmpty(dir.to_string()));
        }

        fs::remove_dir(dir.absolute()).map_err(|e| StorageError::io(dir.absolute(), e))?;
        tracing::debug!(path = %dir, "directory deleted");
        Ok(())
    }
}

/// Lazy depth-first file listing.
///
/// Yields file entries only. Errors are not yielded; they are collected and
/// available from [`RecursiveListing::skipped`] once iteration is done.
pub struct RecursiveListing {
    index: DirectoryIndex,
    walker: walkdir::IntoIter,
    skipped: Vec<SkippedPath>,
}

impl RecursiveListing {
    /// Subtrees that were skipped so far.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedPath] {
        &self.skipped
    }
}

impl Iterator for RecursiveListing {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    // A missing start directory simply has no files.
                    if e.depth() == 0
                        && e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound)
                    {
                        return None;
                    }
                    tracing::warn!(error = %e, "skipping unreadable path");
                    self.skipped.push(SkippedPath {
                        path: e.path().map(Path::to_path_buf),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if is_photo_name(&name) {
                continue;
            }

            let path = self.index.relative(entry.path());
            let meta = if file_type.is_symlink() {
                match self.index.resolve(&path) {
                    Ok(target) => fs::metadata(target.absolute()).ok(),
                    Err(e) => {
                        tracing::warn!(path = %path, "skipping link that leads outside the root");
                        self.skipped.push(SkippedPath {
                            path: Some(entry.path().to_path_buf()),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                entry.metadata().ok()
            };

            if file_type.is_symlink() && !meta.as_ref().is_some_and(Metadata::is_file) {
                continue;
            }

            return Some(DirectoryEntry {
                path,
                kind: EntryKind::File,
                size: meta.map(|m| m.len()),
                name,
            });
        }
    }
}
