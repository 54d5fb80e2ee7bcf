//! Photo attachments that follow their recipe through renames and deletes.
//!
//! A photo lives next to its recipe with the extension swapped
//! (`desserts/cake.md` → `desserts/cake.jpeg`). Upload, download and explicit
//! removal report typed errors; the lifecycle hooks [`AttachmentLinker::on_delete`]
//! and [`AttachmentLinker::on_move`] never fail the document operation they
//! accompany and only report success as a `bool`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::storage::local::persist;
use crate::storage::{DocumentPath, PathResolver, StorageError, photo_path_for};

/// Default upper bound on photo size (10 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Declared metadata of an uploaded photo.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// Name of the file as sent by the client.
    pub filename: &'a str,
    /// Declared MIME type, if the client sent one.
    pub content_type: Option<&'a str>,
}

/// Keeps photo files consistent with their owning documents.
#[derive(Debug, Clone)]
pub struct AttachmentLinker {
    resolver: PathResolver,
    max_bytes: u64,
}

impl AttachmentLinker {
    #[must_use]
    pub fn new(resolver: PathResolver, max_bytes: u64) -> Self {
        Self {
            resolver,
            max_bytes,
        }
    }

    /// Root-relative path of the photo belonging to `document`.
    #[must_use]
    pub fn photo_path(&self, document: &DocumentPath) -> String {
        photo_path_for(Path::new(document.relative()))
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Confined location of the photo of `document`.
    ///
    /// A symlink in the photo's place is refused wherever it points.
    fn photo_file(&self, document: &DocumentPath) -> Result<DocumentPath, StorageError> {
        let link = photo_path_for(document.absolute());
        if fs::symlink_metadata(&link).is_ok_and(|m| m.file_type().is_symlink()) {
            tracing::warn!(document = %document, "refusing symlinked photo");
            return Err(StorageError::InvalidPath(self.photo_path(document)));
        }
        self.resolver.resolve(&self.photo_path(document))
    }

    /// Whether `document` exists and has a photo.
    ///
    /// A photo left behind by a failed cleanup has no owner and is not
    /// reported.
    #[must_use]
    pub fn exists(&self, document: &DocumentPath) -> bool {
        document.absolute().is_file()
            && self
                .photo_file(document)
                .is_ok_and(|photo| photo.absolute().is_file())
    }

    /// Validate and store a photo for an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidAttachment` if the upload is not a
    /// non-empty JPEG within the size limit, `StorageError::NotFound` if the
    /// document does not exist, `StorageError::InvalidPath` if a symlink
    /// occupies the photo's place.
    pub fn put(
        &self,
        document: &DocumentPath,
        content: &[u8],
        upload: Upload<'_>,
    ) -> Result<String, StorageError> {
        self.validate(content, upload)?;

        if !document.absolute().is_file() {
            return Err(StorageError::NotFound(document.to_string()));
        }

        let photo = self.photo_file(document)?;
        persist(photo.absolute(), content).inspect_err(|e| {
            tracing::error!(document = %document, error = %e, "failed to save photo");
        })?;

        tracing::info!(document = %document, bytes = content.len(), "photo saved");
        Ok(self.photo_path(document))
    }

    /// Read the photo of `document`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document has no photo.
    pub fn get(&self, document: &DocumentPath) -> Result<Vec<u8>, StorageError> {
        if !self.exists(document) {
            return Err(StorageError::NotFound(self.photo_path(document)));
        }

        let photo = self.photo_file(document)?;
        fs::read(photo.absolute()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(self.photo_path(document)),
            _ => StorageError::io(photo.absolute(), e),
        })
    }

    /// Remove the photo of `document`.
    ///
    /// Orphaned photos can be removed even when the document is gone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no photo file,
    /// `StorageError::InvalidPath` if a symlink occupies its place.
    pub fn delete(&self, document: &DocumentPath) -> Result<(), StorageError> {
        let photo = self.photo_file(document)?;
        if !photo.absolute().is_file() {
            return Err(StorageError::NotFound(self.photo_path(document)));
        }

        fs::remove_file(photo.absolute()).map_err(|e| StorageError::io(photo.absolute(), e))?;
        tracing::info!(document = %document, "photo deleted");
        Ok(())
    }

    /// Remove the photo after its document was deleted.
    ///
    /// Returns `false` if nothing was removed; the reason is logged.
    pub fn on_delete(&self, document: &DocumentPath) -> bool {
        match self.delete(document) {
            Ok(()) => true,
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(document = %document, "no photo to clean up");
                false
            }
            Err(e) => {
                tracing::warn!(document = %document, error = %e, "failed to delete photo");
                false
            }
        }
    }

    /// Move the photo of `from` to the photo location of `to`.
    ///
    /// Returns `true` when there was nothing to move or the move succeeded,
    /// `false` if the rename failed or either photo location is refused.
    pub fn on_move(&self, from: &DocumentPath, to: &DocumentPath) -> bool {
        let (old_photo, new_photo) = match (self.photo_file(from), self.photo_file(to)) {
            (Ok(old_photo), Ok(new_photo)) => (old_photo, new_photo),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(from = %from, to = %to, error = %e, "failed to move photo");
                return false;
            }
        };
        if !old_photo.absolute().exists() {
            return true;
        }

        let moved = new_photo
            .absolute()
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::rename(old_photo.absolute(), new_photo.absolute()));

        match moved {
            Ok(()) => {
                tracing::info!(from = %from, to = %to, "photo moved");
                true
            }
            Err(e) => {
                tracing::error!(from = %from, to = %to, error = %e, "failed to move photo");
                false
            }
        }
    }

    fn validate(&self, content: &[u8], upload: Upload<'_>) -> Result<(), StorageError> {
        let filename = upload.filename.to_lowercase();
        if !(filename.ends_with(".jpg") || filename.ends_with(".jpeg")) {
            return Err(StorageError::InvalidAttachment(
                "Only JPEG files are allowed".to_string(),
            ));
        }

        if let Some(content_type) = upload.content_type
            && !content_type.starts_with("image/jpeg")
        {
            return Err(StorageError::InvalidAttachment(
                "File must be a JPEG image".to_string(),
            ));
        }

        if content.len() as u64 > self.max_bytes {
            return Err(StorageError::InvalidAttachment(format!(
                "File size must be at most {} bytes",
                self.max_bytes
            )));
        }

        if content.is_empty() {
            return Err(StorageError::InvalidAttachment(
                "Uploaded file is empty".to_string(),
            ));
        }

        Ok(())
    }
}
