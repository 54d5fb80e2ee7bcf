//! Command implementations shared by CLI and MCP server.
//!
//! [`Vault`] bundles the resolver, the versioned store, the attachment linker,
//! the directory index and the translation cache over one recipe root. Every
//! operation takes raw client paths and resolves them before touching disk.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::corpus::recipe::{self, Validation, extract_title, title_from_filename};
use crate::corpus::{DirectoryEntry, DirectoryIndex, RecursiveListing};
use crate::search::{ContentSearch, FilenameSearch, SearchBackend, SearchOptions, SearchResult};
use crate::storage::attachment::Upload;
use crate::storage::{
    AttachmentLinker, DocumentPath, DocumentStore, LocalStore, PathResolver, StorageError,
    is_document_name,
};
use crate::translation::{
    CachedTranslation, HtmlRenderer, TranslationCache, TranslationError, Translator,
};

/// URL prefix under which photos are served, as referenced by rendered pages.
pub const PHOTO_URL_PREFIX: &str = "/api/photos/";

/// Errors surfaced by vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl VaultError {
    /// True for errors caused by the request rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_client_error(),
            Self::Translation(e) => matches!(e, TranslationError::EmptyInput),
        }
    }

    /// True when the request lost a race or collides with existing state.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::VersionConflict { .. } | StorageError::AlreadyExists(_))
        )
    }

    /// True when repeating the same request later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Translation(e) => e.is_retryable(),
            Self::Storage(_) => false,
        }
    }
}

/// A document as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub path: String,
    pub content: String,
    pub version: u64,
    pub modified_at: DateTime<Utc>,
}

/// The recipe store over one root directory.
#[derive(Debug)]
pub struct Vault {
    resolver: PathResolver,
    store: LocalStore,
    attachments: AttachmentLinker,
    index: DirectoryIndex,
    cache: TranslationCache,
    renderer: HtmlRenderer,
    default_limit: usize,
}

impl Vault {
    /// Open a vault on `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or canonicalized.
    pub fn new(root: &Path, max_attachment_bytes: u64) -> Result<Self, VaultError> {
        let resolver = PathResolver::new(root)?;
        tracing::debug!(root = %resolver.root().display(), "vault opened");

        Ok(Self {
            store: LocalStore::new(resolver.clone()),
            attachments: AttachmentLinker::new(resolver.clone(), max_attachment_bytes),
            index: DirectoryIndex::new(resolver.clone()),
            cache: TranslationCache::new(),
            renderer: HtmlRenderer::default(),
            default_limit: crate::config::SearchConfig::default().default_limit,
            resolver,
        })
    }

    /// Open the vault described by `config`.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::new`].
    pub fn open(config: &Config) -> Result<Self, VaultError> {
        let mut vault = Self::new(&config.root(), config.attachments.max_bytes)?;
        vault.default_limit = config.search.default_limit;
        Ok(vault)
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Result limit used when a search does not name one.
    #[must_use]
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    fn options(&self, limit: Option<usize>) -> SearchOptions {
        SearchOptions::with_limit(limit.unwrap_or(self.default_limit))
    }

    // === Directories ===

    /// Direct children of a directory; photos are hidden.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` or `NotADirectory`.
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, VaultError> {
        let dir = self.resolver.resolve(path)?;
        Ok(self.index.list(&dir)?)
    }

    /// Every file below a directory, depth-first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`.
    pub fn list_recursive(&self, path: &str) -> Result<RecursiveListing, VaultError> {
        let dir = self.resolver.resolve(path)?;
        Ok(self.index.list_recursive(&dir))
    }

    /// # Errors
    ///
    /// Returns `InvalidPath` or `NotADirectory`.
    pub fn create_directory(&self, path: &str) -> Result<(), VaultError> {
        let dir = self.resolver.resolve(path)?;
        Ok(self.index.create_directory(&dir)?)
    }

    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound`, `NotADirectory` or `NotEmpty`.
    pub fn delete_directory(&self, path: &str) -> Result<(), VaultError> {
        let dir = self.resolver.resolve(path)?;
        Ok(self.index.delete_directory(&dir)?)
    }

    // === Documents ===

    /// Read a document with its version.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound` or `NotAFile`.
    pub fn read_document(&self, path: &str) -> Result<Document, VaultError> {
        let doc = self.resolver.resolve(path)?;
        let stored = self.store.read(&doc)?;
        Ok(Document {
            content: stored.text(),
            path: doc.relative().to_string(),
            version: stored.version,
            modified_at: stored.modified_at,
        })
    }

    /// Write a document and return its new version.
    ///
    /// With `expected_version`, an existing document is only replaced if its
    /// version still matches.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotAFile` or `VersionConflict`.
    pub fn write_document(
        &self,
        path: &str,
        content: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, VaultError> {
        let doc = self.resolver.resolve(path)?;
        let version = self.store.write(&doc, content.as_bytes(), expected_version)?;
        self.cache.remove(doc.relative());
        Ok(version)
    }

    /// Delete a document, then its photo.
    ///
    /// Photo cleanup is best-effort and never fails the delete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound` or `NotAFile`.
    pub fn delete_document(&self, path: &str) -> Result<(), VaultError> {
        let doc = self.resolver.resolve(path)?;
        self.remove_document(&doc)
    }

    fn remove_document(&self, doc: &DocumentPath) -> Result<(), VaultError> {
        self.store.delete(doc)?;
        self.cache.remove(doc.relative());
        if is_document_name(doc.file_name()) {
            self.attachments.on_delete(doc);
        }
        Ok(())
    }

    /// Move a document, carrying its photo along, and return the version of
    /// the new document.
    ///
    /// The store moves the document atomically, so an edit of the source
    /// racing the move is never lost.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound`, `NotAFile`, or `AlreadyExists` if
    /// the destination is taken.
    pub fn move_document(&self, from: &str, to: &str) -> Result<u64, VaultError> {
        let source = self.resolver.resolve(from)?;
        let destination = self.resolver.resolve(to)?;

        let version = self.store.rename(&source, &destination)?;
        self.cache.remove(source.relative());
        self.cache.remove(destination.relative());

        if is_document_name(source.file_name())
            && is_document_name(destination.file_name())
            && !self.attachments.on_move(&source, &destination)
        {
            tracing::warn!(from = %source, to = %destination, "document moved without its photo");
            // Drop the orphan left at the old location.
            self.attachments.on_delete(&source);
        }

        tracing::info!(from = %source, to = %destination, "document moved");
        Ok(version)
    }

    // === Search ===

    /// Rank documents by content relevance.
    #[must_use]
    pub fn search_content(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        ContentSearch.search(query, &self.index, &self.options(limit))
    }

    /// Rank files by name similarity.
    #[must_use]
    pub fn search_filenames(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        FilenameSearch.search(query, &self.index, &self.options(limit))
    }

    // === Photos ===

    /// Store the photo of a recipe and return the photo's path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `InvalidAttachment`, or `NotFound` if the
    /// recipe does not exist.
    pub fn put_attachment(
        &self,
        recipe: &str,
        content: &[u8],
        upload: Upload<'_>,
    ) -> Result<String, VaultError> {
        let doc = self.resolver.resolve_document(recipe)?;
        Ok(self.attachments.put(&doc, content, upload)?)
    }

    /// # Errors
    ///
    /// Returns `InvalidPath`, or `NotFound` if the recipe has no photo.
    pub fn get_attachment(&self, recipe: &str) -> Result<Vec<u8>, VaultError> {
        let doc = self.resolver.resolve_document(recipe)?;
        Ok(self.attachments.get(&doc)?)
    }

    /// # Errors
    ///
    /// Returns `InvalidPath`, or `NotFound` if there is no photo file.
    pub fn delete_attachment(&self, recipe: &str) -> Result<(), VaultError> {
        let doc = self.resolver.resolve_document(recipe)?;
        Ok(self.attachments.delete(&doc)?)
    }

    /// Whether the recipe exists and has a photo.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`.
    pub fn attachment_exists(&self, recipe: &str) -> Result<bool, VaultError> {
        let doc = self.resolver.resolve_document(recipe)?;
        Ok(self.attachments.exists(&doc))
    }

    // === Recipes ===

    /// Create a recipe from the template, titled after its file name.
    /// Returns the recipe's path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, or `AlreadyExists` if the recipe exists.
    pub fn create_recipe(&self, path: &str) -> Result<String, VaultError> {
        let doc = self.resolver.resolve_document(path)?;
        let title = title_from_filename(doc.file_name());
        self.store.create(&doc, recipe::template(&title).as_bytes())?;
        tracing::info!(path = %doc, title = %title, "recipe created");
        Ok(doc.relative().to_string())
    }

    /// Check a stored recipe's structure.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound` or `NotAFile`.
    pub fn validate_recipe(&self, path: &str) -> Result<Validation, VaultError> {
        let doc = self.resolver.resolve_document(path)?;
        let stored = self.store.read(&doc)?;
        Ok(recipe::validate(&stored.text()))
    }

    /// Translate a recipe and render it as an HTML page.
    ///
    /// Results are cached until the recipe is modified or its photo appears
    /// or disappears.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath`, `NotFound`, `EmptyInput` for a blank recipe, or
    /// the translator's error.
    pub fn translate_document(
        &self,
        path: &str,
        translator: &dyn Translator,
    ) -> Result<String, VaultError> {
        let doc = self.resolver.resolve_document(path)?;
        let modified = self.store.modified(&doc)?;
        let has_attachment = self.attachments.exists(&doc);

        if let Some(cached) = self.cache.get(doc.relative(), modified)
            && cached.has_attachment == has_attachment
        {
            return Ok(cached.html);
        }

        let text = self.store.read(&doc)?.text();
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput.into());
        }

        let title = extract_title(&text).unwrap_or_else(|| title_from_filename(doc.file_name()));
        let translated = translator.translate(&text).inspect_err(|e| {
            tracing::error!(path = %doc, error = %e, "translation failed");
        })?;

        let photo_url = has_attachment.then(|| format!("{PHOTO_URL_PREFIX}{}", doc.relative()));
        let html = self.renderer.render(&translated, &title, photo_url.as_deref());

        self.cache.put(
            doc.relative(),
            CachedTranslation {
                translated,
                html: html.clone(),
                source_modified: modified,
                has_attachment,
            },
        );
        Ok(html)
    }
}
