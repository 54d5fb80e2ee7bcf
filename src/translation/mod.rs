//! Translation of recipes into rendered HTML.
//!
//! The translation service itself is pluggable through [`Translator`]; this
//! crate ships the cache and the HTML renderer that sit around it.

pub mod cache;
pub mod render;

use thiserror::Error;

pub use cache::{CachedTranslation, TranslationCache};
pub use render::HtmlRenderer;

/// Errors reported by a translation service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("content cannot be empty")]
    EmptyInput,

    #[error("translation service unavailable: {0}")]
    Unavailable(String),

    #[error("translation service timed out")]
    Timeout,
}

impl TranslationError {
    /// Whether the same request could succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// A service that translates recipe markdown, keeping its structure.
pub trait Translator: Send + Sync {
    /// Translate `text`, returning markdown.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError` if the service cannot produce a translation.
    fn translate(&self, text: &str) -> Result<String, TranslationError>;
}
