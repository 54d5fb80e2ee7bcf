//! In-memory cache of rendered translations.
//!
//! Entries are stamped with the modification time of the source document
//! they were produced from. A lookup with a newer modification time misses,
//! so edits invalidate entries without any explicit eviction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

/// A translation together with the state of its source when it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTranslation {
    pub translated: String,
    pub html: String,
    pub source_modified: DateTime<Utc>,
    /// Whether the recipe had a photo when the HTML was rendered.
    pub has_attachment: bool,
}

/// Translations keyed by root-relative document path.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<String, CachedTranslation>>,
}

impl TranslationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached translation for `path`, unless the source was modified
    /// after it was made.
    #[must_use]
    pub fn get(&self, path: &str, current_modified: DateTime<Utc>) -> Option<CachedTranslation> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let cached = entries.get(path)?;
        if cached.source_modified >= current_modified {
            tracing::debug!(path, "translation cache hit");
            Some(cached.clone())
        } else {
            None
        }
    }

    /// Store a translation, replacing any previous one for `path`.
    pub fn put(&self, path: &str, translation: CachedTranslation) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), translation);
        tracing::debug!(path, "translation cached");
    }

    /// Drop the entry for `path`.
    pub fn remove(&self, path: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn entry(modified: DateTime<Utc>) -> CachedTranslation {
        CachedTranslation {
            translated: "# Gâteau".into(),
            html: "<h1>Gâteau</h1>".into(),
            source_modified: modified,
            has_attachment: false,
        }
    }

    #[test]
    fn hits_while_source_is_unchanged() {
        let cache = TranslationCache::new();
        let stamp = Utc::now();
        cache.put("cake.md", entry(stamp));

        assert_eq!(cache.get("cake.md", stamp), Some(entry(stamp)));
        assert_eq!(
            cache.get("cake.md", stamp - TimeDelta::seconds(1)),
            Some(entry(stamp))
        );
    }

    #[test]
    fn misses_after_modification() {
        let cache = TranslationCache::new();
        let stamp = Utc::now();
        cache.put("cake.md", entry(stamp));

        assert_eq!(cache.get("cake.md", stamp + TimeDelta::milliseconds(1)), None);
        assert_eq!(cache.get("bread.md", stamp), None);
    }

    #[test]
    fn put_overwrites_and_remove_evicts() {
        let cache = TranslationCache::new();
        let old = Utc::now();
        let new = old + TimeDelta::seconds(5);

        cache.put("cake.md", entry(old));
        cache.put("cake.md", entry(new));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("cake.md", new), Some(entry(new)));

        cache.remove("cake.md");
        assert!(cache.is_empty());
    }
}
