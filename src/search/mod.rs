//! Search backend trait and types.
//!
//! There is no persistent index: every query walks the recipe tree through
//! [`DirectoryIndex`] and scores each candidate from scratch, so results
//! always reflect the files on disk at call time.

pub mod content;
pub mod filename;

use serde::Serialize;

use crate::corpus::DirectoryIndex;

pub use content::ContentSearch;
pub use filename::FilenameSearch;

/// Options for limiting search results.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
}

impl SearchOptions {
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

/// How a file name matched a filename query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatch {
    Exact,
    Prefix,
    Substring,
    /// Enough of the query's characters appear somewhere in the name.
    Fuzzy { matched: usize },
}

/// Why a result scored what it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Match {
    /// The whole query occurs in the content, first at `position` (characters).
    Phrase { text: String, position: usize },
    /// A query word occurs `count` times in the content.
    Word { text: String, count: usize },
    /// The query occurs in the document title.
    Title { text: String },
    /// The query occurs in the file name.
    Filename { text: String },
    /// Result of a filename search.
    Name { text: String, strategy: NameMatch },
}

/// A single ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Path relative to the root.
    pub path: String,
    /// Document title, or the file name when there is none.
    pub title: String,
    pub score: usize,
    pub matches: Vec<Match>,
    /// Excerpt around the first match (content search only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Trait for ranking functions over the recipe tree.
pub trait SearchBackend: Send + Sync {
    /// Score every candidate below the corpus root and return the positive
    /// ones, best first.
    fn search(&self, query: &str, corpus: &DirectoryIndex, options: &SearchOptions)
    -> Vec<SearchResult>;
}

/// Sort by score, best first, keeping encounter order among equal scores,
/// then apply the limit.
pub(crate) fn rank(mut results: Vec<SearchResult>, options: &SearchOptions) -> Vec<SearchResult> {
    // `sort_by` is stable; ties keep traversal order.
    results.sort_by(|a, b| b.score.cmp(&a.score));
    if let Some(limit) = options.limit {
        results.truncate(limit);
    }
    results
}
