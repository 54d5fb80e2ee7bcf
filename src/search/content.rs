//! Content relevance search over recipe documents.
//!
//! Scoring per document:
//! - 10 if the whole query occurs in the content,
//! - 2 per occurrence of each query word (two characters or longer),
//! - 15 if the query occurs in the title,
//! - 8 if the query occurs in the file name.
//!
//! All comparisons are case-insensitive.

use std::fs;
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use crate::corpus::DirectoryIndex;
use crate::corpus::recipe::extract_title;
use crate::search::{Match, SearchBackend, SearchOptions, SearchResult, rank};
use crate::storage::is_document_name;

const PHRASE_WEIGHT: usize = 10;
const WORD_WEIGHT: usize = 2;
const TITLE_WEIGHT: usize = 15;
const FILENAME_WEIGHT: usize = 8;

/// Queries and words shorter than this (in characters) are ignored.
const MIN_TERM_CHARS: usize = 2;

/// Length of the content excerpt, in characters.
pub const PREVIEW_CHARS: usize = 200;

#[allow(clippy::expect_used)]
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Ranks recipe documents by how well their content matches a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSearch;

/// A normalized query.
struct Query<'a> {
    text: &'a str,
    lower: String,
    words: Vec<String>,
}

impl<'a> Query<'a> {
    fn new(text: &'a str) -> Self {
        let lower = text.to_lowercase();
        let words = WORD
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
            .collect();
        Self { text, lower, words }
    }
}

/// Lowercased text that remembers which original character each lowercased
/// character came from.
struct Lowered {
    text: String,
    origin: Vec<usize>,
}

impl Lowered {
    fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        for (index, c) in source.chars().enumerate() {
            for lower in c.to_lowercase() {
                text.push(lower);
                origin.push(index);
            }
        }
        Self { text, origin }
    }

    /// Character offset in the source of the first occurrence of `needle`.
    fn find(&self, needle: &str) -> Option<usize> {
        let byte = self.text.find(needle)?;
        let lowered_index = self.text[..byte].chars().count();
        self.origin.get(lowered_index).copied()
    }
}

/// Score one document. Returns `None` when nothing matched.
fn score_document(query: &Query<'_>, name: &str, path: &str, content: &str) -> Option<SearchResult> {
    let lowered = Lowered::new(content);
    let mut score = 0;
    let mut matches = Vec::new();

    if let Some(position) = lowered.find(&query.lower) {
        score += PHRASE_WEIGHT;
        matches.push(Match::Phrase {
            text: query.text.to_string(),
            position,
        });
    }

    for word in &query.words {
        let count = lowered.text.matches(word.as_str()).count();
        if count > 0 {
            score += count * WORD_WEIGHT;
            matches.push(Match::Word {
                text: word.clone(),
                count,
            });
        }
    }

    let title = extract_title(content);
    if let Some(title) = &title
        && title.to_lowercase().contains(&query.lower)
    {
        score += TITLE_WEIGHT;
        matches.push(Match::Title {
            text: title.clone(),
        });
    }

    if name.to_lowercase().contains(&query.lower) {
        score += FILENAME_WEIGHT;
        matches.push(Match::Filename {
            text: name.to_string(),
        });
    }

    (score > 0).then(|| SearchResult {
        path: path.to_string(),
        title: title.unwrap_or_else(|| name.to_string()),
        score,
        matches,
        preview: Some(preview(content, &query.words, PREVIEW_CHARS)),
    })
}

/// Excerpt of `content` around the first occurrence of any query word.
///
/// The window starts a third of `max_chars` before the match; `...` marks
/// each side that was cut off. Without a match the excerpt is the start of
/// the content.
#[must_use]
pub fn preview(content: &str, words: &[String], max_chars: usize) -> String {
    let content = content.trim();
    let chars: Vec<char> = content.chars().collect();
    let lowered = Lowered::new(content);

    let first_match = words
        .iter()
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS)
        .filter_map(|w| lowered.find(&w.to_lowercase()))
        .min();

    let start = first_match.map_or(0, |pos| pos.saturating_sub(max_chars / 3));
    let end = chars.len().min(start + max_chars);

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push_str("...");
    }
    excerpt.extend(&chars[start..end]);
    if end < chars.len() {
        excerpt.push_str("...");
    }
    excerpt
}

impl SearchBackend for ContentSearch {
    fn search(
        &self,
        query: &str,
        corpus: &DirectoryIndex,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let query = query.trim();
        if query.chars().count() < MIN_TERM_CHARS {
            return vec![];
        }

        let started = Instant::now();
        let query = Query::new(query);
        let mut listing = corpus.list_all();
        let mut results = Vec::new();

        for entry in listing.by_ref() {
            if !is_document_name(&entry.name) {
                continue;
            }

            let Ok(doc) = corpus.resolve(&entry.path) else {
                tracing::debug!(path = %entry.path, "skipping document outside the root");
                continue;
            };
            let content = match fs::read_to_string(doc.absolute()) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(path = %entry.path, error = %e, "skipping unreadable document");
                    continue;
                }
            };

            if let Some(result) = score_document(&query, &entry.name, &entry.path, &content) {
                results.push(result);
            }
        }

        tracing::debug!(
            query = query.text,
            hits = results.len(),
            skipped = listing.skipped().len(),
            elapsed_ms = started.elapsed().as_millis(),
            "content search finished"
        );

        rank(results, options)
    }
}
