//! Filename search: ranks files by how well their name matches a query.
//!
//! | match                                   | score            |
//! |-----------------------------------------|------------------|
//! | name equals query                       | 100              |
//! | name starts with query                  | 50               |
//! | name contains query                     | 25               |
//! | at least 70% of query chars in the name | 2 × matched      |
//!
//! The fuzzy rule counts each query character, repeats included, that
//! occurs anywhere in the name. Order is not considered.

use std::time::Instant;

use crate::corpus::DirectoryIndex;
use crate::search::{Match, NameMatch, SearchBackend, SearchOptions, SearchResult, rank};

const EXACT_SCORE: usize = 100;
const PREFIX_SCORE: usize = 50;
const SUBSTRING_SCORE: usize = 25;
const FUZZY_WEIGHT: usize = 2;

/// Ranks every file in the tree by name similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameSearch;

/// Score a file name against an already lowercased query.
#[must_use]
pub fn score_name(query: &str, name: &str) -> Option<(usize, NameMatch)> {
    let name = name.to_lowercase();

    if name == query {
        return Some((EXACT_SCORE, NameMatch::Exact));
    }
    if name.starts_with(query) {
        return Some((PREFIX_SCORE, NameMatch::Prefix));
    }
    if name.contains(query) {
        return Some((SUBSTRING_SCORE, NameMatch::Substring));
    }

    let total = query.chars().count();
    let matched = query.chars().filter(|c| name.contains(*c)).count();
    // matched / total >= 0.7
    (matched > 0 && matched * 10 >= total * 7)
        .then_some((matched * FUZZY_WEIGHT, NameMatch::Fuzzy { matched }))
}

impl SearchBackend for FilenameSearch {
    fn search(
        &self,
        query: &str,
        corpus: &DirectoryIndex,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return vec![];
        }

        let started = Instant::now();
        let mut listing = corpus.list_all();
        let results: Vec<_> = listing
            .by_ref()
            .filter_map(|entry| {
                let (score, strategy) = score_name(&query, &entry.name)?;
                Some(SearchResult {
                    path: entry.path,
                    title: entry.name.clone(),
                    score,
                    matches: vec![Match::Name {
                        text: entry.name,
                        strategy,
                    }],
                    preview: None,
                })
            })
            .collect();

        tracing::debug!(
            query = %query,
            hits = results.len(),
            skipped = listing.skipped().len(),
            elapsed_ms = started.elapsed().as_millis(),
            "filename search finished"
        );

        rank(results, options)
    }
}
