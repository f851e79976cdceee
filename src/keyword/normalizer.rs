//! Keyword normalization and deduplication.
//!
//! Normalization is idempotent: feeding a normalized string back through
//! produces the same string. Dedupe keeps the first occurrence, so the
//! surviving keyword carries the raw text it was first seen with.

use crate::keyword::types::Keyword;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Minimum normalized length in characters (inclusive)
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Maximum normalized length in characters (inclusive)
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Remove characters outside [a-z0-9 ] after lowercasing
    #[serde(default)]
    pub strip_special_chars: bool,
}

fn default_min_length() -> usize {
    2
}

fn default_max_length() -> usize {
    200
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            strip_special_chars: false,
        }
    }
}

/// Normalizes raw keyword strings and removes exact duplicates.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Creates a normalizer with the given configuration.
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalizes a raw keyword: trim, lowercase, optional special-character
    /// strip, then collapse whitespace runs to single spaces.
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();

        let stripped: String = if self.config.strip_special_chars {
            lowered
                .chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
                .collect()
        } else {
            lowered
        };

        // Collapse last so stripping can never reintroduce double spaces
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Checks whether a normalized keyword falls inside the length window.
    pub fn is_valid(&self, normalized: &str) -> bool {
        let len = normalized.chars().count();
        len >= self.config.min_length && len <= self.config.max_length
    }

    /// Normalizes a batch of raw strings, drops invalid entries, and removes
    /// exact duplicates by normalized text. First occurrence wins.
    pub fn normalize_batch(&self, raw: &[String]) -> Vec<Keyword> {
        let mut keywords = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;

        for text in raw {
            let normalized = self.normalize(text);
            if self.is_valid(&normalized) {
                keywords.push(Keyword::new(text.clone(), normalized));
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            debug!("Dropped {} keywords outside the length window", dropped);
        }

        self.dedupe(keywords)
    }

    /// Removes exact duplicates by normalized text, keeping first occurrences
    /// in their original order.
    pub fn dedupe(&self, keywords: Vec<Keyword>) -> Vec<Keyword> {
        let mut seen: HashSet<String> = HashSet::with_capacity(keywords.len());
        keywords
            .into_iter()
            .filter(|kw| seen.insert(kw.normalized_text.clone()))
            .collect()
    }
}

/// Removes near-duplicate keywords using character-bigram Jaccard similarity.
#[derive(Debug, Clone)]
pub struct SimilarityDeduplicator {
    threshold: f64,
}

impl SimilarityDeduplicator {
    /// Creates a deduplicator with the given similarity threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn bigrams(text: &str) -> HashSet<(char, char)> {
        let chars: Vec<char> = text.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Jaccard similarity over character bigrams.
    ///
    /// Strings too short to form bigrams compare as 1.0 when equal and 0.0
    /// otherwise.
    pub fn similarity(a: &str, b: &str) -> f64 {
        let bigrams_a = Self::bigrams(a);
        let bigrams_b = Self::bigrams(b);

        if bigrams_a.is_empty() || bigrams_b.is_empty() {
            return if a == b { 1.0 } else { 0.0 };
        }

        let intersection = bigrams_a.intersection(&bigrams_b).count();
        let union = bigrams_a.union(&bigrams_b).count();
        intersection as f64 / union as f64
    }

    /// Greedy scan in order: a keyword survives unless it is at least
    /// `threshold`-similar to one already kept.
    pub fn dedupe(&self, keywords: Vec<Keyword>) -> Vec<Keyword> {
        let mut kept: Vec<Keyword> = Vec::with_capacity(keywords.len());

        for candidate in keywords {
            let is_duplicate = kept.iter().any(|existing| {
                Self::similarity(&existing.normalized_text, &candidate.normalized_text)
                    >= self.threshold
            });
            if !is_duplicate {
                kept.push(candidate);
            }
        }

        kept
    }
}

impl Default for SimilarityDeduplicator {
    fn default() -> Self {
        Self::new(0.85)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig::default())
    }

    #[test]
    fn test_normalize_trims_lowercases_and_collapses() {
        let n = normalizer();
        assert_eq!(n.normalize("  Best   Running SHOES  "), "best running shoes");
        assert_eq!(n.normalize("hello\tworld\n"), "hello world");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = normalizer();
        for raw in ["  Mixed CASE  input ", "already normalized", "C++ Tutorial!"] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once);
        }

        let stripping = Normalizer::new(NormalizerConfig {
            strip_special_chars: true,
            ..NormalizerConfig::default()
        });
        for raw in ["rock & roll", "C++ tutorial", "what's new?"] {
            let once = stripping.normalize(raw);
            assert_eq!(stripping.normalize(&once), once);
        }
    }

    #[test]
    fn test_strip_special_chars() {
        let n = Normalizer::new(NormalizerConfig {
            strip_special_chars: true,
            ..NormalizerConfig::default()
        });
        assert_eq!(n.normalize("rock & roll"), "rock roll");
        assert_eq!(n.normalize("C++ tutorial 2024!"), "c tutorial 2024");
    }

    #[test]
    fn test_length_window_boundaries() {
        let n = normalizer();
        assert!(!n.is_valid("a"));
        assert!(n.is_valid("ab"));
        assert!(n.is_valid(&"x".repeat(200)));
        assert!(!n.is_valid(&"x".repeat(201)));
    }

    #[test]
    fn test_dedupe_first_occurrence_wins() {
        let n = normalizer();
        let raw: Vec<String> = vec![
            "Best Shoes".to_string(),
            "best   shoes".to_string(),
            "running gear".to_string(),
            "BEST SHOES".to_string(),
        ];
        let keywords = n.normalize_batch(&raw);

        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].text, "Best Shoes");
        assert_eq!(keywords[0].normalized_text, "best shoes");
        assert_eq!(keywords[1].normalized_text, "running gear");
    }

    #[test]
    fn test_normalize_batch_drops_invalid() {
        let n = normalizer();
        let raw: Vec<String> = vec!["a".to_string(), "  ".to_string(), "ok keyword".to_string()];
        let keywords = n.normalize_batch(&raw);
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords[0].normalized_text, "ok keyword");
    }

    #[test]
    fn test_similarity_short_strings() {
        assert_eq!(SimilarityDeduplicator::similarity("a", "a"), 1.0);
        assert_eq!(SimilarityDeduplicator::similarity("a", "b"), 0.0);
        assert_eq!(SimilarityDeduplicator::similarity("", ""), 1.0);
        assert_eq!(SimilarityDeduplicator::similarity("x", "long string"), 0.0);
    }

    #[test]
    fn test_similarity_identical_and_disjoint() {
        assert_eq!(SimilarityDeduplicator::similarity("keyword", "keyword"), 1.0);
        assert_eq!(SimilarityDeduplicator::similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similar_dedupe_removes_near_duplicates() {
        let dedup = SimilarityDeduplicator::default();
        let keywords = vec![
            Keyword::new("best running shoes", "best running shoes"),
            Keyword::new("best running shoe", "best running shoe"),
            Keyword::new("marathon training plan", "marathon training plan"),
        ];

        let kept = dedup.dedupe(keywords);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].normalized_text, "best running shoes");
        assert_eq!(kept[1].normalized_text, "marathon training plan");
    }

    #[test]
    fn test_similar_dedupe_keeps_distinct() {
        let dedup = SimilarityDeduplicator::default();
        let keywords = vec![
            Keyword::new("seo audit", "seo audit"),
            Keyword::new("content marketing", "content marketing"),
        ];
        assert_eq!(dedup.dedupe(keywords).len(), 2);
    }
}
