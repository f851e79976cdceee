//! Core types for the keyword intelligence pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Search intent behind a keyword.
///
/// Tie-breaks between equal signal scores resolve in declared order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SearchIntent {
    /// User wants to learn something
    Informational,
    /// User is researching before buying
    Commercial,
    /// User wants to buy or sign up
    Transactional,
    /// User is looking for a specific site
    Navigational,
}

impl SearchIntent {
    /// All intents in declared (tie-break) order.
    pub const ALL: [SearchIntent; 4] = [
        SearchIntent::Informational,
        SearchIntent::Commercial,
        SearchIntent::Transactional,
        SearchIntent::Navigational,
    ];

    /// Returns the lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIntent::Informational => "informational",
            SearchIntent::Commercial => "commercial",
            SearchIntent::Transactional => "transactional",
            SearchIntent::Navigational => "navigational",
        }
    }

    /// Returns a human-readable description of the intent.
    pub fn description(&self) -> &'static str {
        match self {
            SearchIntent::Informational => "User is seeking information or knowledge",
            SearchIntent::Commercial => "User is researching options before making a decision",
            SearchIntent::Transactional => "User has high purchase/action intent",
            SearchIntent::Navigational => "User is looking for a specific website or page",
        }
    }

    /// Parses a lowercase wire name.
    pub fn parse(s: &str) -> Option<SearchIntent> {
        match s {
            "informational" => Some(SearchIntent::Informational),
            "commercial" => Some(SearchIntent::Commercial),
            "transactional" => Some(SearchIntent::Transactional),
            "navigational" => Some(SearchIntent::Navigational),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an intent classification was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Signal tables with word-boundary matching
    RuleBased,
    /// LLM batch fallback
    Llm,
    /// Downgrade after an unusable LLM response
    Fallback,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::RuleBased => "rule_based",
            ClassificationMethod::Llm => "llm",
            ClassificationMethod::Fallback => "fallback",
        }
    }
}

/// Intent classification result for a single keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: SearchIntent,
    /// Confidence in [0.0, 1.0]
    pub confidence: f64,
    pub method: ClassificationMethod,
    /// Why this intent was assigned
    pub explanation: String,
    /// Signals that matched during rule-based classification
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<String>,
}

impl IntentClassification {
    /// Builds the standard explanation text for a classification.
    pub fn explain(
        intent: SearchIntent,
        confidence: f64,
        signals: &[String],
        method: ClassificationMethod,
    ) -> String {
        let base = intent.description();
        let pct = (confidence * 100.0).round() as u32;
        if signals.is_empty() {
            format!("{}. Confidence: {}% ({})", base, pct, method.as_str())
        } else {
            let listed = signals
                .iter()
                .take(3)
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{}. Detected signals: {}. Confidence: {}% ({})",
                base,
                listed,
                pct,
                method.as_str()
            )
        }
    }
}

/// A keyword moving through the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Uuid,
    /// Raw text as received (first occurrence wins on dedupe)
    pub text: String,
    /// Lowercase, trimmed, whitespace-collapsed form
    pub normalized_text: String,
    #[serde(default)]
    pub search_volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<SearchIntent>,
    #[serde(default)]
    pub intent_confidence: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub intent_explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intent_signals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Keyword {
    /// Creates a keyword from raw and normalized text.
    pub fn new(text: impl Into<String>, normalized_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            normalized_text: normalized_text.into(),
            search_volume: 0,
            intent: None,
            intent_confidence: 0.0,
            intent_explanation: String::new(),
            intent_signals: Vec::new(),
            embedding: None,
            cluster_id: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the search volume.
    pub fn with_volume(mut self, volume: u64) -> Self {
        self.search_volume = volume;
        self
    }

    /// Checks whether an embedding has been generated.
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Applies an intent classification to this keyword.
    pub fn apply_classification(&mut self, classification: &IntentClassification) {
        self.intent = Some(classification.intent);
        self.intent_confidence = classification.confidence;
        self.intent_explanation = classification.explanation.clone();
        self.intent_signals = classification.signals.clone();
    }
}

/// A group of semantically related keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCluster {
    pub id: Uuid,
    pub name: String,
    /// Member keyword ids in formation order
    pub keyword_ids: Vec<Uuid>,
    /// Text of the highest-volume member
    pub primary_keyword: String,
    /// Mean of member embeddings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub centroid: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_intent: Option<SearchIntent>,
    pub total_search_volume: u64,
    pub avg_search_volume: f64,
    pub created_at: DateTime<Utc>,
}

impl KeywordCluster {
    pub fn len(&self) -> usize {
        self.keyword_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyword_ids.is_empty()
    }
}

/// Aggregate statistics over a clustering result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    pub total_clusters: usize,
    pub total_keywords: usize,
    pub avg_cluster_size: f64,
    pub largest_cluster_size: usize,
    pub smallest_cluster_size: usize,
    pub total_search_volume: u64,
    pub avg_cluster_volume: f64,
}

/// Task execution status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
}

/// Pipeline tunables carried per task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Send ambiguous keywords to the LLM fallback
    #[serde(default = "default_use_llm_intent")]
    pub use_llm_intent: bool,
    /// Override for the similarity dedupe threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    /// Override for the clustering distance threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_threshold: Option<f64>,
}

fn default_use_llm_intent() -> bool {
    true
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            use_llm_intent: default_use_llm_intent(),
            similarity_threshold: None,
            cluster_threshold: None,
        }
    }
}

/// An analysis request as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordAnalysisTask {
    pub id: Uuid,
    pub keywords: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl KeywordAnalysisTask {
    /// Creates a task with a fresh id and default options.
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            keywords,
            locale: default_locale(),
            target_url: None,
            options: AnalysisOptions::default(),
        }
    }
}

/// Per-stage survivor counts for a pipeline run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub input: usize,
    pub normalized: usize,
    pub deduplicated: usize,
    pub classified: usize,
    pub embedded: usize,
    pub clustered: usize,
}

/// Complete result of a keyword analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub keywords: Vec<Keyword>,
    pub clusters: Vec<KeywordCluster>,
    /// Keyword count per intent, zero-filled over all four intents
    pub intent_distribution: HashMap<String, usize>,
    pub total_search_volume: u64,
    pub stage_counts: StageCounts,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Zero-filled intent distribution over all four intents.
    pub fn empty_distribution() -> HashMap<String, usize> {
        SearchIntent::ALL
            .iter()
            .map(|i| (i.as_str().to_string(), 0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_names_round_trip() {
        for intent in SearchIntent::ALL {
            assert_eq!(SearchIntent::parse(intent.as_str()), Some(intent));
        }
        assert_eq!(SearchIntent::parse("browsing"), None);
    }

    #[test]
    fn test_explanation_includes_signals_and_method() {
        let signals = vec!["buy".to_string(), "cheap".to_string()];
        let text = IntentClassification::explain(
            SearchIntent::Transactional,
            0.95,
            &signals,
            ClassificationMethod::RuleBased,
        );
        assert!(text.contains("'buy', 'cheap'"));
        assert!(text.contains("95%"));
        assert!(text.contains("rule_based"));
    }

    #[test]
    fn test_explanation_caps_signals_at_three() {
        let signals: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let text = IntentClassification::explain(
            SearchIntent::Commercial,
            0.8,
            &signals,
            ClassificationMethod::RuleBased,
        );
        assert!(text.contains("'a', 'b', 'c'"));
        assert!(!text.contains("'d'"));
    }

    #[test]
    fn test_apply_classification() {
        let mut kw = Keyword::new("Buy Shoes", "buy shoes");
        let classification = IntentClassification {
            intent: SearchIntent::Transactional,
            confidence: 0.9,
            method: ClassificationMethod::RuleBased,
            explanation: "test".to_string(),
            signals: vec!["buy".to_string()],
        };
        kw.apply_classification(&classification);
        assert_eq!(kw.intent, Some(SearchIntent::Transactional));
        assert_eq!(kw.intent_confidence, 0.9);
        assert_eq!(kw.intent_signals, vec!["buy".to_string()]);
    }

    #[test]
    fn test_empty_distribution_is_zero_filled() {
        let dist = AnalysisReport::empty_distribution();
        assert_eq!(dist.len(), 4);
        assert_eq!(dist["informational"], 0);
        assert_eq!(dist["navigational"], 0);
    }
}
