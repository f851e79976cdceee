//! Search intent classification.
//!
//! Rule-based signal matching is the primary path. Signals match on word
//! boundaries only, so "python buyer guide" never trips the "buy" signal.
//! Keywords the rules cannot resolve go to the LLM fallback in batches;
//! anything the fallback cannot use downgrades to informational at 0.5.

use crate::error::{Error, Result};
use crate::keyword::types::{ClassificationMethod, IntentClassification, SearchIntent};
use crate::llm::{CompletionRequest, LlmClient};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const INFORMATIONAL_SIGNALS: &[&str] = &[
    "how to",
    "what is",
    "why",
    "guide",
    "tutorial",
    "learn",
    "tips",
    "ideas",
    "examples",
    "definition",
    "meaning",
];

const COMMERCIAL_SIGNALS: &[&str] = &[
    "best",
    "top",
    "review",
    "comparison",
    "vs",
    "versus",
    "alternative",
    "compare",
    "which",
    "difference between",
];

const TRANSACTIONAL_SIGNALS: &[&str] = &[
    "buy",
    "price",
    "cheap",
    "discount",
    "deal",
    "order",
    "purchase",
    "shop",
    "coupon",
    "sale",
    "free shipping",
];

const NAVIGATIONAL_SIGNALS: &[&str] = &[
    "login",
    "sign in",
    "website",
    "official",
    "app",
    "download",
    "contact",
    "support",
    "account",
];

const SYSTEM_PROMPT: &str = "You are an SEO search intent classifier. Classify each keyword \
as exactly one of: informational, commercial, transactional, navigational. Respond with only \
a JSON array of objects with keys \"keyword\", \"intent\" and \"confidence\" (0.0 to 1.0).";

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Minimum confidence for a rule-based classification to stand
    #[serde(default = "default_rule_confidence_threshold")]
    pub rule_confidence_threshold: f64,
    /// Send unresolved keywords to the LLM fallback
    #[serde(default = "default_llm_enabled")]
    pub llm_enabled: bool,
    /// Keywords per LLM fallback request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_rule_confidence_threshold() -> f64 {
    0.6
}

fn default_llm_enabled() -> bool {
    true
}

fn default_batch_size() -> usize {
    20
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            rule_confidence_threshold: default_rule_confidence_threshold(),
            llm_enabled: default_llm_enabled(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LlmIntentEntry {
    keyword: String,
    intent: String,
    confidence: f64,
}

/// Classifies keywords by search intent.
pub struct IntentClassifier {
    config: IntentConfig,
    /// Compiled word-boundary patterns per intent, in declared order
    patterns: Vec<(SearchIntent, Vec<(&'static str, Regex)>)>,
    llm: Option<Arc<LlmClient>>,
}

impl IntentClassifier {
    /// Creates a classifier. The LLM client is optional; without one,
    /// unresolved keywords downgrade immediately.
    pub fn new(config: IntentConfig, llm: Option<Arc<LlmClient>>) -> Result<Self> {
        let tables: [(SearchIntent, &[&str]); 4] = [
            (SearchIntent::Informational, INFORMATIONAL_SIGNALS),
            (SearchIntent::Commercial, COMMERCIAL_SIGNALS),
            (SearchIntent::Transactional, TRANSACTIONAL_SIGNALS),
            (SearchIntent::Navigational, NAVIGATIONAL_SIGNALS),
        ];

        let mut patterns = Vec::with_capacity(tables.len());
        for (intent, signals) in tables {
            let mut compiled = Vec::with_capacity(signals.len());
            for signal in signals {
                let pattern = format!(r"\b{}\b", regex::escape(signal));
                let re = Regex::new(&pattern)
                    .map_err(|e| Error::Internal(format!("signal pattern {:?}: {}", signal, e)))?;
                compiled.push((*signal, re));
            }
            patterns.push((intent, compiled));
        }

        Ok(Self {
            config,
            patterns,
            llm,
        })
    }

    /// Rule-based classification. Returns `None` when no signal matches or
    /// the confidence falls below the threshold.
    pub fn classify(&self, keyword: &str) -> Option<IntentClassification> {
        let mut matches: Vec<(SearchIntent, Vec<&'static str>)> = Vec::new();
        let mut total = 0usize;

        for (intent, signals) in &self.patterns {
            let matched: Vec<&'static str> = signals
                .iter()
                .filter(|(_, re)| re.is_match(keyword))
                .map(|(signal, _)| *signal)
                .collect();
            total += matched.len();
            matches.push((*intent, matched));
        }

        if total == 0 {
            return None;
        }

        // Declared order wins ties: only a strictly greater count replaces
        let (winner, winner_signals) = matches
            .into_iter()
            .reduce(|best, candidate| {
                if candidate.1.len() > best.1.len() {
                    candidate
                } else {
                    best
                }
            })
            .unwrap_or((SearchIntent::Informational, Vec::new()));

        let share = winner_signals.len() as f64 / total as f64;
        let confidence = (0.5 + 0.45 * share).min(0.95);

        if confidence < self.config.rule_confidence_threshold {
            return None;
        }

        let signals: Vec<String> = winner_signals.iter().map(|s| s.to_string()).collect();
        let explanation = IntentClassification::explain(
            winner,
            confidence,
            &signals,
            ClassificationMethod::RuleBased,
        );

        Some(IntentClassification {
            intent: winner,
            confidence,
            method: ClassificationMethod::RuleBased,
            explanation,
            signals,
        })
    }

    /// Classifies one keyword without touching the LLM: rule-based result
    /// or the informational downgrade.
    pub fn classify_single(&self, keyword: &str) -> IntentClassification {
        self.classify(keyword)
            .unwrap_or_else(|| Self::fallback_classification())
    }

    /// Classifies a batch. Output is positional: `out[i]` belongs to
    /// `keywords[i]`, and every input gets a classification.
    pub async fn classify_batch(&self, keywords: &[String]) -> Vec<IntentClassification> {
        let mut results: Vec<Option<IntentClassification>> = keywords
            .iter()
            .map(|kw| self.classify(kw))
            .collect();

        let unresolved: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(i, _)| i)
            .collect();

        if !unresolved.is_empty() {
            debug!(
                "Rules resolved {}/{} keywords, {} go to fallback",
                keywords.len() - unresolved.len(),
                keywords.len(),
                unresolved.len()
            );
        }

        if self.config.llm_enabled && self.llm.is_some() && !unresolved.is_empty() {
            for chunk in unresolved.chunks(self.config.batch_size) {
                let texts: Vec<String> = chunk.iter().map(|&i| keywords[i].clone()).collect();
                let classified = self.classify_with_llm(&texts).await;
                for (&idx, classification) in chunk.iter().zip(classified) {
                    results[idx] = Some(classification);
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Self::fallback_classification()))
            .collect()
    }

    /// One LLM round trip for a batch of unresolved keywords. Any failure
    /// downgrades the affected keywords instead of erroring.
    async fn classify_with_llm(&self, keywords: &[String]) -> Vec<IntentClassification> {
        let client = match &self.llm {
            Some(client) => client,
            None => return keywords.iter().map(|_| Self::fallback_classification()).collect(),
        };

        let payload = match serde_json::to_string(keywords) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not serialize keyword batch: {}", e);
                return keywords.iter().map(|_| Self::fallback_classification()).collect();
            }
        };

        let request =
            CompletionRequest::with_system(SYSTEM_PROMPT, format!("Classify these keywords: {}", payload));

        let content = match client.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!("LLM fallback failed, downgrading {} keywords: {}", keywords.len(), e);
                return keywords.iter().map(|_| Self::fallback_classification()).collect();
            }
        };

        let entries = match Self::parse_response(&content) {
            Some(entries) => entries,
            None => {
                warn!("Unparseable LLM response, downgrading {} keywords", keywords.len());
                return keywords.iter().map(|_| Self::fallback_classification()).collect();
            }
        };

        let by_keyword: HashMap<String, (String, f64)> = entries
            .into_iter()
            .map(|e| (e.keyword.to_lowercase(), (e.intent, e.confidence)))
            .collect();

        keywords
            .iter()
            .map(|kw| match by_keyword.get(&kw.to_lowercase()) {
                Some((intent_name, confidence)) => match SearchIntent::parse(intent_name) {
                    Some(intent) => {
                        let confidence = confidence.clamp(0.0, 1.0);
                        let explanation = IntentClassification::explain(
                            intent,
                            confidence,
                            &[],
                            ClassificationMethod::Llm,
                        );
                        IntentClassification {
                            intent,
                            confidence,
                            method: ClassificationMethod::Llm,
                            explanation,
                            signals: Vec::new(),
                        }
                    }
                    None => {
                        warn!("Unknown intent {:?} for keyword {:?}, downgrading", intent_name, kw);
                        Self::fallback_classification()
                    }
                },
                None => {
                    warn!("LLM response missing keyword {:?}, downgrading", kw);
                    Self::fallback_classification()
                }
            })
            .collect()
    }

    fn parse_response(content: &str) -> Option<Vec<LlmIntentEntry>> {
        if let Ok(entries) = serde_json::from_str::<Vec<LlmIntentEntry>>(content) {
            return Some(entries);
        }

        // Tolerate prose around the array
        let start = content.find('[')?;
        let end = content.rfind(']')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Vec<LlmIntentEntry>>(&content[start..=end]).ok()
    }

    fn fallback_classification() -> IntentClassification {
        let explanation = IntentClassification::explain(
            SearchIntent::Informational,
            0.5,
            &[],
            ClassificationMethod::Fallback,
        );
        IntentClassification {
            intent: SearchIntent::Informational,
            confidence: 0.5,
            method: ClassificationMethod::Fallback,
            explanation,
            signals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmConfig;

    fn rule_only() -> IntentClassifier {
        IntentClassifier::new(IntentConfig::default(), None).unwrap()
    }

    #[test]
    fn test_informational_keyword() {
        let c = rule_only().classify("how to fix a bike").unwrap();
        assert_eq!(c.intent, SearchIntent::Informational);
        assert_eq!(c.method, ClassificationMethod::RuleBased);
        assert!(c.signals.contains(&"how to".to_string()));
    }

    #[test]
    fn test_commercial_keyword() {
        let c = rule_only().classify("best mountain bikes").unwrap();
        assert_eq!(c.intent, SearchIntent::Commercial);
    }

    #[test]
    fn test_transactional_keyword() {
        let c = rule_only().classify("buy trek bike online").unwrap();
        assert_eq!(c.intent, SearchIntent::Transactional);
        assert!(c.signals.contains(&"buy".to_string()));
    }

    #[test]
    fn test_navigational_keyword() {
        let c = rule_only().classify("gmail sign in").unwrap();
        assert_eq!(c.intent, SearchIntent::Navigational);
    }

    #[test]
    fn test_word_boundaries_prevent_substring_matches() {
        // "buyer" must not trip the "buy" signal
        let c = rule_only().classify("python buyer guide").unwrap();
        assert_eq!(c.intent, SearchIntent::Informational);
        assert!(!c.signals.contains(&"buy".to_string()));
    }

    #[test]
    fn test_no_signals_is_unclassified() {
        assert!(rule_only().classify("quantum entanglement").is_none());
    }

    #[test]
    fn test_confidence_bounds() {
        let classifier = rule_only();
        for kw in [
            "buy cheap discount deal",
            "best top review",
            "how to learn",
            "best way to buy",
        ] {
            let c = classifier.classify(kw).unwrap();
            assert!(c.confidence >= 0.6, "{} -> {}", kw, c.confidence);
            assert!(c.confidence <= 0.95, "{} -> {}", kw, c.confidence);
        }
    }

    #[test]
    fn test_unanimous_signals_cap_at_095() {
        let c = rule_only().classify("buy cheap discount deal order").unwrap();
        assert_eq!(c.intent, SearchIntent::Transactional);
        assert!((c.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_tie_breaks_in_declared_order() {
        // One commercial signal, one transactional signal
        let c = rule_only().classify("best way to buy").unwrap();
        assert_eq!(c.intent, SearchIntent::Commercial);
        assert!((c.confidence - 0.725).abs() < 1e-9);
    }

    #[test]
    fn test_classify_single_downgrades_without_llm() {
        let c = rule_only().classify_single("quantum entanglement");
        assert_eq!(c.intent, SearchIntent::Informational);
        assert_eq!(c.confidence, 0.5);
        assert_eq!(c.method, ClassificationMethod::Fallback);
    }

    #[tokio::test]
    async fn test_batch_output_is_positional_and_complete() {
        let classifier = rule_only();
        let keywords: Vec<String> = vec![
            "buy shoes".to_string(),
            "zzz qqq".to_string(),
            "how to run".to_string(),
        ];
        let results = classifier.classify_batch(&keywords).await;

        assert_eq!(results.len(), keywords.len());
        assert_eq!(results[0].intent, SearchIntent::Transactional);
        assert_eq!(results[1].method, ClassificationMethod::Fallback);
        assert_eq!(results[2].intent, SearchIntent::Informational);
    }

    #[tokio::test]
    async fn test_batch_uses_llm_for_unresolved() {
        let llm = Arc::new(LlmClient::new(LlmConfig::mock()).unwrap());
        let classifier = IntentClassifier::new(IntentConfig::default(), Some(llm)).unwrap();

        let keywords: Vec<String> = vec!["zzz qqq".to_string()];
        let results = classifier.classify_batch(&keywords).await;

        assert_eq!(results.len(), 1);
        // Mock provider answers informational at 0.7 for unknown text
        assert_eq!(results[0].method, ClassificationMethod::Llm);
        assert_eq!(results[0].intent, SearchIntent::Informational);
        assert!((results[0].confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_response_tolerates_prose() {
        let content = r#"Here you go:
[{"keyword": "x", "intent": "commercial", "confidence": 0.8}]
Hope that helps."#;
        let entries = IntentClassifier::parse_response(content).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].intent, "commercial");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(IntentClassifier::parse_response("not json at all").is_none());
    }
}
