//! Keyword analysis pipeline.
//!
//! Runs the six analysis stages in order: normalization with exact dedupe,
//! similarity dedupe, intent classification, embedding, clustering with a
//! merge pass, and aggregation with persistence. Elapsed time is checked
//! between stages; crossing the deadline fails the task with a timeout
//! report instead of letting a slow provider hold the request forever.

use crate::error::{Error, Result};
use crate::keyword::cluster::{ClusterConfig, ClusterService};
use crate::keyword::embedding::{EmbeddingConfig, EmbeddingService};
use crate::keyword::intent::{IntentClassifier, IntentConfig};
use crate::keyword::normalizer::{Normalizer, NormalizerConfig, SimilarityDeduplicator};
use crate::keyword::repository::{KeywordRepository, SearchHit, VectorIndex};
use crate::keyword::types::{
    AnalysisReport, ClassificationMethod, Keyword, KeywordAnalysisTask, StageCounts, TaskStatus,
};
use crate::llm::LlmClient;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info};

/// Configuration for the whole analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Bigram similarity at or above which keywords count as near-duplicates
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Budget for the whole run, checked between stages
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_stage_timeout_secs() -> u64 {
    120
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            similarity_threshold: default_similarity_threshold(),
            intent: IntentConfig::default(),
            embedding: EmbeddingConfig::default(),
            cluster: ClusterConfig::default(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

/// Orchestrates keyword analysis from raw input to a persisted report.
pub struct KeywordAnalysisPipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    intent: IntentClassifier,
    embeddings: EmbeddingService,
    repository: KeywordRepository,
    index: Arc<RwLock<VectorIndex>>,
}

impl KeywordAnalysisPipeline {
    pub fn new(
        config: PipelineConfig,
        llm: Option<Arc<LlmClient>>,
        repository: KeywordRepository,
    ) -> Result<Self> {
        let normalizer = Normalizer::new(config.normalizer.clone());
        let intent = IntentClassifier::new(config.intent.clone(), llm)?;
        let embeddings = EmbeddingService::new(&config.embedding)?;
        Ok(Self {
            config,
            normalizer,
            intent,
            embeddings,
            repository,
            index: Arc::new(RwLock::new(VectorIndex::new())),
        })
    }

    /// Swaps the embedding service, keeping everything else.
    pub fn with_embedding_service(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn repository(&self) -> KeywordRepository {
        self.repository.clone()
    }

    pub fn index(&self) -> Arc<RwLock<VectorIndex>> {
        Arc::clone(&self.index)
    }

    /// Runs the full pipeline. Failures and timeouts are folded into the
    /// report rather than surfaced as errors, so a run always yields a
    /// report with a final status.
    pub async fn run(&self, task: KeywordAnalysisTask) -> AnalysisReport {
        let started = Instant::now();
        info!(
            "Starting analysis task {} with {} keywords",
            task.id,
            task.keywords.len()
        );

        match self.execute(&task, &started).await {
            Ok(report) => report,
            Err(err) => {
                error!("Analysis task {} failed: {}", task.id, err);
                let status = match err {
                    Error::Timeout(_) => TaskStatus::Timeout,
                    _ => TaskStatus::Failed,
                };
                AnalysisReport {
                    task_id: task.id,
                    status,
                    keywords: Vec::new(),
                    clusters: Vec::new(),
                    intent_distribution: AnalysisReport::empty_distribution(),
                    total_search_volume: 0,
                    stage_counts: StageCounts {
                        input: task.keywords.len(),
                        ..StageCounts::default()
                    },
                    processing_time_ms: started.elapsed().as_millis() as u64,
                    error: Some(err.to_string()),
                    metadata: HashMap::new(),
                    completed_at: Utc::now(),
                }
            }
        }
    }

    async fn execute(
        &self,
        task: &KeywordAnalysisTask,
        started: &Instant,
    ) -> Result<AnalysisReport> {
        let input = task.keywords.len();
        if input == 0 {
            return Ok(self.empty_report(task, started));
        }

        // Stage 1: normalize, validate, exact dedupe
        let mut candidates: Vec<Keyword> = Vec::with_capacity(input);
        let mut normalized = 0usize;
        for raw in &task.keywords {
            let text = self.normalizer.normalize(raw);
            if self.normalizer.is_valid(&text) {
                normalized += 1;
                candidates.push(Keyword::new(raw.clone(), text));
            }
        }
        let candidates = self.normalizer.dedupe(candidates);
        self.check_deadline(started, "similarity deduplication")?;

        // Stage 2: near-duplicate removal
        let threshold = task
            .options
            .similarity_threshold
            .unwrap_or(self.config.similarity_threshold);
        let mut keywords = SimilarityDeduplicator::new(threshold).dedupe(candidates);
        let deduplicated = keywords.len();
        self.check_deadline(started, "intent classification")?;

        // Stage 3: intent classification
        let texts: Vec<String> = keywords.iter().map(|k| k.normalized_text.clone()).collect();
        let classifications = if task.options.use_llm_intent {
            self.intent.classify_batch(&texts).await
        } else {
            texts.iter().map(|t| self.intent.classify_single(t)).collect()
        };
        let mut classified = 0usize;
        for (keyword, classification) in keywords.iter_mut().zip(classifications.iter()) {
            if classification.method != ClassificationMethod::Fallback {
                classified += 1;
            }
            keyword.apply_classification(classification);
        }
        self.check_deadline(started, "embedding")?;

        // Stage 4: embeddings, reusing stored vectors for known keywords
        for keyword in keywords.iter_mut() {
            if keyword.embedding.is_some() {
                continue;
            }
            if let Some(existing) = self.repository.get_by_normalized(&keyword.normalized_text).await
            {
                if existing.embedding.is_some() {
                    keyword.embedding = existing.embedding;
                }
            }
        }
        self.embeddings.embed_missing(&mut keywords).await?;
        let embedded = keywords.iter().filter(|k| k.has_embedding()).count();
        self.check_deadline(started, "clustering")?;

        // Stage 5: clustering with merge pass
        let mut cluster_config = self.config.cluster.clone();
        if let Some(threshold) = task.options.cluster_threshold {
            cluster_config.distance_threshold = threshold;
        }
        let clusterer = ClusterService::new(cluster_config);
        let clusters = clusterer.cluster(&mut keywords);
        let mut clusters = clusterer.merge_clusters(clusters, &mut keywords);
        clusters.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
        self.check_deadline(started, "aggregation")?;

        // Stage 6: aggregate and persist
        let mut intent_distribution = AnalysisReport::empty_distribution();
        for keyword in &keywords {
            if let Some(intent) = keyword.intent {
                *intent_distribution
                    .entry(intent.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
        let total_search_volume: u64 = keywords.iter().map(|k| k.search_volume).sum();
        let clustered = keywords.iter().filter(|k| k.cluster_id.is_some()).count();

        self.repository.upsert_batch(keywords.clone()).await;
        self.repository.replace_clusters(clusters.clone()).await;
        {
            let mut index = self.index.write().await;
            index.rebuild(&keywords);
        }

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "Analysis task {} completed: {} keywords, {} clusters in {} ms",
            task.id,
            keywords.len(),
            clusters.len(),
            processing_time_ms
        );

        Ok(AnalysisReport {
            task_id: task.id,
            status: TaskStatus::Completed,
            keywords,
            clusters,
            intent_distribution,
            total_search_volume,
            stage_counts: StageCounts {
                input,
                normalized,
                deduplicated,
                classified,
                embedded,
                clustered,
            },
            processing_time_ms,
            error: None,
            metadata: HashMap::new(),
            completed_at: Utc::now(),
        })
    }

    /// Embeds a free-text query and returns the nearest indexed keywords.
    pub async fn similar_keywords(&self, text: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query = self.embeddings.embed_query(text).await?;
        let index = self.index.read().await;
        Ok(index.search(&query, top_k))
    }

    fn check_deadline(&self, started: &Instant, next_stage: &str) -> Result<()> {
        let budget = Duration::from_secs(self.config.stage_timeout_secs);
        if started.elapsed() > budget {
            return Err(Error::Timeout(next_stage.to_string()));
        }
        Ok(())
    }

    fn empty_report(&self, task: &KeywordAnalysisTask, started: &Instant) -> AnalysisReport {
        let mut metadata = HashMap::new();
        metadata.insert(
            "note".to_string(),
            serde_json::Value::String("no keywords provided".to_string()),
        );
        AnalysisReport {
            task_id: task.id,
            status: TaskStatus::Completed,
            keywords: Vec::new(),
            clusters: Vec::new(),
            intent_distribution: AnalysisReport::empty_distribution(),
            total_search_volume: 0,
            stage_counts: StageCounts::default(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            error: None,
            metadata,
            completed_at: Utc::now(),
        }
    }
}
