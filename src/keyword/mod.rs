//! Keyword intelligence: normalization, intent, embeddings, clustering.

pub mod cluster;
pub mod embedding;
pub mod intent;
pub mod normalizer;
pub mod pipeline;
pub mod repository;
pub mod types;

pub use cluster::{ClusterConfig, ClusterService};
pub use embedding::{
    cosine_similarity, create_embedding_provider, EmbeddingConfig, EmbeddingProvider,
    EmbeddingService, HashEmbeddingProvider,
};
pub use intent::{IntentClassifier, IntentConfig};
pub use normalizer::{Normalizer, NormalizerConfig, SimilarityDeduplicator};
pub use pipeline::{KeywordAnalysisPipeline, PipelineConfig};
pub use repository::{KeywordRepository, SearchHit, VectorIndex};
pub use types::{
    AnalysisOptions, AnalysisReport, ClassificationMethod, ClusterStats, IntentClassification,
    Keyword, KeywordAnalysisTask, KeywordCluster, SearchIntent, StageCounts, TaskStatus,
};
