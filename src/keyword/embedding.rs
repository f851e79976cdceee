//! Keyword embeddings.
//!
//! The provider seam is positional: `out[i]` is the embedding of
//! `texts[i]`, always. The hash provider derives vectors from a SHA-256
//! digest so the same text maps to the same vector in every process.

use crate::error::{Error, Result};
use crate::keyword::types::Keyword;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Embedding provider selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic digest-seeded vectors (offline)
    Hash,
    /// OpenAI embeddings API
    OpenAI,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Texts per provider call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_provider")]
    pub provider: EmbeddingProviderKind,
    /// Model name for the OpenAI provider
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_dimension() -> usize {
    1536
}

fn default_batch_size() -> usize {
    100
}

fn default_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Hash
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            provider: default_provider(),
            model: default_embedding_model(),
        }
    }
}

/// Produces embeddings for batches of texts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch. The result is positional and must have one vector
    /// per input text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension this provider produces.
    fn dimension(&self) -> usize;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Creates a provider from configuration.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Hash => {
            Ok(Box::new(HashEmbeddingProvider::new(config.dimension)))
        }
        #[cfg(feature = "llm-integration")]
        EmbeddingProviderKind::OpenAI => Ok(Box::new(openai::OpenAiEmbeddingProvider::from_env(
            config.model.clone(),
            config.dimension,
        )?)),
        #[cfg(not(feature = "llm-integration"))]
        EmbeddingProviderKind::OpenAI => Err(Error::Config(
            "OpenAI embeddings require the llm-integration feature".to_string(),
        )),
    }
}

/// Deterministic embedding provider seeded by SHA-256 of the text.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.to_lowercase().as_bytes());
        (0..self.dimension)
            .map(|i| {
                let byte = digest[i % digest.len()];
                let value = (byte as f32 / 255.0) * 2.0 - 1.0;
                (value * 1e6).round() / 1e6
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(feature = "llm-integration")]
mod openai {
    use super::*;
    use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};

    /// OpenAI embeddings provider.
    pub struct OpenAiEmbeddingProvider {
        client: Client<OpenAIConfig>,
        model: String,
        dimension: usize,
    }

    impl OpenAiEmbeddingProvider {
        pub fn from_env(model: String, dimension: usize) -> Result<Self> {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| Error::Config("OPENAI_API_KEY not set".to_string()))?;
            let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Ok(Self {
                client,
                model,
                dimension,
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OpenAiEmbeddingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(texts.to_vec())
                .build()
                .map_err(|e| Error::Embedding(e.to_string()))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| Error::Embedding(e.to_string()))?;

            Ok(response.data.into_iter().map(|d| d.embedding).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn name(&self) -> &str {
            "openai"
        }
    }
}

/// Cosine similarity of two vectors, 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += (*x as f64).powi(2);
        norm_b += (*y as f64).powi(2);
    }

    let norm = norm_a.sqrt() * norm_b.sqrt();
    if norm == 0.0 {
        0.0
    } else {
        dot / norm
    }
}

/// Embeds keywords that do not have a vector yet.
pub struct EmbeddingService {
    provider: Box<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl EmbeddingService {
    /// Creates a service from configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let provider = create_embedding_provider(config)?;
        Ok(Self {
            provider,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Creates a service with an injected provider.
    pub fn with_provider(provider: Box<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embeds every keyword missing a vector, in batches. Already-embedded
    /// keywords are skipped. A failed batch fails the call; batches that
    /// already succeeded keep their vectors. Returns how many keywords were
    /// embedded.
    pub async fn embed_missing(&self, keywords: &mut [Keyword]) -> Result<usize> {
        let missing: Vec<usize> = keywords
            .iter()
            .enumerate()
            .filter(|(_, kw)| !kw.has_embedding())
            .map(|(i, _)| i)
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }

        debug!(
            "Embedding {} of {} keywords via {}",
            missing.len(),
            keywords.len(),
            self.provider.name()
        );

        let mut embedded = 0usize;
        for chunk in missing.chunks(self.batch_size) {
            let texts: Vec<String> = chunk
                .iter()
                .map(|&i| keywords[i].normalized_text.clone())
                .collect();

            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }

            for (&idx, vector) in chunk.iter().zip(vectors) {
                keywords[idx].embedding = Some(vector);
                embedded += 1;
            }
        }

        Ok(embedded)
    }

    /// Cosine similarity between two keywords, 0.0 when either lacks an
    /// embedding.
    pub fn keyword_similarity(&self, a: &Keyword, b: &Keyword) -> f64 {
        match (&a.embedding, &b.embedding) {
            (Some(va), Some(vb)) => cosine_similarity(va, vb),
            _ => 0.0,
        }
    }

    /// Embeds a single query text.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.provider.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("provider returned no embedding".to_string()))
    }
}
