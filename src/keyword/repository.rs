//! In-memory keyword and cluster storage.
//!
//! Keywords are keyed by normalized text, so re-analyzing the same input
//! updates records in place instead of duplicating them. Identity and
//! creation time survive updates; everything else is overwritten.

use crate::keyword::embedding::cosine_similarity;
use crate::keyword::types::{Keyword, KeywordCluster};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Shared keyword store, keyed by normalized text.
#[derive(Debug, Clone, Default)]
pub struct KeywordRepository {
    keywords: Arc<RwLock<HashMap<String, Keyword>>>,
    clusters: Arc<RwLock<HashMap<Uuid, KeywordCluster>>>,
}

impl KeywordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a batch of keywords. Existing records keep their id and
    /// creation timestamp. Returns how many records were newly inserted.
    pub async fn upsert_batch(&self, batch: Vec<Keyword>) -> usize {
        let mut store = self.keywords.write().await;
        let mut inserted = 0usize;
        for mut keyword in batch {
            match store.get(&keyword.normalized_text) {
                Some(existing) => {
                    keyword.id = existing.id;
                    keyword.created_at = existing.created_at;
                }
                None => inserted += 1,
            }
            store.insert(keyword.normalized_text.clone(), keyword);
        }
        debug!("Upserted batch: {} new records, {} total", inserted, store.len());
        inserted
    }

    pub async fn get_by_normalized(&self, normalized: &str) -> Option<Keyword> {
        self.keywords.read().await.get(normalized).cloned()
    }

    /// All stored keywords, ordered by normalized text for stable output.
    pub async fn all_keywords(&self) -> Vec<Keyword> {
        let store = self.keywords.read().await;
        let mut keywords: Vec<Keyword> = store.values().cloned().collect();
        keywords.sort_by(|a, b| a.normalized_text.cmp(&b.normalized_text));
        keywords
    }

    pub async fn keyword_count(&self) -> usize {
        self.keywords.read().await.len()
    }

    /// Replaces the stored clusters for the latest analysis run.
    pub async fn replace_clusters(&self, clusters: Vec<KeywordCluster>) {
        let mut store = self.clusters.write().await;
        store.clear();
        for cluster in clusters {
            store.insert(cluster.id, cluster);
        }
    }

    pub async fn get_cluster(&self, id: Uuid) -> Option<KeywordCluster> {
        self.clusters.read().await.get(&id).cloned()
    }

    pub async fn all_clusters(&self) -> Vec<KeywordCluster> {
        let store = self.clusters.read().await;
        let mut clusters: Vec<KeywordCluster> = store.values().cloned().collect();
        clusters.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
        clusters
    }

    pub async fn cluster_count(&self) -> usize {
        self.clusters.read().await.len()
    }
}

/// One indexed embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub keyword_id: Uuid,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A similarity search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub keyword_id: Uuid,
    pub text: String,
    pub similarity: f64,
}

/// Brute-force cosine similarity index over keyword embeddings.
///
/// Linear scan is fine at the scale this service handles; swapping in an
/// approximate index would only change this type.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from keywords that carry embeddings.
    pub fn rebuild(&mut self, keywords: &[Keyword]) {
        self.entries = keywords
            .iter()
            .filter_map(|kw| {
                kw.embedding.as_ref().map(|vector| IndexEntry {
                    keyword_id: kw.id,
                    text: kw.text.clone(),
                    vector: vector.clone(),
                })
            })
            .collect();
    }

    pub fn add(&mut self, keyword_id: Uuid, text: impl Into<String>, vector: Vec<f32>) {
        self.entries.push(IndexEntry {
            keyword_id,
            text: text.into(),
            vector,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k nearest entries by cosine similarity, most similar first.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                keyword_id: entry.keyword_id,
                text: entry.text.clone(),
                similarity: cosine_similarity(&entry.vector, query),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_preserves_identity() {
        let repo = KeywordRepository::new();

        let first = Keyword::new("Best Shoes", "best shoes").with_volume(100);
        let original_id = first.id;
        assert_eq!(repo.upsert_batch(vec![first]).await, 1);

        let update = Keyword::new("best shoes", "best shoes").with_volume(500);
        assert_eq!(repo.upsert_batch(vec![update]).await, 0);

        let stored = repo.get_by_normalized("best shoes").await.unwrap();
        assert_eq!(stored.id, original_id);
        assert_eq!(stored.search_volume, 500);
        assert_eq!(repo.keyword_count().await, 1);
    }

    #[tokio::test]
    async fn test_all_keywords_sorted_by_normalized_text() {
        let repo = KeywordRepository::new();
        repo.upsert_batch(vec![
            Keyword::new("zebra", "zebra"),
            Keyword::new("apple", "apple"),
        ])
        .await;

        let all = repo.all_keywords().await;
        assert_eq!(all[0].normalized_text, "apple");
        assert_eq!(all[1].normalized_text, "zebra");
    }

    #[tokio::test]
    async fn test_replace_clusters_clears_previous_run() {
        let repo = KeywordRepository::new();

        let mut cluster = KeywordCluster {
            id: Uuid::new_v4(),
            name: "First".to_string(),
            keyword_ids: vec![],
            primary_keyword: "first".to_string(),
            centroid: vec![],
            dominant_intent: None,
            total_search_volume: 0,
            avg_search_volume: 0.0,
            created_at: chrono::Utc::now(),
        };
        repo.replace_clusters(vec![cluster.clone()]).await;
        let old_id = cluster.id;

        cluster.id = Uuid::new_v4();
        cluster.name = "Second".to_string();
        repo.replace_clusters(vec![cluster.clone()]).await;

        assert!(repo.get_cluster(old_id).await.is_none());
        assert!(repo.get_cluster(cluster.id).await.is_some());
        assert_eq!(repo.cluster_count().await, 1);
    }

    #[test]
    fn test_vector_index_returns_most_similar_first() {
        let mut index = VectorIndex::new();
        index.add(Uuid::new_v4(), "east", vec![1.0, 0.0]);
        index.add(Uuid::new_v4(), "north", vec![0.0, 1.0]);
        index.add(Uuid::new_v4(), "north-east", vec![0.7, 0.7]);

        let hits = index.search(&[1.0, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "east");
        assert_eq!(hits[1].text, "north-east");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_vector_index_rebuild_skips_missing_embeddings() {
        let mut with_embedding = Keyword::new("has one", "has one");
        with_embedding.embedding = Some(vec![1.0, 0.0]);
        let without = Keyword::new("has none", "has none");

        let mut index = VectorIndex::new();
        index.rebuild(&[with_embedding, without]);
        assert_eq!(index.len(), 1);
    }
}
