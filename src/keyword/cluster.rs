//! Semantic keyword clustering.
//!
//! Hierarchical agglomerative clustering over cosine distance with average
//! linkage. Merging stops once the closest pair of clusters is at or above
//! the distance threshold. Results are deterministic for identical input
//! order on the same build; pair ties resolve to the lowest index pair.

use crate::keyword::embedding::cosine_similarity;
use crate::keyword::types::{ClusterStats, Keyword, KeywordCluster, SearchIntent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cosine distance at or above which clusters are not merged
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
    /// Smaller groups dissolve into orphans
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Centroid similarity at or above which clusters merge in the merge pass
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,
}

fn default_distance_threshold() -> f64 {
    0.3
}

fn default_min_cluster_size() -> usize {
    3
}

fn default_merge_threshold() -> f64 {
    0.85
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            min_cluster_size: default_min_cluster_size(),
            merge_threshold: default_merge_threshold(),
        }
    }
}

/// Groups keywords into clusters by embedding similarity.
#[derive(Debug, Clone, Default)]
pub struct ClusterService {
    config: ClusterConfig,
}

impl ClusterService {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Clusters keywords that carry embeddings, assigning `cluster_id` in
    /// place. Keywords without embeddings stay unclustered. Groups below
    /// the minimum size dissolve; their members get `cluster_id` cleared.
    /// Output is sorted by total search volume, descending, ties keeping
    /// formation order.
    pub fn cluster(&self, keywords: &mut [Keyword]) -> Vec<KeywordCluster> {
        let embedded: Vec<usize> = keywords
            .iter()
            .enumerate()
            .filter(|(_, kw)| kw.has_embedding())
            .map(|(i, _)| i)
            .collect();

        if embedded.len() < self.config.min_cluster_size {
            warn!(
                "Not enough keywords with embeddings for clustering: required {}, actual {}",
                self.config.min_cluster_size,
                embedded.len()
            );
            if embedded.is_empty() {
                return Vec::new();
            }
            // Catch-all cluster with everything that is embedded
            let cluster = self.build_cluster(keywords, &embedded, Uuid::new_v4());
            return vec![cluster];
        }

        info!("Clustering {} embedded keywords", embedded.len());

        let labels = self.agglomerate(keywords, &embedded);

        // Group members by label in first-appearance order
        let mut order: Vec<usize> = Vec::new();
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for (pos, &idx) in embedded.iter().enumerate() {
            let label = labels[pos];
            groups.entry(label).or_insert_with(|| {
                order.push(label);
                Vec::new()
            });
            if let Some(group) = groups.get_mut(&label) {
                group.push(idx);
            }
        }

        let mut clusters: Vec<KeywordCluster> = Vec::new();
        for label in order {
            let members = &groups[&label];
            if members.len() >= self.config.min_cluster_size {
                clusters.push(self.build_cluster(keywords, members, Uuid::new_v4()));
            } else {
                for &idx in members {
                    keywords[idx].cluster_id = None;
                }
            }
        }

        clusters.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));

        info!("Clustering complete: {} clusters", clusters.len());
        clusters
    }

    /// Average-linkage agglomeration. Returns one label per embedded index.
    fn agglomerate(&self, keywords: &[Keyword], embedded: &[usize]) -> Vec<usize> {
        let n = embedded.len();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![0];
        }

        let vectors: Vec<&Vec<f32>> = embedded
            .iter()
            .filter_map(|&i| keywords[i].embedding.as_ref())
            .collect();

        // Symmetric cosine distance matrix
        let mut dist = vec![vec![0.0f64; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = 1.0 - cosine_similarity(vectors[i], vectors[j]);
                dist[i][j] = d;
                dist[j][i] = d;
            }
        }

        let mut active = vec![true; n];
        let mut size = vec![1usize; n];
        let mut assignment: Vec<usize> = (0..n).collect();

        loop {
            // Closest active pair, lowest indices on ties
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if !active[j] {
                        continue;
                    }
                    match best {
                        Some((_, _, d)) if dist[i][j] >= d => {}
                        _ => best = Some((i, j, dist[i][j])),
                    }
                }
            }

            let (i, j, d) = match best {
                Some(pair) => pair,
                None => break,
            };
            if d >= self.config.distance_threshold {
                break;
            }

            // Lance-Williams update for average linkage
            for k in 0..n {
                if !active[k] || k == i || k == j {
                    continue;
                }
                let merged = (size[i] as f64 * dist[i][k] + size[j] as f64 * dist[j][k])
                    / (size[i] + size[j]) as f64;
                dist[i][k] = merged;
                dist[k][i] = merged;
            }
            size[i] += size[j];
            active[j] = false;
            for label in assignment.iter_mut() {
                if *label == j {
                    *label = i;
                }
            }
        }

        // Compact labels to 0..k in first-appearance order
        let mut remap: HashMap<usize, usize> = HashMap::new();
        assignment
            .into_iter()
            .map(|root| {
                let next = remap.len();
                *remap.entry(root).or_insert(next)
            })
            .collect()
    }

    /// Builds a cluster from member indices, assigning `cluster_id` and
    /// recomputing every aggregate from the members.
    fn build_cluster(
        &self,
        keywords: &mut [Keyword],
        members: &[usize],
        id: Uuid,
    ) -> KeywordCluster {
        let total_search_volume: u64 = members.iter().map(|&i| keywords[i].search_volume).sum();
        let avg_search_volume = if members.is_empty() {
            0.0
        } else {
            total_search_volume as f64 / members.len() as f64
        };

        // Dominant intent: mode with declared-order tie-break
        let mut counts: HashMap<SearchIntent, usize> = HashMap::new();
        for &i in members {
            if let Some(intent) = keywords[i].intent {
                *counts.entry(intent).or_insert(0) += 1;
            }
        }
        let mut dominant_intent: Option<SearchIntent> = None;
        let mut best_count = 0usize;
        for intent in SearchIntent::ALL {
            if let Some(&count) = counts.get(&intent) {
                if count > best_count {
                    best_count = count;
                    dominant_intent = Some(intent);
                }
            }
        }

        // Primary keyword: highest volume, first wins ties
        let mut primary_idx = members[0];
        for &i in &members[1..] {
            if keywords[i].search_volume > keywords[primary_idx].search_volume {
                primary_idx = i;
            }
        }
        let primary_keyword = keywords[primary_idx].text.clone();
        let name = capitalize_first(primary_keyword.trim());

        // Centroid: arithmetic mean of member embeddings
        let centroid = mean_embedding(members.iter().filter_map(|&i| keywords[i].embedding.as_deref()));

        for &i in members {
            keywords[i].cluster_id = Some(id);
        }

        KeywordCluster {
            id,
            name,
            keyword_ids: members.iter().map(|&i| keywords[i].id).collect(),
            primary_keyword,
            centroid,
            dominant_intent,
            total_search_volume,
            avg_search_volume,
            created_at: Utc::now(),
        }
    }

    /// Centroid cosine similarity between two clusters, 0.0 when either
    /// centroid is missing.
    pub fn cluster_similarity(a: &KeywordCluster, b: &KeywordCluster) -> f64 {
        if a.centroid.is_empty() || b.centroid.is_empty() {
            return 0.0;
        }
        cosine_similarity(&a.centroid, &b.centroid)
    }

    /// Greedy merge of clusters whose centroids are at least
    /// `merge_threshold` similar. Similarity checks use the centroids the
    /// clusters entered with; merged clusters are rebuilt from their
    /// combined members under the surviving cluster's id.
    pub fn merge_clusters(
        &self,
        clusters: Vec<KeywordCluster>,
        keywords: &mut [Keyword],
    ) -> Vec<KeywordCluster> {
        if clusters.len() <= 1 {
            return clusters;
        }

        let index_by_id: HashMap<Uuid, usize> = keywords
            .iter()
            .enumerate()
            .map(|(i, kw)| (kw.id, i))
            .collect();

        let mut used: Vec<bool> = vec![false; clusters.len()];
        let mut merged: Vec<KeywordCluster> = Vec::with_capacity(clusters.len());

        for i in 0..clusters.len() {
            if used[i] {
                continue;
            }

            let mut member_ids: Vec<Uuid> = clusters[i].keyword_ids.clone();
            let mut absorbed = false;

            for j in (i + 1)..clusters.len() {
                if used[j] {
                    continue;
                }
                let similarity = Self::cluster_similarity(&clusters[i], &clusters[j]);
                if similarity >= self.config.merge_threshold {
                    member_ids.extend(clusters[j].keyword_ids.iter().copied());
                    used[j] = true;
                    absorbed = true;
                }
            }

            if absorbed {
                let members: Vec<usize> = member_ids
                    .iter()
                    .filter_map(|id| index_by_id.get(id).copied())
                    .collect();
                merged.push(self.build_cluster(keywords, &members, clusters[i].id));
            } else {
                merged.push(clusters[i].clone());
            }
        }

        merged
    }

    /// Aggregate statistics over a clustering result, zero-filled when
    /// there are no clusters.
    pub fn stats(clusters: &[KeywordCluster]) -> ClusterStats {
        if clusters.is_empty() {
            return ClusterStats::default();
        }

        let sizes: Vec<usize> = clusters.iter().map(|c| c.len()).collect();
        let volumes: Vec<u64> = clusters.iter().map(|c| c.total_search_volume).collect();
        let total_keywords: usize = sizes.iter().sum();
        let total_search_volume: u64 = volumes.iter().sum();

        ClusterStats {
            total_clusters: clusters.len(),
            total_keywords,
            avg_cluster_size: total_keywords as f64 / clusters.len() as f64,
            largest_cluster_size: sizes.iter().copied().max().unwrap_or(0),
            smallest_cluster_size: sizes.iter().copied().min().unwrap_or(0),
            total_search_volume,
            avg_cluster_volume: total_search_volume as f64 / clusters.len() as f64,
        }
    }
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Unnamed Cluster".to_string(),
    }
}

fn mean_embedding<'a, I>(embeddings: I) -> Vec<f32>
where
    I: Iterator<Item = &'a [f32]>,
{
    let mut sums: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for embedding in embeddings {
        if sums.is_empty() {
            sums = vec![0.0; embedding.len()];
        }
        for (sum, value) in sums.iter_mut().zip(embedding.iter()) {
            *sum += *value as f64;
        }
        count += 1;
    }

    if count == 0 {
        return Vec::new();
    }
    sums.into_iter().map(|s| (s / count as f64) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(text: &str, volume: u64, intent: Option<SearchIntent>, embedding: Vec<f32>) -> Keyword {
        let mut keyword = Keyword::new(text, text).with_volume(volume);
        keyword.intent = intent;
        keyword.embedding = Some(embedding);
        keyword
    }

    fn two_group_keywords() -> Vec<Keyword> {
        vec![
            kw("best shoes", 900, Some(SearchIntent::Commercial), vec![1.0, 0.0]),
            kw("top shoes", 500, Some(SearchIntent::Commercial), vec![0.995, 0.1]),
            kw("shoe reviews", 300, Some(SearchIntent::Commercial), vec![0.99, -0.1]),
            kw("how to run", 2000, Some(SearchIntent::Informational), vec![0.0, 1.0]),
            kw("running tips", 800, Some(SearchIntent::Informational), vec![0.1, 0.995]),
            kw("marathon guide", 400, Some(SearchIntent::Informational), vec![-0.1, 0.99]),
        ]
    }

    #[test]
    fn test_clusters_two_separated_groups() {
        let service = ClusterService::default();
        let mut keywords = two_group_keywords();

        let clusters = service.cluster(&mut keywords);
        assert_eq!(clusters.len(), 2);

        // Sorted by total volume descending: running group first
        assert_eq!(clusters[0].total_search_volume, 3200);
        assert_eq!(clusters[1].total_search_volume, 1700);
        assert_eq!(clusters[0].dominant_intent, Some(SearchIntent::Informational));
        assert_eq!(clusters[1].dominant_intent, Some(SearchIntent::Commercial));

        // Every member points back at its cluster
        for cluster in &clusters {
            for id in &cluster.keyword_ids {
                let member = keywords.iter().find(|k| k.id == *id).unwrap();
                assert_eq!(member.cluster_id, Some(cluster.id));
            }
        }
    }

    #[test]
    fn test_cluster_naming_capitalizes_first_letter() {
        let service = ClusterService::default();
        let mut keywords = two_group_keywords();

        let clusters = service.cluster(&mut keywords);
        assert_eq!(clusters[0].primary_keyword, "how to run");
        assert_eq!(clusters[0].name, "How to run");
    }

    #[test]
    fn test_small_groups_dissolve_into_orphans() {
        let service = ClusterService::default();
        let mut keywords = vec![
            kw("a one", 10, None, vec![1.0, 0.0]),
            kw("a two", 10, None, vec![0.995, 0.1]),
            kw("a three", 10, None, vec![0.99, -0.1]),
            // Distant pair below the minimum size
            kw("b one", 10, None, vec![0.0, 1.0]),
            kw("b two", 10, None, vec![0.1, 0.995]),
        ];

        let clusters = service.cluster(&mut keywords);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);

        assert!(keywords[3].cluster_id.is_none());
        assert!(keywords[4].cluster_id.is_none());
    }

    #[test]
    fn test_catch_all_below_minimum() {
        let service = ClusterService::default();
        let mut keywords = vec![
            kw("only one", 10, None, vec![1.0, 0.0]),
            kw("only two", 10, None, vec![0.0, 1.0]),
        ];

        let clusters = service.cluster(&mut keywords);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
        assert!(keywords.iter().all(|k| k.cluster_id == Some(clusters[0].id)));
    }

    #[test]
    fn test_no_embeddings_no_clusters() {
        let service = ClusterService::default();
        let mut keywords = vec![Keyword::new("plain", "plain")];
        assert!(service.cluster(&mut keywords).is_empty());
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let service = ClusterService::default();

        let mut first = two_group_keywords();
        let mut second = two_group_keywords();
        let a = service.cluster(&mut first);
        let b = service.cluster(&mut second);

        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.name, cb.name);
            assert_eq!(ca.len(), cb.len());
            assert_eq!(ca.total_search_volume, cb.total_search_volume);
        }
    }

    #[test]
    fn test_dominant_intent_tie_breaks_in_declared_order() {
        let service = ClusterService::default();
        let mut keywords = vec![
            kw("x one", 10, Some(SearchIntent::Transactional), vec![1.0, 0.0]),
            kw("x two", 10, Some(SearchIntent::Commercial), vec![0.999, 0.01]),
            kw("x three", 10, None, vec![0.999, -0.01]),
        ];

        let clusters = service.cluster(&mut keywords);
        assert_eq!(clusters.len(), 1);
        // One vote each: commercial is declared before transactional
        assert_eq!(clusters[0].dominant_intent, Some(SearchIntent::Commercial));
    }

    #[test]
    fn test_merge_combines_similar_clusters() {
        let service = ClusterService::default();
        let mut keywords = vec![
            kw("group a", 100, Some(SearchIntent::Commercial), vec![1.0, 0.0]),
            kw("group b", 300, Some(SearchIntent::Commercial), vec![1.0, 0.001]),
        ];
        let ids = (keywords[0].id, keywords[1].id);

        let first = service.build_cluster(&mut keywords, &[0], Uuid::new_v4());
        let second = service.build_cluster(&mut keywords, &[1], Uuid::new_v4());
        let surviving_id = first.id;

        let merged = service.merge_clusters(vec![first, second], &mut keywords);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, surviving_id);
        assert_eq!(merged[0].total_search_volume, 400);
        assert_eq!(merged[0].primary_keyword, "group b");
        assert!(merged[0].keyword_ids.contains(&ids.0));
        assert!(merged[0].keyword_ids.contains(&ids.1));
        assert_eq!(keywords[1].cluster_id, Some(surviving_id));
    }

    #[test]
    fn test_merge_leaves_distant_clusters_alone() {
        let service = ClusterService::default();
        let mut keywords = vec![
            kw("east", 100, None, vec![1.0, 0.0]),
            kw("north", 100, None, vec![0.0, 1.0]),
        ];

        let first = service.build_cluster(&mut keywords, &[0], Uuid::new_v4());
        let second = service.build_cluster(&mut keywords, &[1], Uuid::new_v4());

        let merged = service.merge_clusters(vec![first, second], &mut keywords);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_stats_zero_filled_when_empty() {
        let stats = ClusterService::stats(&[]);
        assert_eq!(stats.total_clusters, 0);
        assert_eq!(stats.total_keywords, 0);
        assert_eq!(stats.total_search_volume, 0);
    }

    #[test]
    fn test_stats_aggregates() {
        let service = ClusterService::default();
        let mut keywords = two_group_keywords();
        let clusters = service.cluster(&mut keywords);

        let stats = ClusterService::stats(&clusters);
        assert_eq!(stats.total_clusters, 2);
        assert_eq!(stats.total_keywords, 6);
        assert_eq!(stats.avg_cluster_size, 3.0);
        assert_eq!(stats.largest_cluster_size, 3);
        assert_eq!(stats.total_search_volume, 4900);
    }
}
