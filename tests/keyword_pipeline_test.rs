//! End-to-end tests for the keyword analysis pipeline.

use std::collections::HashMap;

use seo_workers_rs::keyword::{
    Keyword, KeywordAnalysisPipeline, KeywordAnalysisTask, KeywordRepository, PipelineConfig,
    SearchIntent, TaskStatus,
};

fn pipeline() -> KeywordAnalysisPipeline {
    KeywordAnalysisPipeline::new(PipelineConfig::default(), None, KeywordRepository::new()).unwrap()
}

fn task(keywords: &[&str]) -> KeywordAnalysisTask {
    let mut task = KeywordAnalysisTask::new(keywords.iter().map(|s| s.to_string()).collect());
    // No LLM client is attached; force the rule-based classifier
    task.options.use_llm_intent = false;
    task
}

#[tokio::test]
async fn test_mixed_intent_keywords_end_to_end() {
    let pipeline = pipeline();
    let report = pipeline
        .run(task(&[
            "how to learn python",
            "best python course",
            "buy python book",
        ]))
        .await;

    assert_eq!(report.status, TaskStatus::Completed);
    assert_eq!(report.keywords.len(), 3);

    let by_text: HashMap<&str, &Keyword> = report
        .keywords
        .iter()
        .map(|k| (k.normalized_text.as_str(), k))
        .collect();

    let learn = by_text["how to learn python"];
    assert_eq!(learn.intent, Some(SearchIntent::Informational));
    assert!(learn.intent_confidence >= 0.6);

    let course = by_text["best python course"];
    assert_eq!(course.intent, Some(SearchIntent::Commercial));
    assert!(course.intent_confidence >= 0.6);

    let book = by_text["buy python book"];
    assert_eq!(book.intent, Some(SearchIntent::Transactional));
    assert!(book.intent_confidence >= 0.6);

    assert_eq!(report.intent_distribution.get("informational"), Some(&1));
    assert_eq!(report.intent_distribution.get("commercial"), Some(&1));
    assert_eq!(report.intent_distribution.get("transactional"), Some(&1));
    assert_eq!(report.intent_distribution.get("navigational"), Some(&0));

    assert!(!report.clusters.is_empty());
    assert!(report.stage_counts.classified >= 3);
}

#[tokio::test]
async fn test_near_duplicate_keywords_are_merged() {
    let pipeline = pipeline();
    let report = pipeline
        .run(task(&[
            "best python course",
            "Best   Python Course",
            "best python course!",
        ]))
        .await;

    assert_eq!(report.status, TaskStatus::Completed);
    assert_eq!(report.keywords.len(), 1);
    assert_eq!(report.keywords[0].normalized_text, "best python course");
    // Raw text keeps the first occurrence
    assert_eq!(report.keywords[0].text, "best python course");
}

#[tokio::test]
async fn test_repository_reflects_completed_run() {
    let pipeline = pipeline();
    let report = pipeline
        .run(task(&[
            "how to learn python",
            "best python course",
            "buy python book",
        ]))
        .await;
    assert_eq!(report.status, TaskStatus::Completed);

    let repository = pipeline.repository();
    assert_eq!(repository.keyword_count().await, 3);
    assert_eq!(repository.cluster_count().await, report.clusters.len());

    for keyword in repository.all_keywords().await {
        assert!(keyword.intent.is_some());
        assert!(keyword.embedding.is_some());
    }

    for cluster in report.clusters {
        let stored = repository.get_cluster(cluster.id).await;
        assert!(stored.is_some());
        assert!(!stored.unwrap().keyword_ids.is_empty());
    }
}

#[tokio::test]
async fn test_similarity_search_after_indexing() {
    let pipeline = pipeline();
    let report = pipeline
        .run(task(&[
            "python tutorial for beginners",
            "learn python basics",
            "advanced python guide",
            "buy running shoes",
        ]))
        .await;
    assert_eq!(report.status, TaskStatus::Completed);

    let hits = pipeline.similar_keywords("python tutorial", 3).await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.len() <= 3);

    // Scores are ranked best-first
    for pair in hits.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }

    // Shared-token queries should land on a python keyword first
    assert!(hits[0].text.contains("python"));
}

#[tokio::test]
async fn test_search_on_empty_index_returns_nothing() {
    let pipeline = pipeline();
    let hits = pipeline.similar_keywords("anything at all", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_empty_task_completes_without_keywords() {
    let pipeline = pipeline();
    let report = pipeline.run(task(&[])).await;

    assert_eq!(report.status, TaskStatus::Completed);
    assert!(report.keywords.is_empty());
    assert!(report.clusters.is_empty());
    assert_eq!(report.total_search_volume, 0);
}

#[tokio::test]
async fn test_rerun_upserts_instead_of_duplicating() {
    let pipeline = pipeline();

    let first = pipeline.run(task(&["best python course"])).await;
    assert_eq!(first.status, TaskStatus::Completed);

    let second = pipeline
        .run(task(&["best python course", "buy python book"]))
        .await;
    assert_eq!(second.status, TaskStatus::Completed);

    assert_eq!(pipeline.repository().keyword_count().await, 2);
}
