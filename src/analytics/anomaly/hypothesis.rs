//! Anomaly Hypothesis Generation
//!
//! 異常原因の仮説生成

use crate::analytics::anomaly::types::{AnomalyKind, Hypothesis};
use crate::monitoring::types::MetricType;
use chrono::NaiveDate;

/// メトリクスと異常パターンに応じた調査仮説を生成する
///
/// 推測ではなく、よくある原因に基づく調査の出発点を返す。
/// 該当パターンのないメトリクスには空リストを返す。
pub fn generate_hypotheses(
    metric: MetricType,
    kind: AnomalyKind,
    deviation_percent: f64,
    anomaly_date: NaiveDate,
) -> Vec<Hypothesis> {
    let is_negative = matches!(kind, AnomalyKind::SuddenDrop | AnomalyKind::GradualDecline);

    match metric {
        MetricType::OrganicTraffic if is_negative => vec![
            Hypothesis {
                description: "Google algorithm update may have affected rankings".to_string(),
                likelihood: 0.3,
                supporting_evidence: vec![
                    "Traffic drops often correlate with algorithm updates".to_string(),
                    format!(
                        "Deviation of {:.1}% is significant",
                        deviation_percent.abs()
                    ),
                ],
                investigation_steps: vec![
                    "Check Google Search Status Dashboard".to_string(),
                    "Review GSC for manual actions".to_string(),
                    "Compare ranking changes for top keywords".to_string(),
                ],
            },
            Hypothesis {
                description: "Technical issue may be blocking crawling/indexing".to_string(),
                likelihood: 0.25,
                supporting_evidence: vec![
                    "Technical issues can cause sudden traffic drops".to_string(),
                ],
                investigation_steps: vec![
                    "Check GSC Coverage report for errors".to_string(),
                    "Verify robots.txt hasn't changed".to_string(),
                    "Test site with Mobile-Friendly Test".to_string(),
                    "Check for server errors in logs".to_string(),
                ],
            },
            Hypothesis {
                description: "Seasonal or market trend change".to_string(),
                likelihood: 0.2,
                supporting_evidence: vec![
                    format!("Date: {anomaly_date}"),
                    "Some industries have predictable seasonal patterns".to_string(),
                ],
                investigation_steps: vec![
                    "Check Google Trends for keyword interest".to_string(),
                    "Compare year-over-year data".to_string(),
                    "Review competitor traffic trends".to_string(),
                ],
            },
        ],
        MetricType::OrganicTraffic => vec![Hypothesis {
            description: "Content or SEO improvement is gaining traction".to_string(),
            likelihood: 0.4,
            supporting_evidence: vec![format!("Traffic increased by {deviation_percent:.1}%")],
            investigation_steps: vec![
                "Identify pages with highest traffic increase".to_string(),
                "Review recent content changes".to_string(),
                "Check for new backlinks acquired".to_string(),
            ],
        }],
        MetricType::KeywordRanking if is_negative => vec![
            Hypothesis {
                description: "Competitor content may have improved".to_string(),
                likelihood: 0.35,
                supporting_evidence: vec!["Rankings are relative to competitors".to_string()],
                investigation_steps: vec![
                    "Analyze SERP for affected keywords".to_string(),
                    "Compare content quality with competitors".to_string(),
                    "Check competitor backlink profiles".to_string(),
                ],
            },
            Hypothesis {
                description: "Search intent may have shifted".to_string(),
                likelihood: 0.25,
                supporting_evidence: vec![
                    "Google may have re-interpreted the query intent".to_string(),
                ],
                investigation_steps: vec![
                    "Review SERP features and result types".to_string(),
                    "Check if content type matches current intent".to_string(),
                    "Analyze 'People also ask' for intent clues".to_string(),
                ],
            },
        ],
        MetricType::Ctr if is_negative => vec![
            Hypothesis {
                description: "Title/description may need optimization".to_string(),
                likelihood: 0.4,
                supporting_evidence: vec!["CTR is affected by snippet quality".to_string()],
                investigation_steps: vec![
                    "Review title tags for affected pages".to_string(),
                    "Check if meta descriptions are being used".to_string(),
                    "Test different title variations".to_string(),
                ],
            },
            Hypothesis {
                description: "SERP features may be reducing clicks".to_string(),
                likelihood: 0.3,
                supporting_evidence: vec![
                    "Featured snippets and rich results reduce CTR".to_string(),
                ],
                investigation_steps: vec![
                    "Check for new SERP features".to_string(),
                    "Identify if AI Overview is showing".to_string(),
                    "Review position vs CTR correlation".to_string(),
                ],
            },
        ],
        _ => Vec::new(),
    }
}
