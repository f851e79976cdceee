//! HTTP API server for the analysis engine
//!
//! Exposes the keyword analysis pipeline and the monitoring runner as a
//! JSON API. All endpoints live under `/api/v1`, with a `/health` probe
//! at the root.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Error;
use crate::keyword::{
    AnalysisOptions, AnalysisReport, KeywordAnalysisPipeline, KeywordAnalysisTask, SearchIntent,
    TaskStatus,
};
use crate::monitoring::{MetricType, MonitoringReport, MonitoringRunner, MonitoringTask};

/// Shared state handed to every request handler
pub struct AppState {
    pub pipeline: Arc<KeywordAnalysisPipeline>,
    pub runner: Arc<MonitoringRunner>,
}

/// HTTP API server wrapping the engine components
pub struct HttpApiServer {
    state: Arc<AppState>,
    request_timeout: Duration,
}

impl HttpApiServer {
    pub fn new(
        pipeline: Arc<KeywordAnalysisPipeline>,
        runner: Arc<MonitoringRunner>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(AppState { pipeline, runner }),
            request_timeout,
        }
    }

    /// Build the application router with all routes and middleware
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/v1/keywords/analyze", post(analyze_keywords))
            .route("/api/v1/keywords/similar", post(similar_keywords))
            .route(
                "/api/v1/keywords/clusters/{cluster_id}/recommendations",
                get(cluster_recommendations),
            )
            .route("/api/v1/monitor", post(run_monitoring))
            .route("/api/v1/alerts", get(list_alerts))
            .route("/api/v1/alerts/{alert_id}/acknowledge", post(acknowledge_alert))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn serve(&self, addr: &str) -> crate::error::Result<()> {
        let app = self.router();

        info!("Starting HTTP API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Error envelope translating engine errors into JSON responses
struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error!("Request failed: {}", self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let indexed_keywords = state.pipeline.repository().keyword_count().await;
    let stored_series = state.runner.store().series_count().await;

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "components": {
            "api": "up",
            "vector_index": "up",
            "time_series_store": "up",
        },
        "indexed_keywords": indexed_keywords,
        "stored_series": stored_series,
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    keywords: Vec<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    target_url: Option<String>,
    #[serde(default)]
    options: Option<AnalysisOptions>,
}

async fn analyze_keywords(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    info!(
        "Received analysis request with {} keywords",
        request.keywords.len()
    );

    let mut task = KeywordAnalysisTask::new(request.keywords);
    if let Some(locale) = request.locale {
        task.locale = locale;
    }
    task.target_url = request.target_url;
    if let Some(options) = request.options {
        task.options = options;
    }

    let report = state.pipeline.run(task).await;
    match report.status {
        TaskStatus::Failed | TaskStatus::Timeout => {
            let message = report
                .error
                .clone()
                .unwrap_or_else(|| "analysis failed".to_string());
            Err(ApiError(Error::Internal(message)))
        }
        _ => Ok(Json(report)),
    }
}

#[derive(Debug, Deserialize)]
struct SimilarRequest {
    text: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct SimilarKeyword {
    id: Uuid,
    text: String,
    score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<SearchIntent>,
}

async fn similar_keywords(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimilarRequest>,
) -> Result<Json<Vec<SimilarKeyword>>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError(Error::InvalidInput(
            "text must not be empty".to_string(),
        )));
    }

    let hits = state
        .pipeline
        .similar_keywords(&request.text, request.top_k)
        .await?;

    // Search hits carry no intent; join it in from the repository
    let intents: HashMap<Uuid, Option<SearchIntent>> = state
        .pipeline
        .repository()
        .all_keywords()
        .await
        .into_iter()
        .map(|keyword| (keyword.id, keyword.intent))
        .collect();

    let results = hits
        .into_iter()
        .map(|hit| SimilarKeyword {
            intent: intents.get(&hit.keyword_id).copied().flatten(),
            id: hit.keyword_id,
            text: hit.text,
            score: hit.similarity,
        })
        .collect();

    Ok(Json(results))
}

#[derive(Debug, Serialize)]
struct Recommendation {
    #[serde(rename = "type")]
    kind: String,
    priority: String,
    suggestion: String,
    reason: String,
}

async fn cluster_recommendations(
    State(state): State<Arc<AppState>>,
    Path(cluster_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let cluster = state
        .pipeline
        .repository()
        .get_cluster(cluster_id)
        .await
        .ok_or_else(|| ApiError(Error::NotFound(format!("cluster {cluster_id}"))))?;

    let mut recommendations = Vec::new();

    match cluster.dominant_intent {
        Some(SearchIntent::Informational) => recommendations.push(Recommendation {
            kind: "content".to_string(),
            priority: "high".to_string(),
            suggestion: format!(
                "Create comprehensive guide content targeting '{}'",
                cluster.name
            ),
            reason: "Informational intent indicates users seeking education".to_string(),
        }),
        Some(SearchIntent::Commercial) => recommendations.push(Recommendation {
            kind: "content".to_string(),
            priority: "high".to_string(),
            suggestion: format!("Create comparison/review content for '{}'", cluster.name),
            reason: "Commercial intent indicates users comparing options".to_string(),
        }),
        Some(SearchIntent::Transactional) => recommendations.push(Recommendation {
            kind: "landing_page".to_string(),
            priority: "high".to_string(),
            suggestion: format!("Optimize conversion pages for '{}' keywords", cluster.name),
            reason: "Transactional intent indicates purchase-ready users".to_string(),
        }),
        Some(SearchIntent::Navigational) | None => {}
    }

    if cluster.total_search_volume > 10_000 {
        recommendations.push(Recommendation {
            kind: "priority".to_string(),
            priority: "high".to_string(),
            suggestion: format!(
                "Prioritize this cluster with {} monthly searches",
                cluster.total_search_volume
            ),
            reason: "High search volume indicates significant traffic potential".to_string(),
        });
    }

    Ok(Json(json!({
        "cluster_id": cluster.id,
        "cluster_name": cluster.name,
        "recommendations": recommendations,
    })))
}

#[derive(Debug, Deserialize)]
struct MonitorRequest {
    site_id: String,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    metrics: Option<Vec<MetricType>>,
    #[serde(default)]
    tracked_keywords: Option<Vec<String>>,
    #[serde(default)]
    dimension: Option<String>,
    #[serde(default)]
    sensitivity: Option<f64>,
    #[serde(default)]
    enable_forecasting: Option<bool>,
}

async fn run_monitoring(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MonitorRequest>,
) -> Result<Json<MonitoringReport>, ApiError> {
    if request.site_id.trim().is_empty() {
        return Err(ApiError(Error::InvalidInput(
            "site_id must not be empty".to_string(),
        )));
    }

    info!("Received monitoring request for site {}", request.site_id);

    let end_date = request.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let mut task = MonitoringTask::new(request.site_id, end_date);
    if let Some(metrics) = request.metrics {
        task.metrics = metrics;
    }
    if let Some(keywords) = request.tracked_keywords {
        task.tracked_keywords = keywords;
    }
    task.dimension = request.dimension;
    if let Some(sensitivity) = request.sensitivity {
        task.sensitivity = sensitivity;
    }
    if let Some(enabled) = request.enable_forecasting {
        task.enable_forecasting = enabled;
    }

    // The report carries its own status; failures are part of the document
    let report = state.runner.run(&task).await;
    Ok(Json(report))
}

async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<Value> {
    let alerts = state.runner.alert_manager().active_alerts().await;
    Json(json!({ "count": alerts.len(), "alerts": alerts }))
}

#[derive(Debug, Deserialize)]
struct AcknowledgeRequest {
    #[serde(default)]
    acknowledged_by: Option<String>,
}

async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<Uuid>,
    Json(request): Json<AcknowledgeRequest>,
) -> Result<Json<Value>, ApiError> {
    let by = request.acknowledged_by.unwrap_or_else(|| "api".to_string());
    let acknowledged = state.runner.alert_manager().acknowledge(alert_id, &by).await;

    if !acknowledged {
        return Err(ApiError(Error::NotFound(format!("alert {alert_id}"))));
    }

    info!("Alert {} acknowledged by {}", alert_id, by);
    Ok(Json(json!({ "acknowledged": true, "alert_id": alert_id })))
}
