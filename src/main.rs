use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use seo_workers_rs::config::ConfigLoader;
use seo_workers_rs::http_server::HttpApiServer;
use seo_workers_rs::keyword::{KeywordAnalysisPipeline, KeywordRepository};
use seo_workers_rs::llm::LlmClient;
use seo_workers_rs::logging::{get_log_stats, init_logging};
use seo_workers_rs::monitoring::{IngestionService, MonitoringRunner};

/// Statistical analysis engine for SEO workloads
#[derive(Debug, Parser)]
#[command(name = "seo-workers-rs", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "SEO_CONFIG")]
    config: Option<String>,

    /// Bind address override (host:port)
    #[arg(short, long, env = "SEO_BIND_ADDR")]
    bind: Option<String>,

    /// Log level override
    #[arg(short, long, env = "SEO_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered configuration: defaults, file, environment, CLI flags
    let mut loader = ConfigLoader::new()
        .load_from_file(cli.config.as_deref())
        .load_from_env();
    if let Some(level) = &cli.log_level {
        loader = loader.with_override("logging.level", level.as_str());
    }
    let config = loader.build()?;
    config.validate()?;

    // The guard must outlive the server or buffered file logs are lost
    let _log_guard = init_logging(&config.logging)?;

    info!("🚀 seo-workers-rs v{} starting", env!("CARGO_PKG_VERSION"));

    if config.logging.file_enabled {
        if let Ok(stats) = get_log_stats(&config.logging.log_dir) {
            info!(
                "🗂️  Existing logs: {} files, {}",
                stats.file_count,
                stats.format_size()
            );
        }
    }

    // The mock provider needs no credentials; real providers fall back to
    // the heuristic classifier when the client cannot be built
    let llm_client = match LlmClient::new(config.llm.clone()) {
        Ok(client) => {
            info!("LLM client ready (provider: {:?})", config.llm.provider);
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("LLM client unavailable, using heuristic fallbacks: {}", e);
            None
        }
    };

    let repository = KeywordRepository::new();
    let pipeline = Arc::new(KeywordAnalysisPipeline::new(
        config.pipeline.clone(),
        llm_client,
        repository,
    )?);

    let ingestion = IngestionService::with_mock_sources(config.monitoring.mock_seed);
    let runner = Arc::new(MonitoringRunner::new(
        ingestion,
        config.monitoring.anomaly.clone(),
        config.monitoring.forecast.clone(),
        config.monitoring.alert.clone(),
    ));

    let addr = cli.bind.clone().unwrap_or_else(|| config.server.bind_addr());
    let server = HttpApiServer::new(
        pipeline,
        runner,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    server.serve(&addr).await?;

    Ok(())
}
