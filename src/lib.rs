//! # seo-workers-rs
//!
//! Statistical analysis engine for SEO workloads.
//!
//! The crate has two cooperating halves: a keyword intelligence pipeline
//! (normalization, intent classification, embeddings and clustering) and a
//! site monitoring system (metric ingestion, anomaly detection, forecasting,
//! alerting and health scoring), both exposed over an HTTP JSON API.

pub mod analytics;
pub mod config;
pub mod error;
pub mod http_server;
pub mod keyword;
pub mod llm;
pub mod logging;
pub mod monitoring;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use http_server::HttpApiServer;
pub use keyword::KeywordAnalysisPipeline;
pub use monitoring::MonitoringRunner;
