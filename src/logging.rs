//! ログシステム
//!
//! コンソール出力とローテーション付きファイル出力を設定に応じて
//! 組み合わせて初期化する。ファイル出力は非同期書き込みのため、
//! 返される `WorkerGuard` を保持している間だけフラッシュされる。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LogRotation, LoggingConfig};

/// ログファイル名のプレフィックス
const LOG_FILE_PREFIX: &str = "seo-workers.log";

/// ログシステムを初期化
///
/// ファイル出力が有効な場合、返されるガードをプロセス終了まで
/// 保持すること。ドロップするとバッファ済みログが失われる。
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // 両方無効の場合は最低限の警告出力のみ
    let env_filter = if !config.console_enabled && !config.file_enabled {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;
    let mut log_dir = None;

    if config.console_enabled {
        let console = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true);
        layers.push(match config.format {
            LogFormat::Pretty => console.pretty().boxed(),
            LogFormat::Json => console.json().boxed(),
            LogFormat::Compact => console.compact().boxed(),
        });
    } else if !config.file_enabled {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .boxed(),
        );
    }

    if config.file_enabled {
        let dir = resolve_log_dir(&config.log_dir);
        let file_appender = match config.rotation {
            LogRotation::Daily => rolling::daily(&dir, LOG_FILE_PREFIX),
            LogRotation::Hourly => rolling::hourly(&dir, LOG_FILE_PREFIX),
            LogRotation::Never => rolling::never(&dir, LOG_FILE_PREFIX),
        };
        let (writer, worker_guard) = non_blocking(file_appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .json()
                .boxed(),
        );
        guard = Some(worker_guard);
        log_dir = Some(dir);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    tracing::info!("📝 ログシステム初期化完了");
    tracing::info!("📊 ログレベル: {}", config.level);
    if let Some(dir) = log_dir {
        tracing::info!("📂 ログディレクトリ: {}", dir.display());
    }

    Ok(guard)
}

/// ログディレクトリを解決
/// 優先順位：
/// 1. 設定されたディレクトリ
/// 2. システムテンプディレクトリの seo-workers フォルダ
/// 3. カレントディレクトリ
fn resolve_log_dir(configured: &Path) -> PathBuf {
    if ensure_log_dir(configured).is_ok() {
        return configured.to_path_buf();
    }

    let temp_log_dir = std::env::temp_dir().join("seo-workers").join("logs");
    if ensure_log_dir(&temp_log_dir).is_ok() {
        return temp_log_dir;
    }

    // フォールバック：カレントディレクトリ
    PathBuf::from(".")
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// ログ統計情報を取得
pub fn get_log_stats(log_dir: &Path) -> Result<LogStats> {
    let mut stats = LogStats::default();

    if !log_dir.exists() {
        return Ok(stats);
    }

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with(LOG_FILE_PREFIX) {
                    if let Ok(metadata) = entry.metadata() {
                        stats.file_count += 1;
                        stats.total_size += metadata.len();

                        if let Ok(modified) = metadata.modified() {
                            let newer = stats
                                .last_modified
                                .map(|current| modified > current)
                                .unwrap_or(true);
                            if newer {
                                stats.last_modified = Some(modified);
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(stats)
}

/// ログディレクトリの統計
#[derive(Debug, Default)]
pub struct LogStats {
    /// ログファイル数
    pub file_count: usize,
    /// 合計サイズ（バイト）
    pub total_size: u64,
    /// 最終更新時刻
    pub last_modified: Option<std::time::SystemTime>,
}

impl LogStats {
    /// 合計サイズを人間可読形式で返す
    pub fn format_size(&self) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        let mut size = self.total_size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
