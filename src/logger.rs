use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, CargoEnv};

pub struct Logger;

impl Logger {
    /// Installs the global subscriber. Keep the guard alive until exit or
    /// buffered lines are lost.
    ///
    /// Development logs compact lines with uptime to stdout. Production writes a
    /// daily rolling file under `log_dir` (default `./logs`).
    pub fn init(config: &AppConfig) -> std::io::Result<WorkerGuard> {
        // env var: `RUST_LOG`, falling back to the configured level
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log));

        match config.cargo_env {
            CargoEnv::Development => {
                let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_timer(tracing_subscriber::fmt::time::uptime())
                    .with_writer(non_blocking)
                    .compact()
                    .init();
                Ok(guard)
            }
            CargoEnv::Production => {
                let log_dir = config.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs"));
                std::fs::create_dir_all(&log_dir)?;
                let file_logger = tracing_appender::rolling::daily(&log_dir, "ledger.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_logger);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .with_file(true)
                            .with_line_number(true)
                            .with_target(false),
                    )
                    .init();
                Ok(guard)
            }
        }
    }
}
