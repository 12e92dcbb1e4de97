//! Flakedoc daemon: serves the classification tools over stdio.
//!
//! Wiring only: env configuration, tracing subscriber, GitHub-backed
//! evidence providers, file-backed audit log. All logs go to stderr;
//! stdout is the JSON-RPC channel.

use anyhow::Result;
use flakedoc_core::audit::AuditLog;
use flakedoc_core::evidence::{LogSnippetProvider, RunMetricsProvider};
use flakedoc_github::ActionsClient;
use flakedoc_rpc::{serve_stdio, Dispatcher};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Env var naming the audit log file.
const AUDIT_LOG_ENV: &str = "AUDIT_LOG";

/// Default audit log file in the working directory.
const AUDIT_LOG_DEFAULT: &str = "audit.log";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let audit_path =
        std::env::var(AUDIT_LOG_ENV).unwrap_or_else(|_| AUDIT_LOG_DEFAULT.to_string());
    let audit = Arc::new(AuditLog::file(&audit_path));

    let client = Arc::new(ActionsClient::from_env());
    let metrics: Arc<dyn RunMetricsProvider> = client.clone();
    let logs: Arc<dyn LogSnippetProvider> = client;

    let dispatcher = Dispatcher::new(metrics, logs, audit);

    tracing::info!(audit = %audit_path, "flakedocd started");
    serve_stdio(&dispatcher).await?;
    tracing::info!("stdin closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn flakedocd_smoke_compiles() {
        assert!(true);
    }
}
