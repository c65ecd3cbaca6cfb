//! groupmatch - stdin/stdout driver for the matching engine.
//!
//! Reads newline-delimited JSON join requests from stdin and writes one JSON
//! exit record per line to stdout. Logs go to stderr.
//!
//! ```text
//! groupmatch [config.yaml]
//! GROUPMATCH_CONFIG=config.yaml groupmatch
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use groupmatch::{
    ExitNotifier, ExitRecord, GroupMatchConfig, IngestSender, JoinRequest, LoggingConfig,
    NotifyError, Scheduler,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, watch};
use tracing_subscriber::EnvFilter;

/// Writes exit records to stdout as JSON lines.
struct StdoutNotifier {
    out: Mutex<tokio::io::Stdout>,
}

#[async_trait]
impl ExitNotifier for StdoutNotifier {
    async fn notify(&self, record: &ExitRecord) -> Result<(), NotifyError> {
        let mut line =
            serde_json::to_vec(record).map_err(|err| NotifyError(err.to_string()))?;
        line.push(b'\n');
        let mut out = self.out.lock().await;
        out.write_all(&line)
            .await
            .map_err(|err| NotifyError(err.to_string()))?;
        out.flush().await.map_err(|err| NotifyError(err.to_string()))
    }
}

fn load_config() -> anyhow::Result<GroupMatchConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GROUPMATCH_CONFIG").ok());
    match path {
        Some(path) => Ok(GroupMatchConfig::from_file(path)?),
        None => Ok(GroupMatchConfig::default()),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Feed stdin lines into the intake queue until EOF.
async fn pump_stdin(sender: IngestSender) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let request = match JoinRequest::from_json(&line) {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::warn!(error = %err, "request_rejected");
                        continue;
                    }
                };
                if let Err(err) = sender.submit(request).await {
                    tracing::warn!(error = %err, retryable = err.is_retryable(), "request_rejected");
                }
            }
            Ok(None) => {
                tracing::info!("stdin closed");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "stdin read failed");
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let (sender, scheduler) = Scheduler::with_queue(config)?;
    let notifier = Arc::new(StdoutNotifier {
        out: Mutex::new(tokio::io::stdout()),
    });
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(pump_stdin(sender));
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let status = scheduler.run(notifier, shutdown_rx).await;
    tracing::info!(
        ticks = status.ticks,
        exited_total = status.exited_total,
        still_waiting = status.waiting_members,
        "groupmatch stopped"
    );
    Ok(())
}
