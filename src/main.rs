use anyhow::{Error, Result};
use achievement_notifier::{
    api::run_api_server,
    clients::{dispatcher::Dispatcher, health::HealthChecker},
    config::Config,
    models::status::DeliveryState,
    notifier::{Notifier, Outcome},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let endpoints = config.endpoints()?;

    let (dispatcher, mut reports) = Dispatcher::start(config.dispatcher_config(), endpoints)?;
    let notifier = Notifier::from_config(&config, dispatcher.clone())?;

    let server_shutdown = CancellationToken::new();
    let server = tokio::spawn(run_api_server(
        HealthChecker::new(dispatcher.clone()),
        config.server_port,
        server_shutdown.clone(),
    ));

    let report_logger = tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            if report.status == DeliveryState::Delivered {
                debug!(task_id = %report.task_id, endpoint = %report.endpoint, "Delivery report");
            } else {
                warn!(
                    task_id = %report.task_id,
                    endpoint = %report.endpoint,
                    kind = %report.kind,
                    status = %report.status,
                    attempts = report.attempts,
                    error = report.last_error.as_deref().unwrap_or_default(),
                    "Delivery did not succeed"
                );
            }
        }
    });

    info!("Reading host events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Host stream closed");
                break;
            }
            Err(e) => {
                error!(error = %e, "Failed to read host stream");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match notifier.process_message(&line).await {
            Ok(Outcome::Enqueued(task_ids)) => {
                debug!(tasks = task_ids.len(), "Host event enqueued")
            }
            Ok(outcome) => debug!(outcome = ?outcome, "Host event not notified"),
            Err(e) => warn!(error = %e, "Failed to process host event"),
        }
    }

    let cancelled = dispatcher.shutdown().await;
    if cancelled > 0 {
        warn!(cancelled, "Deliveries cancelled at shutdown");
    }

    server_shutdown.cancel();
    match server.await {
        Ok(Err(e)) => error!(error = %e, "Health check server failed"),
        Err(e) => error!(error = %e, "Health check server task panicked"),
        Ok(Ok(())) => {}
    }

    drop(notifier);
    drop(dispatcher);
    if let Err(e) = report_logger.await {
        error!(error = %e, "Report logger task failed");
    }

    info!("Shutdown complete");

    Ok(())
}
