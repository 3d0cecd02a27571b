//! Autoledger deferred-posting replayer.
//!
//! Polls the pending transaction queue and posts each queued request through
//! the ledger engine until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use autoledger_core::Ledger;
use autoledger_db::{PgLedgerStore, connect_with, pending_backlog};
use autoledger_shared::telemetry::init_tracing;
use autoledger_shared::{AppConfig, SmsClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let store = PgLedgerStore::new(db.clone());
    let mut ledger = Ledger::new(store, config.ledger.clone());
    if config.sms.enabled {
        let label = config.sms.currency_label.clone();
        let client = SmsClient::new(config.sms.clone()).context("Failed to build SMS client")?;
        ledger = ledger.with_notifier(Arc::new(client), label);
        info!(send_url = %config.sms.send_url, "SMS notifications enabled");
    }

    let batch_size = config.replayer.batch_size;
    let mut ticker = tokio::time::interval(Duration::from_secs(config.replayer.poll_interval_secs));
    info!(
        batch_size,
        poll_interval_secs = config.replayer.poll_interval_secs,
        "Replayer started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match ledger.replay_pending(batch_size).await {
                    Ok(summary) if summary.processed + summary.failed > 0 => {
                        let backlog = pending_backlog(&db).await.unwrap_or_default();
                        info!(
                            processed = summary.processed,
                            failed = summary.failed,
                            backlog,
                            "Replayed deferred postings"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error_code = e.error_code(), error = %e, "Replay pass failed"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    ledger.flush_notifications().await;
    info!("Replayer stopped");
    Ok(())
}
