//! Initialisation du logging
//!
//! Le niveau par défaut vient de `host.logger.min_level` ; `RUST_LOG`, s'il
//! est défini, a priorité.

use anyhow::anyhow;
use pmoconfig::Config;
use pmosource::{NotificationLevel, Notifier};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Directive de filtre correspondant au niveau configuré
pub fn default_directive(config: &Config) -> anyhow::Result<String> {
    let level = config.get_log_min_level()?.trim().to_lowercase();
    Ok(match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => level,
        "warning" => "warn".to_string(),
        _ => "info".to_string(),
    })
}

pub fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(config)?)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

/// Recopie les notifications dans les logs
pub fn forward_notifications(notifier: &Notifier) -> JoinHandle<()> {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(n) => match n.level {
                    NotificationLevel::Info => info!(target: "notifications", "{}", n.message),
                    NotificationLevel::Success => info!(target: "notifications", "✅ {}", n.message),
                    NotificationLevel::Error => error!(target: "notifications", "{}", n.message),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} notification(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
