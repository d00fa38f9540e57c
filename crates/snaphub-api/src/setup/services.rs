//! Service initialization and application state setup

use anyhow::Context;
use snaphub_core::Config;
use snaphub_db::Stores;
use snaphub_services::{NotificationChannel, SmtpChannel, Storage};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Handles of spawned background loops, aborted once the server has stopped
#[derive(Default)]
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn shutdown(self) {
        let count = self.handles.len();
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            // Cancellation is the expected result
            let _ = handle.await;
        }
        tracing::info!(tasks = count, "Background tasks stopped");
    }
}

/// Build the application state and start background tasks
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> anyhow::Result<(Arc<AppState>, BackgroundTasks)> {
    let channel: Option<Arc<dyn NotificationChannel>> = SmtpChannel::from_config(config)
        .context("Failed to configure SMTP notifications")?
        .map(|c| Arc::new(c) as Arc<dyn NotificationChannel>);
    tracing::info!(
        notifications = channel.is_some(),
        timezone = %config.notification_timezone(),
        "Notification channel configured"
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        Stores::postgres(pool),
        storage,
        channel,
    ));

    let mut tasks = BackgroundTasks::default();
    let interval = config.reconcile_interval_secs();
    if interval > 0 {
        tasks.push(state.reconcile.clone().start(interval));
        tracing::info!(
            interval_secs = interval,
            grace_period_secs = config.reconcile_grace_period_secs(),
            "Storage reconciliation scheduled"
        );
    } else {
        tracing::info!("Storage reconciliation disabled (RECONCILE_INTERVAL_SECS=0)");
    }

    Ok((state, tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_aborts_running_tasks() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tasks = BackgroundTasks::default();
        tasks.push(tokio::spawn(async move {
            let _held = tx;
            std::future::pending::<()>().await;
        }));
        assert_eq!(tasks.len(), 1);

        tasks.shutdown().await;

        // The sender is dropped only when the task is cancelled
        assert!(rx.await.is_err());
    }
}
