use std::sync::Arc;

use timesheet_storage::Database;
use tokio::task::JoinHandle;

use crate::notifier::Notifier;
use crate::{auto_shutdown, expiry_sweeper, lunch_reminder};

/// Spawns the three background workers as parallel tasks under one
/// cooperative shutdown signal (§4.4, §5 "Scheduling").
pub struct WorkerCoordinator {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerCoordinator {
    #[must_use]
    pub fn spawn(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let handles = vec![
            tokio::spawn(auto_shutdown::run(db.clone(), notifier.clone(), shutdown_rx.clone())),
            tokio::spawn(lunch_reminder::run(db.clone(), notifier, shutdown_rx.clone())),
            tokio::spawn(expiry_sweeper::run(db, shutdown_rx)),
        ];

        Self { shutdown_tx, handles }
    }

    /// Signal every worker to stop and wait for them to drain in-flight
    /// work before returning (§4.4 "Cancellation").
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("worker task panicked during shutdown: {e}");
            }
        }
    }
}
