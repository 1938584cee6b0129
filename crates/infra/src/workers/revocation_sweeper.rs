use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use castle_auth::RevocationRegistry;

/// Handle to stop and join the sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request shutdown and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "revocation sweeper did not stop cleanly");
            }
        }
    }
}

/// Periodically drops revocation entries whose token has expired.
#[derive(Debug)]
pub struct RevocationSweeper;

impl RevocationSweeper {
    /// Spawn the sweeper on the current tokio runtime.
    pub fn spawn(registry: Arc<RevocationRegistry>, period: Duration) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let period = period.max(Duration::from_millis(1));
        let join = tokio::spawn(sweep_loop(registry, period, shutdown_rx));

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

async fn sweep_loop(registry: Arc<RevocationRegistry>, period: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                let removed = registry.sweep(Utc::now());
                if removed > 0 {
                    debug!(removed, remaining = registry.len(), "swept expired revocations");
                }
            }
        }
    }
    debug!("revocation sweeper stopped");
}
