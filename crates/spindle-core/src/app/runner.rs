//! DispatchRunner - periodic trigger for [`DispatchLoop`].
//!
//! - 一定間隔で `drive_cycle()` を 1 回ずつ呼ぶ（並行には走らせない）
//! - 遅れた tick はまとめて撃たずに skip する
//! - `shutdown_and_join()` で trigger を止め、走っている handler を待つ

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use super::dispatch_loop::{DispatchError, DispatchLoop};

/// Handle to a spawned trigger task.
pub struct DispatchRunner {
    dispatch: Arc<DispatchLoop>,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatchRunner {
    pub fn spawn(dispatch: Arc<DispatchLoop>, poll_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(trigger_loop(
            Arc::clone(&dispatch),
            poll_interval,
            shutdown_rx,
        ));
        Self {
            dispatch,
            shutdown_tx,
            join,
        }
    }

    pub fn dispatch(&self) -> &DispatchLoop {
        &self.dispatch
    }

    /// Stop scheduling new cycles. Running handlers are not cancelled.
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the trigger, then wait for in-flight handlers to finish.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            error!(error = %e, "dispatch trigger task ended abnormally");
        }
        self.dispatch.drain().await;
        info!("dispatch runner stopped");
    }
}

#[instrument(name = "dispatch_trigger", skip_all, fields(poll_interval_ms = poll_interval.as_millis() as u64))]
async fn trigger_loop(
    dispatch: Arc<DispatchLoop>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("dispatch trigger started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped も停止扱い
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match dispatch.drive_cycle().await {
            Ok(outcome) => debug!(?outcome, "dispatch cycle finished"),
            Err(DispatchError::NoHandler {
                message_id,
                message_type,
            }) => {
                error!(
                    %message_id,
                    %message_type,
                    "no handler registered for message type"
                );
            }
            Err(e) => error!(error = %e, "dispatch cycle failed"),
        }
    }

    debug!("dispatch trigger exiting");
}
