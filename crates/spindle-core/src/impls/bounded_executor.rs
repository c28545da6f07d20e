//! BoundedExecutor - tokio worker pool capped by a semaphore.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, TryAcquireError};
use tracing::debug;

use crate::ports::{BoxTask, Executor, ExecutorError};

/// Runs submitted tasks on the tokio runtime, at most `pool_size` at a time.
///
/// Each task holds one semaphore permit for its whole run. A submit that
/// finds no free permit is rejected instead of queued.
pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
    pool_size: u32,
}

impl BoundedExecutor {
    pub fn new(pool_size: u32) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(pool_size as usize)),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    /// Number of tasks currently running.
    pub fn active(&self) -> usize {
        if self.permits.is_closed() {
            return 0;
        }
        (self.pool_size as usize).saturating_sub(self.permits.available_permits())
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

#[async_trait]
impl Executor for BoundedExecutor {
    fn has_capacity(&self) -> bool {
        !self.permits.is_closed() && self.permits.available_permits() > 0
    }

    fn submit(&self, task: BoxTask) -> Result<(), ExecutorError> {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => return Err(ExecutorError::Rejected),
            Err(TryAcquireError::Closed) => return Err(ExecutorError::Closed),
        };

        tokio::spawn(async move {
            // permit は task が終わる（panic を含む）まで保持する
            let _permit = permit;
            task.await;
        });
        Ok(())
    }

    async fn drain(&self) {
        // 全 permit が戻るまで待ってから close する
        match self.permits.acquire_many(self.pool_size).await {
            Ok(all) => {
                all.forget();
                self.permits.close();
                debug!(pool_size = self.pool_size, "executor drained");
            }
            Err(_) => debug!("executor already drained"),
        }
    }
}
