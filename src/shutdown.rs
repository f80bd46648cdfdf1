use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Coordinates Ctrl-C handling for long-running console commands
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    grace: Duration,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Wait for SIGINT
    pub async fn wait_for_signal() -> Result<()> {
        tokio::signal::ctrl_c().await?;
        info!("Interrupt received, shutting down");
        Ok(())
    }

    /// Drive `work` to completion unless Ctrl-C arrives first.
    ///
    /// Returns `None` when interrupted.
    pub async fn run_until_signal<F>(&self, work: F) -> Option<F::Output>
    where
        F: Future,
    {
        self.run_until(work, async {
            if let Err(e) = Self::wait_for_signal().await {
                warn!("Failed to listen for interrupt: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Drive `work` to completion unless `signal` resolves first.
    pub async fn run_until<F, S>(&self, work: F, signal: S) -> Option<F::Output>
    where
        F: Future,
        S: Future<Output = ()>,
    {
        tokio::select! {
            output = work => Some(output),
            _ = signal => None,
        }
    }

    /// Run a cleanup step, giving up after the grace period.
    pub async fn drain<F>(&self, cleanup: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        timeout(self.grace, cleanup)
            .await
            .map_err(|_| anyhow::anyhow!("Timeout waiting for shutdown cleanup"))?;
        info!("Shutdown cleanup completed");
        Ok(())
    }
}
