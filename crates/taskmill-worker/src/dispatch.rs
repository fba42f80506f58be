use std::sync::Arc;

use taskmill_store::Repository;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::handoff::HandoffSender;

/// Claims eligible tasks from the repository and hands them to workers.
///
/// The claim is the only contended critical section in the system; the
/// repository serializes it, so any number of dispatchers may run against
/// one store without double-delivery.
pub struct Dispatcher {
    config: DispatcherConfig,
    repository: Arc<dyn Repository>,
    handoff: HandoffSender,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        repository: Arc<dyn Repository>,
        handoff: HandoffSender,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Dispatcher {
            config,
            repository,
            handoff,
            shutdown,
        }
    }

    /// Run until the shutdown flag flips, then idle each worker with one
    /// stop sentinel. Only repository errors propagate.
    pub async fn run(mut self) -> taskmill_store::Result<()> {
        info!(batch_size = self.config.batch_size, "dispatcher started");

        while !*self.shutdown.borrow() {
            let batch = self
                .repository
                .claim_for_processing(self.config.batch_size)
                .await?;

            if batch.is_empty() {
                tokio::select! {
                    _ = self.shutdown.changed() => {}
                    _ = tokio::time::sleep(self.config.poll_interval()) => {}
                }
                continue;
            }

            debug!(count = batch.len(), "handing off claimed batch");
            for task in batch {
                if !self.handoff.send_task(task).await {
                    warn!("all workers gone, dispatcher exiting");
                    return Ok(());
                }
            }
        }

        for _ in 0..self.config.worker_count {
            if !self.handoff.send_stop().await {
                break;
            }
        }
        info!("dispatcher stopped");
        Ok(())
    }
}
