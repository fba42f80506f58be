use std::sync::Arc;

use taskmill_core::{Failure, TaskId, TaskRecord};
use taskmill_store::Repository;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::executor::Executor;
use crate::handoff::{HandoffReceiver, RecvOutcome};
use crate::registry::ProcessorRegistry;

/// Errors that terminate a worker's run loop.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] taskmill_store::StoreError),

    #[error("task {id} failed: {failure}")]
    Execution { id: TaskId, failure: Failure },
}

/// Why a worker's run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Task budget exhausted.
    Completed,
    /// Stop sentinel received.
    Stopped,
    /// The dispatcher is gone; nothing will ever arrive again.
    Orphaned,
    /// A task failed. The failure is recorded on the task and this worker
    /// terminates so the supervisor can replace it with a fresh one.
    Crashed,
}

/// Final accounting returned to the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct WorkerReport {
    pub exit: WorkerExit,
    pub tasks_processed: u32,
}

/// A bounded-lifetime task consumer.
///
/// Pulls claimed tasks from the handoff queue one at a time, executes
/// them, and reports the outcome into the task's state machine. Dies
/// after `tasks_before_death` successes or on the first failed task
/// (crash-and-restart model); replacement is the supervisor's job.
pub struct Worker {
    id: String,
    config: WorkerConfig,
    repository: Arc<dyn Repository>,
    registry: Arc<ProcessorRegistry>,
    executor: Executor,
    handoff: HandoffReceiver,
    tasks_processed: u32,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        repository: Arc<dyn Repository>,
        registry: Arc<ProcessorRegistry>,
        handoff: HandoffReceiver,
    ) -> Self {
        let id = config.resolve_worker_id();
        let executor = Executor::new(Arc::clone(&registry));
        Worker {
            id,
            config,
            repository,
            registry,
            executor,
            handoff,
            tasks_processed: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run until the task budget is exhausted, a stop sentinel arrives,
    /// the dispatcher disappears, or a task fails. Errors never cross
    /// this boundary; they are logged and folded into the report.
    pub async fn run(mut self) -> WorkerReport {
        info!(worker = %self.id, "worker started");

        let exit = match self.run_loop().await {
            Ok(exit) => exit,
            Err(err) => {
                error!(worker = %self.id, "got error, exiting: {err}");
                WorkerExit::Crashed
            }
        };

        match exit {
            WorkerExit::Completed => info!(
                worker = %self.id,
                "processed {} of {} tasks, exiting",
                self.tasks_processed,
                self.config.tasks_before_death.unwrap_or(self.tasks_processed),
            ),
            WorkerExit::Stopped => info!(worker = %self.id, "worker stopped"),
            WorkerExit::Orphaned => warn!(worker = %self.id, "dispatcher gone, exiting"),
            WorkerExit::Crashed => warn!(
                worker = %self.id,
                tasks_processed = self.tasks_processed,
                "worker crashed, awaiting replacement",
            ),
        }

        WorkerReport {
            exit,
            tasks_processed: self.tasks_processed,
        }
    }

    fn budget_remaining(&self) -> bool {
        match self.config.tasks_before_death {
            None => true,
            Some(limit) => self.tasks_processed < limit,
        }
    }

    async fn run_loop(&mut self) -> Result<WorkerExit, WorkerError> {
        while self.budget_remaining() {
            let task = match self.handoff.recv_timeout(self.config.poll_timeout()).await {
                RecvOutcome::TimedOut => continue,
                RecvOutcome::Disconnected => return Ok(WorkerExit::Orphaned),
                RecvOutcome::Stop => return Ok(WorkerExit::Stopped),
                RecvOutcome::Received(task) => task,
            };
            self.process(*task).await?;
        }
        Ok(WorkerExit::Completed)
    }

    /// Execute one task and settle it. A failure is recorded on the task
    /// first and then propagated to end this worker's life.
    async fn process(&mut self, task: TaskRecord) -> Result<(), WorkerError> {
        match self.executor.execute_contained(&task).await {
            Ok(value) => {
                self.repository.complete(task.id).await?;
                self.tasks_processed += 1;
                debug!(worker = %self.id, task = %task.id, result = %value, "task finished");
                Ok(())
            }
            Err(failure) => {
                let policy = self
                    .registry
                    .resolve(&task.processor_class)
                    .ok()
                    .and_then(|spec| spec.delay_policy);
                self.repository
                    .fail(task.id, &failure, policy.as_ref())
                    .await?;
                warn!(worker = %self.id, task = %task.id, "task failed: {failure}");
                Err(WorkerError::Execution {
                    id: task.id,
                    failure,
                })
            }
        }
    }
}
