use std::sync::Arc;

use serde_json::Value;
use taskmill_core::{Failure, TaskRecord};
use tracing::{debug, error};

use crate::registry::ProcessorRegistry;

/// Executes stored task records by replaying their arguments through the
/// registered processor type.
pub struct Executor {
    registry: Arc<ProcessorRegistry>,
}

impl Executor {
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Executor { registry }
    }

    /// Resolve the processor, rebuild it from the stored arguments, run
    /// it. Returns the run's value so direct callers and tests can
    /// observe it; resolution and decoding problems come back as
    /// failures with their reserved kinds.
    pub async fn execute(&self, task: &TaskRecord) -> Result<Value, Failure> {
        let spec = self.registry.resolve(&task.processor_class).map_err(|err| {
            error!(task = %task.id, "{err}");
            Failure::processor_not_found(&task.processor_class)
        })?;

        let processor = spec.build(task.arguments.clone()).map_err(|err| {
            error!(task = %task.id, processor = spec.name, "stored arguments rejected: {err}");
            Failure::invalid_arguments(&err)
        })?;

        debug!(task = %task.id, processor = spec.name, try_num = task.try_num, "executing task");
        processor.execute().await
    }

    /// Execute inside a spawned task so a panicking processor surfaces as
    /// a failure instead of unwinding through the worker loop.
    pub async fn execute_contained(&self, task: &TaskRecord) -> Result<Value, Failure> {
        let executor = Executor {
            registry: Arc::clone(&self.registry),
        };
        let task = task.clone();
        match tokio::spawn(async move { executor.execute(&task).await }).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => Err(Failure::panicked()),
            Err(_) => Err(Failure::new(
                "Cancelled",
                "execution was cancelled before completion",
            )),
        }
    }
}
