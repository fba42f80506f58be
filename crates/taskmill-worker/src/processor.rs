use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use taskmill_core::{
    ArgumentError, Arguments, DelayPolicy, Failure, TaskRecord, DEFAULT_PRIORITY,
};
use taskmill_store::{EnqueueOutcome, EnqueueRequest, Repository};

/// Enqueue-time overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Overrides the processor's default priority when set.
    pub priority: Option<i32>,
    /// Earliest execution time; the task is eligible immediately when unset.
    pub execute_after: Option<DateTime<Utc>>,
}

/// User-defined unit of work.
///
/// An implementation is built from concrete values, enqueued with its
/// arguments stored verbatim, and later rebuilt from those stored
/// arguments when a worker executes the task. `NAME` is the identity key
/// recorded on every task record and used for registry resolution.
#[async_trait]
pub trait Processor: Send + Sync + Sized + 'static {
    /// Registered name; stored as the task's `processor_class`.
    const NAME: &'static str;

    /// Default priority for records enqueued without an explicit override.
    const PRIORITY: i32 = DEFAULT_PRIORITY;

    /// Makes enqueue idempotent while a NEW record with identical
    /// arguments exists.
    const UNIQUE_FOR_PARAMS: bool = false;

    /// Retry configuration consulted when a run fails. None means a
    /// failure is always terminal.
    fn delay_policy() -> Option<DelayPolicy> {
        None
    }

    /// Rebuild an equivalent instance from stored arguments.
    fn from_arguments(arguments: Arguments) -> Result<Self, ArgumentError>;

    /// The arguments this instance was constructed with.
    fn arguments(&self) -> Arguments;

    /// The unit of work. The worker loop discards the returned value; it
    /// stays observable through direct invocation and the executor.
    async fn run(&self) -> Result<Value, Failure>;

    /// Persist this unit of work as a NEW task with default options.
    async fn enqueue(&self, repository: &dyn Repository) -> taskmill_store::Result<TaskRecord> {
        self.enqueue_with(repository, EnqueueOptions::default())
            .await
            .map(|outcome| outcome.record)
    }

    /// Persist with explicit overrides. The duplicate check (when
    /// `UNIQUE_FOR_PARAMS` is set) and the insert run inside a single
    /// repository transaction.
    async fn enqueue_with(
        &self,
        repository: &dyn Repository,
        options: EnqueueOptions,
    ) -> taskmill_store::Result<EnqueueOutcome> {
        let request = EnqueueRequest {
            processor_class: Self::NAME.to_string(),
            arguments: self.arguments(),
            priority: options.priority.unwrap_or(Self::PRIORITY),
            execute_after: options.execute_after,
            unique_for_params: Self::UNIQUE_FOR_PARAMS,
        };
        repository.enqueue(request).await
    }
}

/// Object-safe execution facet of a processor, used for dispatch once the
/// concrete type has been resolved by name.
#[async_trait]
pub trait RunnableTask: Send + Sync {
    async fn execute(&self) -> Result<Value, Failure>;
}

#[async_trait]
impl<P: Processor> RunnableTask for P {
    async fn execute(&self) -> Result<Value, Failure> {
        self.run().await
    }
}
