use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskmill_core::{Arguments, DelayPolicy, Failure, TaskId, TaskRecord, TaskStatusKind};

use crate::Result;

/// A request to persist one new task.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub processor_class: String,
    pub arguments: Arguments,
    pub priority: i32,
    /// Earliest execution time; eligible immediately when unset.
    pub execute_after: Option<DateTime<Utc>>,
    /// De-duplicate against NEW records with the same processor name and
    /// arguments instead of inserting.
    pub unique_for_params: bool,
}

/// The persisted record, and whether an existing NEW record was returned
/// instead of creating a new one.
#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    pub record: TaskRecord,
    pub deduplicated: bool,
}

/// Storage contract of the dequeue protocol.
///
/// Every method is atomic with respect to the others. Two guarantees carry
/// the whole design: `claim_for_processing` never hands the same record to
/// two callers, and `enqueue` runs its duplicate check and insert inside
/// one transaction scope. Implementations realize both with pessimistic
/// locking (the in-memory store with a table mutex, a relational store
/// with `SELECT ... FOR UPDATE` in a transaction).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a new NEW task, or return the existing duplicate when the
    /// request asks for de-duplication.
    async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueOutcome>;

    /// Eligible NEW tasks (`execute_after` absent or due), ordered by
    /// priority descending then creation time ascending.
    async fn select_new(&self, limit: Option<usize>) -> Result<Vec<TaskRecord>>;

    /// Atomically claim up to `limit` eligible NEW tasks: each returned
    /// record is IN_PROCESS with its `try_num` incremented and is owned by
    /// the caller until it resolves. Concurrent callers receive disjoint
    /// sets.
    async fn claim_for_processing(&self, limit: usize) -> Result<Vec<TaskRecord>>;

    /// IN_PROCESS → FINISHED.
    async fn complete(&self, id: TaskId) -> Result<TaskRecord>;

    /// Record a failed attempt. With a policy that handles the failure
    /// kind and has retries left, the task goes back to NEW deferred by
    /// the policy's delay; otherwise it becomes terminal ERROR carrying
    /// the stringified failure.
    async fn fail(
        &self,
        id: TaskId,
        failure: &Failure,
        policy: Option<&DelayPolicy>,
    ) -> Result<TaskRecord>;

    /// Whether a NEW record with this processor name and identical
    /// arguments currently exists. `enqueue` performs the same check
    /// inside its own transaction when asked to de-duplicate.
    async fn exists_new(&self, processor_class: &str, arguments: &Arguments) -> Result<bool>;

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>>;

    async fn tasks_by_status(&self, kind: TaskStatusKind) -> Result<Vec<TaskRecord>>;

    async fn count_by_status(&self, kind: TaskStatusKind) -> Result<usize>;
}
