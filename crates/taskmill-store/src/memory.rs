use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use taskmill_core::{
    Arguments, DelayPolicy, Failure, TaskId, TaskRecord, TaskStatus, TaskStatusKind,
};
use tracing::debug;

use crate::repository::{EnqueueOutcome, EnqueueRequest, Repository};
use crate::{Result, StoreError};

/// In-memory repository.
///
/// One mutex over the whole table is the transaction and row-lock
/// boundary: each operation runs in its own critical section, so
/// concurrent `claim_for_processing` calls are serialized and their
/// results disjoint by construction.
#[derive(Default)]
pub struct MemoryRepository {
    table: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ids of claim-eligible records, priority descending then creation time
/// ascending, truncated to `limit`.
fn eligible_ids(
    table: &HashMap<TaskId, TaskRecord>,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> Vec<TaskId> {
    let mut eligible: Vec<&TaskRecord> =
        table.values().filter(|task| task.is_eligible_at(now)).collect();
    eligible.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    let mut ids: Vec<TaskId> = eligible.into_iter().map(|task| task.id).collect();
    if let Some(limit) = limit {
        ids.truncate(limit);
    }
    ids
}

fn find_new_duplicate<'a>(
    table: &'a HashMap<TaskId, TaskRecord>,
    processor_class: &str,
    arguments: &Arguments,
) -> Option<&'a TaskRecord> {
    table.values().find(|task| {
        task.status == TaskStatus::New
            && task.processor_class == processor_class
            && task.arguments == *arguments
    })
}

fn expect_in_process(task: &TaskRecord) -> Result<()> {
    if task.status.kind() != TaskStatusKind::InProcess {
        return Err(StoreError::InvalidState {
            id: task.id,
            expected: TaskStatusKind::InProcess.as_str(),
            actual: task.status.kind().as_str(),
        });
    }
    Ok(())
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueOutcome> {
        let mut table = self.table.lock();

        if request.unique_for_params {
            let duplicate =
                find_new_duplicate(&table, &request.processor_class, &request.arguments);
            if let Some(existing) = duplicate {
                debug!(task = %existing.id, processor = %existing.processor_class,
                    "enqueue deduplicated against existing NEW record");
                return Ok(EnqueueOutcome {
                    record: existing.clone(),
                    deduplicated: true,
                });
            }
        }

        let record = TaskRecord::new(
            request.processor_class,
            request.arguments,
            request.priority,
            request.execute_after,
        );
        table.insert(record.id, record.clone());
        debug!(task = %record.id, processor = %record.processor_class,
            priority = record.priority, "task enqueued");
        Ok(EnqueueOutcome {
            record,
            deduplicated: false,
        })
    }

    async fn select_new(&self, limit: Option<usize>) -> Result<Vec<TaskRecord>> {
        let table = self.table.lock();
        let now = Utc::now();
        let ids = eligible_ids(&table, now, limit);
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn claim_for_processing(&self, limit: usize) -> Result<Vec<TaskRecord>> {
        let mut table = self.table.lock();
        let now = Utc::now();
        let ids = eligible_ids(&table, now, Some(limit));

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = table.get_mut(&id) {
                task.mark_claimed();
                claimed.push(task.clone());
            }
        }
        if !claimed.is_empty() {
            debug!(count = claimed.len(), "claimed batch for processing");
        }
        Ok(claimed)
    }

    async fn complete(&self, id: TaskId) -> Result<TaskRecord> {
        let mut table = self.table.lock();
        let task = table.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        expect_in_process(task)?;
        task.mark_finished();
        debug!(task = %id, "task finished");
        Ok(task.clone())
    }

    async fn fail(
        &self,
        id: TaskId,
        failure: &Failure,
        policy: Option<&DelayPolicy>,
    ) -> Result<TaskRecord> {
        let mut table = self.table.lock();
        let task = table.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        expect_in_process(task)?;

        match policy {
            Some(policy)
                if policy.handles(&failure.kind) && policy.should_retry(task.try_num) =>
            {
                let execute_after = policy.next_execute_after(Utc::now(), task.try_num);
                task.mark_retry(execute_after);
                debug!(task = %id, try_num = task.try_num, %execute_after,
                    "task failed, retry scheduled");
            }
            _ => {
                task.mark_error(failure.to_string());
                debug!(task = %id, try_num = task.try_num, "task failed for good: {failure}");
            }
        }
        Ok(task.clone())
    }

    async fn exists_new(&self, processor_class: &str, arguments: &Arguments) -> Result<bool> {
        let table = self.table.lock();
        Ok(find_new_duplicate(&table, processor_class, arguments).is_some())
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        Ok(self.table.lock().get(&id).cloned())
    }

    async fn tasks_by_status(&self, kind: TaskStatusKind) -> Result<Vec<TaskRecord>> {
        Ok(self
            .table
            .lock()
            .values()
            .filter(|task| task.status.kind() == kind)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, kind: TaskStatusKind) -> Result<usize> {
        Ok(self
            .table
            .lock()
            .values()
            .filter(|task| task.status.kind() == kind)
            .count())
    }
}
