use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a stored task.
pub type TaskId = Uuid;

/// Task status. Serialized internally tagged so the persisted document is
/// `{"status": "New"}`, or `{"status": "Error", "message": "..."}` once a
/// task has failed for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum TaskStatus {
    New,
    #[serde(rename = "In Process")]
    InProcess,
    Finished,
    Error { message: String },
}

/// Status discriminant, independent of the error message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatusKind {
    New,
    InProcess,
    Finished,
    Error,
}

impl TaskStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatusKind::New => "New",
            TaskStatusKind::InProcess => "In Process",
            TaskStatusKind::Finished => "Finished",
            TaskStatusKind::Error => "Error",
        }
    }
}

impl std::fmt::Display for TaskStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TaskStatus {
    pub fn kind(&self) -> TaskStatusKind {
        match self {
            TaskStatus::New => TaskStatusKind::New,
            TaskStatus::InProcess => TaskStatusKind::InProcess,
            TaskStatus::Finished => TaskStatusKind::Finished,
            TaskStatus::Error { .. } => TaskStatusKind::Error,
        }
    }

    /// Failure text, present only on `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            TaskStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// Argument payload stored on a task and replayed to the processor at
/// execution time. Values are opaque to the queue and round-trip through
/// JSON unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl Arguments {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Arguments { args, kwargs }
    }

    /// Positional arguments only.
    pub fn positional<I>(args: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Arguments {
            args: args.into_iter().collect(),
            kwargs: Map::new(),
        }
    }
}

/// One persisted unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,

    /// Registered name of the processor that executes this task.
    pub processor_class: String,

    /// Payload passed verbatim to the processor at execution time.
    pub arguments: Arguments,

    /// Higher value is served first.
    pub priority: i32,

    pub status: TaskStatus,

    /// Ineligible for claim while the current time is before this.
    pub execute_after: Option<DateTime<Utc>>,

    /// Execution attempts so far; incremented once per claim.
    pub try_num: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Fresh NEW record. Called by the store on creation; the store owns
    /// id assignment.
    pub fn new(
        processor_class: impl Into<String>,
        arguments: Arguments,
        priority: i32,
        execute_after: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        TaskRecord {
            id: Uuid::new_v4(),
            processor_class: processor_class.into(),
            arguments,
            priority,
            status: TaskStatus::New,
            execute_after,
            try_num: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record may be claimed at `now`: NEW, and not deferred
    /// into the future.
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::New
            && self.execute_after.map_or(true, |after| after <= now)
    }

    /// NEW → IN_PROCESS. Counts the attempt.
    pub fn mark_claimed(&mut self) {
        self.status = TaskStatus::InProcess;
        self.try_num += 1;
        self.updated_at = Utc::now();
    }

    /// IN_PROCESS → FINISHED.
    pub fn mark_finished(&mut self) {
        self.status = TaskStatus::Finished;
        self.updated_at = Utc::now();
    }

    /// IN_PROCESS → NEW, deferred to `execute_after` for the next attempt.
    pub fn mark_retry(&mut self, execute_after: DateTime<Utc>) {
        self.status = TaskStatus::New;
        self.execute_after = Some(execute_after);
        self.updated_at = Utc::now();
    }

    /// IN_PROCESS → ERROR, terminal, with the stringified failure.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Error {
            message: message.into(),
        };
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> TaskRecord {
        TaskRecord::new("Echo", Arguments::positional([json!(1)]), 10, None)
    }

    #[test]
    fn new_record_starts_new_with_zero_tries() {
        let task = record();
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(task.try_num, 0);
        assert_eq!(task.processor_class, "Echo");
        assert!(task.is_eligible_at(Utc::now()));
    }

    #[test]
    fn claim_counts_the_attempt() {
        let mut task = record();
        task.mark_claimed();
        assert_eq!(task.status, TaskStatus::InProcess);
        assert_eq!(task.try_num, 1);
        task.mark_finished();
        assert_eq!(task.status, TaskStatus::Finished);
    }

    #[test]
    fn retry_goes_back_to_new_and_defers() {
        let mut task = record();
        task.mark_claimed();
        let after = Utc::now() + chrono::Duration::seconds(30);
        task.mark_retry(after);
        assert_eq!(task.status, TaskStatus::New);
        assert_eq!(task.execute_after, Some(after));
        assert!(!task.is_eligible_at(Utc::now()));
        assert!(task.is_eligible_at(after));
    }

    #[test]
    fn deferred_record_is_not_eligible() {
        let future = Utc::now() + chrono::Duration::hours(1);
        let task = TaskRecord::new("Echo", Arguments::default(), 10, Some(future));
        assert!(!task.is_eligible_at(Utc::now()));
    }

    #[test]
    fn claimed_record_is_not_eligible() {
        let mut task = record();
        task.mark_claimed();
        assert!(!task.is_eligible_at(Utc::now()));
    }

    #[test]
    fn status_serializes_under_the_status_tag() {
        assert_eq!(
            serde_json::to_value(TaskStatus::New).unwrap(),
            json!({"status": "New"})
        );
        assert_eq!(
            serde_json::to_value(TaskStatus::InProcess).unwrap(),
            json!({"status": "In Process"})
        );
        assert_eq!(
            serde_json::to_value(TaskStatus::Error {
                message: "boom".to_string()
            })
            .unwrap(),
            json!({"status": "Error", "message": "boom"})
        );
    }

    #[test]
    fn arguments_round_trip_through_json() {
        let mut kwargs = Map::new();
        kwargs.insert("flag".to_string(), json!(true));
        kwargs.insert("nested".to_string(), json!({"a": [1, 2.5, null]}));
        let arguments = Arguments::new(
            vec![json!("text"), json!(42), json!(null), json!([1, "two"])],
            kwargs,
        );

        let encoded = serde_json::to_string(&arguments).unwrap();
        let decoded: Arguments = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, arguments);
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut task = record();
        task.mark_claimed();
        let encoded = serde_json::to_string(&task).unwrap();
        let decoded: TaskRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, task.id);
        assert_eq!(decoded.status, task.status);
        assert_eq!(decoded.arguments, task.arguments);
        assert_eq!(decoded.try_num, 1);
    }
}
