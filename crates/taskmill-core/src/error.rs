use thiserror::Error;

/// Invalid retry/backoff configuration. Raised at construction time only;
/// a policy that was built successfully never fails at use time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("\"retry_on\" should be defined and not empty")]
    EmptyRetryOn,

    #[error("\"retries_count\" should be equal or bigger than 1")]
    ZeroRetries,
}

/// A processor could not be rebuilt from the arguments stored on a task.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("missing argument {0:?}")]
    Missing(&'static str),

    #[error("argument {name:?} has an unexpected shape: expected {expected}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
    },

    #[error("failed to decode arguments: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Execution failure reported by a processor run.
///
/// `kind` identifies the failure class and is what a
/// [`DelayPolicy`](crate::DelayPolicy) matches its `retry_on` set against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: String,
    pub message: String,
}

impl Failure {
    /// Kind recorded when a task's processor name resolves to nothing.
    pub const PROCESSOR_NOT_FOUND: &'static str = "ProcessorNotFound";

    /// Kind recorded when stored arguments do not fit the processor.
    pub const INVALID_ARGUMENTS: &'static str = "InvalidArguments";

    /// Kind recorded when a processor panics instead of returning.
    pub const PANIC: &'static str = "Panic";

    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Failure {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn processor_not_found(name: &str) -> Self {
        Failure::new(
            Self::PROCESSOR_NOT_FOUND,
            format!("no processor registered under name {name:?}"),
        )
    }

    pub fn invalid_arguments(err: &ArgumentError) -> Self {
        Failure::new(Self::INVALID_ARGUMENTS, err.to_string())
    }

    pub fn panicked() -> Self {
        Failure::new(Self::PANIC, "processor panicked during execution")
    }
}
