mod memory;
mod repository;

pub use memory::MemoryRepository;
pub use repository::{EnqueueOutcome, EnqueueRequest, Repository};

use taskmill_core::TaskId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task {id} is {actual}, expected {expected}")]
    InvalidState {
        id: TaskId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
