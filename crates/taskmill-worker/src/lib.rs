pub mod config;
pub mod dispatch;
pub mod executor;
pub mod handoff;
pub mod processor;
pub mod registry;
pub mod worker;

pub use config::{DispatcherConfig, WorkerConfig};
pub use dispatch::Dispatcher;
pub use executor::Executor;
pub use handoff::{handoff_channel, HandoffReceiver, HandoffSender, RecvOutcome};
pub use processor::{EnqueueOptions, Processor, RunnableTask};
pub use registry::{ProcessorNotFound, ProcessorRegistry, ProcessorSpec};
pub use worker::{Worker, WorkerError, WorkerExit, WorkerReport};
