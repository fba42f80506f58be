use std::collections::HashMap;

use parking_lot::RwLock;
use taskmill_core::{ArgumentError, Arguments, DelayPolicy};
use thiserror::Error;

use crate::processor::{Processor, RunnableTask};

/// No processor is registered under the requested name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no processor registered under name {0:?}")]
pub struct ProcessorNotFound(pub String);

type Constructor = fn(Arguments) -> Result<Box<dyn RunnableTask>, ArgumentError>;

fn construct<P: Processor>(arguments: Arguments) -> Result<Box<dyn RunnableTask>, ArgumentError> {
    Ok(Box::new(P::from_arguments(arguments)?))
}

/// Erased description of one registered processor type.
#[derive(Clone, Debug)]
pub struct ProcessorSpec {
    pub name: &'static str,
    pub priority: i32,
    pub unique_for_params: bool,
    pub delay_policy: Option<DelayPolicy>,
    constructor: Constructor,
}

impl ProcessorSpec {
    fn of<P: Processor>() -> Self {
        ProcessorSpec {
            name: P::NAME,
            priority: P::PRIORITY,
            unique_for_params: P::UNIQUE_FOR_PARAMS,
            delay_policy: P::delay_policy(),
            constructor: construct::<P>,
        }
    }

    /// Rebuild a runnable instance from stored arguments.
    pub fn build(&self, arguments: Arguments) -> Result<Box<dyn RunnableTask>, ArgumentError> {
        (self.constructor)(arguments)
    }
}

/// Process-wide mapping from processor name to its registered spec.
///
/// Populated at startup, read-only during dispatch. Resolution is by
/// exact name; there is no discovery fallback.
pub struct ProcessorRegistry {
    specs: RwLock<HashMap<&'static str, ProcessorSpec>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        ProcessorRegistry {
            specs: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent: registering the same name again keeps the first entry.
    /// The processor's delay policy is materialized here, so invalid
    /// retry configuration surfaces at startup rather than at failure
    /// time.
    pub fn register<P: Processor>(&self) {
        let mut specs = self.specs.write();
        specs.entry(P::NAME).or_insert_with(ProcessorSpec::of::<P>);
    }

    pub fn resolve(&self, name: &str) -> Result<ProcessorSpec, ProcessorNotFound> {
        self.specs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ProcessorNotFound(name.to_string()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.specs.read().contains_key(name)
    }

    /// All registered processor names.
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.read().keys().copied().collect()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use taskmill_core::{Failure, RetryStrategy};

    struct Double {
        n: i64,
    }

    #[async_trait::async_trait]
    impl Processor for Double {
        const NAME: &'static str = "Double";
        const PRIORITY: i32 = 42;
        const UNIQUE_FOR_PARAMS: bool = true;

        fn delay_policy() -> Option<DelayPolicy> {
            Some(DelayPolicy::new(["Transient"], 2, 5, RetryStrategy::Incremental).unwrap())
        }

        fn from_arguments(arguments: Arguments) -> Result<Self, ArgumentError> {
            let n = arguments
                .args
                .first()
                .and_then(Value::as_i64)
                .ok_or(ArgumentError::Missing("n"))?;
            Ok(Double { n })
        }

        fn arguments(&self) -> Arguments {
            Arguments::positional([json!(self.n)])
        }

        async fn run(&self) -> Result<Value, Failure> {
            Ok(json!(self.n * 2))
        }
    }

    #[test]
    fn registration_is_idempotent_and_exposes_metadata() {
        let registry = ProcessorRegistry::new();
        registry.register::<Double>();
        registry.register::<Double>();

        assert_eq!(registry.names(), vec!["Double"]);
        let spec = registry.resolve("Double").unwrap();
        assert_eq!(spec.priority, 42);
        assert!(spec.unique_for_params);
        assert!(spec.delay_policy.is_some());
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let registry = ProcessorRegistry::new();
        let err = registry.resolve("Ghost").unwrap_err();
        assert_eq!(err, ProcessorNotFound("Ghost".to_string()));
        assert!(!registry.is_registered("Ghost"));
    }

    #[tokio::test]
    async fn build_replays_stored_arguments() {
        let registry = ProcessorRegistry::new();
        registry.register::<Double>();
        let spec = registry.resolve("Double").unwrap();

        let task = spec.build(Arguments::positional([json!(21)])).unwrap();
        assert_eq!(task.execute().await.unwrap(), json!(42));

        assert!(spec.build(Arguments::default()).is_err());
    }
}
