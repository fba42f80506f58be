use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Fixed worker id; generated from host and pid when unset.
    pub worker_id: Option<String>,

    /// Tasks to process before exiting so the supervisor can start a
    /// fresh worker; unbounded when unset.
    pub tasks_before_death: Option<u32>,

    /// Bounded wait on the handoff queue between liveness checks.
    pub poll_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            worker_id: None,
            tasks_before_death: None,
            poll_timeout_secs: 5,
        }
    }
}

impl WorkerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Diagnostic worker identity used in logs.
    pub fn resolve_worker_id(&self) -> String {
        if let Some(id) = &self.worker_id {
            return id.clone();
        }

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        let pid = std::process::id();
        let suffix = uuid::Uuid::new_v4().simple().to_string();

        format!("{}-{}-{}", host, pid, &suffix[..8])
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Tasks claimed per repository round-trip.
    pub batch_size: usize,

    /// Idle pause when no task is eligible.
    pub poll_interval_ms: u64,

    /// Capacity of the handoff queue.
    pub handoff_capacity: usize,

    /// Workers fed by this dispatcher; one stop sentinel each on
    /// shutdown.
    pub worker_count: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            batch_size: 10,
            poll_interval_ms: 500,
            handoff_capacity: 64,
            worker_count: 4,
        }
    }
}

impl DispatcherConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DispatcherConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
