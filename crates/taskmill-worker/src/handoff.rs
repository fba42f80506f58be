use std::sync::Arc;
use std::time::Duration;

use taskmill_core::TaskRecord;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Message carried from the dispatcher to the workers.
#[derive(Debug)]
enum Handoff {
    Task(TaskRecord),
    /// Idles exactly one worker.
    Stop,
}

/// Producer half of the handoff queue, held by the dispatcher.
#[derive(Clone)]
pub struct HandoffSender {
    tx: mpsc::Sender<Handoff>,
}

impl HandoffSender {
    /// Deliver a claimed task. Returns false once every worker is gone.
    pub async fn send_task(&self, task: TaskRecord) -> bool {
        self.tx.send(Handoff::Task(task)).await.is_ok()
    }

    /// Deliver one stop sentinel; each sentinel stops exactly one worker.
    pub async fn send_stop(&self) -> bool {
        self.tx.send(Handoff::Stop).await.is_ok()
    }
}

/// Consumer half. Clones share one underlying queue, so each message is
/// received by exactly one worker.
#[derive(Clone)]
pub struct HandoffReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Handoff>>>,
}

/// Outcome of one bounded wait on the handoff queue.
#[derive(Debug)]
pub enum RecvOutcome {
    Received(Box<TaskRecord>),
    /// Stop sentinel: exit cleanly.
    Stop,
    /// Nothing arrived within the wait; caller may run liveness checks
    /// and wait again.
    TimedOut,
    /// Every sender is gone: the dispatcher no longer exists.
    Disconnected,
}

impl HandoffReceiver {
    /// Wait up to `wait` for the next message.
    pub async fn recv_timeout(&self, wait: Duration) -> RecvOutcome {
        let recv = async { self.rx.lock().await.recv().await };
        match tokio::time::timeout(wait, recv).await {
            Err(_) => RecvOutcome::TimedOut,
            Ok(None) => RecvOutcome::Disconnected,
            Ok(Some(Handoff::Stop)) => RecvOutcome::Stop,
            Ok(Some(Handoff::Task(task))) => RecvOutcome::Received(Box::new(task)),
        }
    }
}

/// Bounded dispatcher→workers queue with a stop sentinel.
pub fn handoff_channel(capacity: usize) -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        HandoffSender { tx },
        HandoffReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}
