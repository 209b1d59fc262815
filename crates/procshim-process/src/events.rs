//! Process event bus
//!
//! Lifecycle notifications (`beforeExit`, `exit`, signals, warnings) are
//! published on a tokio broadcast channel. Publishing with no subscribers is
//! fine.

use tokio::sync::broadcast;

use crate::warning::WarningEvent;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// Process notification
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BeforeExit { code: i32 },
    Exit { code: i32 },
    /// A signal is about to be delivered
    Signal {
        pid: i32,
        /// `None` for the existence probe (0)
        name: Option<&'static str>,
        number: i32,
    },
    Warning(WarningEvent),
}

impl ProcessEvent {
    /// Node.js event name
    pub fn name(&self) -> &'static str {
        match self {
            ProcessEvent::BeforeExit { .. } => "beforeExit",
            ProcessEvent::Exit { .. } => "exit",
            ProcessEvent::Signal { name, .. } => name.unwrap_or("kill"),
            ProcessEvent::Warning(_) => "warning",
        }
    }
}

/// Broadcast bus for [`ProcessEvent`]s
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ProcessEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create with custom capacity (must be > 0)
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers
    pub fn publish(&self, event: ProcessEvent) {
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
