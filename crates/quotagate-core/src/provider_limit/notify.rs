//! Status-change fan-out with per-observer failure isolation.

use parking_lot::RwLock;
use quotagate_types::StatusChange;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Observer invoked on every debounced status transition.
pub type StatusCallback = Arc<dyn Fn(&StatusChange) + Send + Sync>;

const BROADCAST_CAPACITY: usize = 64;

/// Queue feeding one observer's dedicated worker thread.
///
/// Each observer sees transitions in dispatch order; a slow or panicking
/// observer only delays itself.
struct ObserverQueue {
    tx: mpsc::UnboundedSender<StatusChange>,
}

pub(crate) struct StatusNotifier {
    observers: RwLock<Vec<ObserverQueue>>,
    tx: broadcast::Sender<StatusChange>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn run_observer(index: usize, callback: StatusCallback, mut rx: mpsc::UnboundedReceiver<StatusChange>) {
    // Ends once the notifier (and with it the sender) is dropped
    while let Some(change) = rx.blocking_recv() {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&change))) {
            tracing::error!(
                "Status observer #{} panicked for provider {}: {}",
                index,
                change.provider,
                panic_message(payload.as_ref())
            );
        }
    }
}

impl StatusNotifier {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { observers: RwLock::new(Vec::new()), tx }
    }

    pub(crate) fn register(&self, callback: StatusCallback) {
        let mut observers = self.observers.write();
        let index = observers.len();
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name(format!("quotagate-observer-{}", index))
            .spawn(move || run_observer(index, callback, rx));
        match spawned {
            Ok(_) => observers.push(ObserverQueue { tx }),
            Err(e) => tracing::error!("Failed to start status observer #{}: {}", index, e),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.tx.subscribe()
    }

    pub(crate) fn callback_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Queue `change` for every observer. Must be called without holding a record lock.
    pub(crate) fn dispatch(&self, change: StatusChange) {
        tracing::info!(
            "Provider {} status: {} -> {}",
            change.provider,
            change.previous,
            change.status
        );

        if self.tx.send(change.clone()).is_err() {
            tracing::trace!("No status subscribers for provider {}", change.provider);
        }

        for (index, observer) in self.observers.read().iter().enumerate() {
            if observer.tx.send(change.clone()).is_err() {
                tracing::warn!("Status observer #{} has stopped, dropping change", index);
            }
        }
    }
}
