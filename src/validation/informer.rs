//! Observation sink for validation progress
//!
//! An [`Informer`] is notified when a named validation starts and finishes.
//! It exists for progress visibility only and has no effect on control flow.

use std::error::Error as StdError;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

/// Observer notified of validation starts and completions
pub trait Informer: Send + Sync {
    /// A validation named `name` is about to run
    fn starting(&self, name: &str, message: &str);

    /// The validation named `name` finished, with its error if it failed
    fn done(&self, name: &str, err: Option<&(dyn StdError + 'static)>);
}

/// Informer that reports validation progress through `tracing`
#[derive(Debug, Default)]
pub struct TracingInformer;

impl TracingInformer {
    /// Create a new tracing-backed informer
    pub fn new() -> Self {
        Self
    }
}

impl Informer for TracingInformer {
    fn starting(&self, name: &str, message: &str) {
        info!(validation = %name, "{}", message);
    }

    fn done(&self, name: &str, err: Option<&(dyn StdError + 'static)>) {
        if let Some(err) = err {
            warn!(validation = %name, error = %err, "Validation failed");
        }
    }
}

/// Informer that ignores all notifications
#[derive(Debug, Default)]
pub struct NoopInformer;

impl Informer for NoopInformer {
    fn starting(&self, _name: &str, _message: &str) {}

    fn done(&self, _name: &str, _err: Option<&(dyn StdError + 'static)>) {}
}

/// A single recorded informer notification
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A validation started
    Starting(String),
    /// A validation finished; the payload is the error message, if any
    Done(String, Option<String>),
}

/// Informer that records notifications for test assertions
#[derive(Debug, Default, Clone)]
pub struct RecordingInformer {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingInformer {
    /// Create a new recording informer
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notifications received so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("informer lock poisoned").clone()
    }
}

impl Informer for RecordingInformer {
    fn starting(&self, name: &str, _message: &str) {
        self.events
            .lock()
            .expect("informer lock poisoned")
            .push(Event::Starting(name.to_string()));
    }

    fn done(&self, name: &str, err: Option<&(dyn StdError + 'static)>) {
        self.events
            .lock()
            .expect("informer lock poisoned")
            .push(Event::Done(name.to_string(), err.map(|e| e.to_string())));
    }
}
