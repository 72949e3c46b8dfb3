//! Recording daemon manager for tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::DaemonManager;
use crate::Result;

/// Daemon manager that records every operation instead of touching systemd
#[derive(Debug, Default, Clone)]
pub(crate) struct FakeManager {
    operations: Arc<Mutex<Vec<String>>>,
}

impl FakeManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Operations performed so far, in order (e.g., "enable kubelet")
    pub(crate) fn operations(&self) -> Vec<String> {
        self.operations.lock().expect("fake manager lock").clone()
    }

    fn record(&self, op: String) {
        self.operations.lock().expect("fake manager lock").push(op);
    }
}

#[async_trait]
impl DaemonManager for FakeManager {
    async fn daemon_reload(&self) -> Result<()> {
        self.record("daemon-reload".to_string());
        Ok(())
    }

    async fn enable_daemon(&self, name: &str) -> Result<()> {
        self.record(format!("enable {name}"));
        Ok(())
    }

    async fn restart_daemon(&self, name: &str) -> Result<()> {
        self.record(format!("restart {name}"));
        Ok(())
    }

    async fn stop_daemon(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"));
        Ok(())
    }

    fn close(&self) {
        self.record("close".to_string());
    }
}
