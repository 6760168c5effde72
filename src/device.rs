// src/device.rs
//! Device command adapter. The scheduler only ever speaks three verbs
//! (stop, start, refresh), so any cast-control backend that can do those
//! satisfies the seam. The stock implementation shells out to the `catt`
//! CLI; commands are bounded by a timeout rather than cancelled mid-flight.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::process::Command;

#[async_trait::async_trait]
pub trait DeviceCommander: Send + Sync {
    /// Halt whatever the device is showing. Safe to issue when idle.
    async fn stop(&self) -> Result<()>;
    /// Point the device at `target` (a network-reachable address it loads).
    async fn start(&self, target: &str) -> Result<()>;
    /// Reload the current content. Defaults to stop-then-start for devices
    /// with no live-reload primitive.
    async fn refresh(&self, target: &str) -> Result<()> {
        self.stop().await?;
        self.start(target).await
    }
    fn name(&self) -> &'static str;
}

/// Drives a cast-capable screen through the `catt` command-line tool.
pub struct CattDevice {
    device: String,
    timeout: Duration,
}

impl CattDevice {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn run_catt(&self, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new("catt");
        cmd.arg("-d").arg(&self.device).args(args);
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| anyhow!("catt {} timed out after {:?}", args.join(" "), self.timeout))?
            .map_err(|e| anyhow!("spawning catt {}: {e}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "catt {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DeviceCommander for CattDevice {
    async fn stop(&self) -> Result<()> {
        self.run_catt(&["stop"]).await
    }

    async fn start(&self, target: &str) -> Result<()> {
        self.run_catt(&["cast_site", target]).await
    }

    fn name(&self) -> &'static str {
        "catt"
    }
}

// --- Test helper ---
/// Records every issued command and can be primed to fail the next N calls.
pub struct MockDevice {
    pub calls: std::sync::Mutex<Vec<String>>,
    pub fail_next: std::sync::atomic::AtomicU32,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            fail_next: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn inject_failures(&self, n: u32) {
        self.fail_next.store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        use std::sync::atomic::Ordering;
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            bail!("injected failure on {call}");
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceCommander for &MockDevice {
    async fn stop(&self) -> Result<()> {
        self.record("stop".into())
    }

    async fn start(&self, target: &str) -> Result<()> {
        self.record(format!("start {target}"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
