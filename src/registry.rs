//! Process registry with idempotent shutdown.
//!
//! Owns every background child spawned during a run. Shutdown drains the
//! registry, so invoking it again (signal handler plus normal exit path)
//! is a no-op. Per-child failures are absorbed: a process that already
//! exited, or one that refuses to die, must not block cleanup of the rest.

use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, info, warn};

pub struct ManagedProcess {
    pub name: String,
    child: Child,
}

pub struct ProcessRegistry {
    children: Vec<ManagedProcess>,
    grace: Duration,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::with_grace(Duration::from_secs(3))
    }

    /// Registry with a custom graceful-termination window.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            children: Vec::new(),
            grace,
        }
    }

    pub fn register(&mut self, name: &str, child: Child) {
        debug!("Registered process '{name}' (pid {:?})", child.id());
        self.children.push(ManagedProcess {
            name: name.to_string(),
            child,
        });
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Terminate every registered child: graceful stop first, forced kill
    /// after the grace window. Draining makes repeated calls no-ops, and
    /// no per-child error escapes.
    pub async fn shutdown(&mut self) {
        if self.children.is_empty() {
            return;
        }

        info!("Shutting down services...");
        for mut managed in self.children.drain(..) {
            terminate(&managed.name, &mut managed.child, self.grace).await;
        }
        info!("All services stopped.");
    }
}

async fn terminate(name: &str, child: &mut Child, grace: Duration) {
    // Child already reaped: nothing to do.
    if matches!(child.try_wait(), Ok(Some(_))) {
        debug!("Process '{name}' already exited");
        return;
    }

    request_graceful_stop(name, child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!("Process '{name}' exited with {status}");
            return;
        }
        Ok(Err(e)) => warn!("Waiting for '{name}' failed: {e}"),
        Err(_) => warn!("Process '{name}' did not stop within {grace:?}, killing"),
    }

    if let Err(e) = child.kill().await {
        warn!("Failed to kill '{name}': {e}");
    }
}

#[cfg(unix)]
fn request_graceful_stop(name: &str, child: &mut Child) {
    match child.id() {
        Some(pid) => {
            // SIGTERM gives the service a chance to flush and exit cleanly.
            let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if ret != 0 {
                warn!(
                    "SIGTERM to '{name}' (pid {pid}) failed: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
        None => debug!("Process '{name}' has no pid, skipping SIGTERM"),
    }
}

#[cfg(not(unix))]
fn request_graceful_stop(name: &str, child: &mut Child) {
    // No portable graceful signal; fall through to the kill path.
    if let Err(e) = child.start_kill() {
        warn!("Failed to stop '{name}': {e}");
    }
}
