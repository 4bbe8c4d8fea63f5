//! Health-checked service spawning.
//!
//! Starts a child process with an environment overlay merged onto the
//! inherited environment, then optionally polls an HTTP health endpoint
//! until it answers 200 or the attempt budget runs out. Timeout is
//! reported as a typed readiness, never as an error: the launcher keeps
//! going and assumes eventual readiness, as the original system did.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::registry::ProcessRegistry;

/// Launch parameters for one managed service. Used once per spawn.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub command: Vec<String>,
    pub cwd: PathBuf,
    /// Overlay keys win over the inherited environment.
    pub env: Vec<(String, String)>,
    pub health_url: Option<String>,
}

/// Outcome of the readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Health polling parameters. Defaults match the original launcher:
/// 30 attempts, 1s request timeout, 1s spacing, 2s settle without a URL.
#[derive(Debug, Clone)]
pub struct HealthPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub interval: Duration,
    pub settle: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            attempt_timeout: Duration::from_secs(1),
            interval: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

/// Spawn a child process from a spec. The overlay is applied with
/// `Command::envs`, so overlay keys replace inherited values.
pub fn spawn(spec: &ServiceSpec) -> Result<Child, String> {
    let Some((program, args)) = spec.command.split_first() else {
        return Err(format!("[{}] empty command", spec.name));
    };

    Command::new(program)
        .args(args)
        .current_dir(&spec.cwd)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .spawn()
        .map_err(|e| format!("[{}] failed to spawn {program}: {e}", spec.name))
}

/// Poll a health URL until it returns 200 or attempts are exhausted.
/// Stops on the first success.
pub async fn wait_for_health(client: &Client, url: &str, policy: &HealthPolicy) -> Readiness {
    for attempt in 1..=policy.max_attempts {
        let request = client.get(url).timeout(policy.attempt_timeout).send();
        match request.await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                debug!("Health check {url} passed on attempt {attempt}");
                return Readiness::Ready;
            }
            Ok(resp) => debug!("Health check {url} attempt {attempt}: HTTP {}", resp.status()),
            Err(e) => debug!("Health check {url} attempt {attempt}: {e}"),
        }
        tokio::time::sleep(policy.interval).await;
    }
    Readiness::TimedOut
}

/// Start a service in the background: spawn, register with the registry,
/// then gate on its health endpoint (or a fixed settle time without one).
///
/// A health-check timeout is logged and returned, not raised — the caller
/// decides whether to escalate.
pub async fn start_service(
    registry: &mut ProcessRegistry,
    client: &Client,
    spec: &ServiceSpec,
    policy: &HealthPolicy,
) -> Result<Readiness, String> {
    info!("[{}] Starting...", spec.name);

    let child = spawn(spec)?;
    registry.register(&spec.name, child);

    let readiness = match &spec.health_url {
        Some(url) => wait_for_health(client, url, policy).await,
        None => {
            tokio::time::sleep(policy.settle).await;
            Readiness::Ready
        }
    };

    match readiness {
        Readiness::Ready => info!("[{}] Ready", spec.name),
        Readiness::TimedOut => warn!("[{}] Started (health check timeout)", spec.name),
    }

    Ok(readiness)
}
