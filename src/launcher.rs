//! Launcher orchestration: runs all services and manages their lifecycle.
//!
//! Sequence: start the transcribe service and the agent service in the
//! background (each gated on its /health endpoint), then run the widget
//! UI in the foreground and block until it exits. Cleanup runs on every
//! path out — normal exit, error, or interrupt — through the shared
//! registry's idempotent shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::registry::ProcessRegistry;
use crate::spawner::{self, HealthPolicy, Readiness, ServiceSpec};

pub const TRANSCRIBE_PORT: u16 = 6001;
pub const AGENT_PORT: u16 = 6002;

/// Name of the required credential variable.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Read the required credential from the environment.
pub fn api_key_from_env() -> Result<String, String> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(format!("{API_KEY_VAR} environment variable is not set")),
    }
}

/// Background service descriptors, in start order.
pub fn service_specs(root: &Path, api_key: &str) -> Vec<ServiceSpec> {
    vec![
        ServiceSpec {
            name: "Transcribe Service".into(),
            command: vec!["python".into(), "app.py".into()],
            cwd: root.join("transcribe"),
            env: vec![
                (API_KEY_VAR.into(), api_key.into()),
                ("PORT".into(), TRANSCRIBE_PORT.to_string()),
            ],
            health_url: Some(format!("http://127.0.0.1:{TRANSCRIBE_PORT}/health")),
        },
        ServiceSpec {
            name: "Agent Service".into(),
            command: vec![
                "python".into(),
                "app.py".into(),
                "--mode".into(),
                "service".into(),
                "--port".into(),
                AGENT_PORT.to_string(),
            ],
            cwd: root.join("agent-main"),
            env: vec![(API_KEY_VAR.into(), api_key.into())],
            health_url: Some(format!("http://127.0.0.1:{AGENT_PORT}/health")),
        },
    ]
}

/// Foreground widget descriptor: receives both service base URLs and the
/// repo root prepended to its module search path.
pub fn widget_spec(root: &Path, inherited_pythonpath: Option<&str>) -> ServiceSpec {
    let sep = if cfg!(windows) { ';' } else { ':' };
    let pythonpath = match inherited_pythonpath {
        Some(existing) if !existing.is_empty() => {
            format!("{}{sep}{existing}", root.display())
        }
        _ => root.display().to_string(),
    };

    ServiceSpec {
        name: "Widget".into(),
        command: vec!["python".into(), "widget.py".into()],
        cwd: root.join("widget"),
        env: vec![
            ("PYTHONPATH".into(), pythonpath),
            (
                "TRANSCRIBE_URL".into(),
                format!("http://127.0.0.1:{TRANSCRIBE_PORT}/upload"),
            ),
            ("AGENT_URL".into(), format!("http://127.0.0.1:{AGENT_PORT}")),
        ],
        health_url: None,
    }
}

pub struct Launcher {
    root: PathBuf,
    api_key: String,
    registry: Arc<Mutex<ProcessRegistry>>,
    policy: HealthPolicy,
    client: Client,
}

impl Launcher {
    pub fn new(root: PathBuf, api_key: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(1))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            root,
            api_key,
            registry: Arc::new(Mutex::new(ProcessRegistry::new())),
            policy: HealthPolicy::default(),
            client,
        }
    }

    /// Shared registry handle, for shutdown from the signal path.
    pub fn registry(&self) -> Arc<Mutex<ProcessRegistry>> {
        self.registry.clone()
    }

    /// Start both background services, then run the widget UI in the
    /// foreground until it exits. Always shuts the registry down before
    /// returning, on the error path included.
    pub async fn run(&self) -> Result<(), String> {
        let result = self.run_inner().await;
        self.registry.lock().await.shutdown().await;
        result
    }

    async fn run_inner(&self) -> Result<(), String> {
        info!("Starting AI Agent System");

        for spec in service_specs(&self.root, &self.api_key) {
            let mut registry = self.registry.lock().await;
            let readiness =
                spawner::start_service(&mut registry, &self.client, &spec, &self.policy).await?;
            if readiness == Readiness::TimedOut {
                // Deliberate: keep going and assume eventual readiness.
                warn!("[{}] proceeding without confirmed readiness", spec.name);
            }
        }

        info!("All services up:");
        info!("  - Transcribe: http://localhost:{TRANSCRIBE_PORT}");
        info!("  - Agent:      http://localhost:{AGENT_PORT}");

        info!("Starting Widget UI...");
        let spec = widget_spec(&self.root, std::env::var("PYTHONPATH").ok().as_deref());
        let mut widget = spawner::spawn(&spec)?;

        let status = widget
            .wait()
            .await
            .map_err(|e| format!("Waiting for widget failed: {e}"))?;
        info!("Widget closed ({status}). Shutting down services...");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_specs_carry_credential_and_ports() {
        let specs = service_specs(Path::new("/repo"), "sk-test");
        assert_eq!(specs.len(), 2);

        let transcribe = &specs[0];
        assert_eq!(transcribe.cwd, Path::new("/repo/transcribe"));
        assert_eq!(
            transcribe.health_url.as_deref(),
            Some("http://127.0.0.1:6001/health")
        );
        assert!(transcribe
            .env
            .contains(&("OPENAI_API_KEY".into(), "sk-test".into())));
        assert!(transcribe.env.contains(&("PORT".into(), "6001".into())));

        let agent = &specs[1];
        assert_eq!(agent.cwd, Path::new("/repo/agent-main"));
        assert_eq!(
            agent.health_url.as_deref(),
            Some("http://127.0.0.1:6002/health")
        );
        assert!(agent.command.contains(&"--port".to_string()));
        assert!(agent.command.contains(&"6002".to_string()));
    }

    #[test]
    fn widget_spec_injects_service_urls() {
        let spec = widget_spec(Path::new("/repo"), None);
        assert_eq!(spec.cwd, Path::new("/repo/widget"));
        assert!(spec.health_url.is_none());
        assert!(spec.env.contains(&(
            "TRANSCRIBE_URL".into(),
            "http://127.0.0.1:6001/upload".into()
        )));
        assert!(spec
            .env
            .contains(&("AGENT_URL".into(), "http://127.0.0.1:6002".into())));
    }

    #[test]
    fn widget_spec_prepends_root_to_module_search_path() {
        let sep = if cfg!(windows) { ';' } else { ':' };

        let fresh = widget_spec(Path::new("/repo"), None);
        let path_of = |spec: &ServiceSpec| {
            spec.env
                .iter()
                .find(|(k, _)| k == "PYTHONPATH")
                .map(|(_, v)| v.clone())
                .expect("PYTHONPATH set")
        };
        assert_eq!(path_of(&fresh), "/repo");

        let merged = widget_spec(Path::new("/repo"), Some("/elsewhere"));
        assert_eq!(path_of(&merged), format!("/repo{sep}/elsewhere"));
    }

    #[test]
    fn missing_credential_is_an_error() {
        // Sole test touching OPENAI_API_KEY, to keep parallel runs safe.
        std::env::remove_var(API_KEY_VAR);
        assert!(api_key_from_env().is_err());

        std::env::set_var(API_KEY_VAR, "sk-test");
        assert_eq!(api_key_from_env().unwrap(), "sk-test");

        std::env::set_var(API_KEY_VAR, "   ");
        assert!(api_key_from_env().is_err());
        std::env::remove_var(API_KEY_VAR);
    }

    #[tokio::test]
    async fn launcher_starts_with_empty_registry() {
        // Nothing may be spawned before run() is invoked: a missing
        // credential aborts in main before any child exists.
        let launcher = Launcher::new(PathBuf::from("/repo"), "sk-test".into());
        assert!(launcher.registry().lock().await.is_empty());
    }
}
