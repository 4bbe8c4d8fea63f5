//! Application settings loaded from YAML.
//!
//! Mirrors the config.yaml layout of the Python AI-agent desktop app:
//! nested sections with named defaults for every field, unknown keys
//! ignored, parse failures falling back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    pub widget_opacity: f64,
    pub widget_width: u32,
    pub widget_height: u32,
    pub chat_width: u32,
    pub chat_height: u32,
    pub always_on_top: bool,
    pub font_size: u32,
    pub show_token_usage: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            widget_opacity: 0.95,
            widget_width: 60,
            widget_height: 60,
            chat_width: 600,
            chat_height: 700,
            always_on_top: true,
            font_size: 13,
            show_token_usage: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    pub model: String,
    pub language: String,
    pub sample_rate: u32,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-transcribe".into(),
            language: "en".into(),
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsSection {
    pub model: String,
    pub voice: String,
    pub format: String,
}

impl Default for TtsSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini-tts".into(),
            voice: "coral".into(),
            format: "mp3".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub enabled_tools: Vec<String>,
    pub terminal_permission_required: bool,
    pub filesystem_permission_required: bool,
    pub project_root: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled_tools: vec![
                "memory".into(),
                "todos".into(),
                "filesystem".into(),
                "terminal".into(),
                "documents".into(),
                "visualization".into(),
                "web".into(),
                "image_generation".into(),
            ],
            terminal_permission_required: false,
            filesystem_permission_required: false,
            project_root: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent_name: String,
    pub user_id: String,
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub transcribe: TranscribeConfig,
    pub tts: TtsSection,
    pub embedding: EmbeddingConfig,
    pub tools: ToolsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent_name: "Djasha".into(),
            user_id: "default_user".into(),
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            transcribe: TranscribeConfig::default(),
            tts: TtsSection::default(),
            embedding: EmbeddingConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/ai-agent/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/ai-agent/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_yml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_when_file_missing() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/config.yaml")));
        assert_eq!(config.agent_name, "Djasha");
        assert_eq!(config.ui.theme, "dark");
        assert_eq!(config.transcribe.sample_rate, 16000);
        assert_eq!(config.tts.voice, "coral");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.tools.enabled_tools.len(), 8);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config("ui:\n  theme: light\n");
        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config.ui.theme, "light");
        // Everything else stays at its documented default.
        assert_eq!(config.ui.widget_opacity, 0.95);
        assert_eq!(config.ui.chat_width, 600);
        assert_eq!(config.agent_name, "Djasha");
        assert_eq!(config.tts.model, "gpt-4o-mini-tts");
    }

    #[test]
    fn malformed_yaml_falls_back_to_defaults() {
        let file = write_config("ui: [not: a, mapping\n  ::::");
        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config.ui.theme, "dark");
        assert_eq!(config.user_id, "default_user");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file = write_config("unknown_section:\n  foo: 1\nagent_name: Atlas\n");
        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config.agent_name, "Atlas");
        assert_eq!(config.ui.theme, "dark");
    }
}
