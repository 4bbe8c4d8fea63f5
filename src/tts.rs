//! Text-to-speech client for the OpenAI speech endpoint.
//!
//! One synchronous request per call, no retry, no caching. Output goes
//! either straight to a file (timestamped name when given a directory or
//! nothing) or back to the caller as bytes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";
const DEFAULT_VOICE: &str = "coral";
const DEFAULT_FORMAT: &str = "mp3";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Resolved TTS configuration.
///
/// Each field resolves with precedence: explicit argument > environment
/// variable (`TTS_MODEL`, `TTS_VOICE`, `TTS_INSTRUCTIONS`,
/// `TTS_AUDIO_FORMAT`, `TTS_OUTPUT_DIR`) > built-in default.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub model: String,
    pub voice: String,
    pub instructions: Option<String>,
    pub audio_format: String,
    pub output_dir: PathBuf,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self::resolve(None, None, None, None, None)
    }
}

impl TtsConfig {
    pub fn resolve(
        model: Option<&str>,
        voice: Option<&str>,
        instructions: Option<&str>,
        audio_format: Option<&str>,
        output_dir: Option<&Path>,
    ) -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            model: model
                .map(String::from)
                .or_else(|| env("TTS_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            voice: voice
                .map(String::from)
                .or_else(|| env("TTS_VOICE"))
                .unwrap_or_else(|| DEFAULT_VOICE.into()),
            instructions: instructions.map(String::from).or_else(|| env("TTS_INSTRUCTIONS")),
            audio_format: audio_format
                .map(str::to_lowercase)
                .or_else(|| env("TTS_AUDIO_FORMAT").map(|v| v.to_lowercase()))
                .unwrap_or_else(|| DEFAULT_FORMAT.into()),
            output_dir: output_dir
                .map(PathBuf::from)
                .or_else(|| env("TTS_OUTPUT_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("generated")),
        }
    }
}

/// Per-call overrides; unset fields fall back to the client's config.
#[derive(Debug, Clone, Default)]
pub struct TtsOptions {
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub audio_format: Option<String>,
}

pub struct TtsClient {
    config: TtsConfig,
    api_key: String,
    base_url: String,
    client: Client,
}

impl TtsClient {
    pub fn new(config: TtsConfig, api_key: String) -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            api_key,
            base_url,
            client,
        }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    /// Synthesize speech and stream it to a file. With no destination, or
    /// a directory, a timestamped file name is generated. Returns the
    /// written path.
    pub async fn synthesize_to_file(
        &self,
        input_text: &str,
        dest: Option<&Path>,
        opts: &TtsOptions,
    ) -> Result<PathBuf, String> {
        check_input(input_text)?;

        let format = self.audio_format(opts);
        let path = resolve_output_path(dest, &self.config.output_dir, &format);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }

        let mut response = self.request(input_text, opts, &format).await?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;

        // Stream chunks to disk instead of buffering the whole clip.
        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| format!("Failed to read speech response: {e}"))?
        {
            written += chunk.len();
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        }
        file.flush()
            .await
            .map_err(|e| format!("Failed to flush {}: {e}", path.display()))?;

        info!("Wrote {written} bytes of speech to {}", path.display());
        Ok(path)
    }

    /// Synthesize speech and return the raw audio bytes.
    pub async fn synthesize_bytes(
        &self,
        input_text: &str,
        opts: &TtsOptions,
    ) -> Result<Vec<u8>, String> {
        check_input(input_text)?;

        let format = self.audio_format(opts);
        let response = self.request(input_text, opts, &format).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read speech response: {e}"))?;
        Ok(bytes.to_vec())
    }

    fn audio_format(&self, opts: &TtsOptions) -> String {
        opts.audio_format
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.config.audio_format.clone())
    }

    async fn request(
        &self,
        input_text: &str,
        opts: &TtsOptions,
        format: &str,
    ) -> Result<reqwest::Response, String> {
        let model = opts.model.as_deref().unwrap_or(&self.config.model);
        let voice = opts.voice.as_deref().unwrap_or(&self.config.voice);
        let instructions = opts
            .instructions
            .as_deref()
            .or(self.config.instructions.as_deref());

        let mut body = json!({
            "model": model,
            "voice": voice,
            "input": input_text,
            "response_format": format,
        });
        // Only sent when set; the endpoint rejects empty instructions.
        if let Some(instructions) = instructions {
            body["instructions"] = json!(instructions);
        }

        debug!("TTS request: model={model} voice={voice} format={format}");

        let url = format!("{}/v1/audio/speech", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Speech request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("Speech request failed (HTTP {status}): {detail}"));
        }

        Ok(response)
    }
}

fn check_input(input_text: &str) -> Result<(), String> {
    if input_text.trim().is_empty() {
        return Err("input_text must be a non-empty string".into());
    }
    Ok(())
}

/// Resolve where the audio lands. An explicit file path wins; a directory
/// (or nothing) gets a timestamped default name inside it.
fn resolve_output_path(dest: Option<&Path>, output_dir: &Path, audio_format: &str) -> PathBuf {
    let ext = match audio_format {
        "mp3" | "wav" => audio_format,
        _ => "mp3",
    };

    let timestamped = || {
        format!(
            "speech_{}.{ext}",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        )
    };

    match dest {
        None => output_dir.join(timestamped()),
        Some(path) if path.is_dir() => path.join(timestamped()),
        Some(path) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TtsClient {
        TtsClient::new(TtsConfig::default(), "sk-test".into())
    }

    #[tokio::test]
    async fn rejects_empty_input_before_any_request() {
        let client = client();
        let opts = TtsOptions::default();

        // Empty and all-whitespace input are rejected identically; no
        // network call happens (the dummy key would otherwise fail loudly).
        let err = client.synthesize_bytes("", &opts).await.unwrap_err();
        assert!(err.contains("non-empty"));

        let err = client.synthesize_bytes("   \n\t", &opts).await.unwrap_err();
        assert!(err.contains("non-empty"));

        let err = client
            .synthesize_to_file("", None, &opts)
            .await
            .unwrap_err();
        assert!(err.contains("non-empty"));

        let err = client
            .synthesize_to_file("  \t ", None, &opts)
            .await
            .unwrap_err();
        assert!(err.contains("non-empty"));
    }

    #[test]
    fn output_path_defaults_to_timestamped_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = resolve_output_path(None, dir.path(), "mp3");
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("speech_"));
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn directory_destination_gets_timestamped_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = resolve_output_path(Some(dir.path()), Path::new("generated"), "wav");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.to_string_lossy().ends_with(".wav"));
    }

    #[test]
    fn explicit_file_destination_is_kept() {
        let path = resolve_output_path(
            Some(Path::new("/tmp/out/voice.mp3")),
            Path::new("generated"),
            "mp3",
        );
        assert_eq!(path, Path::new("/tmp/out/voice.mp3"));
    }

    #[test]
    fn unknown_format_falls_back_to_mp3() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = resolve_output_path(None, dir.path(), "flac");
        assert!(path.to_string_lossy().ends_with(".mp3"));
    }

    #[test]
    fn explicit_arguments_win_over_defaults() {
        let config = TtsConfig::resolve(
            Some("gpt-tts-next"),
            Some("alloy"),
            Some("slow and calm"),
            Some("WAV"),
            Some(Path::new("/tmp/audio")),
        );
        assert_eq!(config.model, "gpt-tts-next");
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.instructions.as_deref(), Some("slow and calm"));
        assert_eq!(config.audio_format, "wav");
        assert_eq!(config.output_dir, Path::new("/tmp/audio"));
    }

    #[test]
    fn environment_wins_over_defaults_but_not_arguments() {
        // Sole test touching the TTS_* variables, to keep parallel runs safe.
        std::env::set_var("TTS_MODEL", "env-model");
        std::env::set_var("TTS_VOICE", "env-voice");
        std::env::set_var("TTS_AUDIO_FORMAT", "wav");

        let from_env = TtsConfig::resolve(None, None, None, None, None);
        assert_eq!(from_env.model, "env-model");
        assert_eq!(from_env.voice, "env-voice");
        assert_eq!(from_env.audio_format, "wav");

        let overridden = TtsConfig::resolve(Some("arg-model"), None, None, Some("mp3"), None);
        assert_eq!(overridden.model, "arg-model");
        assert_eq!(overridden.voice, "env-voice");
        assert_eq!(overridden.audio_format, "mp3");

        std::env::remove_var("TTS_MODEL");
        std::env::remove_var("TTS_VOICE");
        std::env::remove_var("TTS_AUDIO_FORMAT");

        let defaults = TtsConfig::resolve(None, None, None, None, None);
        assert_eq!(defaults.model, DEFAULT_MODEL);
        assert_eq!(defaults.voice, DEFAULT_VOICE);
        assert_eq!(defaults.audio_format, DEFAULT_FORMAT);
        assert_eq!(defaults.instructions, None);
    }
}
