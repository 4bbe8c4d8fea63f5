//! agent-shell-rs: desktop AI agent shell.
//!
//! Boots the transcription and agent microservices as health-gated
//! background processes, runs the widget UI in the foreground, and
//! guarantees cleanup of every child on the way out. Also carries the
//! OpenAI text-to-speech client and the YAML settings loader the rest
//! of the app shares.

pub mod config;
pub mod explorer;
pub mod launcher;
pub mod registry;
pub mod spawner;
pub mod tts;
