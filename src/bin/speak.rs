//! speak: command-line front end for the text-to-speech client.
//!
//! Reads text from the argument list or stdin and writes the synthesized
//! audio to a file (timestamped name inside the output directory unless
//! a destination is given).

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agent_shell::config::AppConfig;
use agent_shell::launcher::api_key_from_env;
use agent_shell::tts::{TtsClient, TtsConfig, TtsOptions};

#[derive(Parser, Debug)]
#[command(name = "speak", about = "Synthesize speech via the OpenAI TTS API")]
struct Args {
    /// Text to speak (reads stdin when omitted)
    text: Option<String>,

    /// Destination file or directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TTS model override
    #[arg(long)]
    model: Option<String>,

    /// Voice preset override
    #[arg(long)]
    voice: Option<String>,

    /// Style/tone instructions for the voice
    #[arg(long)]
    instructions: Option<String>,

    /// Audio format (mp3 or wav)
    #[arg(long)]
    format: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();

    let api_key = match api_key_from_env() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            if std::io::stdin().read_to_string(&mut buf).is_err() {
                eprintln!("Error: failed to read text from stdin");
                std::process::exit(1);
            }
            buf
        }
    };

    let app = AppConfig::load(args.config.as_deref());
    let mut config = TtsConfig::resolve(
        args.model.as_deref(),
        args.voice.as_deref(),
        args.instructions.as_deref(),
        args.format.as_deref(),
        None,
    );

    // config.yaml sits beneath flags and the TTS_* environment variables.
    let env_unset = |key: &str| std::env::var(key).map_or(true, |v| v.is_empty());
    if args.model.is_none() && env_unset("TTS_MODEL") {
        config.model = app.tts.model.clone();
    }
    if args.voice.is_none() && env_unset("TTS_VOICE") {
        config.voice = app.tts.voice.clone();
    }
    if args.format.is_none() && env_unset("TTS_AUDIO_FORMAT") {
        config.audio_format = app.tts.format.to_lowercase();
    }

    let client = TtsClient::new(config, api_key);
    match client
        .synthesize_to_file(&text, args.out.as_deref(), &TtsOptions::default())
        .await
    {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
