use anyhow::{Context, Result};
use clap::Parser;
use replay_voice_core::{ComServerEntry, RegistrationScript, VoiceRegistryEntry};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "replay-voice-register")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate the registry script that installs the Replay Voice engine")]
struct Args {
    /// TOML manifest with [server] and [voice] tables; defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Path of the engine DLL recorded under InprocServer32
    #[arg(long, value_name = "PATH")]
    dll: Option<PathBuf>,

    /// Only emit the voice token, not the COM class
    #[arg(long)]
    voice_only: bool,

    /// Write the script here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    replay_voice_sapi::logging::init();
    let args = Args::parse();

    let mut script = match &args.manifest {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read manifest {}", path.display()))?;
            RegistrationScript::from_toml_str(&text)
                .with_context(|| format!("Invalid manifest {}", path.display()))?
        }
        None => RegistrationScript::new(ComServerEntry::default(), VoiceRegistryEntry::default()),
    };

    if let Some(dll) = &args.dll {
        let dll = std::path::absolute(dll)
            .with_context(|| format!("Failed to resolve {}", dll.display()))?;
        let server = script.server.get_or_insert_with(|| ComServerEntry {
            clsid: script.voice.clsid,
            ..ComServerEntry::default()
        });
        server.server_path = dll.display().to_string();
    }

    if args.voice_only {
        script.server = None;
    }

    script.validate()?;

    match &args.out {
        Some(path) => {
            script.write_to(path)?;
            info!("Import with: reg import {}", path.display());
        }
        None => print!("{}", script.render()),
    }

    Ok(())
}
