//! Command line front end for audio-switcher.

use anyhow::Context;
use audio_switcher::audio::Apartment;
use audio_switcher::{
    logging, with_system_audio, AudioControl, AudioError, PolicyVariant, SwitcherConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::process::ExitCode;

/// Inspect and switch Windows playback devices
#[derive(Parser, Debug)]
#[command(name = "audio-switcher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter (e.g. `debug`, `audio_switcher=trace`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// IPolicyConfig layout: modern or vista
    #[arg(long, global = true)]
    policy: Option<PolicyVariant>,

    /// COM apartment: mta or sta
    #[arg(long, global = true)]
    apartment: Option<Apartment>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active playback devices
    List,

    /// Show the default playback device
    Default,

    /// Make a device the default for every role
    SetDefault {
        /// Endpoint ID as printed by `list`
        id: String,
    },

    /// Mute or unmute the default playback device
    Mute {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Mute or unmute a device by ID
    MuteDevice {
        id: String,
        #[arg(value_enum)]
        state: Switch,
    },

    /// Show the shared-mode mix format of a device
    Format { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn muted(self) -> bool {
        matches!(self, Switch::On)
    }
}

/// Printed output plus whether the operation reported success.
struct Outcome {
    output: Value,
    success: bool,
}

impl Outcome {
    fn flag(success: bool) -> Self {
        Self {
            output: json!({ "success": success }),
            success,
        }
    }
}

fn run(command: &Command, audio: &dyn AudioControl) -> Result<Outcome, AudioError> {
    let outcome = match command {
        Command::List => Outcome {
            output: json!(audio.list_devices()?),
            success: true,
        },
        Command::Default => {
            let device = audio.default_device();
            Outcome {
                success: device.is_some(),
                output: json!(device),
            }
        }
        Command::SetDefault { id } => Outcome::flag(audio.set_default_device(id)?),
        Command::Mute { state } => Outcome::flag(audio.set_default_playback_mute(state.muted())),
        Command::MuteDevice { id, state } => {
            Outcome::flag(audio.mute_device_by_id(id, state.muted()))
        }
        Command::Format { id } => {
            let format = audio.format_info_by_id(id);
            Outcome {
                success: format.valid,
                output: json!({
                    "format": format,
                    "description": format.to_string(),
                    "muted": audio.mute_state_by_id(id),
                }),
            }
        }
    };
    Ok(outcome)
}

/// Environment settings overridden by command line options.
fn load_config(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> SwitcherConfig {
    let mut config = SwitcherConfig::from_lookup(lookup);
    if let Some(level) = &cli.log_level {
        config.log_level = Some(level.clone());
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(apartment) = cli.apartment {
        config.apartment = apartment;
    }
    config
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Must precede load_config, which warns about invalid settings
    logging::init(cli.log_level.as_deref());
    let config = load_config(&cli, |key| std::env::var(key).ok());

    let outcome = with_system_audio(&config, |audio| run(&cli.command, audio))
        .context("audio device operation failed")?;

    println!("{}", serde_json::to_string_pretty(&outcome.output)?);

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
