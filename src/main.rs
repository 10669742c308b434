// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{crate_version, Parser, Subcommand};
use padtrigger::{
    config::{Trigger, DEFAULT_CONFIG},
    engine::{Engine, Options, Stats, StopHandle},
    sampler::{BankedSampler, RecordedFrontend},
    transport::{self, CONSOLE_DEVICE},
};
use tracing::info;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=drum trigger to MIDI

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/padtrigger
ExecStart=/usr/local/bin/padtrigger start "$PADTRIGGER_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=padtrigger.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Turns drum pad hits into MIDI notes."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI output devices.
    Devices {},
    /// Start will run the trigger loop against the configured recording and transport.
    Start {
        /// The path to the trigger config.
        config_path: String,
    },
    /// Replays a recording as fast as possible and prints the resulting notes.
    Simulate {
        /// The path to the trigger config.
        config_path: String,
        /// The multichannel WAV capture to replay.
        recording: String,
    },
    /// Prints the default configuration to stdout.
    DefaultConfig {},
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

/// Builds the trigger loop on the current thread and runs it to completion. The transport is
/// opened here because MIDI connections stay on the thread that made them.
fn replay(
    options: Options,
    recording: PathBuf,
    device: String,
    report_interval: Duration,
    stop: StopHandle,
) -> Result<Stats, String> {
    let frontend = RecordedFrontend::open(&recording, options.direct_inputs)
        .map_err(|e| format!("unable to load {}: {}", recording.display(), e))?;
    frontend
        .check_pacing(options.tick_interval)
        .map_err(|e| format!("{}: {}", recording.display(), e))?;
    let sampler = BankedSampler::new(frontend, options.notes.len(), options.direct_inputs);
    let transport =
        transport::get_transport(&device, report_interval).map_err(|e| e.to_string())?;

    let mut engine = Engine::new(&options, Box::new(sampler), transport);
    Ok(engine.run(&stop))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = transport::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start { config_path } => {
            let trigger = Trigger::deserialize(Path::new(&config_path))?;
            let recording = trigger
                .recording()
                .ok_or("no recording configured, nothing to sample")?;
            let options = trigger.options()?;
            let device = trigger.transport().device().to_string();
            let report_interval = trigger.transport().report_interval()?;

            let stop = StopHandle::new();
            let loop_stop = stop.clone();
            let mut trigger_loop = tokio::task::spawn_blocking(move || {
                replay(options, recording, device, report_interval, loop_stop)
            });

            let stats = tokio::select! {
                result = &mut trigger_loop => result??,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping trigger loop.");
                    stop.stop();
                    trigger_loop.await??
                }
            };
            println!("{}", stats);
        }
        Commands::Simulate {
            config_path,
            recording,
        } => {
            let trigger = Trigger::deserialize(Path::new(&config_path))?;
            let options = Options {
                tick_interval: None,
                watchdog_timeout: None,
                thread_priority: None,
                ..trigger.options()?
            };

            let stats = tokio::task::spawn_blocking(move || {
                replay(
                    options,
                    PathBuf::from(recording),
                    CONSOLE_DEVICE.to_string(),
                    Duration::ZERO,
                    StopHandle::new(),
                )
            })
            .await??;
            println!("{}", stats);
        }
        Commands::DefaultConfig {} => {
            print!("{}", DEFAULT_CONFIG)
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
