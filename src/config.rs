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
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::{channel::DEFAULT_SUSTAIN_TICKS, engine, watchdog};

pub mod channels;
pub mod detector;
pub mod error;
pub mod transport;

pub use self::error::ConfigError;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// The reference configuration, spelled out.
pub const DEFAULT_CONFIG: &str = r#"# padtrigger configuration
channels:
  # One note per input, in input order.
  notes: [38, 41, 36, 40, 37, 46, 45, 47, 48, 43, 39, 42, 44]
  # Inputs 0-4 go straight to the ADC, the rest through the multiplexer.
  direct_inputs: 5
  midi_channel: 1

detector:
  threshold: 10
  drop_shift: 4
  velocity_shift: 3

scheduler:
  sustain_ticks: 30

tick_interval: 1ms
watchdog_timeout: 1s

transport:
  device: console
  report_interval: 10ms

# recording: /path/to/capture.wav
"#;

/// Parses a duration string such as `10ms` or `1s`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Into::into)
        .map_err(|e| ConfigError::Duration(value.to_string(), e.to_string()))
}

/// Scheduler settings.
#[derive(Deserialize, Clone, Default)]
pub struct Scheduler {
    /// How many services a note sounds before its note-off (default: 30).
    sustain_ticks: Option<u8>,
}

impl Scheduler {
    /// Returns the sustain in scheduler services.
    pub fn sustain_ticks(&self) -> Result<u8, ConfigError> {
        match self.sustain_ticks.unwrap_or(DEFAULT_SUSTAIN_TICKS) {
            0 => Err(ConfigError::invalid(
                "sustain_ticks",
                "a note must sound for at least one tick",
            )),
            sustain_ticks => Ok(sustain_ticks),
        }
    }
}

/// The top level trigger configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Trigger {
    #[serde(default)]
    channels: channels::Channels,

    #[serde(default)]
    detector: detector::Detector,

    #[serde(default)]
    scheduler: Scheduler,

    /// The time between ticks of the trigger loop. Zero runs as fast as possible.
    tick_interval: Option<String>,

    /// How long the loop may stall before it is reset. Zero disables the watchdog.
    watchdog_timeout: Option<String>,

    /// Priority for the trigger loop thread, 0-99.
    thread_priority: Option<u8>,

    #[serde(default)]
    transport: transport::Transport,

    /// A multichannel WAV capture to replay as the analog input.
    recording: Option<String>,

    /// The directory relative recording paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Trigger {
    /// Loads a trigger configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Trigger, ConfigError> {
        let mut trigger = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Trigger>()?;
        trigger.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(trigger)
    }

    pub fn channels(&self) -> &channels::Channels {
        &self.channels
    }

    pub fn detector(&self) -> &detector::Detector {
        &self.detector
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &transport::Transport {
        &self.transport
    }

    /// Returns the tick interval (default: 1ms). None means no pacing.
    pub fn tick_interval(&self) -> Result<Option<Duration>, ConfigError> {
        optional_duration(self.tick_interval.as_deref(), DEFAULT_TICK_INTERVAL)
    }

    /// Returns the watchdog timeout (default: 1s). None means no watchdog.
    pub fn watchdog_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        optional_duration(self.watchdog_timeout.as_deref(), watchdog::DEFAULT_TIMEOUT)
    }

    pub fn thread_priority(&self) -> Result<Option<u8>, ConfigError> {
        match self.thread_priority {
            Some(priority) if priority > 99 => Err(ConfigError::invalid(
                "thread_priority",
                format!("{} is outside 0-99", priority),
            )),
            priority => Ok(priority),
        }
    }

    /// Returns the recording path, resolved against the config file's directory.
    pub fn recording(&self) -> Option<PathBuf> {
        self.recording
            .as_ref()
            .map(|recording| self.base_dir.join(recording))
    }

    /// Validates the configuration and turns it into trigger loop options.
    pub fn options(&self) -> Result<engine::Options, ConfigError> {
        let notes = self.channels.notes()?;
        let direct_inputs = self.channels.direct_inputs(notes.len())?;

        let tick_interval = self.tick_interval()?;
        let watchdog_timeout = self.watchdog_timeout()?;
        if let (Some(tick_interval), Some(watchdog_timeout)) = (tick_interval, watchdog_timeout) {
            // Every tick kicks the watchdog, so it has to outlast at least one tick.
            if tick_interval >= watchdog_timeout {
                return Err(ConfigError::invalid(
                    "watchdog_timeout",
                    format!(
                        "{:?} must be longer than the tick interval of {:?}",
                        watchdog_timeout, tick_interval
                    ),
                ));
            }
        }

        Ok(engine::Options {
            notes,
            direct_inputs,
            midi_channel: self.channels.midi_channel()?,
            detector: self.detector.settings()?,
            sustain_ticks: self.scheduler.sustain_ticks()?,
            tick_interval,
            watchdog_timeout,
            thread_priority: self.thread_priority()?,
        })
    }
}

fn optional_duration(
    value: Option<&str>,
    default: Duration,
) -> Result<Option<Duration>, ConfigError> {
    let duration = match value {
        Some(value) => parse_duration(value)?,
        None => default,
    };
    Ok(if duration.is_zero() {
        None
    } else {
        Some(duration)
    })
}
