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
use std::time::Duration;

use serde::Deserialize;

use super::{error::ConfigError, parse_duration};
use crate::transport::{CONSOLE_DEVICE, DEFAULT_REPORT_INTERVAL};

/// A YAML representation of the transport configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Transport {
    /// The transport device: `console`, a `mock` name, or part of a MIDI output port name.
    device: Option<String>,

    /// The minimum time between reports on a MIDI output (default: 10ms).
    report_interval: Option<String>,
}

impl Transport {
    /// Returns the device from the configuration (default: console).
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(CONSOLE_DEVICE)
    }

    /// Returns the report interval from the configuration.
    pub fn report_interval(&self) -> Result<Duration, ConfigError> {
        match &self.report_interval {
            Some(report_interval) => parse_duration(report_interval),
            None => Ok(DEFAULT_REPORT_INTERVAL),
        }
    }
}
