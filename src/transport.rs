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
use std::{fmt, io, time::Duration};

use crate::encoder::Report;

pub mod console;
mod midir;
pub mod mock;

/// The device name that selects the console transport.
pub const CONSOLE_DEVICE: &str = "console";

/// The reference link takes one report every 10ms.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(10);

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MIDI init error: {0}")]
    Init(#[from] ::midir::InitError),

    #[error("MIDI port error: {0}")]
    PortInfo(#[from] ::midir::PortInfoError),

    #[error("unable to connect to {0}: {1}")]
    Connect(String, String),

    #[error("MIDI send error: {0}")]
    Send(#[from] ::midir::SendError),

    #[error("no device found with name {0}")]
    NotFound(String),

    #[error("found too many devices that match ({0}), use a less ambiguous device name")]
    Ambiguous(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("transport rejected report: {0}")]
    Rejected(String),
}

/// Carries reports to the host. Implementations own framing and timing; the trigger loop only
/// asks whether a report can go out and hands it over.
pub trait Transport: fmt::Display {
    /// Services the link. Called once per tick whether or not anything is sent.
    fn poll(&mut self) {}

    /// Returns true if a new report may be submitted.
    fn is_ready(&self) -> bool;

    /// Submits a report of one or two packets.
    fn send(&mut self, report: &Report) -> Result<(), TransportError>;
}

/// Lists the MIDI output ports known to midir.
pub fn list_devices() -> Result<Vec<String>, TransportError> {
    midir::list()
}

/// Gets a transport by device name. `mock` names get a mock transport and `console` writes to
/// stdout. Anything else is matched against the MIDI output ports.
pub fn get_transport(
    device: &str,
    report_interval: Duration,
) -> Result<Box<dyn Transport>, TransportError> {
    if device.starts_with("mock") {
        return Ok(Box::new(mock::Transport::get(device)));
    }
    if device == CONSOLE_DEVICE {
        return Ok(Box::new(console::Transport::stdout()));
    }

    Ok(Box::new(midir::get(device, report_interval)?))
}
