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
    fmt,
    time::{Duration, Instant},
};

use midir::{MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;
use tracing::{debug, info};

use super::TransportError;
use crate::encoder::Report;

/// A transport that writes to a MIDI output port. Each packet goes out as a plain three byte
/// MIDI message; the leading code index byte only matters to packet based links.
pub struct Transport {
    name: String,
    connection: MidiOutputConnection,
    report_interval: Duration,
    last_report: Option<Instant>,
}

impl super::Transport for Transport {
    fn is_ready(&self) -> bool {
        match self.last_report {
            Some(last_report) => last_report.elapsed() >= self.report_interval,
            None => true,
        }
    }

    fn send(&mut self, report: &Report) -> Result<(), TransportError> {
        for packet in report.packets() {
            let message = &packet[1..];
            if let Ok(event) = LiveEvent::parse(message) {
                debug!(
                    device = self.name,
                    event = format!("{:?}", event),
                    "Sending MIDI event."
                );
            }
            self.connection.send(message)?;
        }
        self.last_report = Some(Instant::now());

        Ok(())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Output)", self.name)
    }
}

/// Lists the names of midir output ports, sorted.
pub fn list() -> Result<Vec<String>, TransportError> {
    let output = MidiOutput::new("padtrigger output listing")?;
    let mut names = output
        .ports()
        .iter()
        .map(|port| output.port_name(port))
        .collect::<Result<Vec<String>, _>>()?;
    names.sort();
    Ok(names)
}

/// Connects to the single output port whose name contains `name`.
pub fn get(name: &str, report_interval: Duration) -> Result<Transport, TransportError> {
    let output = MidiOutput::new("padtrigger output")?;

    let mut matches = Vec::new();
    for port in output.ports() {
        let port_name = output.port_name(&port)?;
        if port_name.contains(name) {
            matches.push((port_name, port));
        }
    }

    if matches.is_empty() {
        return Err(TransportError::NotFound(name.to_string()));
    }
    if matches.len() > 1 {
        return Err(TransportError::Ambiguous(
            matches
                .iter()
                .map(|(port_name, _)| port_name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        ));
    }

    // We've verified that there's only one element in the vector, so this should be safe.
    let (port_name, port) = matches.swap_remove(0);
    let connection = output
        .connect(&port, "padtrigger")
        .map_err(|e| TransportError::Connect(port_name.clone(), e.to_string()))?;

    info!(
        device = port_name,
        report_interval = format!("{:?}", report_interval),
        "Connected to MIDI output."
    );

    Ok(Transport {
        name: port_name,
        connection,
        report_interval,
        last_report: None,
    })
}
