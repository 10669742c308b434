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
    io::{self, Write},
};

use midly::{live::LiveEvent, MidiMessage};

use super::TransportError;
use crate::encoder::Report;

/// Writes every report as a line of hex followed by the decoded events. Always ready.
pub struct Transport<W: Write> {
    out: W,
    reports: usize,
}

impl Transport<io::Stdout> {
    pub fn stdout() -> Transport<io::Stdout> {
        Transport::new(io::stdout())
    }
}

impl<W: Write> Transport<W> {
    pub fn new(out: W) -> Transport<W> {
        Transport { out, reports: 0 }
    }

    /// The number of reports written so far.
    pub fn reports(&self) -> usize {
        self.reports
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Renders one packet's MIDI message for people to read.
fn describe(packet: &[u8]) -> String {
    match LiveEvent::parse(&packet[1..]) {
        Ok(LiveEvent::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        }) => format!(
            "note on ch={} key={} vel={}",
            channel.as_int() + 1,
            key.as_int(),
            vel.as_int()
        ),
        Ok(LiveEvent::Midi {
            channel,
            message: MidiMessage::NoteOff { key, .. },
        }) => format!("note off ch={} key={}", channel.as_int() + 1, key.as_int()),
        Ok(event) => format!("{:?}", event),
        Err(e) => format!("unparseable ({})", e),
    }
}

impl<W: Write> super::Transport for Transport<W> {
    fn is_ready(&self) -> bool {
        true
    }

    fn send(&mut self, report: &Report) -> Result<(), TransportError> {
        let events = report
            .packets()
            .map(describe)
            .collect::<Vec<String>>()
            .join(", ");
        writeln!(self.out, "{:<25} {}", report.to_string(), events)?;
        self.reports += 1;
        Ok(())
    }
}

impl<W: Write> fmt::Display for Transport<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "console")
    }
}
