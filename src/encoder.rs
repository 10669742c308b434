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
use std::fmt;

use midly::num::{u4, u7};

/// Every event travels as a group of this many bytes.
pub const PACKET_SIZE: usize = 4;

/// The most a single report can carry: a note off followed by a note on.
pub const REPORT_CAPACITY: usize = 2 * PACKET_SIZE;

const CODE_INDEX_NOTE_OFF: u8 = 0x08;
const CODE_INDEX_NOTE_ON: u8 = 0x09;
const STATUS_NOTE_OFF: u8 = 0x80;
const STATUS_NOTE_ON: u8 = 0x90;

/// A single note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On { note: u7, velocity: u7 },
    Off { note: u7 },
}

impl NoteEvent {
    /// Encodes the event as one packet: code index, status, note, velocity.
    pub fn encode(&self, channel: u4) -> [u8; PACKET_SIZE] {
        match self {
            NoteEvent::On { note, velocity } => [
                CODE_INDEX_NOTE_ON,
                STATUS_NOTE_ON | channel.as_int(),
                note.as_int(),
                velocity.as_int(),
            ],
            NoteEvent::Off { note } => [
                CODE_INDEX_NOTE_OFF,
                STATUS_NOTE_OFF | channel.as_int(),
                note.as_int(),
                0x00,
            ],
        }
    }
}

/// What the scheduler decided to send for a channel on one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A new note.
    NoteOn { note: u7, velocity: u7 },
    /// A new note while the previous one on the same channel is still sounding.
    Retrigger { note: u7, velocity: u7 },
    /// The sustain ran out.
    NoteOff { note: u7 },
}

impl Dispatch {
    /// The events in the order they go on the wire.
    pub fn events(&self) -> impl Iterator<Item = NoteEvent> {
        let (first, second) = match *self {
            Dispatch::NoteOn { note, velocity } => (NoteEvent::On { note, velocity }, None),
            Dispatch::Retrigger { note, velocity } => (
                NoteEvent::Off { note },
                Some(NoteEvent::On { note, velocity }),
            ),
            Dispatch::NoteOff { note } => (NoteEvent::Off { note }, None),
        };
        std::iter::once(first).chain(second)
    }
}

/// An outgoing buffer of whole packets.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Report {
    bytes: [u8; REPORT_CAPACITY],
    len: usize,
}

impl Report {
    pub fn new() -> Report {
        Report {
            bytes: [0; REPORT_CAPACITY],
            len: 0,
        }
    }

    /// Appends a packet. Returns false, leaving the report untouched, if it is full.
    pub fn push(&mut self, packet: [u8; PACKET_SIZE]) -> bool {
        if self.len + PACKET_SIZE > REPORT_CAPACITY {
            return false;
        }
        self.bytes[self.len..self.len + PACKET_SIZE].copy_from_slice(&packet);
        self.len += PACKET_SIZE;
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the packets in the report.
    pub fn packets(&self) -> impl Iterator<Item = &[u8]> {
        self.as_bytes().chunks_exact(PACKET_SIZE)
    }
}

impl Default for Report {
    fn default() -> Self {
        Report::new()
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Report({})", self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let packets = self
            .packets()
            .map(|packet| {
                packet
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect::<Vec<String>>()
                    .join(" ")
            })
            .collect::<Vec<String>>();
        write!(f, "{}", packets.join(" | "))
    }
}

/// Turns dispatches into reports for a fixed MIDI channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    channel: u4,
}

impl Encoder {
    /// Creates an encoder for the given zero-indexed MIDI channel.
    pub fn new(channel: u4) -> Encoder {
        Encoder { channel }
    }

    pub fn encode(&self, dispatch: &Dispatch) -> Report {
        let mut report = Report::new();
        for event in dispatch.events() {
            // A dispatch never holds more than two events.
            report.push(event.encode(self.channel));
        }
        report
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(u4::new(0))
    }
}
