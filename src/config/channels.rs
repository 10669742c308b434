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
use midly::num::{u4, u7};
use serde::Deserialize;

use super::error::ConfigError;
use crate::{
    channel::DEFAULT_NOTES,
    sampler::{DEFAULT_DIRECT_INPUTS, MUX_LINES},
};

const DEFAULT_MIDI_CHANNEL: u8 = 1;

/// A YAML representation of the channel table.
#[derive(Deserialize, Clone, Default)]
pub struct Channels {
    /// The note for each input, in input order. The length sets the number of channels.
    notes: Option<Vec<u8>>,

    /// How many inputs are wired directly to the ADC before the multiplexed bank starts.
    direct_inputs: Option<usize>,

    /// The MIDI channel notes are sent on, 1-16.
    midi_channel: Option<u8>,
}

impl Channels {
    /// Returns the note assignment (default: the reference 13 pad kit).
    pub fn notes(&self) -> Result<Vec<u7>, ConfigError> {
        let notes = match &self.notes {
            Some(notes) => notes.clone(),
            None => DEFAULT_NOTES.to_vec(),
        };
        if notes.is_empty() {
            return Err(ConfigError::invalid("notes", "at least one channel is required"));
        }

        notes
            .iter()
            .map(|note| {
                u7::try_from(*note).ok_or_else(|| {
                    ConfigError::invalid("notes", format!("{} is not a MIDI note", note))
                })
            })
            .collect()
    }

    /// Returns the size of the direct bank (default: 5).
    pub fn direct_inputs(&self, channel_count: usize) -> Result<usize, ConfigError> {
        let direct_inputs = self.direct_inputs.unwrap_or(DEFAULT_DIRECT_INPUTS);
        if direct_inputs > channel_count {
            return Err(ConfigError::invalid(
                "direct_inputs",
                format!(
                    "{} direct inputs but only {} channels",
                    direct_inputs, channel_count
                ),
            ));
        }
        // The ADC has input 0 for the multiplexer and one input per direct channel.
        if direct_inputs > usize::from(u8::MAX) {
            return Err(ConfigError::invalid(
                "direct_inputs",
                format!("{} is more than the ADC can address", direct_inputs),
            ));
        }
        if channel_count - direct_inputs > MUX_LINES {
            return Err(ConfigError::invalid(
                "notes",
                format!(
                    "{} multiplexed channels but the multiplexer has {} lines",
                    channel_count - direct_inputs,
                    MUX_LINES
                ),
            ));
        }
        Ok(direct_inputs)
    }

    /// Returns the zero-indexed MIDI channel (default: channel 1).
    pub fn midi_channel(&self) -> Result<u4, ConfigError> {
        let midi_channel = self.midi_channel.unwrap_or(DEFAULT_MIDI_CHANNEL);
        if !(1..=16).contains(&midi_channel) {
            return Err(ConfigError::invalid(
                "midi_channel",
                format!("{} is not between 1 and 16", midi_channel),
            ));
        }
        Ok(u4::from_int_lossy(midi_channel - 1))
    }
}
