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
pub mod mock;
pub mod recorded;

pub use recorded::{RecordedFrontend, RecordingError};

/// The largest level a conversion can return.
pub const MAX_LEVEL: u16 = 1023;

/// Channels below this index are wired straight to an ADC input.
pub const DEFAULT_DIRECT_INPUTS: usize = 5;

/// The number of lines the multiplexer select byte can address.
pub const MUX_LINES: usize = 256;

/// The ADC input the external multiplexer is wired to.
const MUX_INPUT: u8 = 0;

/// The analog front end: an ADC with a handful of inputs, one of which sits behind an
/// external multiplexer.
pub trait Frontend: Send {
    /// Drives the multiplexer select lines.
    fn select_mux(&mut self, line: u8);

    /// Runs one conversion on the given ADC input, blocking until it completes.
    fn convert(&mut self, input: u8) -> u16;

    /// Called once every channel has been read. Returns false when there is nothing left to
    /// sample.
    fn advance(&mut self) -> bool {
        true
    }
}

/// Maps a multiplexer line and ADC input back to the logical channel wired there.
pub(crate) fn logical_channel(mux_line: u8, input: u8, direct_inputs: usize) -> usize {
    if input == MUX_INPUT {
        direct_inputs + usize::from(mux_line)
    } else {
        usize::from(input) - 1
    }
}

/// Reads levels for logical channels.
pub trait Sampler: Send {
    /// The number of logical channels.
    fn channel_count(&self) -> usize;

    /// Reads the level of a channel, 0..=1023. Out of range channels read the last channel.
    fn read(&mut self, channel: usize) -> u16;

    /// Marks the end of a scan. Returns false when the source is exhausted.
    fn end_scan(&mut self) -> bool;
}

/// A sampler for a board whose first `direct_inputs` channels are wired to ADC inputs 1 and
/// up, with the remaining channels behind the multiplexer on input 0.
pub struct BankedSampler<F: Frontend> {
    frontend: F,
    channel_count: usize,
    direct_inputs: usize,
}

impl<F: Frontend> BankedSampler<F> {
    /// Channels past the last multiplexer line are not wired and are dropped from the count.
    pub fn new(frontend: F, channel_count: usize, direct_inputs: usize) -> BankedSampler<F> {
        let direct_inputs = direct_inputs.min(channel_count);
        BankedSampler {
            frontend,
            channel_count: channel_count.min(direct_inputs + MUX_LINES),
            direct_inputs,
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }
}

impl<F: Frontend> Sampler for BankedSampler<F> {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn read(&mut self, channel: usize) -> u16 {
        let channel = channel.min(self.channel_count.saturating_sub(1));
        let level = if channel >= self.direct_inputs {
            let line = u8::try_from(channel - self.direct_inputs).unwrap_or(u8::MAX);
            self.frontend.select_mux(line);
            self.frontend.convert(MUX_INPUT)
        } else {
            self.frontend.select_mux(0);
            self.frontend.convert(channel as u8 + 1)
        };
        level.min(MAX_LEVEL)
    }

    fn end_scan(&mut self) -> bool {
        self.frontend.advance()
    }
}
