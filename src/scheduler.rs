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
use crate::{channel::Channel, encoder::Dispatch};

/// Round robin dispatcher. Services at most one channel per transport opportunity and starts
/// each scan just after the channel it serviced last, so a busy channel can't hold the others
/// off for more than one full turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    first_reported: usize,
    sustain_ticks: u8,
}

impl Scheduler {
    pub fn new(sustain_ticks: u8) -> Scheduler {
        Scheduler {
            first_reported: 0,
            sustain_ticks,
        }
    }

    /// The channel the next scan starts from.
    pub fn cursor(&self) -> usize {
        self.first_reported
    }

    /// Scans the channels starting at the cursor and returns the first dispatch found along
    /// with the channel it came from.
    ///
    /// Channels scanned before the match count down their sustain timers. Channels after it
    /// are not touched until a later service.
    pub fn service(&mut self, channels: &mut [Channel]) -> Option<(usize, Dispatch)> {
        let count = channels.len();
        if count == 0 {
            return None;
        }

        let start = self.first_reported % count;
        let sustain_ticks = self.sustain_ticks;
        let serviced = (0..count)
            .map(|offset| (start + offset) % count)
            .find_map(|index| {
                channels[index]
                    .take_dispatch(sustain_ticks)
                    .map(|dispatch| (index, dispatch))
            });

        self.first_reported = match serviced {
            Some((index, _)) => (index + 1) % count,
            None => start,
        };
        serviced
    }

    /// Moves the cursor back to the first channel.
    pub fn reset(&mut self) {
        self.first_reported = 0;
    }
}
