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
use midly::num::u7;
use tracing::debug;

use crate::{
    detector::{self, Detector},
    encoder::Dispatch,
};

/// Note numbers for the reference 13 pad kit, ordered by input.
pub const DEFAULT_NOTES: [u8; 13] = [38, 41, 36, 40, 37, 46, 45, 47, 48, 43, 39, 42, 44];

/// How many scheduler services a note sounds for before it is turned off.
pub const DEFAULT_SUSTAIN_TICKS: u8 = 30;

/// One trigger input: its note and the state of its detector and note.
#[derive(Debug, Clone)]
pub struct Channel {
    index: usize,
    note: u7,
    detector: Detector,
    pending_hit: bool,
    velocity: u7,
    note_on_timer: u8,
}

impl Channel {
    /// Creates a channel in its power-up state.
    pub fn new(index: usize, note: u7) -> Channel {
        Channel {
            index,
            note,
            detector: Detector::new(),
            pending_hit: false,
            velocity: u7::new(0),
            note_on_timer: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn note(&self) -> u7 {
        self.note
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn pending_hit(&self) -> bool {
        self.pending_hit
    }

    pub fn velocity(&self) -> u7 {
        self.velocity
    }

    pub fn note_on_timer(&self) -> u8 {
        self.note_on_timer
    }

    /// True if the channel has a hit to send or a note still sounding.
    pub fn is_busy(&self) -> bool {
        self.pending_hit || self.note_on_timer > 0
    }

    /// Feeds one sample to the detector. Returns true if it produced a new hit.
    pub fn sample(&mut self, level: u16, settings: &detector::Settings) -> bool {
        match self.detector.process(level, self.pending_hit, settings) {
            Some(velocity) => {
                debug!(
                    channel = self.index,
                    note = self.note.as_int(),
                    velocity = velocity.as_int(),
                    "Hit detected."
                );
                self.pending_hit = true;
                self.velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Takes the next thing this channel wants to send, if any.
    ///
    /// A pending hit always goes out, preceded by a note off if the previous note is still
    /// sounding. Otherwise a sounding note counts down and is turned off when the count
    /// reaches zero.
    pub fn take_dispatch(&mut self, sustain_ticks: u8) -> Option<Dispatch> {
        if self.pending_hit {
            let dispatch = if self.note_on_timer > 0 {
                Dispatch::Retrigger {
                    note: self.note,
                    velocity: self.velocity,
                }
            } else {
                Dispatch::NoteOn {
                    note: self.note,
                    velocity: self.velocity,
                }
            };
            self.pending_hit = false;
            self.note_on_timer = sustain_ticks;
            return Some(dispatch);
        }

        if self.note_on_timer > 0 {
            self.note_on_timer -= 1;
            if self.note_on_timer == 0 {
                return Some(Dispatch::NoteOff { note: self.note });
            }
        }

        None
    }

    /// Returns the channel to its power-up state. The note assignment is kept.
    pub fn reset(&mut self) {
        *self = Channel::new(self.index, self.note);
    }
}

/// Builds the channel table from a note assignment, one channel per note.
pub fn table(notes: &[u7]) -> Vec<Channel> {
    notes
        .iter()
        .enumerate()
        .map(|(index, note)| Channel::new(index, *note))
        .collect()
}

#[cfg(test)]
mod test {
    use midly::num::u7;

    use super::*;
    use crate::detector::Settings;
    use crate::testutil::pulse;

    fn hit(channel: &mut Channel, peak: u16) {
        let settings = Settings::default();
        let hits = pulse(peak)
            .into_iter()
            .filter(|sample| channel.sample(*sample, &settings))
            .count();
        assert_eq!(1, hits);
    }

    #[test]
    fn test_table() {
        let notes = u7::slice_from_int(&DEFAULT_NOTES);
        let channels = table(notes);
        assert_eq!(13, channels.len());
        for (index, channel) in channels.iter().enumerate() {
            assert_eq!(index, channel.index());
            assert_eq!(DEFAULT_NOTES[index], channel.note().as_int());
            assert!(!channel.is_busy());
        }
    }

    #[test]
    fn test_hit_then_note_on() {
        let mut channel = Channel::new(0, u7::new(38));
        hit(&mut channel, 800);
        assert!(channel.pending_hit());
        assert_eq!(100, channel.velocity().as_int());

        assert_eq!(
            Some(Dispatch::NoteOn {
                note: u7::new(38),
                velocity: u7::new(100),
            }),
            channel.take_dispatch(DEFAULT_SUSTAIN_TICKS)
        );
        assert!(!channel.pending_hit());
        assert_eq!(DEFAULT_SUSTAIN_TICKS, channel.note_on_timer());
    }

    #[test]
    fn test_sustain_countdown() {
        let mut channel = Channel::new(2, u7::new(36));
        hit(&mut channel, 400);
        assert!(channel.take_dispatch(3).is_some());

        assert_eq!(None, channel.take_dispatch(3));
        assert_eq!(None, channel.take_dispatch(3));
        assert_eq!(
            Some(Dispatch::NoteOff { note: u7::new(36) }),
            channel.take_dispatch(3)
        );
        assert!(!channel.is_busy());
        assert_eq!(None, channel.take_dispatch(3));
    }

    #[test]
    fn test_retrigger_while_sounding() {
        let mut channel = Channel::new(1, u7::new(41));
        hit(&mut channel, 400);
        assert!(channel.take_dispatch(DEFAULT_SUSTAIN_TICKS).is_some());
        assert_eq!(None, channel.take_dispatch(DEFAULT_SUSTAIN_TICKS));

        // Let the detector re-arm, then strike again.
        let settings = Settings::default();
        channel.sample(5, &settings);
        hit(&mut channel, 1023);

        assert_eq!(
            Some(Dispatch::Retrigger {
                note: u7::new(41),
                velocity: u7::new(127),
            }),
            channel.take_dispatch(DEFAULT_SUSTAIN_TICKS)
        );
        assert_eq!(DEFAULT_SUSTAIN_TICKS, channel.note_on_timer());
    }

    #[test]
    fn test_pending_velocity_is_frozen() {
        let settings = Settings::default();
        let mut channel = Channel::new(0, u7::new(38));
        hit(&mut channel, 400);

        // A louder strike before the first is sent is folded into the pending one.
        channel.sample(5, &settings);
        for sample in pulse(1000) {
            assert!(!channel.sample(sample, &settings));
        }
        assert_eq!(50, channel.velocity().as_int());
    }

    #[test]
    fn test_reset() {
        let mut channel = Channel::new(4, u7::new(37));
        hit(&mut channel, 800);
        channel.reset();
        assert!(!channel.is_busy());
        assert_eq!(4, channel.index());
        assert_eq!(37, channel.note().as_int());
        assert_eq!(&Detector::new(), channel.detector());
    }
}
