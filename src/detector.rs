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

/// Levels at or below this value never count as a pulse.
pub const DEFAULT_THRESHOLD: u16 = 10;

/// A pulse has peaked once a sample falls more than `peak >> DEFAULT_DROP_SHIFT` below the peak.
pub const DEFAULT_DROP_SHIFT: u8 = 4;

/// Velocity is `peak >> DEFAULT_VELOCITY_SHIFT`, saturated to 127.
pub const DEFAULT_VELOCITY_SHIFT: u8 = 3;

/// Tuning for the peak detector. Shared by every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub threshold: u16,
    pub drop_shift: u8,
    pub velocity_shift: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            threshold: DEFAULT_THRESHOLD,
            drop_shift: DEFAULT_DROP_SHIFT,
            velocity_shift: DEFAULT_VELOCITY_SHIFT,
        }
    }
}

impl Settings {
    /// Maps a peak level onto a MIDI velocity.
    pub fn velocity(&self, peak: u16) -> u7 {
        let velocity = (peak >> self.velocity_shift).min(u16::from(u7::max_value().as_int()));
        u7::from_int_lossy(velocity as u8)
    }
}

/// Which edge of the pulse the detector is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Waiting for a rise and recording its maximum.
    #[default]
    Searching,
    /// Following the decay after a hit so ringing doesn't re-trigger.
    Falling,
}

/// The per-channel peak detector.
///
/// While searching, the detector records the running maximum and declares a hit once a sample
/// drops far enough below it. The drop is relative to the peak itself, so loud and soft strikes
/// are judged by the same shape. After a hit the detector follows the decay down and only arms
/// again once the signal has settled under the threshold and starts to rise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detector {
    stage: Stage,
    peak: u16,
}

impl Detector {
    pub fn new() -> Detector {
        Detector::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn peak(&self) -> u16 {
        self.peak
    }

    /// Feeds one sample. Returns the velocity of a hit if this sample completes a pulse.
    ///
    /// `hit_pending` holds detection back while an earlier hit on the channel has not been sent.
    pub fn process(&mut self, level: u16, hit_pending: bool, settings: &Settings) -> Option<u7> {
        match self.stage {
            Stage::Searching => {
                if level > self.peak {
                    self.peak = level;
                }

                let peak = self.peak;
                if peak > settings.threshold
                    && peak > level
                    && !hit_pending
                    && (peak - level) > (peak >> settings.drop_shift)
                {
                    self.stage = Stage::Falling;
                    return Some(settings.velocity(peak));
                }
                None
            }
            Stage::Falling => {
                if level < self.peak {
                    self.peak = level;
                }

                // The decayed floor stays as the new baseline.
                if self.peak < settings.threshold && level > self.peak {
                    self.stage = Stage::Searching;
                }
                None
            }
        }
    }
}
