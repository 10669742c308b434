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
use serde::Deserialize;

use super::error::ConfigError;
use crate::detector::{self, DEFAULT_DROP_SHIFT, DEFAULT_THRESHOLD, DEFAULT_VELOCITY_SHIFT};

/// A YAML representation of the peak detector tuning.
#[derive(Deserialize, Clone, Default)]
pub struct Detector {
    /// Peaks at or below this level are ignored (default: 10).
    threshold: Option<u16>,

    /// A drop of more than `peak >> drop_shift` ends a pulse (default: 4).
    drop_shift: Option<u8>,

    /// Velocity is `peak >> velocity_shift`, saturated to 127 (default: 3).
    velocity_shift: Option<u8>,
}

impl Detector {
    /// Returns the detector settings.
    pub fn settings(&self) -> Result<detector::Settings, ConfigError> {
        let drop_shift = self.drop_shift.unwrap_or(DEFAULT_DROP_SHIFT);
        if u32::from(drop_shift) >= u16::BITS {
            return Err(ConfigError::invalid(
                "drop_shift",
                format!("{} must be less than {}", drop_shift, u16::BITS),
            ));
        }
        let velocity_shift = self.velocity_shift.unwrap_or(DEFAULT_VELOCITY_SHIFT);
        if u32::from(velocity_shift) >= u16::BITS {
            return Err(ConfigError::invalid(
                "velocity_shift",
                format!("{} must be less than {}", velocity_shift, u16::BITS),
            ));
        }

        Ok(detector::Settings {
            threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
            drop_shift,
            velocity_shift,
        })
    }
}
