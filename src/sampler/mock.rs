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
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Frontend, RecordedFrontend};

/// A single conversion as seen by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub mux_line: u8,
    pub input: u8,
}

/// A mock frontend. Plays scripted frames and remembers every conversion it was asked for.
#[derive(Clone)]
pub struct MockFrontend {
    frames: RecordedFrontend,
    mux_line: u8,
    conversions: Arc<Mutex<Vec<Conversion>>>,
    scans: Arc<Mutex<usize>>,
}

impl MockFrontend {
    /// Creates a mock frontend playing the given frames.
    pub fn new(frames: Vec<Vec<u16>>, direct_inputs: usize) -> MockFrontend {
        MockFrontend {
            frames: RecordedFrontend::from_frames(frames, direct_inputs),
            mux_line: 0,
            conversions: Arc::new(Mutex::new(Vec::new())),
            scans: Arc::new(Mutex::new(0)),
        }
    }

    /// Every conversion made so far, in order.
    pub fn conversions(&self) -> Vec<Conversion> {
        self.conversions.lock().clone()
    }

    /// The number of completed scans.
    pub fn scans(&self) -> usize {
        *self.scans.lock()
    }
}

impl Frontend for MockFrontend {
    fn select_mux(&mut self, line: u8) {
        self.mux_line = line;
        self.frames.select_mux(line);
    }

    fn convert(&mut self, input: u8) -> u16 {
        self.conversions.lock().push(Conversion {
            mux_line: self.mux_line,
            input,
        });
        self.frames.convert(input)
    }

    fn advance(&mut self) -> bool {
        *self.scans.lock() += 1;
        self.frames.advance()
    }
}
