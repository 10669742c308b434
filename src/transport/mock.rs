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
use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use super::TransportError;
use crate::encoder::Report;

#[derive(Default)]
struct State {
    ready: bool,
    fail_sends: bool,
    polls: usize,
    reports: Vec<Report>,
}

/// A mock transport. Doesn't send anything, but keeps every report it is given. Clones share
/// state, so a test can hold on to one while the trigger loop owns another.
#[derive(Clone)]
pub struct Transport {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Transport {
    /// Gets the given mock transport. It starts out ready.
    pub fn get(name: &str) -> Transport {
        Transport {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State {
                ready: true,
                ..Default::default()
            })),
        }
    }

    /// Sets whether the transport accepts reports.
    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    /// Makes every send fail until turned off again.
    pub fn set_fail_sends(&self, fail_sends: bool) {
        self.state.lock().fail_sends = fail_sends;
    }

    /// The number of times the transport has been polled.
    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    /// Every report accepted so far.
    pub fn reports(&self) -> Vec<Report> {
        self.state.lock().reports.clone()
    }

    /// Every accepted byte, in order.
    pub fn bytes(&self) -> Vec<u8> {
        self.state
            .lock()
            .reports
            .iter()
            .flat_map(|report| report.as_bytes().to_vec())
            .collect()
    }
}

impl super::Transport for Transport {
    fn poll(&mut self) {
        self.state.lock().polls += 1;
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn send(&mut self, report: &Report) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(TransportError::Rejected(report.to_string()));
        }
        debug!(device = self.name, report = report.to_string(), "Mock send.");
        state.reports.push(*report);
        Ok(())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
