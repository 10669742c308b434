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
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{error, span, Level};

/// How long the trigger loop may go without kicking the watchdog.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Watches the trigger loop for stalls.
///
/// The loop kicks the watchdog once per tick. If no kick arrives within the timeout, the
/// supervisor thread marks the watchdog as expired, and the next kick reports it so the loop
/// can throw away its state and start over.
pub struct Watchdog {
    kick_tx: Option<Sender<()>>,
    expired: Arc<AtomicBool>,
    supervisor: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Starts the supervisor thread.
    pub fn start(timeout: Duration) -> Watchdog {
        // A single slot is enough: any pending kick means the loop is alive.
        let (kick_tx, kick_rx) = bounded::<()>(1);
        let expired = Arc::new(AtomicBool::new(false));

        let supervisor = {
            let expired = expired.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "watchdog");
                let _enter = span.enter();

                loop {
                    match kick_rx.recv_timeout(timeout) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => {
                            if !expired.swap(true, Ordering::AcqRel) {
                                error!(
                                    timeout = format!("{:?}", timeout),
                                    "Trigger loop stalled."
                                );
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })
        };

        Watchdog {
            kick_tx: Some(kick_tx),
            expired,
            supervisor: Some(supervisor),
        }
    }

    /// Tells the watchdog the loop is alive. Returns true if it expired since the last kick.
    pub fn kick(&self) -> bool {
        if let Some(kick_tx) = self.kick_tx.as_ref() {
            // A full slot already counts as a kick.
            let _ = kick_tx.try_send(());
        }
        self.expired.swap(false, Ordering::AcqRel)
    }

    #[cfg(test)]
    pub(crate) fn expire(&self) {
        self.expired.store(true, Ordering::Release);
    }

    #[cfg(test)]
    fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Disconnecting the channel stops the supervisor.
        self.kick_tx.take();
        if let Some(supervisor) = self.supervisor.take() {
            let _ = supervisor.join();
        }
    }
}
