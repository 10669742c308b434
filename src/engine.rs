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
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use midly::num::{u4, u7};
use tracing::{debug, error, info, span, warn, Level};

use crate::{
    channel::{self, Channel, DEFAULT_NOTES, DEFAULT_SUSTAIN_TICKS},
    detector,
    encoder::Encoder,
    sampler::{Sampler, DEFAULT_DIRECT_INPUTS},
    scheduler::Scheduler,
    thread_priority,
    transport::Transport,
    watchdog::{self, Watchdog},
};

/// Everything the trigger loop needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// The note for each channel. The length is the channel count.
    pub notes: Vec<u7>,
    /// How many channels are wired directly to the ADC.
    pub direct_inputs: usize,
    /// The zero-indexed MIDI channel for all notes.
    pub midi_channel: u4,
    pub detector: detector::Settings,
    pub sustain_ticks: u8,
    /// The time between ticks. None runs the loop as fast as it will go.
    pub tick_interval: Option<Duration>,
    /// None disables the watchdog.
    pub watchdog_timeout: Option<Duration>,
    /// Priority for the loop thread, 0-99.
    pub thread_priority: Option<u8>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            notes: u7::slice_from_int(&DEFAULT_NOTES).to_vec(),
            direct_inputs: DEFAULT_DIRECT_INPUTS,
            midi_channel: u4::new(0),
            detector: detector::Settings::default(),
            sustain_ticks: DEFAULT_SUSTAIN_TICKS,
            tick_interval: Some(Duration::from_millis(1)),
            watchdog_timeout: Some(watchdog::DEFAULT_TIMEOUT),
            thread_priority: None,
        }
    }
}

/// Counters for a run of the trigger loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub ticks: u64,
    pub hits: u64,
    pub reports: u64,
    pub send_failures: u64,
    pub resets: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks: {}, hits: {}, reports: {}, send failures: {}, resets: {}",
            self.ticks, self.hits, self.reports, self.send_failures, self.resets
        )
    }
}

/// Stops a running trigger loop from another thread.
#[derive(Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> StopHandle {
        StopHandle::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// The trigger loop. Owns the channel table and everything that touches it, so all state
/// lives on the one thread that runs the loop.
pub struct Engine {
    sampler: Box<dyn Sampler>,
    transport: Box<dyn Transport>,
    channels: Vec<Channel>,
    scheduler: Scheduler,
    encoder: Encoder,
    settings: detector::Settings,
    watchdog: Option<Watchdog>,
    watchdog_timeout: Option<Duration>,
    tick_interval: Option<Duration>,
    thread_priority: Option<u8>,
    stats: Stats,
}

impl Engine {
    /// Creates a trigger loop. A configured watchdog starts with the first tick.
    pub fn new(
        options: &Options,
        sampler: Box<dyn Sampler>,
        transport: Box<dyn Transport>,
    ) -> Engine {
        if sampler.channel_count() != options.notes.len() {
            warn!(
                sampler_channels = sampler.channel_count(),
                channels = options.notes.len(),
                "Sampler and channel table disagree on the channel count."
            );
        }

        Engine {
            sampler,
            transport,
            channels: channel::table(&options.notes),
            scheduler: Scheduler::new(options.sustain_ticks),
            encoder: Encoder::new(options.midi_channel),
            settings: options.detector,
            watchdog: None,
            watchdog_timeout: options.watchdog_timeout,
            tick_interval: options.tick_interval,
            thread_priority: options.thread_priority,
            stats: Stats::default(),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// True if no channel has a hit waiting or a note sounding.
    pub fn is_idle(&self) -> bool {
        !self.channels.iter().any(Channel::is_busy)
    }

    /// Runs one pass of the loop: feed the watchdog, service the link, sample every channel,
    /// then send at most one channel's events if the transport can take them.
    ///
    /// Returns false once the sampler has nothing more to give.
    pub fn tick(&mut self) -> bool {
        self.kick_watchdog();
        self.transport.poll();

        for channel in self.channels.iter_mut() {
            let level = self.sampler.read(channel.index());
            if channel.sample(level, &self.settings) {
                self.stats.hits += 1;
            }
        }
        let more = self.sampler.end_scan();

        self.dispatch();
        self.stats.ticks += 1;
        more
    }

    /// Keeps servicing the scheduler without sampling until every hit is sent and every
    /// sounding note has been turned off.
    pub fn drain(&mut self, stop: &StopHandle) {
        while !self.is_idle() && !stop.is_stopped() {
            self.kick_watchdog();
            self.transport.poll();
            self.dispatch();
            self.stats.ticks += 1;
            self.pace();
        }
    }

    /// Ticks until stopped or until the sampler runs dry, then drains.
    pub fn run(&mut self, stop: &StopHandle) -> Stats {
        let span = span!(Level::INFO, "trigger loop");
        let _enter = span.enter();

        if let Some(priority) = self.thread_priority {
            thread_priority::configure_current_thread(priority);
        }

        info!(
            transport = self.transport.to_string(),
            channels = self.channels.len(),
            tick_interval = format!("{:?}", self.tick_interval),
            "Trigger loop started."
        );

        while !stop.is_stopped() {
            if !self.tick() {
                info!(ticks = self.stats.ticks, "Sampler exhausted.");
                break;
            }
            self.pace();
        }
        self.drain(stop);

        info!(stats = self.stats.to_string(), "Trigger loop stopped.");
        self.stats
    }

    /// Puts every channel and the scheduler back in their power-up state.
    pub fn reset(&mut self) {
        self.channels.iter_mut().for_each(Channel::reset);
        self.scheduler.reset();
        self.stats.resets += 1;
    }

    fn kick_watchdog(&mut self) {
        let expired = match &self.watchdog {
            Some(watchdog) => watchdog.kick(),
            None => {
                self.watchdog = self.watchdog_timeout.map(Watchdog::start);
                false
            }
        };
        if expired {
            warn!("Watchdog expired, resetting trigger state.");
            self.reset();
        }
    }

    fn dispatch(&mut self) {
        if !self.transport.is_ready() {
            return;
        }

        let (index, dispatch) = match self.scheduler.service(&mut self.channels) {
            Some(serviced) => serviced,
            None => return,
        };
        let report = self.encoder.encode(&dispatch);
        match self.transport.send(&report) {
            Ok(()) => {
                debug!(
                    channel = index,
                    dispatch = format!("{:?}", dispatch),
                    "Sent report."
                );
                self.stats.reports += 1;
            }
            Err(e) => {
                error!(
                    channel = index,
                    err = e.to_string(),
                    report = report.to_string(),
                    "Error sending report."
                );
                self.stats.send_failures += 1;
            }
        }
    }

    fn pace(&self) {
        if let Some(tick_interval) = self.tick_interval {
            spin_sleep::sleep(tick_interval);
        }
    }
}

#[cfg(test)]
mod test {
    use std::{thread, time::Duration};

    use super::*;
    use crate::{
        encoder::Report,
        sampler::{mock::MockFrontend, BankedSampler},
        testutil::{frames_with, pulse},
        transport::mock,
    };

    const CHANNELS: usize = 13;

    fn options() -> Options {
        Options {
            tick_interval: None,
            watchdog_timeout: None,
            ..Default::default()
        }
    }

    fn engine(
        options: &Options,
        frames: Vec<Vec<u16>>,
    ) -> (Engine, MockFrontend, mock::Transport) {
        let frontend = MockFrontend::new(frames, options.direct_inputs);
        let transport = mock::Transport::get("mock");
        let engine = Engine::new(
            options,
            Box::new(BankedSampler::new(
                frontend.clone(),
                options.notes.len(),
                options.direct_inputs,
            )),
            Box::new(transport.clone()),
        );
        (engine, frontend, transport)
    }

    /// Ticks through every frame and returns the tick each report was sent on.
    fn run_ticks(
        engine: &mut Engine,
        transport: &mock::Transport,
        ticks: usize,
    ) -> Vec<(usize, Report)> {
        let mut sent = Vec::new();
        for tick in 0..ticks {
            let before = transport.reports().len();
            engine.tick();
            for report in transport.reports().into_iter().skip(before) {
                sent.push((tick, report));
            }
        }
        sent
    }

    #[test]
    fn test_tick_polls_and_scans() {
        let (mut engine, frontend, transport) = engine(&options(), vec![vec![0; CHANNELS]; 3]);
        assert!(engine.tick());
        assert_eq!(1, transport.polls());
        assert_eq!(1, frontend.scans());
        assert_eq!(CHANNELS, frontend.conversions().len());
        assert_eq!(1, engine.stats().ticks);
        assert!(transport.reports().is_empty());
    }

    #[test]
    fn test_note_on_then_note_off() {
        let note = DEFAULT_NOTES[3];
        let (mut engine, _, transport) =
            engine(&options(), frames_with(CHANNELS, 64, 3, 0, &pulse(800)));

        let sent = run_ticks(&mut engine, &transport, 64);
        assert_eq!(2, sent.len());

        // The hit is recognized on the first sample after the peak and sent right away.
        assert_eq!(4, sent[0].0);
        assert_eq!(&[0x09, 0x90, note, 100], sent[0].1.as_bytes());

        assert_eq!(4 + usize::from(DEFAULT_SUSTAIN_TICKS), sent[1].0);
        assert_eq!(&[0x08, 0x80, note, 0x00], sent[1].1.as_bytes());
        assert!(engine.is_idle());
        assert_eq!(1, engine.stats().hits);
        assert_eq!(2, engine.stats().reports);
    }

    #[test]
    fn test_not_ready_defers_without_loss() {
        let (mut engine, _, transport) =
            engine(&options(), frames_with(CHANNELS, 64, 7, 0, &pulse(400)));
        transport.set_ready(false);

        let sent = run_ticks(&mut engine, &transport, 20);
        assert!(sent.is_empty());
        assert!(engine.channels()[7].pending_hit());
        assert_eq!(20, transport.polls());

        transport.set_ready(true);
        engine.tick();
        assert_eq!(vec![0x09, 0x90, DEFAULT_NOTES[7], 50], transport.bytes());
        assert_eq!(DEFAULT_SUSTAIN_TICKS, engine.channels()[7].note_on_timer());
    }

    #[test]
    fn test_retrigger_sends_off_then_on() {
        let note = DEFAULT_NOTES[0];
        let mut samples = pulse(400);
        samples.push(3);
        samples.extend(pulse(1016));
        let (mut engine, _, transport) =
            engine(&options(), frames_with(CHANNELS, 40, 0, 0, &samples));

        let sent = run_ticks(&mut engine, &transport, 40);
        assert_eq!(2, sent.len());
        assert_eq!(&[0x09, 0x90, note, 50], sent[0].1.as_bytes());
        assert_eq!(
            &[0x08, 0x80, note, 0x00, 0x09, 0x90, note, 127],
            sent[1].1.as_bytes()
        );
    }

    #[test]
    fn test_simultaneous_hits_are_fair() {
        let mut frames = vec![vec![0; CHANNELS]; 40];
        for (offset, level) in pulse(800).into_iter().enumerate() {
            frames[offset] = vec![level; CHANNELS];
        }
        let (mut engine, _, transport) = engine(&options(), frames);

        let sent = run_ticks(&mut engine, &transport, 4 + CHANNELS);
        let notes = sent
            .iter()
            .map(|(_, report)| report.as_bytes()[2])
            .collect::<Vec<u8>>();
        // One channel per tick, in channel order, starting on the tick the hits land.
        assert_eq!(DEFAULT_NOTES.to_vec(), notes);
        assert_eq!(4, sent[0].0);
        assert_eq!(4 + CHANNELS - 1, sent[CHANNELS - 1].0);
    }

    #[test]
    fn test_send_failure_drops_event() {
        let (mut engine, _, transport) =
            engine(&options(), frames_with(CHANNELS, 10, 2, 0, &pulse(800)));
        transport.set_fail_sends(true);

        run_ticks(&mut engine, &transport, 10);
        assert_eq!(1, engine.stats().send_failures);
        assert_eq!(0, engine.stats().reports);
        assert!(!engine.channels()[2].pending_hit());
    }

    #[test]
    fn test_run_drains_sounding_notes() {
        let note = DEFAULT_NOTES[10];
        let (mut engine, _, transport) =
            engine(&options(), frames_with(CHANNELS, 10, 10, 1, &pulse(800)));

        let stats = engine.run(&StopHandle::new());
        assert!(engine.is_idle());
        assert_eq!(2, stats.reports);
        assert_eq!(
            vec![0x09, 0x90, note, 100, 0x08, 0x80, note, 0x00],
            transport.bytes()
        );
    }

    #[test]
    fn test_stopped_before_run() {
        let (mut engine, frontend, _) =
            engine(&options(), frames_with(CHANNELS, 10, 10, 1, &pulse(800)));
        let stop = StopHandle::new();
        stop.stop();

        let stats = engine.run(&stop);
        assert_eq!(0, stats.ticks);
        assert_eq!(0, frontend.scans());
    }

    #[test]
    fn test_watchdog_resets_state() {
        let options = Options {
            watchdog_timeout: Some(Duration::from_secs(60)),
            ..options()
        };
        let (mut engine, _, transport) =
            engine(&options, frames_with(CHANNELS, 20, 5, 0, &pulse(800)));
        transport.set_ready(false);
        run_ticks(&mut engine, &transport, 6);
        assert!(engine.channels()[5].pending_hit());

        // Stall the loop.
        engine.watchdog.as_ref().unwrap().expire();
        engine.tick();
        assert_eq!(1, engine.stats().resets);
        assert!(engine.is_idle());
        assert_eq!(0, engine.scheduler().cursor());
    }

    #[test]
    fn test_watchdog_starts_with_first_tick() {
        let options = Options {
            watchdog_timeout: Some(Duration::from_millis(20)),
            ..options()
        };
        let (mut engine, _, _) = engine(&options, vec![vec![0; CHANNELS]; 3]);
        assert!(engine.watchdog.is_none());

        // Time between construction and the loop starting isn't a stall.
        thread::sleep(Duration::from_millis(100));
        engine.tick();
        assert!(engine.watchdog.is_some());
        assert_eq!(0, engine.stats().resets);
    }

    #[test]
    fn test_custom_midi_channel() {
        let options = Options {
            midi_channel: u4::new(9),
            ..options()
        };
        let (mut engine, _, transport) =
            engine(&options, frames_with(CHANNELS, 10, 0, 0, &pulse(800)));
        run_ticks(&mut engine, &transport, 10);
        assert_eq!(vec![0x09, 0x99, DEFAULT_NOTES[0], 100], transport.bytes());
    }
}
