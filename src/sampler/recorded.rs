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
use std::{path::Path, time::Duration};

use hound::{SampleFormat, WavReader};
use tracing::info;

use super::{logical_channel, Frontend, MAX_LEVEL};

/// Error types for loading recordings.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("recording has no channels")]
    NoChannels,

    #[error("recording is sampled at {sample_rate} Hz but the trigger loop ticks every {tick_interval:?}")]
    Pacing {
        sample_rate: u32,
        tick_interval: Duration,
    },
}

/// Replays a capture of trigger signals, one frame per scan.
///
/// Frame `n` holds the level of every logical channel on scan `n`. Selections made through the
/// multiplexer are mapped back to the logical channel the board wires there, so the capture
/// exercises the same routing as the hardware would. A capture replays in real time only when
/// it was sampled once per tick, see [`RecordedFrontend::check_pacing`].
#[derive(Debug, Clone)]
pub struct RecordedFrontend {
    frames: Vec<Vec<u16>>,
    position: usize,
    mux_line: u8,
    direct_inputs: usize,
    sample_rate: Option<u32>,
}

impl RecordedFrontend {
    /// Creates a frontend from in-memory frames.
    pub fn from_frames(frames: Vec<Vec<u16>>, direct_inputs: usize) -> RecordedFrontend {
        RecordedFrontend {
            frames,
            position: 0,
            mux_line: 0,
            direct_inputs,
            sample_rate: None,
        }
    }

    /// Loads a multichannel WAV file. WAV channel `n` becomes logical channel `n`. Samples are
    /// rectified and scaled onto the ADC range.
    pub fn open<P: AsRef<Path>>(
        path: P,
        direct_inputs: usize,
    ) -> Result<RecordedFrontend, RecordingError> {
        let mut reader = WavReader::open(&path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels);
        if channels == 0 {
            return Err(RecordingError::NoChannels);
        }

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            SampleFormat::Int => {
                // Use i64 to avoid overflow for 32-bit samples.
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|sample| sample as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let frames: Vec<Vec<u16>> = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().map(|sample| to_level(*sample)).collect())
            .collect();

        info!(
            path = path.as_ref().display().to_string(),
            channels,
            frames = frames.len(),
            sample_rate = spec.sample_rate,
            "Loaded recording."
        );

        Ok(RecordedFrontend {
            sample_rate: Some(spec.sample_rate),
            ..RecordedFrontend::from_frames(frames, direct_inputs)
        })
    }

    /// The number of frames in the recording.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The time between frames when the capture was made. None for in-memory frames.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.sample_rate
            .filter(|sample_rate| *sample_rate > 0)
            .map(|sample_rate| Duration::from_secs_f64(1.0 / f64::from(sample_rate)))
    }

    /// Checks that one frame per tick replays the capture at the speed it was recorded. Off by
    /// more than 1% is an error. An unpaced loop or a capture without a rate always passes.
    pub fn check_pacing(&self, tick_interval: Option<Duration>) -> Result<(), RecordingError> {
        let (frame_interval, tick_interval) = match (self.frame_interval(), tick_interval) {
            (Some(frame_interval), Some(tick_interval)) => (frame_interval, tick_interval),
            _ => return Ok(()),
        };

        let drift = if frame_interval > tick_interval {
            frame_interval - tick_interval
        } else {
            tick_interval - frame_interval
        };
        if drift * 100 > tick_interval {
            return Err(RecordingError::Pacing {
                sample_rate: self.sample_rate.unwrap_or_default(),
                tick_interval,
            });
        }
        Ok(())
    }

    /// The frame the next conversion reads from.
    pub fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn frame(&self, position: usize) -> Option<&[u16]> {
        self.frames.get(position).map(Vec::as_slice)
    }
}

/// Rectifies a normalized sample and scales it onto 0..=MAX_LEVEL.
fn to_level(sample: f32) -> u16 {
    (sample.abs().min(1.0) * f32::from(MAX_LEVEL)).round() as u16
}

impl Frontend for RecordedFrontend {
    fn select_mux(&mut self, line: u8) {
        self.mux_line = line;
    }

    fn convert(&mut self, input: u8) -> u16 {
        let channel = logical_channel(self.mux_line, input, self.direct_inputs);
        self.frame(self.position)
            .and_then(|frame| frame.get(channel))
            .copied()
            .unwrap_or(0)
    }

    fn advance(&mut self) -> bool {
        if self.position < self.frames.len() {
            self.position += 1;
        }
        self.position < self.frames.len()
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use tempfile::tempdir;

    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_to_level() {
        assert_eq!(0, to_level(0.0));
        assert_eq!(MAX_LEVEL, to_level(1.0));
        assert_eq!(MAX_LEVEL, to_level(-1.0));
        assert_eq!(MAX_LEVEL, to_level(3.5));
        assert_eq!(512, to_level(0.5));
        assert_eq!(512, to_level(-0.5));
    }

    #[test]
    fn test_routing() {
        let mut frontend = RecordedFrontend::from_frames(vec![vec![10, 11, 12, 13]], 2);

        frontend.select_mux(0);
        assert_eq!(10, frontend.convert(1));
        assert_eq!(11, frontend.convert(2));
        assert_eq!(12, frontend.convert(0));
        frontend.select_mux(1);
        assert_eq!(13, frontend.convert(0));

        // Nothing is wired past the recorded channels.
        frontend.select_mux(5);
        assert_eq!(0, frontend.convert(0));
    }

    #[test]
    fn test_advance() {
        let mut frontend = RecordedFrontend::from_frames(vec![vec![1], vec![2], vec![3]], 1);
        assert_eq!(1, frontend.convert(1));
        assert!(frontend.advance());
        assert_eq!(2, frontend.convert(1));
        assert!(frontend.advance());
        assert_eq!(3, frontend.convert(1));
        assert!(!frontend.advance());
        assert_eq!(0, frontend.convert(1));
        assert!(!frontend.advance());
        assert_eq!(3, frontend.position());
    }

    #[test]
    fn test_empty_recording() {
        let mut frontend = RecordedFrontend::from_frames(Vec::new(), 5);
        assert!(frontend.is_empty());
        assert_eq!(0, frontend.convert(1));
        assert!(!frontend.advance());
    }

    #[test]
    fn test_open_wav() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("capture.wav");
        write_wav(
            &path,
            &[
                vec![0, i16::MAX, -16384, 0],
                vec![i16::MIN, 0, 8192, 0],
            ],
            44100,
        )?;

        let frontend = RecordedFrontend::open(&path, 1)?;
        assert_eq!(4, frontend.len());
        assert_eq!(Some(&[0, 1023][..]), frontend.frame(0));
        assert_eq!(Some(&[1023, 0][..]), frontend.frame(1));
        assert_eq!(Some(&[512, 256][..]), frontend.frame(2));
        assert_eq!(Some(&[0, 0][..]), frontend.frame(3));

        // A 44.1kHz capture can't be replayed one frame per millisecond.
        assert!(matches!(
            frontend.check_pacing(Some(Duration::from_millis(1))),
            Err(RecordingError::Pacing {
                sample_rate: 44100,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_pacing_matches_sample_rate() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan.wav");
        write_wav(&path, &[vec![0, 100, 0]], 1000)?;

        let frontend = RecordedFrontend::open(&path, 1)?;
        assert_eq!(Some(Duration::from_millis(1)), frontend.frame_interval());
        frontend.check_pacing(Some(Duration::from_millis(1)))?;
        frontend.check_pacing(None)?;
        assert!(frontend
            .check_pacing(Some(Duration::from_millis(10)))
            .is_err());

        let in_memory = RecordedFrontend::from_frames(vec![vec![0]], 1);
        assert_eq!(None, in_memory.frame_interval());
        in_memory.check_pacing(Some(Duration::from_millis(10)))?;
        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            RecordedFrontend::open("/does/not/exist.wav", 5),
            Err(RecordingError::Wav(_))
        ));
    }
}
