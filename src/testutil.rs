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
use std::{error::Error, fs::File, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};
use midly::num::u7;

use crate::detector::{Detector, Settings};

/// A single strike: a quick rise to `peak` followed by a decay back to zero.
pub fn pulse(peak: u16) -> Vec<u16> {
    vec![0, peak / 4, peak / 2, peak, peak / 2, peak / 4, peak / 16, 0]
}

/// Runs every sample through the detector, returning the velocities of the hits it reports.
/// Hits are assumed to be consumed immediately.
pub fn feed(detector: &mut Detector, settings: &Settings, samples: &[u16]) -> Vec<u7> {
    samples
        .iter()
        .filter_map(|sample| detector.process(*sample, false, settings))
        .collect()
}

/// Builds per-tick frames for `channels` channels, all silent except the given
/// channel, which plays `samples` starting at `start`.
pub fn frames_with(
    channels: usize,
    len: usize,
    channel: usize,
    start: usize,
    samples: &[u16],
) -> Vec<Vec<u16>> {
    let mut frames = vec![vec![0; channels]; len];
    for (offset, sample) in samples.iter().enumerate() {
        if let Some(frame) = frames.get_mut(start + offset) {
            frame[channel] = *sample;
        }
    }
    frames
}

/// Writes planar integer samples to a 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[Vec<i16>], sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    let frames = samples.iter().map(Vec::len).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in samples.iter() {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0))?;
        }
    }
    writer.finalize()?;

    Ok(())
}
