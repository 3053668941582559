use std::path::Path;

use anyhow::Context;
use looptty::audio::StereoFrame;

/// A WAV file looped as the live input, for practising without a microphone.
#[derive(Clone, Debug)]
pub struct BackingTrack {
    data: Vec<StereoFrame>, // the audio data array
    pos: usize,
}

impl BackingTrack {
    // Load a WAV file from disk, resampled to the device rate
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        let spec = reader.spec();
        let file_rate = spec.sample_rate;
        let file_channels = spec.channels as usize;

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let mut frames: Vec<StereoFrame> = if file_channels == 1 {
            samples
                .into_iter()
                .map(|x| StereoFrame::new(x, x)) // mono, duplicate
                .collect()
        } else {
            // anything past the first two channels is dropped
            samples
                .chunks_exact(file_channels)
                .map(|c| StereoFrame::new(c[0], c[1]))
                .collect()
        };

        if file_rate != target_rate {
            frames = resample_linear(&frames, file_rate, target_rate);
        }
        if frames.is_empty() {
            anyhow::bail!("{} has no audio", path.display());
        }
        log::info!(
            "backing track {}: {} frames at {} Hz",
            path.display(),
            frames.len(),
            target_rate
        );

        Ok(Self { data: frames, pos: 0 })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn next_frame(&mut self) -> StereoFrame {
        let frame = self.data[self.pos];
        self.pos += 1;
        if self.pos >= self.data.len() {
            self.pos = 0;
        }
        frame
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    // plain linear interpolation; good enough for a practice track
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= frames.len() - 1 { // edge case
            out.push(frames[frames.len() - 1]);
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(a * (1.0 - frac) + b * frac); // blend via frac
        }
    }
    out
}
