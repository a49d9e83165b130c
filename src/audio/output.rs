//! WAV output

use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Peak amplitude floor used when normalizing near-silent audio
const PEAK_FLOOR: f32 = 0.01;

/// Audio output handler
pub struct AudioOutput;

impl AudioOutput {
    /// Save audio samples to a 16-bit mono PCM WAV file.
    ///
    /// With `normalize` the waveform is scaled so its peak reaches full scale.
    pub fn save<P: AsRef<Path>>(
        samples: &[f32],
        sample_rate: u32,
        path: P,
        normalize: bool,
    ) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let gain = if normalize { Self::peak_gain(samples) } else { 1.0 };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;

        for &sample in samples {
            let scaled = (sample * gain * 32767.0).clamp(-32767.0, 32767.0) as i16;
            writer.write_sample(scaled)?;
        }

        writer.finalize()?;
        debug!("Wrote {} samples to {:?}", samples.len(), path.as_ref());
        Ok(())
    }

    /// Gain bringing the absolute peak to 1.0
    pub fn peak_gain(samples: &[f32]) -> f32 {
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        1.0 / peak.max(PEAK_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..1000).map(|i| 0.25 * (i as f32 * 0.05).sin()).collect();

        AudioOutput::save(&samples, 22050, &path, true).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        let written: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(written.len(), 1000);
        let peak = written.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak > 32000);
    }

    #[test]
    fn test_peak_gain_silence() {
        assert!((AudioOutput::peak_gain(&[0.0; 10]) - 100.0).abs() < 1e-3);
        assert_eq!(AudioOutput::peak_gain(&[0.5, -1.0]), 1.0);
    }
}
