//! Short-time Fourier transform and its overlap-add inverse
//!
//! Frames are centered: the signal is reflect-padded by `n_fft / 2` on both
//! sides before analysis, and the inverse trims the same amount, so a
//! spectrogram of `F` frames synthesizes `hop_length * (F - 1)` samples.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::{Result, TacotronError};

/// Window-sum values below this are treated as uncovered samples
const WINDOW_SUM_FLOOR: f32 = 1e-8;

/// Complex STFT frames, each `n_fft / 2 + 1` bins wide
pub type ComplexFrames = Vec<Vec<Complex<f32>>>;

/// STFT analysis/synthesis pair sharing one window
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    win_length: usize,
    /// Hann window zero-padded (centered) to `n_fft`
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    /// Create a transform pair. `n_fft` must be even.
    pub fn new(n_fft: usize, win_length: usize, hop_length: usize) -> Result<Self> {
        if n_fft == 0
            || n_fft % 2 != 0
            || hop_length == 0
            || win_length == 0
            || win_length > n_fft
        {
            return Err(TacotronError::Config(format!(
                "invalid STFT geometry: n_fft={} win_length={} hop_length={}",
                n_fft, win_length, hop_length
            )));
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n_fft);
        let inverse = planner.plan_fft_inverse(n_fft);

        let offset = (n_fft - win_length) / 2;
        let mut window = vec![0.0; n_fft];
        for (i, w) in hann_window(win_length).into_iter().enumerate() {
            window[offset + i] = w;
        }

        Ok(Self {
            n_fft,
            hop_length,
            win_length,
            window,
            forward,
            inverse,
        })
    }

    /// FFT size
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Hop length in samples
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Window length in samples
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Bins per frame
    pub fn n_freq(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        len / self.hop_length + 1
    }

    /// Samples produced when synthesizing `frames` frames
    pub fn signal_length(&self, frames: usize) -> usize {
        self.hop_length * frames.saturating_sub(1)
    }

    /// Forward transform
    pub fn analyze(&self, signal: &[f32]) -> ComplexFrames {
        let pad = self.n_fft / 2;
        let padded = reflect_pad(signal, pad);
        let num_frames = (padded.len() - self.n_fft) / self.hop_length + 1;
        let n_freq = self.n_freq();

        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];

        for i in 0..num_frames {
            let start = i * self.hop_length;
            for (j, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + j] * self.window[j], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..n_freq].to_vec());
        }

        frames
    }

    /// Magnitudes of the forward transform
    pub fn magnitudes(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        self.analyze(signal)
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Inverse transform by windowed overlap-add.
    ///
    /// Every frame must hold exactly `n_fft / 2 + 1` bins.
    pub fn synthesize(&self, frames: &[Vec<Complex<f32>>]) -> Result<Vec<f32>> {
        let n_freq = self.n_freq();
        if let Some(bad) = frames.iter().find(|f| f.len() != n_freq) {
            return Err(TacotronError::shape("Stft::synthesize", n_freq, bad.len()));
        }
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let n = self.n_fft;
        let padded_len = n + self.hop_length * (frames.len() - 1);
        let mut signal = vec![0.0f32; padded_len];
        let mut window_sum = vec![0.0f32; padded_len];
        let mut buffer = vec![Complex::new(0.0, 0.0); n];
        let scale = 1.0 / n as f32;

        for (i, frame) in frames.iter().enumerate() {
            // Rebuild the Hermitian-symmetric full spectrum
            buffer[0] = Complex::new(frame[0].re, 0.0);
            for k in 1..n_freq - 1 {
                buffer[k] = frame[k];
                buffer[n - k] = frame[k].conj();
            }
            buffer[n / 2] = Complex::new(frame[n / 2].re, 0.0);

            self.inverse.process(&mut buffer);

            let start = i * self.hop_length;
            for j in 0..n {
                let w = self.window[j];
                signal[start + j] += buffer[j].re * scale * w;
                window_sum[start + j] += w * w;
            }
        }

        for (s, &w) in signal.iter_mut().zip(window_sum.iter()) {
            if w > WINDOW_SUM_FLOOR {
                *s /= w;
            }
        }

        let pad = n / 2;
        let len = self.signal_length(frames.len());
        Ok(signal[pad..pad + len].to_vec())
    }
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Mirror the signal around its edges, excluding the edge sample itself.
/// Signals shorter than the padding bounce back and forth.
fn reflect_pad(signal: &[f32], pad: usize) -> Vec<f32> {
    let len = signal.len();
    let mut out = Vec::with_capacity(len + 2 * pad);
    if len == 0 {
        out.resize(2 * pad, 0.0);
        return out;
    }

    for i in -(pad as isize)..(len + pad) as isize {
        out.push(signal[reflect_index(i, len)]);
    }
    out
}

fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chirp(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 16000.0;
                0.5 * (2.0 * PI * (200.0 + 300.0 * t) * t).sin()
                    + 0.25 * (2.0 * PI * 1250.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_pad() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);

        let short = reflect_pad(&[1.0, 2.0], 3);
        assert_eq!(short.len(), 8);

        assert_eq!(reflect_pad(&[], 2), vec![0.0; 4]);
    }

    #[test]
    fn test_frame_geometry() {
        let stft = Stft::new(512, 400, 100).unwrap();
        let frames = stft.analyze(&vec![0.0; 1000]);
        assert_eq!(frames.len(), 11);
        assert_eq!(frames.len(), stft.frame_count(1000));
        assert_eq!(frames[0].len(), 257);

        let signal = stft.synthesize(&frames).unwrap();
        assert_eq!(signal.len(), 1000);
        assert_eq!(stft.frame_count(signal.len()), frames.len());
    }

    #[test]
    fn test_perfect_reconstruction() {
        let stft = Stft::new(512, 400, 100).unwrap();
        let signal = chirp(4000);
        let rebuilt = stft.synthesize(&stft.analyze(&signal)).unwrap();

        assert_eq!(rebuilt.len(), signal.len());
        let max_err = signal
            .iter()
            .zip(rebuilt.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-3, "max reconstruction error {}", max_err);
    }

    #[test]
    fn test_sine_peak_bin() {
        // 1 kHz at 16 kHz with n_fft 512: bin 32
        let stft = Stft::new(512, 512, 128).unwrap();
        let signal: Vec<f32> = (0..4096)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / 16000.0).sin())
            .collect();
        let mags = stft.magnitudes(&signal);
        let frame = &mags[mags.len() / 2];
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 32);
    }

    #[test]
    fn test_synthesize_rejects_wrong_width() {
        let stft = Stft::new(64, 64, 16).unwrap();
        let frames = vec![vec![Complex::new(0.0, 0.0); 10]];
        assert!(stft.synthesize(&frames).is_err());
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(Stft::new(256, 512, 64).is_err());
        assert!(Stft::new(256, 256, 0).is_err());
    }

    #[test]
    fn test_odd_fft_size_rejected() {
        assert!(matches!(Stft::new(15, 15, 4), Err(TacotronError::Config(_))));
        assert!(Stft::new(16, 15, 4).is_ok());
    }
}
