//! Frame-major spectrogram container

use candle_core::Tensor;

use crate::error::{Result, TacotronError};

/// A 2D spectrogram stored row-major as (frames, bins)
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    frames: usize,
    bins: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    /// Wrap row-major data
    pub fn new(frames: usize, bins: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != frames * bins {
            return Err(TacotronError::shape("Spectrogram::new", frames * bins, data.len()));
        }
        Ok(Self { frames, bins, data })
    }

    /// Build from per-frame rows; all rows must share the same width
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let bins = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * bins);
        for row in rows {
            if row.len() != bins {
                return Err(TacotronError::shape("Spectrogram::from_rows", bins, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { frames: rows.len(), bins, data })
    }

    /// Read a (frames, bins) tensor
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        let (frames, bins) = tensor.dims2()?;
        let data = tensor.flatten_all()?.to_vec1::<f32>()?;
        Self::new(frames, bins, data)
    }

    /// Unfold reduced frames: a (steps, bins * r) group matrix becomes
    /// (steps * r, bins).
    pub fn unfold(self, reduction: usize) -> Result<Self> {
        if reduction == 0 || self.bins % reduction != 0 {
            return Err(TacotronError::shape(
                "Spectrogram::unfold",
                format!("multiple of {}", reduction),
                self.bins,
            ));
        }
        Ok(Self {
            frames: self.frames * reduction,
            bins: self.bins / reduction,
            data: self.data,
        })
    }

    /// Group `r` consecutive frames into one row, zero-padding the tail
    /// so the frame count becomes a multiple of `r`.
    pub fn fold(&self, reduction: usize) -> Result<Self> {
        if reduction == 0 {
            return Err(TacotronError::Config("reduction factor must be positive".into()));
        }
        let steps = self.frames.div_ceil(reduction);
        let mut data = self.data.clone();
        data.resize(steps * reduction * self.bins, 0.0);
        Ok(Self {
            frames: steps,
            bins: self.bins * reduction,
            data,
        })
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of bins per frame
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// One frame
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.data[index * self.bins..(index + 1) * self.bins]
    }

    /// Iterate over frames
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks(0) panics; an empty spectrogram has no rows anyway
        self.data.chunks(self.bins.max(1)).take(self.frames)
    }

    /// Raw row-major values
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Apply `f` to every value
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            frames: self.frames,
            bins: self.bins,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Keep the first `frames` frames
    pub fn truncate(&mut self, frames: usize) {
        if frames < self.frames {
            self.frames = frames;
            self.data.truncate(frames * self.bins);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_new_checks_size() {
        assert!(Spectrogram::new(2, 3, vec![0.0; 6]).is_ok());
        assert!(Spectrogram::new(2, 3, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_unfold_keeps_frame_order() {
        // Two steps of r = 2 frames with 3 bins each
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let spec = Spectrogram::new(2, 6, data).unwrap().unfold(2).unwrap();
        assert_eq!(spec.frames(), 4);
        assert_eq!(spec.bins(), 3);
        assert_eq!(spec.frame(1), &[3.0, 4.0, 5.0]);
        assert_eq!(spec.frame(3), &[9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_fold_pads_tail() {
        let spec = Spectrogram::new(3, 2, vec![1.0; 6]).unwrap();
        let folded = spec.fold(2).unwrap();
        assert_eq!(folded.frames(), 2);
        assert_eq!(folded.bins(), 4);
        assert_eq!(folded.frame(1), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unfold_rejects_bad_width() {
        let spec = Spectrogram::new(1, 5, vec![0.0; 5]).unwrap();
        assert!(spec.unfold(2).is_err());
    }

    #[test]
    fn test_from_tensor() {
        let t = Tensor::new(&[[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]], &Device::Cpu).unwrap();
        let spec = Spectrogram::from_tensor(&t).unwrap();
        assert_eq!(spec.frames(), 3);
        assert_eq!(spec.frame(2), &[5.0, 6.0]);
        assert_eq!(spec.rows().count(), 3);
    }
}
