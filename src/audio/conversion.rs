//! Decibel, magnitude and time/sample conversions

use crate::config::DecibelNormalization;

/// Smallest magnitude mapped to decibel, avoids `log10(0)`
pub const MIN_MAGNITUDE: f32 = 1e-5;

/// Convert a duration in milliseconds to a sample count.
///
/// Fractional samples are truncated, so 50 ms at 22050 Hz is 1102 samples.
pub fn ms_to_samples(ms: f32, sampling_rate: u32) -> usize {
    let samples = sampling_rate as f64 * ms as f64 / 1000.0;
    samples.max(0.0).floor() as usize
}

/// Convert a sample count to milliseconds
pub fn samples_to_ms(samples: usize, sampling_rate: u32) -> f32 {
    (samples as f64 * 1000.0 / sampling_rate as f64) as f32
}

/// `20 * log10(mag)`, clamped at [`MIN_MAGNITUDE`]
pub fn magnitude_to_decibel(mag: f32) -> f32 {
    20.0 * mag.max(MIN_MAGNITUDE).log10()
}

/// `10^(db / 20)`
pub fn decibel_to_magnitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Map decibel values onto (0, 1]
pub fn normalize_decibel(db: f32, ref_db: f32, max_db: f32) -> f32 {
    ((db - ref_db + max_db) / max_db).clamp(1e-8, 1.0)
}

/// Inverse of [`normalize_decibel`]; inputs are clamped to [0, 1] first
pub fn inv_normalize_decibel(norm: f32, ref_db: f32, max_db: f32) -> f32 {
    norm.clamp(0.0, 1.0) * max_db - max_db + ref_db
}

impl DecibelNormalization {
    /// Normalize a decibel value
    pub fn normalize(&self, db: f32) -> f32 {
        normalize_decibel(db, self.ref_db, self.max_db)
    }

    /// Recover the decibel value from a normalized one
    pub fn denormalize(&self, norm: f32) -> f32 {
        inv_normalize_decibel(norm, self.ref_db, self.max_db)
    }

    /// Normalized value -> linear magnitude.
    ///
    /// Denormalization happens before the decibel conversion; the constants
    /// only make sense in that order.
    pub fn to_magnitude(&self, norm: f32) -> f32 {
        decibel_to_magnitude(self.denormalize(norm))
    }

    /// Linear magnitude -> normalized value
    pub fn from_magnitude(&self, mag: f32) -> f32 {
        self.normalize(magnitude_to_decibel(mag))
    }
}
