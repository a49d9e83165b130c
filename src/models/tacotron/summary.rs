//! Monitoring snapshot of a graph: loss scalars and spectrogram images

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use super::model::Graph;
use crate::audio::Spectrogram;
use crate::error::{Result, TacotronError};

/// Value of one summary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SummaryValue {
    /// Single number
    Scalar {
        /// Value
        value: f32,
    },
    /// 8-bit grayscale image, row-major
    Image {
        /// Rows
        height: usize,
        /// Columns
        width: usize,
        /// `height * width` pixels
        pixels: Vec<u8>,
    },
}

/// Tagged summary entry
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryItem {
    /// Slash separated tag
    pub tag: String,
    /// Value
    pub value: SummaryValue,
}

impl SummaryItem {
    fn scalar(tag: &str, value: f32) -> Self {
        Self {
            tag: tag.to_string(),
            value: SummaryValue::Scalar { value },
        }
    }
}

impl Graph {
    /// Loss scalars plus images of the first batch item's normalized
    /// linear spectrograms, unfolded to (frames * r, n_freq)
    pub fn summary(&self) -> Result<Vec<SummaryItem>> {
        let mut items = Vec::new();

        if let Some(ref loss) = self.loss {
            let values = loss.values()?;
            items.push(SummaryItem::scalar("loss", values.total));
            if let Some(mel) = values.mel {
                items.push(SummaryItem::scalar("loss_mel", mel));
            }
            items.push(SummaryItem::scalar("loss_linear", values.linear));
        }

        if let Some(ref target) = self.target_linear {
            items.push(SummaryItem {
                tag: "normalized_inputs/linear_spec".to_string(),
                value: spectrogram_image(&target.get(0)?, self.n_freq)?,
            });
        }
        items.push(SummaryItem {
            tag: "normalized_outputs/linear_spec".to_string(),
            value: spectrogram_image(&self.linear.get(0)?, self.n_freq)?,
        });

        if let Some(ref alignments) = self.alignments {
            items.push(SummaryItem {
                tag: "alignment".to_string(),
                value: image(&Spectrogram::from_tensor(&alignments.get(0)?)?),
            });
        }

        Ok(items)
    }
}

/// Image of one reduced spectrogram (steps, n_freq * r)
pub fn spectrogram_image(reduced: &Tensor, n_freq: usize) -> Result<SummaryValue> {
    let spec = Spectrogram::from_tensor(reduced)?;
    if n_freq == 0 || spec.bins() % n_freq != 0 {
        return Err(TacotronError::shape(
            "spectrogram_image",
            format!("multiple of {}", n_freq),
            spec.bins(),
        ));
    }
    let reduction = spec.bins() / n_freq;
    Ok(image(&spec.unfold(reduction)?))
}

/// Values are clamped to [0, 1] before quantization
fn image(spec: &Spectrogram) -> SummaryValue {
    let pixels = spec
        .data()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    SummaryValue::Image {
        height: spec.frames(),
        width: spec.bins(),
        pixels,
    }
}
