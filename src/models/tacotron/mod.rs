//! Tacotron acoustic model
//!
//! Sentence ids -> encoder -> attention decoder (mel, `r` frames per step)
//! -> post-processing CBHG (linear spectrogram).

mod attention;
mod decoder;
mod encoder;
mod loss;
mod model;
mod post_process;
mod summary;

pub use attention::{sequence_mask, BahdanauAttention};
pub use decoder::{Decoder, DecoderOutput};
pub use encoder::Encoder;
pub use loss::{l1_loss, Loss, LossValues};
pub use model::{Graph, Inputs, Mode, Tacotron, Targets};
pub use post_process::PostProcess;
pub use summary::{spectrogram_image, SummaryItem, SummaryValue};
