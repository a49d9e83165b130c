//! Neural network models
//!
//! This module contains:
//! - Layer library (convolution bank, highway, CBHG, bidirectional GRU, prenet)
//! - Tacotron encoder, attention decoder and post-processing net

pub mod layers;
pub mod tacotron;

// Re-exports
pub use tacotron::{Graph, Inputs, Mode, Tacotron, Targets};
