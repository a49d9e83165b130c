//! # Tacotron - Rust Implementation
//!
//! A Tacotron text-to-speech pipeline on the Candle tensor runtime: a
//! sequence-to-sequence acoustic model mapping character ids to
//! spectrograms, and Griffin-Lim reconstruction of waveforms from them.
//!
//! ## Features
//!
//! - CBHG, highway, convolution bank and bidirectional GRU layers
//! - Attention decoder with a reduction factor
//! - TRAIN / EVAL / PREDICT graphs with L1 losses and summaries
//! - Griffin-Lim phase reconstruction over rustfft
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tacotron::{Config, Synthesizer};
//!
//! let config = Config::load("config.yaml")?;
//! let mut synthesizer = Synthesizer::new(&config, candle_core::Device::Cpu, None)?;
//! let written = synthesizer.synthesize_to_dir(&["A short sentence."])?;
//! ```

// Require docs for public items, but not struct fields (too verbose)
#![warn(missing_docs)]
#![allow(rustdoc::missing_crate_level_docs)]

pub mod audio;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod text;

// Re-exports for convenience
pub use config::Config;
pub use error::{Result, TacotronError};
pub use inference::{Synthesizer, Trainer};
pub use models::{Inputs, Mode, Tacotron};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for output audio (22050 Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
