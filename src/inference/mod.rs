//! Running the model
//!
//! This module provides:
//! - Synthesizer: checkpoint restore, prediction and waveform reconstruction
//! - Trainer: optimizer steps and periodic snapshots
//! - Session: scoped ownership of device and parameters
//! - CheckpointStore / SummaryWriter: run directory bookkeeping

mod checkpoint;
mod session;
mod summary;
mod synthesizer;
mod trainer;

pub use checkpoint::{parse_step, CheckpointStore, LATEST_MARKER};
pub use session::Session;
pub use summary::{read_events, Event, SummaryWriter, EVENTS_FILE};
pub use synthesizer::{read_sentences, Prediction, Synthesizer, DEFAULT_SENTENCES};
pub use trainer::Trainer;
