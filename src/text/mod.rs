//! Text processing modules
//!
//! - Character vocabulary (sentence to id sequence)
//! - Padding of id sequences into equal-length batches
//! - Output file naming

mod filename;
mod padding;
mod vocabulary;

pub use filename::{output_file_name, output_file_names, sanitize_sentence};
pub use padding::{pad_sentence, PaddedBatch};
pub use vocabulary::{Vocabulary, DEFAULT_CHARACTERS, EOS_ID, PAD_ID};
