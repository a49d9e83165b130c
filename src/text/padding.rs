//! Sequence padding for batching

use crate::error::{Result, TacotronError};

/// Append `pad_id` until the sentence is `max_len` long
pub fn pad_sentence(sentence: &[u32], max_len: usize, pad_id: u32) -> Result<Vec<u32>> {
    if sentence.len() > max_len {
        return Err(TacotronError::shape("pad_sentence", format!("<= {}", max_len), sentence.len()));
    }
    let mut padded = Vec::with_capacity(max_len);
    padded.extend_from_slice(sentence);
    padded.resize(max_len, pad_id);
    Ok(padded)
}

/// Equal-length id sequences together with their unpadded lengths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    /// Padded sequences, all `max_len` long
    pub ids: Vec<Vec<u32>>,
    /// Length of each sequence before padding
    pub lengths: Vec<usize>,
}

impl PaddedBatch {
    /// Pad every sequence to the longest one
    pub fn new(sequences: &[Vec<u32>], pad_id: u32) -> Result<Self> {
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        let ids = sequences
            .iter()
            .map(|s| pad_sentence(s, max_len, pad_id))
            .collect::<Result<Vec<_>>>()?;
        let lengths = sequences.iter().map(Vec::len).collect();
        Ok(Self { ids, lengths })
    }

    /// Wrap sequences that were padded elsewhere; all must share one length
    pub fn from_padded(ids: Vec<Vec<u32>>, lengths: Vec<usize>) -> Result<Self> {
        if ids.len() != lengths.len() {
            return Err(TacotronError::shape("PaddedBatch::from_padded", ids.len(), lengths.len()));
        }
        let max_len = ids.first().map_or(0, Vec::len);
        if let Some(bad) = ids.iter().find(|s| s.len() != max_len) {
            return Err(TacotronError::shape("PaddedBatch::from_padded", max_len, bad.len()));
        }
        if let Some(&bad) = lengths.iter().find(|&&l| l == 0 || l > max_len) {
            return Err(TacotronError::shape(
                "PaddedBatch::from_padded",
                format!("1..={}", max_len),
                bad,
            ));
        }
        Ok(Self { ids, lengths })
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Padded length shared by all sequences
    pub fn max_len(&self) -> usize {
        self.ids.first().map_or(0, Vec::len)
    }

    /// Row-major ids, `len() * max_len()` values
    pub fn flat_ids(&self) -> Vec<u32> {
        self.ids.iter().flatten().copied().collect()
    }
}
