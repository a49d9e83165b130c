//! Character vocabulary
//!
//! Maps sentences to id sequences under a fixed character dictionary with
//! two reserved tokens: `pad` (id 0) and `eos` (id 1).

use std::collections::HashMap;

/// Id of the padding token
pub const PAD_ID: u32 = 0;
/// Id of the end-of-sentence token
pub const EOS_ID: u32 = 1;
/// Characters of the default dictionary
pub const DEFAULT_CHARACTERS: &str = "abcdefghijklmnopqrstuvwxyz0123456789 !'(),-.:;?\"";

/// Character dictionary
#[derive(Debug, Clone)]
pub struct Vocabulary {
    char_to_id: HashMap<char, u32>,
    id_to_char: Vec<Option<char>>,
}

impl Vocabulary {
    /// Build a dictionary from an ordered character set. Duplicate
    /// characters keep their first id.
    pub fn new(characters: &str) -> Self {
        let mut char_to_id = HashMap::new();
        let mut id_to_char = vec![None, None];

        for c in characters.chars() {
            if char_to_id.contains_key(&c) {
                continue;
            }
            char_to_id.insert(c, id_to_char.len() as u32);
            id_to_char.push(Some(c));
        }

        Self {
            char_to_id,
            id_to_char,
        }
    }

    /// Number of ids, reserved tokens included
    pub fn len(&self) -> usize {
        self.id_to_char.len()
    }

    /// Whether only the reserved tokens exist
    pub fn is_empty(&self) -> bool {
        self.char_to_id.is_empty()
    }

    /// Id of the padding token
    pub fn pad_id(&self) -> u32 {
        PAD_ID
    }

    /// Id of the end-of-sentence token
    pub fn eos_id(&self) -> u32 {
        EOS_ID
    }

    /// Lowercase and collapse whitespace runs to single spaces
    pub fn clean(sentence: &str) -> String {
        sentence
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Encode one sentence; unknown characters are dropped and `eos` appended
    pub fn encode(&self, sentence: &str) -> Vec<u32> {
        let mut ids: Vec<u32> = Self::clean(sentence)
            .chars()
            .filter_map(|c| self.char_to_id.get(&c).copied())
            .collect();
        ids.push(EOS_ID);
        ids
    }

    /// Decode ids back into text, skipping reserved tokens
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|&id| self.id_to_char.get(id as usize).copied().flatten())
            .collect()
    }

    /// Encode a list of sentences, returning the id sequences and their lengths
    pub fn process_sentences<S: AsRef<str>>(&self, sentences: &[S]) -> (Vec<Vec<u32>>, Vec<usize>) {
        let ids: Vec<Vec<u32>> = sentences.iter().map(|s| self.encode(s.as_ref())).collect();
        let lengths = ids.iter().map(Vec::len).collect();
        (ids, lengths)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_CHARACTERS)
    }
}
