//! Output file naming

use std::collections::HashSet;

use crate::config::FileNaming;

/// Longest sanitized stem kept in a file name
const MAX_STEM_CHARS: usize = 64;

/// Lowercase the sentence and keep only alphanumeric characters
pub fn sanitize_sentence(sentence: &str) -> String {
    sentence
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(MAX_STEM_CHARS)
        .collect()
}

/// WAV file name for the `index`-th input line
pub fn output_file_name(naming: FileNaming, index: usize, sentence: &str) -> String {
    format!("{}.wav", file_stem(naming, index, sentence))
}

/// One distinct WAV file name per input line.
///
/// A stem already taken by an earlier line gets `_<index>` appended.
pub fn output_file_names<S: AsRef<str>>(naming: FileNaming, sentences: &[S]) -> Vec<String> {
    let mut taken = HashSet::new();
    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            let mut stem = file_stem(naming, i, sentence.as_ref());
            while taken.contains(&stem) {
                stem = format!("{}_{:04}", stem, i);
            }
            taken.insert(stem.clone());
            format!("{}.wav", stem)
        })
        .collect()
}

fn file_stem(naming: FileNaming, index: usize, sentence: &str) -> String {
    match naming {
        FileNaming::Index => format!("{:04}", index),
        FileNaming::Text => {
            let stem = sanitize_sentence(sentence);
            if stem.is_empty() {
                format!("{:04}", index)
            } else {
                stem
            }
        }
    }
}
