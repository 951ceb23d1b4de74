//! Phonemic transcription matching.
//!
//! Splits an IPA-like string into a sequence of declared phonemes by
//! greedy longest match. The inventory handed in must already be sorted
//! by glyph length descending, ties broken by declaration index ascending;
//! [`Module::list_phonemes`](crate::module::Module::list_phonemes) provides
//! exactly that order.

use thiserror::Error;

use crate::phonology::PhonemeId;

/// One matched phoneme: where it starts in the input (byte offset), how
/// many bytes its glyph covers, and which phoneme it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhonemeMatch {
    pub offset: usize,
    pub length: usize,
    pub phoneme: PhonemeId,
}

/// Failure to segment a transcription, pointing at the first character no
/// declared phoneme covers.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no phoneme matches {rest:?} at offset {offset}")]
pub struct TranscriptionError {
    pub offset: usize,
    pub rest: String,
}

/// Greedy longest-match segmentation. `inventory` pairs each phoneme with
/// its glyph, sorted longest-first; at each offset the first glyph that
/// prefixes the remaining input wins.
pub fn match_phonemes(
    text: &str,
    inventory: &[(PhonemeId, &str)],
) -> Result<Vec<PhonemeMatch>, TranscriptionError> {
    let mut matches = Vec::new();
    let mut offset = 0;

    while offset < text.len() {
        let rest = &text[offset..];
        let hit = inventory
            .iter()
            .find(|(_, glyph)| !glyph.is_empty() && rest.starts_with(glyph));
        match hit {
            Some(&(phoneme, glyph)) => {
                matches.push(PhonemeMatch {
                    offset,
                    length: glyph.len(),
                    phoneme,
                });
                offset += glyph.len();
            }
            None => {
                return Err(TranscriptionError {
                    offset,
                    rest: rest.to_string(),
                })
            }
        }
    }

    Ok(matches)
}
