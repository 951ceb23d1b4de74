//! Classes and phonemes.

use indexmap::IndexMap;

use crate::phonology::{ClassId, FeatureId, PhonemeId, TraitId};
use crate::span::Span;

/// A contrastive sound unit: a glyph plus a feature value for every trait
/// its class encodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Phoneme {
    /// Non-empty IPA-like spelling, e.g. "k" or "tʃ".
    pub glyph: String,
    /// trait → feature, keyed in the class's `encodes` order. Total over
    /// the class's encodes list after a clean declaration; a declaration
    /// with an arity error records what it can.
    pub features: IndexMap<TraitId, FeatureId>,
    pub class: ClassId,
    /// Module-wide declaration sequence number. Strictly increasing across
    /// all phonemes of one module; used as the transcription tie-break.
    pub index: usize,
    pub declared_at: Span,
}

/// A named set of phonemes that all encode the same trait dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    /// Traits every member phoneme must specify a feature for, in
    /// declaration order. Member feature tuples are positional over this.
    pub encodes: Vec<TraitId>,
    /// Members in declaration order.
    pub phonemes: Vec<PhonemeId>,
    pub declared_at: Span,
}
