//! Lexicon entries.
//!
//! A word is immutable: applying a sound change allocates a new word whose
//! origin chain links back to the predecessor. Module lexicons hold words
//! as declared; derived words only ever appear in snapshots.

use std::rc::Rc;

use crate::change::SoundChangeId;
use crate::language::Tag;
use crate::module::Module;
use crate::phonology::PhonemeId;
use crate::span::Span;

/// One sense of a word.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub part_of_speech: Option<String>,
    pub text: String,
}

/// One step in a word's derivation history: the word as it was before a
/// sound change rewrote it, and the change that did.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub predecessor: Rc<Word>,
    pub change: SoundChangeId,
}

/// A lexicon entry: a gloss, its phonemic transcription, and the tag it
/// was declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Natural-language identifier, unique within a module.
    pub gloss: String,
    pub phonemes: Vec<PhonemeId>,
    pub definitions: Vec<Definition>,
    pub tag: Tag,
    pub definition_site: Span,
    /// Derivation steps, most recent first. Empty for words as declared.
    pub etymology: Vec<Origin>,
}

impl Word {
    /// The word's phonemic spelling, glyphs concatenated.
    pub fn render(&self, module: &Module) -> String {
        module.render(&self.phonemes)
    }

    /// A new word derived from `self` by `change`, with the given phoneme
    /// sequence and `self` prepended onto the origin chain.
    pub(crate) fn derive(&self, phonemes: Vec<PhonemeId>, change: SoundChangeId) -> Word {
        let mut etymology = Vec::with_capacity(self.etymology.len() + 1);
        etymology.push(Origin {
            predecessor: Rc::new(self.clone()),
            change,
        });
        etymology.extend(self.etymology.iter().cloned());
        Word {
            gloss: self.gloss.clone(),
            phonemes,
            definitions: self.definitions.clone(),
            tag: self.tag,
            definition_site: self.definition_site.clone(),
            etymology,
        }
    }
}
