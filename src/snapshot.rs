//! Snapshots.
//!
//! A snapshot is a language's lexicon at a chosen point in time: the words
//! visible to that language, each rewritten by every sound change whose
//! window had opened by then, in `(start, declaration order)` order.

use crate::change::SoundChangeId;
use crate::diagnostics::Diagnostic;
use crate::language::compare_tags;
use crate::lexicon::Word;
use crate::module::Module;
use crate::span::Span;

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The requested language identifier.
    pub language: String,
    pub time: f64,
    /// Selected words with all applicable changes folded over them, in
    /// lexicon order.
    pub words: Vec<Word>,
    /// The changes that were in effect, in application order.
    pub sound_changes: Vec<SoundChangeId>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Snapshot {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn word(&self, gloss: &str) -> Option<&Word> {
        self.words.iter().find(|w| w.gloss == gloss)
    }
}

impl Module {
    /// Build the snapshot of `language` at `time`. An unknown language
    /// yields an empty snapshot carrying the lookup error.
    pub fn snapshot(&self, language: &str, time: f64) -> Snapshot {
        let mut errors = self.errors.clone();
        let mut warnings = self.warnings.clone();

        let Some(lang) = self.language_by_id(language) else {
            errors.push(
                Diagnostic::error("unknown_language", Span::synthetic(self.name.clone()))
                    .with_message(format!("language '{}' is not defined", language))
                    .add_param("language", language),
            );
            return Snapshot {
                language: language.to_string(),
                time,
                words: Vec::new(),
                sound_changes: Vec::new(),
                errors,
                warnings,
            };
        };

        let mut changes: Vec<(SoundChangeId, &crate::change::SoundChange)> = self
            .sound_changes
            .iter()
            .enumerate()
            .filter(|(_, change)| change.tag.start <= time)
            .map(|(i, change)| (SoundChangeId(i), change))
            .collect();
        changes.sort_by(|a, b| compare_tags(&a.1.tag, &b.1.tag));

        let mut words = Vec::new();
        for word in self.words.values() {
            if !self.is_descendant(lang, word.tag.language) || !word.tag.covers(time) {
                continue;
            }
            let mut current = word.clone();
            for (id, change) in &changes {
                if let Some(next) = change.apply(*id, &current, self, &mut warnings) {
                    current = next;
                }
            }
            words.push(current);
        }

        Snapshot {
            language: language.to_string(),
            time,
            words,
            sound_changes: changes.into_iter().map(|(id, _)| id).collect(),
            errors,
            warnings,
        }
    }
}
