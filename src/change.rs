//! Sound changes and the rewrite engine.
//!
//! A sound change is `source > target / environment`, stamped with the tag
//! it was declared under. Applying one to a word finds every place the
//! source pattern matches, filters those through the environment, and
//! splices the resolved target over each surviving match, left to right.
//! Feature-modification targets are re-resolved against the phoneme's own
//! class so the output is always a phoneme of the current inventory.

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::language::{tags_overlap, Tag};
use crate::lexicon::Word;
use crate::module::Module;
use crate::phonology::{Category, Modifier, ModifierSign, PhonemeId};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SoundChangeId(pub(crate) usize);

/// One position of a source pattern or environment: a specific phoneme or
/// a natural-class predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Phoneme(PhonemeId),
    Category(Category),
}

impl Segment {
    pub fn matches(&self, phoneme: PhonemeId, module: &Module) -> bool {
        match self {
            Segment::Phoneme(p) => *p == phoneme,
            Segment::Category(category) => category.contains(phoneme, module),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourcePattern {
    /// Matches the gap between any two phonemes (and both word edges).
    Empty,
    /// Matches `len()` consecutive phonemes, positionally.
    Sequence(Vec<Segment>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Delete the matched phonemes.
    Empty,
    /// Replace the match with this literal sequence.
    Phonemes(Vec<PhonemeId>),
    /// Rewrite each matched phoneme's features and re-resolve it within
    /// its own class.
    Modification(Vec<Modifier>),
}

/// The context a match must sit in. `before` is matched right-justified
/// against the phonemes left of the match, `after` against those right of
/// it; the anchors additionally pin the context to the word edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    pub before: Vec<Segment>,
    pub after: Vec<Segment>,
    pub anchor_start: bool,
    pub anchor_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundChange {
    pub source: SourcePattern,
    pub target: Target,
    pub environment: Option<Environment>,
    pub description: Option<String>,
    pub tag: Tag,
    pub definition_site: Span,
}

impl SoundChange {
    /// Whether this change has any effect on `word`: the tags must overlap
    /// in time and the source must match somewhere in the word.
    pub fn applies_to(&self, word: &Word, module: &Module) -> bool {
        tags_overlap(&self.tag, &word.tag) && !self.source_matches(&word.phonemes, module).is_empty()
    }

    /// All `[start, end)` ranges where the source matches, in ascending
    /// start order. Empty sources match every gap, including both edges.
    pub(crate) fn source_matches(
        &self,
        phonemes: &[PhonemeId],
        module: &Module,
    ) -> Vec<(usize, usize)> {
        match &self.source {
            SourcePattern::Empty => (0..=phonemes.len()).map(|i| (i, i)).collect(),
            SourcePattern::Sequence(segments) => {
                let k = segments.len();
                if k == 0 || k > phonemes.len() {
                    return Vec::new();
                }
                (0..=phonemes.len() - k)
                    .filter(|&i| {
                        segments
                            .iter()
                            .zip(&phonemes[i..i + k])
                            .all(|(segment, &p)| segment.matches(p, module))
                    })
                    .map(|i| (i, i + k))
                    .collect()
            }
        }
    }

    /// Environment test for a candidate range. Context running off either
    /// edge of the word fails; a missing environment passes everything.
    fn environment_allows(
        &self,
        phonemes: &[PhonemeId],
        start: usize,
        end: usize,
        module: &Module,
    ) -> bool {
        let Some(env) = &self.environment else {
            return true;
        };
        if start < env.before.len() || end + env.after.len() > phonemes.len() {
            return false;
        }
        if env.anchor_start && start != env.before.len() {
            return false;
        }
        if env.anchor_end && end + env.after.len() != phonemes.len() {
            return false;
        }
        let before_at = start - env.before.len();
        let before_ok = env
            .before
            .iter()
            .zip(&phonemes[before_at..start])
            .all(|(segment, &p)| segment.matches(p, module));
        let after_ok = env
            .after
            .iter()
            .zip(&phonemes[end..end + env.after.len()])
            .all(|(segment, &p)| segment.matches(p, module));
        before_ok && after_ok
    }

    /// Apply this change to `word`, returning the rewritten word, or
    /// `None` when nothing changed (no overlap, no surviving match, or a
    /// rewrite that reproduced the input). Warnings for unresolvable
    /// feature modifications are pushed onto `warnings`.
    pub fn apply(
        &self,
        id: SoundChangeId,
        word: &Word,
        module: &Module,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<Word> {
        if !tags_overlap(&self.tag, &word.tag) {
            return None;
        }
        let ranges: Vec<_> = self
            .source_matches(&word.phonemes, module)
            .into_iter()
            .filter(|&(start, end)| self.environment_allows(&word.phonemes, start, end, module))
            .collect();
        if ranges.is_empty() {
            return None;
        }

        let mut result = Vec::with_capacity(word.phonemes.len());
        let mut consumed = 0;
        for (start, end) in ranges {
            // matches may overlap at discovery time; consume left-to-right
            // and never re-enter a replaced region
            if start < consumed {
                continue;
            }
            result.extend_from_slice(&word.phonemes[consumed..start]);
            result.extend(self.resolve_target(&word.phonemes[start..end], module, warnings));
            consumed = end;
        }
        result.extend_from_slice(&word.phonemes[consumed..]);

        if result == word.phonemes {
            return None;
        }
        Some(word.derive(result, id))
    }

    fn resolve_target(
        &self,
        matched: &[PhonemeId],
        module: &Module,
        warnings: &mut Vec<Diagnostic>,
    ) -> Vec<PhonemeId> {
        match &self.target {
            Target::Empty => Vec::new(),
            Target::Phonemes(phonemes) => phonemes.clone(),
            Target::Modification(modifiers) => matched
                .iter()
                .map(|&p| self.resolve_modification(p, modifiers, module, warnings))
                .collect(),
        }
    }

    /// Apply the modifiers to a copy of the phoneme's feature map, then
    /// find the first phoneme of its class realizing the edited map. When
    /// no inventoried phoneme does, warn and keep the original.
    fn resolve_modification(
        &self,
        phoneme: PhonemeId,
        modifiers: &[Modifier],
        module: &Module,
        warnings: &mut Vec<Diagnostic>,
    ) -> PhonemeId {
        let original = module.phoneme(phoneme);
        let mut features = original.features.clone();
        for modifier in modifiers {
            let trait_id = module.feature(modifier.feature).trait_id;
            // modifiers whose trait the phoneme does not encode are inert
            let Some(&current) = features.get(&trait_id) else {
                continue;
            };
            let next = match modifier.sign {
                ModifierSign::Positive => modifier.feature,
                ModifierSign::Negative => {
                    let dimension = module.trait_def(trait_id);
                    if current == dimension.default {
                        dimension
                            .features
                            .iter()
                            .copied()
                            .find(|&f| f != modifier.feature)
                            .unwrap_or(current)
                    } else {
                        dimension.default
                    }
                }
            };
            features.insert(trait_id, next);
        }

        let class = module.class(original.class);
        for &candidate in &class.phonemes {
            if module.phoneme(candidate).features == features {
                return candidate;
            }
        }
        warnings.push(
            Diagnostic::warning("unresolved_modification", self.definition_site.clone())
                .with_message(format!(
                    "no phoneme in class '{}' realizes the modified features of '{}'",
                    class.name, original.glyph
                ))
                .add_param("phoneme", original.glyph.clone())
                .add_param("class", class.name.clone()),
        );
        phoneme
    }
}
