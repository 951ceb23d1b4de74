//! The compilation unit.
//!
//! A module owns everything a source text declared or imported: arenas for
//! the phonology entities, ordered name tables over them, the lexicon, the
//! sound-change list, and the diagnostics the compiler recorded along the
//! way. Entity handles index into the arenas; absorbing an imported module
//! merges its arenas in and remaps every handle.

use indexmap::IndexMap;

use crate::change::SoundChange;
use crate::diagnostics::Diagnostic;
use crate::language::{Language, LanguageId, Milestone};
use crate::lexicon::Word;
use crate::phonology::{
    Category, CategoryBase, Class, ClassId, Feature, FeatureId, Phoneme, PhonemeId, Series,
    SeriesId, SeriesKind, Trait, TraitId,
};
use crate::span::Span;
use crate::transcription::{match_phonemes, PhonemeMatch, TranscriptionError};

/// A named sound entity. Classes, series, and phoneme glyphs share one
/// namespace; lookups consult them in that fixed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundEntity {
    Class(ClassId),
    Series(SeriesId),
    Phoneme(PhonemeId),
}

/// Any named entity a module can export. The `Word` variant carries the
/// entry's position in the lexicon table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entity {
    Language(LanguageId),
    Trait(TraitId),
    Class(ClassId),
    Series(SeriesId),
    Phoneme(PhonemeId),
    Word(usize),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// The source name this module was compiled from.
    pub name: String,

    pub(crate) traits: Vec<Trait>,
    pub(crate) features: Vec<Feature>,
    pub(crate) classes: Vec<Class>,
    pub(crate) phonemes: Vec<Phoneme>,
    pub(crate) series: Vec<Series>,
    pub(crate) languages: Vec<Language>,

    pub(crate) language_ids: IndexMap<String, LanguageId>,
    pub(crate) trait_names: IndexMap<String, TraitId>,
    pub(crate) class_names: IndexMap<String, ClassId>,
    pub(crate) series_names: IndexMap<String, SeriesId>,
    pub(crate) phoneme_glyphs: IndexMap<String, PhonemeId>,
    /// Every feature label in the module; label uniqueness is global.
    pub(crate) feature_labels: IndexMap<String, FeatureId>,

    /// Lexicon by gloss, in declaration order.
    pub words: IndexMap<String, Word>,
    pub milestones: Vec<Milestone>,
    pub sound_changes: Vec<SoundChange>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,

    /// Next phoneme declaration sequence number.
    pub(crate) phoneme_seq: usize,
    /// Next tag materialization sequence number.
    pub(crate) tag_seq: usize,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }

    // ---- arena access ----

    pub fn trait_def(&self, id: TraitId) -> &Trait {
        &self.traits[id.0]
    }

    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.0]
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn phoneme(&self, id: PhonemeId) -> &Phoneme {
        &self.phonemes[id.0]
    }

    pub fn series_def(&self, id: SeriesId) -> &Series {
        &self.series[id.0]
    }

    pub fn language(&self, id: LanguageId) -> &Language {
        &self.languages[id.0]
    }

    pub(crate) fn language_mut(&mut self, id: LanguageId) -> &mut Language {
        &mut self.languages[id.0]
    }

    // ---- name lookups ----

    pub fn language_by_id(&self, id: &str) -> Option<LanguageId> {
        self.language_ids.get(id).copied()
    }

    pub fn trait_by_name(&self, name: &str) -> Option<TraitId> {
        self.trait_names.get(name).copied()
    }

    /// Global label lookup; labels name exactly one feature module-wide.
    pub fn feature_by_label(&self, label: &str) -> Option<FeatureId> {
        self.feature_labels.get(label).copied()
    }

    pub fn phoneme_by_glyph(&self, glyph: &str) -> Option<PhonemeId> {
        self.phoneme_glyphs.get(glyph).copied()
    }

    /// Shared-namespace lookup over classes, series, and phoneme glyphs,
    /// in that order, with the declaration site for conflict reporting.
    pub fn sound_entity(&self, name: &str) -> Option<(SoundEntity, &Span)> {
        if let Some(&id) = self.class_names.get(name) {
            return Some((SoundEntity::Class(id), &self.class(id).declared_at));
        }
        if let Some(&id) = self.series_names.get(name) {
            return Some((SoundEntity::Series(id), &self.series_def(id).declared_at));
        }
        if let Some(&id) = self.phoneme_glyphs.get(name) {
            return Some((SoundEntity::Phoneme(id), &self.phoneme(id).declared_at));
        }
        None
    }

    /// Lookup across every exportable namespace, in a fixed order.
    pub fn entity(&self, name: &str) -> Option<Entity> {
        if let Some(id) = self.language_by_id(name) {
            return Some(Entity::Language(id));
        }
        if let Some(id) = self.trait_by_name(name) {
            return Some(Entity::Trait(id));
        }
        if let Some((sound, _)) = self.sound_entity(name) {
            return Some(match sound {
                SoundEntity::Class(id) => Entity::Class(id),
                SoundEntity::Series(id) => Entity::Series(id),
                SoundEntity::Phoneme(id) => Entity::Phoneme(id),
            });
        }
        self.words.get_index_of(name).map(Entity::Word)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// The phoneme inventory in transcription match order: glyph length
    /// descending, declaration index ascending. This is the only ordering
    /// contract the matcher depends on.
    pub fn list_phonemes(&self) -> Vec<PhonemeId> {
        let mut ids: Vec<PhonemeId> = self.phoneme_glyphs.values().copied().collect();
        ids.sort_by(|&a, &b| {
            let a = self.phoneme(a);
            let b = self.phoneme(b);
            b.glyph
                .chars()
                .count()
                .cmp(&a.glyph.chars().count())
                .then(a.index.cmp(&b.index))
        });
        ids
    }

    /// Segment `text` against the module's current inventory.
    pub fn match_transcription(&self, text: &str) -> Result<Vec<PhonemeMatch>, TranscriptionError> {
        let order = self.list_phonemes();
        let inventory: Vec<(PhonemeId, &str)> = order
            .iter()
            .map(|&id| (id, self.phoneme(id).glyph.as_str()))
            .collect();
        match_phonemes(text, &inventory)
    }

    /// Concatenated glyphs of a phoneme sequence.
    pub fn render(&self, phonemes: &[PhonemeId]) -> String {
        phonemes
            .iter()
            .map(|&id| self.phoneme(id).glyph.as_str())
            .collect()
    }

    /// Whether `language` is `ancestor` itself or descends from it.
    pub fn is_descendant(&self, language: LanguageId, ancestor: LanguageId) -> bool {
        let mut current = Some(language);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.language(id).parent;
        }
        false
    }

    // ---- import absorption ----

    /// Merge `other`'s arenas into this module, remapping every handle.
    /// Nothing is registered in this module's name tables; the returned
    /// [`Absorbed`] carries the remapped tables for the import handler to
    /// register selectively.
    pub(crate) fn absorb(&mut self, other: Module) -> Absorbed {
        let trait_off = self.traits.len();
        let feature_off = self.features.len();
        let class_off = self.classes.len();
        let phoneme_off = self.phonemes.len();
        let series_off = self.series.len();
        let language_off = self.languages.len();
        let tag_off = self.tag_seq;

        let remap_category = |category: &mut Category| {
            if let Some(base) = &mut category.base {
                *base = match *base {
                    CategoryBase::Class(id) => CategoryBase::Class(ClassId(id.0 + class_off)),
                    CategoryBase::Series(id) => CategoryBase::Series(SeriesId(id.0 + series_off)),
                };
            }
            for modifier in &mut category.modifiers {
                modifier.feature = FeatureId(modifier.feature.0 + feature_off);
            }
        };

        for mut dimension in other.traits {
            for feature in &mut dimension.features {
                *feature = FeatureId(feature.0 + feature_off);
            }
            dimension.default = FeatureId(dimension.default.0 + feature_off);
            self.traits.push(dimension);
        }
        for mut feature in other.features {
            feature.trait_id = TraitId(feature.trait_id.0 + trait_off);
            self.features.push(feature);
        }
        for mut class in other.classes {
            for encoded in &mut class.encodes {
                *encoded = TraitId(encoded.0 + trait_off);
            }
            for member in &mut class.phonemes {
                *member = PhonemeId(member.0 + phoneme_off);
            }
            self.classes.push(class);
        }
        for mut phoneme in other.phonemes {
            phoneme.class = ClassId(phoneme.class.0 + class_off);
            let features = phoneme
                .features
                .iter()
                .map(|(&t, &f)| (TraitId(t.0 + trait_off), FeatureId(f.0 + feature_off)))
                .collect();
            phoneme.features = features;
            phoneme.index = self.phoneme_seq;
            self.phoneme_seq += 1;
            self.phonemes.push(phoneme);
        }
        for mut series in other.series {
            match &mut series.kind {
                SeriesKind::List(members) => {
                    for member in members {
                        *member = PhonemeId(member.0 + phoneme_off);
                    }
                }
                SeriesKind::Category(category) => remap_category(category),
            }
            self.series.push(series);
        }
        for mut language in other.languages {
            if let Some(parent) = &mut language.parent {
                *parent = LanguageId(parent.0 + language_off);
            }
            for milestone in &mut language.milestones {
                milestone.language = LanguageId(milestone.language.0 + language_off);
            }
            self.languages.push(language);
        }

        let languages = other
            .language_ids
            .into_iter()
            .map(|(name, id)| (name, LanguageId(id.0 + language_off)))
            .collect();
        let traits = other
            .trait_names
            .into_iter()
            .map(|(name, id)| (name, TraitId(id.0 + trait_off)))
            .collect();
        let classes = other
            .class_names
            .into_iter()
            .map(|(name, id)| (name, ClassId(id.0 + class_off)))
            .collect();
        let series = other
            .series_names
            .into_iter()
            .map(|(name, id)| (name, SeriesId(id.0 + series_off)))
            .collect();
        let phonemes = other
            .phoneme_glyphs
            .into_iter()
            .map(|(name, id)| (name, PhonemeId(id.0 + phoneme_off)))
            .collect();
        let feature_labels = other
            .feature_labels
            .into_iter()
            .map(|(name, id)| (name, FeatureId(id.0 + feature_off)))
            .collect();

        let words = other
            .words
            .into_iter()
            .map(|(gloss, mut word)| {
                for phoneme in &mut word.phonemes {
                    *phoneme = PhonemeId(phoneme.0 + phoneme_off);
                }
                word.tag.language = LanguageId(word.tag.language.0 + language_off);
                word.tag.index += tag_off;
                (gloss, word)
            })
            .collect();
        let milestones = other
            .milestones
            .into_iter()
            .map(|mut milestone| {
                milestone.language = LanguageId(milestone.language.0 + language_off);
                milestone
            })
            .collect();
        self.tag_seq += other.tag_seq;

        Absorbed {
            languages,
            traits,
            classes,
            series,
            phonemes,
            feature_labels,
            words,
            milestones,
            errors: other.errors,
        }
    }
}

/// The remapped exports of an absorbed module. Sound changes are unnamed
/// and stay with their own module; everything here is eligible for
/// registration by the import handler.
#[derive(Debug)]
pub(crate) struct Absorbed {
    pub languages: IndexMap<String, LanguageId>,
    pub traits: IndexMap<String, TraitId>,
    pub classes: IndexMap<String, ClassId>,
    pub series: IndexMap<String, SeriesId>,
    pub phonemes: IndexMap<String, PhonemeId>,
    pub feature_labels: IndexMap<String, FeatureId>,
    pub words: IndexMap<String, Word>,
    pub milestones: Vec<Milestone>,
    pub errors: Vec<Diagnostic>,
}
