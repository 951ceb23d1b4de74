//! Series and category predicates.

use crate::module::Module;
use crate::phonology::{ClassId, FeatureId, PhonemeId, SeriesId};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierSign {
    Positive,
    Negative,
}

/// A signed feature requirement. A phoneme satisfies a positive modifier
/// when its feature for the modifier's trait is exactly the modifier's
/// feature, and a negative modifier when it is not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifier {
    pub feature: FeatureId,
    pub sign: ModifierSign,
}

impl Modifier {
    /// Whether `phoneme` satisfies this modifier. A phoneme whose class
    /// does not encode the modifier's trait never satisfies a positive
    /// modifier and always satisfies a negative one.
    pub fn admits(&self, phoneme: PhonemeId, module: &Module) -> bool {
        let trait_id = module.feature(self.feature).trait_id;
        let current = module.phoneme(phoneme).features.get(&trait_id).copied();
        match self.sign {
            ModifierSign::Positive => current == Some(self.feature),
            ModifierSign::Negative => current != Some(self.feature),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoryBase {
    Class(ClassId),
    Series(SeriesId),
}

/// An inline predicate over phonemes: an optional base class or series
/// narrowed by signed feature modifiers. Categories appear embedded in
/// sound-change patterns and in category series; they are not declared
/// entities of their own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Category {
    pub base: Option<CategoryBase>,
    pub modifiers: Vec<Modifier>,
}

impl Category {
    pub fn with_base(base: CategoryBase) -> Self {
        Category {
            base: Some(base),
            modifiers: Vec::new(),
        }
    }

    /// Category membership test. The base narrows the candidate set (class
    /// membership, list membership, or a nested category series); every
    /// modifier must then admit the phoneme.
    pub fn contains(&self, phoneme: PhonemeId, module: &Module) -> bool {
        if let Some(base) = self.base {
            let in_base = match base {
                CategoryBase::Class(class) => {
                    module.class(class).phonemes.contains(&phoneme)
                }
                CategoryBase::Series(series) => match &module.series_def(series).kind {
                    SeriesKind::List(members) => members.contains(&phoneme),
                    SeriesKind::Category(category) => category.contains(phoneme, module),
                },
            };
            if !in_base {
                return false;
            }
        }
        self.modifiers.iter().all(|m| m.admits(phoneme, module))
    }
}

/// A named grouping of phonemes, either by explicit list or by predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub kind: SeriesKind,
    pub declared_at: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesKind {
    /// An explicit ordered set of phonemes.
    List(Vec<PhonemeId>),
    /// A base class/series plus feature modifiers.
    Category(Category),
}
