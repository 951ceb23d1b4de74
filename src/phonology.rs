//! Phonology model.
//!
//! Traits carve out the dimensions a language distinguishes (voicing,
//! place, ...), features are the values along one dimension, classes group
//! phonemes that encode the same dimensions, and series name ad-hoc
//! groupings either by explicit list or by feature predicate. Entities are
//! identified by handles into the owning [`Module`](crate::module::Module)'s
//! arenas; handle equality is reference identity.

pub mod inventory;
pub mod series;
pub mod traits;

pub use inventory::{Class, Phoneme};
pub use series::{Category, CategoryBase, Modifier, ModifierSign, Series, SeriesKind};
pub use traits::{Feature, Label, Trait};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TraitId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FeatureId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PhonemeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeriesId(pub(crate) usize);
