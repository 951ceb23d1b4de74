//! Traits and features.

use crate::phonology::{FeatureId, TraitId};
use crate::span::Span;

/// One spelling of a feature, with the span it was declared at. A feature
/// may carry several synonymous labels; the first one is its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub span: Span,
}

/// A value along one phonological dimension, e.g. *voiced* along *Voicing*.
///
/// The trait back-reference is a logical back-pointer; the trait owns the
/// feature through its ordered `features` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Synonymous labels, non-empty, in declaration order.
    pub labels: Vec<Label>,
    pub trait_id: TraitId,
}

impl Feature {
    pub fn name(&self) -> &str {
        &self.labels[0].text
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.text == label)
    }
}

/// A named phonological dimension with an ordered, non-empty feature list
/// and exactly one designated default feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Trait {
    pub name: String,
    /// Declaration-ordered features, non-empty.
    pub features: Vec<FeatureId>,
    /// The marked default, or the first feature when none was marked.
    pub default: FeatureId,
    pub declared_at: Span,
}
