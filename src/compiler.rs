//! The compiler driver.
//!
//! Walks parsed statements in document order, carrying the ambient
//! language/time context milestones establish, and populates a module.
//! Problems are recorded as diagnostics on the module; within a statement,
//! recoverable errors skip only the offending piece, fatal ones abort that
//! statement, and only a parser error stops the walk altogether.

use indexmap::IndexMap;

use crate::change::{Environment, Segment, SoundChange, SourcePattern, Target};
use crate::diagnostics::Diagnostic;
use crate::language::{Language, LanguageId, Milestone, Tag};
use crate::lexicon::{Definition, Word};
use crate::module::{Absorbed, Module, SoundEntity};
use crate::phonology::{
    Category, CategoryBase, Class, ClassId, Feature, FeatureId, Label, Modifier, ModifierSign,
    Phoneme, PhonemeId, Series, SeriesId, SeriesKind, Trait, TraitId,
};
use crate::resolver::ModuleResolver;
use crate::span::{Span, Spanned};
use crate::syntax::{self, ast};
use crate::transcription::TranscriptionError;

/// Compile one source text into a module. Errors are recorded inside the
/// module, never raised; the resolver is consulted for imports.
pub fn compile_module(source: &str, source_name: &str, resolver: &dyn ModuleResolver) -> Module {
    let mut module = Module::new(source_name);
    let statements = match syntax::parse(source, source_name) {
        Ok(statements) => statements,
        Err(err) => {
            module.errors.push(
                Diagnostic::error("parse_error", err.span(source_name))
                    .with_message(err.to_string()),
            );
            return module;
        }
    };

    let mut compiler = Compiler {
        module,
        resolver,
        language: None,
        starts: None,
        ends: None,
    };
    for statement in &statements {
        let proceed = match statement {
            ast::Statement::Import(stmt) => compiler.import(stmt),
            ast::Statement::Language(stmt) => compiler.language(stmt),
            ast::Statement::Milestone(stmt) => compiler.milestone(stmt),
            ast::Statement::Trait(stmt) => compiler.trait_decl(stmt),
            ast::Statement::Class(stmt) => compiler.class(stmt),
            ast::Statement::Series(stmt) => compiler.series(stmt),
            ast::Statement::Word(stmt) => compiler.word(stmt),
            ast::Statement::Change(stmt) => compiler.change(stmt),
        };
        if !proceed {
            break;
        }
    }
    compiler.module
}

struct Compiler<'a> {
    module: Module,
    resolver: &'a dyn ModuleResolver,
    /// Ambient context set by milestones; a tag is materializable only
    /// once all three parts are known.
    language: Option<LanguageId>,
    starts: Option<f64>,
    ends: Option<f64>,
}

fn entity_kind(entity: SoundEntity) -> &'static str {
    match entity {
        SoundEntity::Class(_) => "class",
        SoundEntity::Series(_) => "series",
        SoundEntity::Phoneme(_) => "phoneme",
    }
}

impl Compiler<'_> {
    fn error(&mut self, diagnostic: Diagnostic) {
        self.module.errors.push(diagnostic);
    }

    fn can_tag(&self) -> bool {
        self.language.is_some() && self.starts.is_some() && self.ends.is_some()
    }

    /// Callers must check [`can_tag`](Self::can_tag) first; requesting a
    /// tag without a context is a programmer error, not an input error.
    fn materialize_tag(&mut self) -> Tag {
        debug_assert!(self.can_tag(), "tag requested before a milestone context");
        let tag = Tag {
            start: self.starts.unwrap_or(0.0),
            end: self.ends.unwrap_or(f64::INFINITY),
            language: self.language.unwrap_or(LanguageId(0)),
            index: self.module.tag_seq,
        };
        self.module.tag_seq += 1;
        tag
    }

    /// A sound-name conflict against the joint class/series/phoneme
    /// namespace, reported with the prior declaration site.
    fn sound_conflict(&mut self, declaring: &'static str, name: &Spanned<String>) -> bool {
        let prior = self
            .module
            .sound_entity(&name.node)
            .map(|(entity, span)| (entity_kind(entity), span.clone()));
        if let Some((kind, prior_span)) = prior {
            let code: &'static str = match declaring {
                "class" => "duplicate_class",
                "series" => "duplicate_series",
                _ => "duplicate_phoneme",
            };
            self.error(
                Diagnostic::error(code, name.span.clone())
                    .with_message(format!(
                        "name '{}' is already used by a {}",
                        name.node, kind
                    ))
                    .add_param("name", name.node.clone())
                    .add_param("conflicts_with", kind)
                    .add_param("previously_declared_at", prior_span.to_string()),
            );
            return true;
        }
        false
    }

    fn transcription_error(&mut self, err: &TranscriptionError, span: &Span) {
        self.error(
            Diagnostic::error("transcription_error", span.clone())
                .with_message(err.to_string())
                .add_param("offset", err.offset)
                .add_param("rest", err.rest.clone()),
        );
    }

    // ---- imports ----

    fn import(&mut self, stmt: &ast::ImportStmt) -> bool {
        let wildcard = stmt
            .members
            .iter()
            .any(|m| matches!(m, ast::ImportMember::Wildcard(_)));
        let named: Vec<&Spanned<String>> = stmt
            .members
            .iter()
            .filter_map(|m| match m {
                ast::ImportMember::Named(name) => Some(name),
                ast::ImportMember::Wildcard(_) => None,
            })
            .collect();
        if wildcard && !named.is_empty() {
            self.error(
                Diagnostic::error("import_wildcard_mixed", stmt.span.clone()).with_message(
                    "a wildcard import cannot be combined with named members",
                ),
            );
        }

        let resolved = match &stmt.path.node {
            ast::ImportPath::Scoped { scope, path } => self.resolver.resolve_scoped(scope, path),
            ast::ImportPath::Local { path, absolute } => {
                self.resolver.resolve_local(path, *absolute)
            }
        };
        let imported = match resolved {
            Ok(module) => module,
            Err(err) => {
                self.error(
                    Diagnostic::error("unresolved_import", stmt.path.span.clone())
                        .with_message(err.to_string()),
                );
                return true;
            }
        };

        let absorbed = self.module.absorb(imported);

        // re-emit the imported module's errors against the import site,
        // keeping the inner span for attribution
        let import_span = stmt.path.span.clone();
        for inner in &absorbed.errors {
            let mut reemitted = inner.clone();
            reemitted.source_span = Some(inner.source_span.clone().unwrap_or(inner.span.clone()));
            reemitted.span = import_span.clone();
            self.module.errors.push(reemitted);
        }

        if wildcard {
            self.adopt_everything(&absorbed, &import_span);
        }
        for name in named {
            self.adopt_named(&absorbed, name);
        }
        true
    }

    fn adopt_everything(&mut self, absorbed: &Absorbed, at: &Span) {
        for (name, &id) in &absorbed.languages {
            self.adopt_language(name, id, at);
        }
        for (name, &id) in &absorbed.traits {
            self.adopt_trait_name(name, id, at);
        }
        for (label, &id) in &absorbed.feature_labels {
            self.adopt_feature_label(label, id, at);
        }
        for (name, &id) in &absorbed.classes {
            self.adopt_class_name(name, id, at);
        }
        for (name, &id) in &absorbed.series {
            self.adopt_series_name(name, id, at);
        }
        for (glyph, &id) in &absorbed.phonemes {
            self.adopt_phoneme_glyph(glyph, id, at);
        }
        for (gloss, word) in &absorbed.words {
            self.adopt_word(gloss, word.clone(), at);
        }
        for &milestone in &absorbed.milestones {
            self.adopt_milestone(milestone);
        }
    }

    fn adopt_named(&mut self, absorbed: &Absorbed, name: &Spanned<String>) {
        let at = &name.span;
        if let Some(&id) = absorbed.languages.get(&name.node) {
            self.adopt_language(&name.node, id, at);
            let milestones = self.module.language(id).milestones.clone();
            for milestone in milestones {
                self.adopt_milestone(milestone);
            }
        } else if let Some(&id) = absorbed.traits.get(&name.node) {
            self.adopt_trait(&name.node, id, at);
        } else if let Some(&id) = absorbed.classes.get(&name.node) {
            self.adopt_class(&name.node, id, at);
        } else if let Some(&id) = absorbed.series.get(&name.node) {
            self.adopt_series_name(&name.node, id, at);
        } else if let Some(&id) = absorbed.phonemes.get(&name.node) {
            self.adopt_phoneme_glyph(&name.node, id, at);
        } else if let Some(word) = absorbed.words.get(&name.node) {
            self.adopt_word(&name.node, word.clone(), at);
        } else {
            self.error(
                Diagnostic::error("import_missing", at.clone())
                    .with_message(format!("module does not export '{}'", name.node))
                    .add_param("name", name.node.clone()),
            );
        }
    }

    fn adopt_language(&mut self, name: &str, id: LanguageId, at: &Span) {
        if self.module.language_by_id(name).is_some() {
            self.error(
                Diagnostic::error("duplicate_language", at.clone())
                    .with_message(format!("language '{}' is already defined", name)),
            );
            return;
        }
        self.module.language_ids.insert(name.to_string(), id);
    }

    fn adopt_trait_name(&mut self, name: &str, id: TraitId, at: &Span) {
        if self.module.trait_by_name(name).is_some() {
            self.error(
                Diagnostic::error("duplicate_trait", at.clone())
                    .with_message(format!("trait '{}' is already declared", name)),
            );
            return;
        }
        self.module.trait_names.insert(name.to_string(), id);
    }

    fn adopt_feature_label(&mut self, label: &str, id: FeatureId, at: &Span) {
        if self.module.feature_by_label(label).is_some() {
            self.error(
                Diagnostic::error("duplicate_feature_label", at.clone())
                    .with_message(format!("label '{}' already names a feature", label)),
            );
            return;
        }
        self.module.feature_labels.insert(label.to_string(), id);
    }

    /// A named trait import brings the trait and its feature labels.
    fn adopt_trait(&mut self, name: &str, id: TraitId, at: &Span) {
        self.adopt_trait_name(name, id, at);
        let features = self.module.trait_def(id).features.clone();
        for feature in features {
            let labels: Vec<String> = self
                .module
                .feature(feature)
                .labels
                .iter()
                .map(|l| l.text.clone())
                .collect();
            for label in labels {
                self.adopt_feature_label(&label, feature, at);
            }
        }
    }

    fn adopt_class_name(&mut self, name: &str, id: ClassId, at: &Span) {
        let conflict = self.module.sound_entity(name).map(|(e, _)| entity_kind(e));
        if let Some(kind) = conflict {
            self.error(
                Diagnostic::error("duplicate_class", at.clone())
                    .with_message(format!("name '{}' is already used by a {}", name, kind)),
            );
            return;
        }
        self.module.class_names.insert(name.to_string(), id);
    }

    /// A named class import brings the class, its member glyphs, and the
    /// traits it encodes.
    fn adopt_class(&mut self, name: &str, id: ClassId, at: &Span) {
        self.adopt_class_name(name, id, at);
        let members = self.module.class(id).phonemes.clone();
        for member in members {
            let glyph = self.module.phoneme(member).glyph.clone();
            self.adopt_phoneme_glyph(&glyph, member, at);
        }
        let encodes = self.module.class(id).encodes.clone();
        for trait_id in encodes {
            let trait_name = self.module.trait_def(trait_id).name.clone();
            if self.module.trait_by_name(&trait_name).is_none() {
                self.adopt_trait(&trait_name, trait_id, at);
            }
        }
    }

    fn adopt_series_name(&mut self, name: &str, id: SeriesId, at: &Span) {
        let conflict = self.module.sound_entity(name).map(|(e, _)| entity_kind(e));
        if let Some(kind) = conflict {
            self.error(
                Diagnostic::error("duplicate_series", at.clone())
                    .with_message(format!("name '{}' is already used by a {}", name, kind)),
            );
            return;
        }
        self.module.series_names.insert(name.to_string(), id);
    }

    fn adopt_phoneme_glyph(&mut self, glyph: &str, id: PhonemeId, at: &Span) {
        let conflict = self.module.sound_entity(glyph).map(|(e, _)| entity_kind(e));
        if let Some(kind) = conflict {
            self.error(
                Diagnostic::error("duplicate_phoneme", at.clone())
                    .with_message(format!("name '{}' is already used by a {}", glyph, kind)),
            );
            return;
        }
        self.module.phoneme_glyphs.insert(glyph.to_string(), id);
    }

    fn adopt_word(&mut self, gloss: &str, word: Word, at: &Span) {
        if self.module.words.contains_key(gloss) {
            self.error(
                Diagnostic::error("duplicate_word", at.clone())
                    .with_message(format!("word '{}' is already defined", gloss)),
            );
            return;
        }
        self.module.words.insert(gloss.to_string(), word);
    }

    fn adopt_milestone(&mut self, milestone: Milestone) {
        if !self.module.milestones.contains(&milestone) {
            self.module.milestones.push(milestone);
        }
        let language = self.module.language_mut(milestone.language);
        if !language.milestones.contains(&milestone) {
            language.milestones.push(milestone);
        }
    }

    // ---- declarations ----

    fn language(&mut self, stmt: &ast::LanguageStmt) -> bool {
        if self.module.language_by_id(&stmt.id.node).is_some() {
            self.error(
                Diagnostic::error("duplicate_language", stmt.id.span.clone())
                    .with_message(format!("language '{}' is already defined", stmt.id.node)),
            );
            return true;
        }
        let parent = match &stmt.parent {
            Some(parent) => match self.module.language_by_id(&parent.node) {
                Some(id) => Some(id),
                None => {
                    self.error(
                        Diagnostic::error("unresolved_language", parent.span.clone())
                            .with_message(format!("language '{}' is not defined", parent.node)),
                    );
                    None
                }
            },
            None => None,
        };

        let id = LanguageId(self.module.languages.len());
        self.module.languages.push(Language {
            id: stmt.id.node.clone(),
            name: stmt
                .display_name
                .as_ref()
                .map(|n| n.node.clone())
                .unwrap_or_else(|| stmt.id.node.clone()),
            parent,
            milestones: Vec::new(),
            declared_at: stmt.id.span.clone(),
        });
        self.module.language_ids.insert(stmt.id.node.clone(), id);
        true
    }

    fn milestone(&mut self, stmt: &ast::MilestoneStmt) -> bool {
        match &stmt.time {
            Some(ast::TimeSpec::Instant(starts)) => {
                self.starts = Some(starts.node);
                self.ends = Some(f64::INFINITY);
            }
            Some(ast::TimeSpec::Range { starts, ends }) => {
                if starts.node >= ends.node {
                    self.error(
                        Diagnostic::error(
                            "milestone_range_inverted",
                            starts.span.merge(&ends.span),
                        )
                        .with_message(format!(
                            "milestone range {}-{} is empty",
                            starts.node, ends.node
                        )),
                    );
                } else {
                    self.starts = Some(starts.node);
                    self.ends = Some(ends.node);
                }
            }
            None => {}
        }
        if let Some(language) = &stmt.language {
            match self.module.language_by_id(&language.node) {
                Some(id) => self.language = Some(id),
                None => {
                    self.error(
                        Diagnostic::error("unresolved_language", language.span.clone())
                            .with_message(format!("language '{}' is not defined", language.node)),
                    );
                }
            }
        }

        if let (Some(language), Some(starts), Some(ends)) = (self.language, self.starts, self.ends)
        {
            self.adopt_milestone(Milestone {
                starts,
                ends,
                language,
            });
        }
        true
    }

    fn trait_decl(&mut self, stmt: &ast::TraitStmt) -> bool {
        if self.module.trait_by_name(&stmt.name.node).is_some() {
            self.error(
                Diagnostic::error("duplicate_trait", stmt.name.span.clone())
                    .with_message(format!("trait '{}' is already declared", stmt.name.node)),
            );
            return true;
        }

        let trait_id = TraitId(self.module.traits.len());
        let mut features = Vec::new();
        let mut default = None;
        for decl in &stmt.features {
            let feature_id = FeatureId(self.module.features.len());
            let mut labels = Vec::new();
            for label in &decl.labels {
                if self.module.feature_by_label(&label.node).is_some() {
                    self.error(
                        Diagnostic::error("duplicate_feature_label", label.span.clone())
                            .with_message(format!(
                                "label '{}' already names a feature",
                                label.node
                            ))
                            .add_param("label", label.node.clone()),
                    );
                    continue;
                }
                self.module
                    .feature_labels
                    .insert(label.node.clone(), feature_id);
                labels.push(Label {
                    text: label.node.clone(),
                    span: label.span.clone(),
                });
            }
            if labels.is_empty() {
                continue;
            }
            self.module.features.push(Feature { labels, trait_id });
            features.push(feature_id);
            if decl.default {
                if default.is_some() {
                    self.error(
                        Diagnostic::error("multiple_default_features", decl.span.clone())
                            .with_message(format!(
                                "trait '{}' already has a default feature",
                                stmt.name.node
                            )),
                    );
                } else {
                    default = Some(feature_id);
                }
            }
        }

        if features.is_empty() {
            self.error(
                Diagnostic::error("empty_trait", stmt.name.span.clone())
                    .with_message(format!("trait '{}' has no usable features", stmt.name.node)),
            );
            return true;
        }
        let default = default.unwrap_or(features[0]);
        self.module.traits.push(Trait {
            name: stmt.name.node.clone(),
            features,
            default,
            declared_at: stmt.name.span.clone(),
        });
        self.module
            .trait_names
            .insert(stmt.name.node.clone(), trait_id);
        true
    }

    fn class(&mut self, stmt: &ast::ClassStmt) -> bool {
        if self.sound_conflict("class", &stmt.name) {
            return true;
        }
        let mut encodes = Vec::new();
        for name in &stmt.encodes {
            match self.module.trait_by_name(&name.node) {
                Some(id) => encodes.push(id),
                None => {
                    self.error(
                        Diagnostic::error("unresolved_trait", name.span.clone())
                            .with_message(format!("trait '{}' is not declared", name.node)),
                    );
                    return true;
                }
            }
        }

        let class_id = ClassId(self.module.classes.len());
        self.module.classes.push(Class {
            name: stmt.name.node.clone(),
            encodes: encodes.clone(),
            phonemes: Vec::new(),
            declared_at: stmt.name.span.clone(),
        });
        self.module
            .class_names
            .insert(stmt.name.node.clone(), class_id);

        for decl in &stmt.phonemes {
            if self.sound_conflict("phoneme", &decl.glyph) {
                continue;
            }
            let index = self.module.phoneme_seq;
            self.module.phoneme_seq += 1;

            if decl.features.len() != encodes.len() {
                self.error(
                    Diagnostic::error("feature_arity_mismatch", decl.span.clone())
                        .with_message(format!(
                            "phoneme '{}' gives {} features but class '{}' encodes {}",
                            decl.glyph.node,
                            decl.features.len(),
                            stmt.name.node,
                            encodes.len()
                        ))
                        .add_param("expected", encodes.len())
                        .add_param("found", decl.features.len()),
                );
            }
            let mut features = IndexMap::new();
            for (slot, label) in decl.features.iter().enumerate() {
                let Some(&trait_id) = encodes.get(slot) else {
                    break;
                };
                match self.module.feature_by_label(&label.node) {
                    Some(feature_id) if self.module.feature(feature_id).trait_id == trait_id => {
                        features.insert(trait_id, feature_id);
                    }
                    _ => {
                        let trait_name = self.module.trait_def(trait_id).name.clone();
                        self.error(
                            Diagnostic::error("unresolved_feature", label.span.clone())
                                .with_message(format!(
                                    "'{}' is not a feature of trait '{}'",
                                    label.node, trait_name
                                )),
                        );
                    }
                }
            }

            let phoneme_id = PhonemeId(self.module.phonemes.len());
            self.module.phonemes.push(Phoneme {
                glyph: decl.glyph.node.clone(),
                features,
                class: class_id,
                index,
                declared_at: decl.glyph.span.clone(),
            });
            self.module.classes[class_id.0].phonemes.push(phoneme_id);
            self.module
                .phoneme_glyphs
                .insert(decl.glyph.node.clone(), phoneme_id);
        }
        true
    }

    fn series(&mut self, stmt: &ast::SeriesStmt) -> bool {
        if self.sound_conflict("series", &stmt.name) {
            return true;
        }
        let kind = match &stmt.body {
            ast::SeriesBody::List(glyphs) => {
                let mut members = Vec::new();
                for glyph in glyphs {
                    match self.module.phoneme_by_glyph(&glyph.node) {
                        Some(id) => members.push(id),
                        None => {
                            self.error(
                                Diagnostic::error("unresolved_phoneme", glyph.span.clone())
                                    .with_message(format!(
                                        "phoneme '{}' is not declared",
                                        glyph.node
                                    )),
                            );
                        }
                    }
                }
                SeriesKind::List(members)
            }
            ast::SeriesBody::Category(expr) => match self.compile_category(expr) {
                Some(category) => SeriesKind::Category(category),
                None => return true,
            },
        };

        let series_id = SeriesId(self.module.series.len());
        self.module.series.push(Series {
            name: stmt.name.node.clone(),
            kind,
            declared_at: stmt.name.span.clone(),
        });
        self.module
            .series_names
            .insert(stmt.name.node.clone(), series_id);
        true
    }

    fn word(&mut self, stmt: &ast::WordStmt) -> bool {
        if !self.can_tag() {
            self.error(
                Diagnostic::error("missing_milestone", stmt.span.clone())
                    .with_message("a word cannot be defined before a milestone"),
            );
            return true;
        }
        if self.module.words.contains_key(&stmt.gloss.node) {
            self.error(
                Diagnostic::error("duplicate_word", stmt.gloss.span.clone())
                    .with_message(format!("word '{}' is already defined", stmt.gloss.node)),
            );
            return true;
        }
        let phonemes = match self.module.match_transcription(&stmt.pronunciation.node) {
            Ok(matches) => matches.into_iter().map(|m| m.phoneme).collect(),
            Err(err) => {
                self.transcription_error(&err, &stmt.pronunciation.span);
                return true;
            }
        };

        let tag = self.materialize_tag();
        let word = Word {
            gloss: stmt.gloss.node.clone(),
            phonemes,
            definitions: stmt
                .definitions
                .iter()
                .map(|d| Definition {
                    part_of_speech: d.part_of_speech.as_ref().map(|p| p.node.clone()),
                    text: d.text.node.clone(),
                })
                .collect(),
            tag,
            definition_site: stmt.span.clone(),
            etymology: Vec::new(),
        };
        self.module.words.insert(stmt.gloss.node.clone(), word);
        true
    }

    fn change(&mut self, stmt: &ast::ChangeStmt) -> bool {
        if !self.can_tag() {
            self.error(
                Diagnostic::error("missing_milestone", stmt.span.clone())
                    .with_message("a sound change cannot be defined before a milestone"),
            );
            return true;
        }

        let source = match &stmt.source {
            ast::SourceExpr::Empty(_) => SourcePattern::Empty,
            ast::SourceExpr::Segments(exprs) => {
                let mut segments = Vec::new();
                for expr in exprs {
                    match expr {
                        ast::SegmentExpr::Literal(run) => match self.compile_segment_run(run) {
                            Some(mut run_segments) => segments.append(&mut run_segments),
                            None => return true,
                        },
                        ast::SegmentExpr::Category(expr) => match self.compile_category(expr) {
                            Some(category) => segments.push(Segment::Category(category)),
                            None => return true,
                        },
                    }
                }
                SourcePattern::Sequence(segments)
            }
        };

        let target = match &stmt.target {
            ast::TargetExpr::Empty(_) => Target::Empty,
            ast::TargetExpr::Literal(runs) => {
                let mut phonemes = Vec::new();
                for run in runs {
                    match self.module.match_transcription(&run.node) {
                        Ok(matches) => {
                            phonemes.extend(matches.into_iter().map(|m| m.phoneme));
                        }
                        Err(err) => {
                            self.transcription_error(&err, &run.span);
                            return true;
                        }
                    }
                }
                Target::Phonemes(phonemes)
            }
            ast::TargetExpr::Modification(exprs, span) => {
                let modifiers = self.compile_modifiers(exprs);
                if modifiers.is_empty() {
                    self.error(
                        Diagnostic::error("empty_modification", span.clone())
                            .with_message("no usable modifiers in the change target"),
                    );
                    return true;
                }
                Target::Modification(modifiers)
            }
        };

        let environment = match &stmt.environment {
            Some(expr) => match self.compile_environment(expr) {
                Some(environment) => Some(environment),
                None => return true,
            },
            None => None,
        };

        let tag = self.materialize_tag();
        self.module.sound_changes.push(SoundChange {
            source,
            target,
            environment,
            description: stmt.description.as_ref().map(|d| d.node.clone()),
            tag,
            definition_site: stmt.span.clone(),
        });
        true
    }

    // ---- shared lowering ----

    /// A glyph run in a pattern position. A run naming a class or series
    /// stands for that base as a category; anything else is segmented
    /// against the inventory.
    fn compile_segment_run(&mut self, run: &Spanned<String>) -> Option<Vec<Segment>> {
        if let Some((entity, _)) = self.module.sound_entity(&run.node) {
            return Some(vec![match entity {
                SoundEntity::Class(id) => {
                    Segment::Category(Category::with_base(CategoryBase::Class(id)))
                }
                SoundEntity::Series(id) => {
                    Segment::Category(Category::with_base(CategoryBase::Series(id)))
                }
                SoundEntity::Phoneme(id) => Segment::Phoneme(id),
            }]);
        }
        match self.module.match_transcription(&run.node) {
            Ok(matches) => Some(
                matches
                    .into_iter()
                    .map(|m| Segment::Phoneme(m.phoneme))
                    .collect(),
            ),
            Err(err) => {
                self.transcription_error(&err, &run.span);
                None
            }
        }
    }

    fn compile_modifiers(&mut self, exprs: &[ast::ModifierExpr]) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        for expr in exprs {
            match self.module.feature_by_label(&expr.label.node) {
                Some(feature) => modifiers.push(Modifier {
                    feature,
                    sign: if expr.positive {
                        ModifierSign::Positive
                    } else {
                        ModifierSign::Negative
                    },
                }),
                None => {
                    self.error(
                        Diagnostic::error("unresolved_feature", expr.label.span.clone())
                            .with_message(format!(
                                "'{}' does not name a feature",
                                expr.label.node
                            )),
                    );
                }
            }
        }
        modifiers
    }

    fn compile_category(&mut self, expr: &ast::CategoryExpr) -> Option<Category> {
        let base = match &expr.base {
            Some(name) => match self.module.sound_entity(&name.node).map(|(e, _)| e) {
                Some(SoundEntity::Class(id)) => Some(CategoryBase::Class(id)),
                Some(SoundEntity::Series(id)) => Some(CategoryBase::Series(id)),
                Some(SoundEntity::Phoneme(_)) => {
                    self.error(
                        Diagnostic::error("invalid_category_base", name.span.clone())
                            .with_message(format!(
                                "'{}' is a phoneme, not a class or series",
                                name.node
                            )),
                    );
                    return None;
                }
                None => {
                    self.error(
                        Diagnostic::error("unresolved_category_base", name.span.clone())
                            .with_message(format!(
                                "'{}' does not name a class or series",
                                name.node
                            )),
                    );
                    return None;
                }
            },
            None => None,
        };
        Some(Category {
            base,
            modifiers: self.compile_modifiers(&expr.modifiers),
        })
    }

    /// Syllable boundaries parse but carry no weight in matching; they are
    /// dropped here.
    fn compile_environment(&mut self, expr: &ast::EnvironmentExpr) -> Option<Environment> {
        let mut compile_side = |compiler: &mut Self, elements: &[ast::EnvElementExpr]| {
            let mut side = Vec::new();
            for element in elements {
                match element {
                    ast::EnvElementExpr::SyllableBreak(_) => {}
                    ast::EnvElementExpr::Literal(run) => {
                        side.append(&mut compiler.compile_segment_run(run)?);
                    }
                    ast::EnvElementExpr::Category(expr) => {
                        side.push(Segment::Category(compiler.compile_category(expr)?));
                    }
                }
            }
            Some(side)
        };
        let before = compile_side(self, &expr.before)?;
        let after = compile_side(self, &expr.after)?;
        Some(Environment {
            before,
            after,
            anchor_start: expr.anchor_start,
            anchor_end: expr.anchor_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MockResolver;

    const INVENTORY: &str = "\
trait Voicing { *voiceless, voiced }
trait Place { bilabial, alveolar, palatal, velar }
class C encodes (Voicing, Place) {
  p = (voiceless, bilabial),
  t = (voiceless, alveolar),
  k = (voiceless, velar),
  c = (voiceless, palatal),
  g = (voiced, velar),
}
trait Height { high, low }
class V encodes (Height) {
  i = (high),
  e = (low),
}
";

    fn compile(source: &str) -> Module {
        compile_module(source, "test", &MockResolver::new())
    }

    fn codes(module: &Module) -> Vec<&str> {
        module.errors.iter().map(|e| e.code.as_ref()).collect()
    }

    #[test]
    fn test_clean_inventory_compiles() {
        let module = compile(INVENTORY);
        assert!(module.errors.is_empty(), "{:?}", module.errors);
        assert!(module.has_entity("C"));
        assert!(module.has_entity("k"));
        assert!(module.trait_by_name("Voicing").is_some());
    }

    #[test]
    fn test_phoneme_indices_increase() {
        let module = compile(INVENTORY);
        let indices: Vec<usize> = module
            .phoneme_glyphs
            .values()
            .map(|&id| module.phoneme(id).index)
            .collect();
        for window in indices.windows(2) {
            assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn test_default_feature_marker() {
        let module = compile(INVENTORY);
        let voicing = module.trait_by_name("Voicing").unwrap();
        let default = module.trait_def(voicing).default;
        assert_eq!(module.feature(default).name(), "voiceless");

        // unmarked traits default to the first feature
        let height = module.trait_by_name("Height").unwrap();
        let default = module.trait_def(height).default;
        assert_eq!(module.feature(default).name(), "high");
    }

    #[test]
    fn test_duplicate_declarations() {
        let source = format!("{}\ntrait Voicing {{ x }}\nclass C encodes (Height) {{ o = (high) }}", INVENTORY);
        let module = compile(&source);
        assert!(codes(&module).contains(&"duplicate_trait"));
        assert!(codes(&module).contains(&"duplicate_class"));
    }

    #[test]
    fn test_duplicate_feature_label_across_traits() {
        let module = compile("trait A { x }\ntrait B { x | y }");
        assert!(codes(&module).contains(&"duplicate_feature_label"));
        // the non-conflicting label still resolves
        assert!(module.feature_by_label("y").is_some());
    }

    #[test]
    fn test_feature_arity_mismatch_keeps_partial_features() {
        let module = compile(
            "trait Voicing { *voiceless, voiced }\n\
             trait Place { bilabial, velar }\n\
             class C encodes (Voicing, Place) { k = (voiceless) }",
        );
        assert!(codes(&module).contains(&"feature_arity_mismatch"));
        let k = module.phoneme_by_glyph("k").unwrap();
        assert_eq!(module.phoneme(k).features.len(), 1);
    }

    #[test]
    fn test_word_before_milestone() {
        let module = compile("lang ON\n- I /ek/");
        assert!(codes(&module).contains(&"missing_milestone"));
        assert!(module.words.is_empty());
    }

    #[test]
    fn test_change_before_milestone() {
        let source = format!("{}\n$ k > c", INVENTORY);
        let module = compile(&source);
        assert!(codes(&module).contains(&"missing_milestone"));
        assert!(module.sound_changes.is_empty());
    }

    #[test]
    fn test_milestone_range_inverted() {
        let module = compile("lang ON\n@ 1500-1400, ON");
        assert!(codes(&module).contains(&"milestone_range_inverted"));
    }

    #[test]
    fn test_milestones_recorded_and_deduplicated() {
        let module = compile("lang ON\n@ 1350, ON\n@ 1350, ON\n@ 1400, ON");
        assert_eq!(module.milestones.len(), 2);
        let on = module.language_by_id("ON").unwrap();
        assert_eq!(module.language(on).milestones.len(), 2);
    }

    #[test]
    fn test_word_transcription_failure() {
        let source = format!("{}\nlang ON\n@ 1350, ON\n- I /ex/", INVENTORY);
        let module = compile(&source);
        let error = module
            .errors
            .iter()
            .find(|e| e.code == "transcription_error")
            .expect("expected a transcription error");
        assert_eq!(error.params.get("rest").unwrap().as_str().unwrap(), "x");
        assert!(module.words.is_empty());
    }

    #[test]
    fn test_series_list_skips_unresolved() {
        let source = format!("{}\nseries S [k, zz, t]", INVENTORY);
        let module = compile(&source);
        assert!(codes(&module).contains(&"unresolved_phoneme"));
        let series = module.series_names.get("S").copied().unwrap();
        match &module.series_def(series).kind {
            SeriesKind::List(members) => assert_eq!(members.len(), 2),
            other => panic!("expected a list series, got {:?}", other),
        }
    }

    #[test]
    fn test_category_series() {
        let source = format!("{}\nseries Voiced = [C+voiced]", INVENTORY);
        let module = compile(&source);
        assert!(module.errors.is_empty(), "{:?}", module.errors);
        let series = module.series_names.get("Voiced").copied().unwrap();
        let g = module.phoneme_by_glyph("g").unwrap();
        let k = module.phoneme_by_glyph("k").unwrap();
        match &module.series_def(series).kind {
            SeriesKind::Category(category) => {
                assert!(category.contains(g, &module));
                assert!(!category.contains(k, &module));
            }
            other => panic!("expected a category series, got {:?}", other),
        }
    }

    #[test]
    fn test_change_with_class_literal_in_environment() {
        let source = format!("{}\nlang ON\n@ 1350, ON\n$ k > c / V_V", INVENTORY);
        let module = compile(&source);
        assert!(module.errors.is_empty(), "{:?}", module.errors);
        let change = &module.sound_changes[0];
        let environment = change.environment.as_ref().unwrap();
        assert_eq!(environment.before.len(), 1);
        assert!(matches!(environment.before[0], Segment::Category(_)));
    }

    #[test]
    fn test_tag_indices_increase() {
        let source = format!(
            "{}\nlang ON\n@ 1350, ON\n- I /ek/\n$ k > c\n- go /ik/",
            INVENTORY
        );
        let module = compile(&source);
        assert!(module.errors.is_empty(), "{:?}", module.errors);
        let word_i = &module.words["I"];
        let change = &module.sound_changes[0];
        let word_go = &module.words["go"];
        assert!(word_i.tag.index < change.tag.index);
        assert!(change.tag.index < word_go.tag.index);
    }

    #[test]
    fn test_parse_error_stops_compilation() {
        let module = compile("lang ON\n???\nlang EI");
        assert_eq!(codes(&module), vec!["parse_error"]);
        assert!(module.language_by_id("ON").is_none());
    }
}
