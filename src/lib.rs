//! Chronlang: a compiler and rewrite engine for diachronic conlanging.
//!
//! A chronlang source describes a language family, its phonology, a
//! lexicon, and a time-tagged sequence of sound changes. Compiling it
//! yields a [`Module`](module::Module); asking the module for a
//! [`snapshot`](module::Module::snapshot) of a language at a point in time
//! rewrites every visible word by the sound laws that had taken effect by
//! then.
//!
//! ```
//! use chronlang::compiler::compile_module;
//! use chronlang::resolver::MockResolver;
//!
//! let source = "
//! trait Voicing { *voiceless, voiced }
//! class C encodes (Voicing) { k = (voiceless), g = (voiced) }
//! class V encodes (Voicing) { e = (voiced) }
//!
//! lang ON : Old Norse
//! @ 1350, ON
//! - I /ek/
//! $ k > g / e_
//! ";
//! let module = compile_module(source, "demo", &MockResolver::new());
//! assert!(module.errors.is_empty());
//!
//! let snapshot = module.snapshot("ON", 1400.0);
//! assert_eq!(snapshot.word("I").unwrap().render(&module), "eg");
//! ```

pub mod change;
pub mod compiler;
pub mod diagnostics;
pub mod language;
pub mod lexicon;
pub mod module;
pub mod phonology;
pub mod resolver;
pub mod snapshot;
pub mod span;
pub mod syntax;
pub mod transcription;

pub use compiler::compile_module;
pub use diagnostics::{Diagnostic, DiagnosticReport, Severity};
pub use module::Module;
pub use resolver::{MockResolver, ModuleResolver, ResolveError};
pub use snapshot::Snapshot;
