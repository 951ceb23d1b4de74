//! Module resolution.
//!
//! The engine never touches the filesystem itself; a resolver hands it
//! compiled modules for the paths an import names. [`MockResolver`] backs
//! the test suite with an in-memory name→source table, compiling on
//! demand with itself as the recursive resolver.

use std::collections::HashMap;

use thiserror::Error;

use crate::compiler::compile_module;
use crate::module::Module;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

pub trait ModuleResolver {
    /// Resolve `@scope/path`.
    fn resolve_scoped(&self, scope: &str, path: &str) -> Result<Module, ResolveError>;

    /// Resolve a relative or absolute path.
    fn resolve_local(&self, path: &str, absolute: bool) -> Result<Module, ResolveError>;
}

/// A resolver over a pre-populated name→source mapping. Scoped sources are
/// keyed as `@scope/path`, local ones by their literal path. The source
/// map must be acyclic; a cyclic import recurses without bound.
#[derive(Debug, Clone, Default)]
pub struct MockResolver {
    sources: HashMap<String, String>,
}

impl MockResolver {
    pub fn new() -> Self {
        MockResolver::default()
    }

    #[must_use]
    pub fn with_source(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(name.into(), source.into());
        self
    }

    fn compile(&self, key: &str) -> Result<Module, ResolveError> {
        match self.sources.get(key) {
            Some(source) => Ok(compile_module(source, key, self)),
            None => Err(ResolveError(format!("module '{}' not found", key))),
        }
    }
}

impl ModuleResolver for MockResolver {
    fn resolve_scoped(&self, scope: &str, path: &str) -> Result<Module, ResolveError> {
        self.compile(&format!("@{}/{}", scope, path))
    }

    fn resolve_local(&self, path: &str, _absolute: bool) -> Result<Module, ResolveError> {
        self.compile(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_module() {
        let resolver = MockResolver::new();
        assert!(resolver.resolve_local("./nowhere", false).is_err());
        assert!(resolver.resolve_scoped("core", "ipa").is_err());
    }

    #[test]
    fn test_compiles_on_demand() {
        let resolver = MockResolver::new().with_source("./norse", "lang ON : Old Norse");
        let module = resolver.resolve_local("./norse", false).unwrap();
        assert!(module.errors.is_empty());
        assert!(module.has_entity("ON"));
    }
}
