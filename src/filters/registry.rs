//! Strategy registry for generators, processors and namers.
//!
//! Strategies are registered once (usually at startup) and looked up by id
//! when a `Thumbnailer` is built, replacing string-based dynamic imports.

use crate::core::error::{StrategyKind, ThumbnailError, ThumbnailResult};
use crate::filters::strategy::{Processor, SourceGenerator};
use crate::naming::namers::Namer;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Registry of every available strategy, keyed by id.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    generators: IndexMap<String, Arc<dyn SourceGenerator>>,
    processors: IndexMap<String, Arc<dyn Processor>>,
    namers: IndexMap<String, Arc<dyn Namer>>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::filters::builtin::register_all(&mut registry);
        crate::naming::namers::register(&mut registry);
        registry
    }

    /// Shared registry of built-in strategies.
    pub fn builtin() -> &'static StrategyRegistry {
        static BUILTIN: OnceLock<StrategyRegistry> = OnceLock::new();
        BUILTIN.get_or_init(StrategyRegistry::with_builtins)
    }

    /// Register a source generator. Replaces any generator with the same id.
    pub fn register_generator(&mut self, generator: Arc<dyn SourceGenerator>) {
        self.generators.insert(generator.id().to_string(), generator);
    }

    /// Register a processor. Replaces any processor with the same id.
    pub fn register_processor(&mut self, processor: Arc<dyn Processor>) {
        self.processors.insert(processor.id().to_string(), processor);
    }

    /// Register a namer. Replaces any namer with the same id.
    pub fn register_namer(&mut self, namer: Arc<dyn Namer>) {
        self.namers.insert(namer.id().to_string(), namer);
    }

    pub fn generator(&self, id: &str) -> Option<Arc<dyn SourceGenerator>> {
        self.generators.get(id).cloned()
    }

    pub fn processor(&self, id: &str) -> Option<Arc<dyn Processor>> {
        self.processors.get(id).cloned()
    }

    pub fn namer(&self, id: &str) -> Option<Arc<dyn Namer>> {
        self.namers.get(id).cloned()
    }

    /// Resolve generator ids in order, failing on the first unknown id.
    pub fn resolve_generators(
        &self,
        ids: &[String],
    ) -> ThumbnailResult<Vec<Arc<dyn SourceGenerator>>> {
        ids.iter()
            .map(|id| self.generator(id).ok_or_else(|| unknown(StrategyKind::Generator, id)))
            .collect()
    }

    /// Resolve processor ids in order, failing on the first unknown id.
    pub fn resolve_processors(&self, ids: &[String]) -> ThumbnailResult<Vec<Arc<dyn Processor>>> {
        ids.iter()
            .map(|id| self.processor(id).ok_or_else(|| unknown(StrategyKind::Processor, id)))
            .collect()
    }

    pub fn resolve_namer(&self, id: &str) -> ThumbnailResult<Arc<dyn Namer>> {
        self.namer(id).ok_or_else(|| unknown(StrategyKind::Namer, id))
    }

    /// Check if a strategy of the given kind is registered.
    pub fn contains(&self, kind: StrategyKind, id: &str) -> bool {
        match kind {
            StrategyKind::Generator => self.generators.contains_key(id),
            StrategyKind::Processor => self.processors.contains_key(id),
            StrategyKind::Namer => self.namers.contains_key(id),
        }
    }

    /// Registered ids of one kind, in registration order.
    pub fn ids(&self, kind: StrategyKind) -> Vec<&str> {
        let keys: Box<dyn Iterator<Item = &String>> = match kind {
            StrategyKind::Generator => Box::new(self.generators.keys()),
            StrategyKind::Processor => Box::new(self.processors.keys()),
            StrategyKind::Namer => Box::new(self.namers.keys()),
        };
        keys.map(String::as_str).collect()
    }

    /// Unregister a strategy.
    pub fn unregister(&mut self, kind: StrategyKind, id: &str) -> bool {
        match kind {
            StrategyKind::Generator => self.generators.shift_remove(id).is_some(),
            StrategyKind::Processor => self.processors.shift_remove(id).is_some(),
            StrategyKind::Namer => self.namers.shift_remove(id).is_some(),
        }
    }

    /// Total number of registered strategies.
    pub fn len(&self) -> usize {
        self.generators.len() + self.processors.len() + self.namers.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("generators", &self.ids(StrategyKind::Generator))
            .field("processors", &self.ids(StrategyKind::Processor))
            .field("namers", &self.ids(StrategyKind::Namer))
            .finish()
    }
}

fn unknown(kind: StrategyKind, id: &str) -> ThumbnailError {
    ThumbnailError::UnknownStrategy {
        kind,
        id: id.to_string(),
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    registry: StrategyRegistry,
    include_builtins: bool,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: StrategyRegistry::new(),
            include_builtins: true,
        }
    }

    /// Include or exclude built-in strategies.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    pub fn generator(mut self, generator: Arc<dyn SourceGenerator>) -> Self {
        self.registry.register_generator(generator);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.registry.register_processor(processor);
        self
    }

    pub fn namer(mut self, namer: Arc<dyn Namer>) -> Self {
        self.registry.register_namer(namer);
        self
    }

    /// Build the registry. Custom strategies override built-ins of the same id.
    pub fn build(self) -> StrategyRegistry {
        if !self.include_builtins {
            return self.registry;
        }
        let mut registry = StrategyRegistry::with_builtins();
        for generator in self.registry.generators.into_values() {
            registry.register_generator(generator);
        }
        for processor in self.registry.processors.into_values() {
            registry.register_processor(processor);
        }
        for namer in self.registry.namers.into_values() {
            registry.register_namer(namer);
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
