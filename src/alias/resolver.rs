//! Alias resolution.

use crate::core::error::ConfigError;
use crate::core::options::OptionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope an alias is defined at, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasScope {
    Field,
    Model,
    App,
    Global,
}

impl AliasScope {
    /// Scope implied by the number of dotted parts in a target key.
    fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(AliasScope::Global),
            1 => Some(AliasScope::App),
            2 => Some(AliasScope::Model),
            3 => Some(AliasScope::Field),
            _ => None,
        }
    }
}

impl fmt::Display for AliasScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AliasScope::Field => "field",
            AliasScope::Model => "model",
            AliasScope::App => "app",
            AliasScope::Global => "global",
        };
        f.write_str(name)
    }
}

/// The context an alias is resolved against: `app`, `app.Model` or
/// `app.Model.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasTarget {
    parts: Vec<String>,
}

impl AliasTarget {
    /// Parse a dotted target string.
    pub fn parse(target: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidAliasTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<String> = target.split('.').map(str::to_string).collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("empty component"));
        }
        if parts.len() > 3 {
            return Err(invalid("expected at most app.Model.field"));
        }
        Ok(Self { parts })
    }

    /// Scope of the target itself.
    pub fn scope(&self) -> AliasScope {
        AliasScope::from_depth(self.parts.len()).unwrap_or(AliasScope::Field)
    }

    /// Keys to consult, most specific first, excluding global.
    fn keys(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.parts.len()).rev().map(|n| self.parts[..n].join("."))
    }
}

impl fmt::Display for AliasTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

impl std::str::FromStr for AliasTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Serialized alias table: global aliases plus per-target tables keyed by
/// `app`, `app.Model` or `app.Model.field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub global: IndexMap<String, OptionSet>,
    pub targets: IndexMap<String, IndexMap<String, OptionSet>>,
}

/// One alias as stored in the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDefinition {
    pub name: String,
    pub scope: AliasScope,
    /// Target key the alias is attached to; `None` for global aliases.
    pub target: Option<String>,
    pub options: OptionSet,
}

/// Resolves alias names to option sets.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    global: IndexMap<String, OptionSet>,
    targets: IndexMap<String, IndexMap<String, OptionSet>>,
}

impl AliasResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver from a configuration table, validating target keys.
    pub fn from_config(config: &AliasConfig) -> Result<Self, ConfigError> {
        let mut resolver = Self::new();
        for (name, options) in &config.global {
            resolver.set(name.clone(), options.clone(), None);
        }
        for (target, aliases) in &config.targets {
            let target = AliasTarget::parse(target)?;
            for (name, options) in aliases {
                resolver.set(name.clone(), options.clone(), Some(&target));
            }
        }
        Ok(resolver)
    }

    /// Define (or replace) an alias. `None` defines it globally.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        options: OptionSet,
        target: Option<&AliasTarget>,
    ) {
        let name = name.into();
        match target {
            Some(target) => {
                self.targets
                    .entry(target.to_string())
                    .or_default()
                    .insert(name, options);
            }
            None => {
                self.global.insert(name, options);
            }
        }
    }

    /// Resolve `name` for `target`.
    ///
    /// Scans `field → model → app`, then `global` only when `include_global`
    /// is set. Returns the first non-empty definition without merging
    /// anything from less specific scopes. `None` means no such alias exists
    /// for this target.
    pub fn resolve(
        &self,
        name: &str,
        target: Option<&AliasTarget>,
        include_global: bool,
    ) -> Option<OptionSet> {
        let scoped = target.into_iter().flat_map(|t| t.keys()).find_map(|key| {
            self.targets
                .get(&key)
                .and_then(|aliases| aliases.get(name))
                .filter(|options| !options.is_empty())
        });

        let found = scoped.or_else(|| {
            include_global
                .then(|| self.global.get(name).filter(|options| !options.is_empty()))
                .flatten()
        });

        if let Some(options) = found {
            log::debug!("Resolved alias '{}' for {:?}", name, target.map(|t| t.to_string()));
            Some(options.clone())
        } else {
            None
        }
    }

    /// Every alias visible to `target`, more specific definitions shadowing
    /// less specific ones of the same name.
    pub fn all(
        &self,
        target: Option<&AliasTarget>,
        include_global: bool,
    ) -> IndexMap<String, OptionSet> {
        let mut visible = IndexMap::new();
        if include_global {
            for (name, options) in self.global.iter().filter(|(_, o)| !o.is_empty()) {
                visible.insert(name.clone(), options.clone());
            }
        }
        if let Some(target) = target {
            let keys: Vec<String> = target.keys().collect();
            for key in keys.iter().rev() {
                if let Some(aliases) = self.targets.get(key) {
                    for (name, options) in aliases.iter().filter(|(_, o)| !o.is_empty()) {
                        visible.insert(name.clone(), options.clone());
                    }
                }
            }
        }
        visible
    }

    /// All stored definitions, global first.
    pub fn definitions(&self) -> Vec<AliasDefinition> {
        let global = self.global.iter().map(|(name, options)| AliasDefinition {
            name: name.clone(),
            scope: AliasScope::Global,
            target: None,
            options: options.clone(),
        });
        let scoped = self.targets.iter().flat_map(|(key, aliases)| {
            let scope = AliasScope::from_depth(key.split('.').count()).unwrap_or(AliasScope::Field);
            aliases.iter().map(move |(name, options)| AliasDefinition {
                name: name.clone(),
                scope,
                target: Some(key.clone()),
                options: options.clone(),
            })
        });
        global.chain(scoped).collect()
    }

    /// Number of stored definitions.
    pub fn len(&self) -> usize {
        self.global.len() + self.targets.values().map(IndexMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OptionValue;

    fn target(s: &str) -> AliasTarget {
        AliasTarget::parse(s).unwrap()
    }

    fn opts(width: u32) -> OptionSet {
        OptionSet::new().with_size(Some(width), Some(width))
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(target("blog").scope(), AliasScope::App);
        assert_eq!(target("blog.Entry").scope(), AliasScope::Model);
        assert_eq!(target("blog.Entry.image").scope(), AliasScope::Field);
        assert!(AliasTarget::parse("a..b").is_err());
        assert!(AliasTarget::parse("a.b.c.d").is_err());
        assert!(AliasTarget::parse("").is_err());
    }

    #[test]
    fn test_field_shadows_global() {
        let mut resolver = AliasResolver::new();
        resolver.set("small", opts(50).with("crop", true), None);
        resolver.set("small", opts(20), Some(&target("blog.Entry.image")));

        let resolved = resolver
            .resolve("small", Some(&target("blog.Entry.image")), true)
            .unwrap();
        assert_eq!(resolved, opts(20));
        assert!(resolved.get("crop").is_none());
    }

    #[test]
    fn test_precedence_order() {
        let mut resolver = AliasResolver::new();
        resolver.set("thumb", opts(1), None);
        resolver.set("thumb", opts(2), Some(&target("blog")));
        resolver.set("thumb", opts(3), Some(&target("blog.Entry")));

        let field = target("blog.Entry.image");
        assert_eq!(resolver.resolve("thumb", Some(&field), true), Some(opts(3)));

        let other_model = target("blog.Author.avatar");
        assert_eq!(resolver.resolve("thumb", Some(&other_model), true), Some(opts(2)));

        let other_app = target("shop.Item.photo");
        assert_eq!(resolver.resolve("thumb", Some(&other_app), true), Some(opts(1)));
    }

    #[test]
    fn test_global_skipped_unless_included() {
        let mut resolver = AliasResolver::new();
        resolver.set("small", opts(50), None);

        assert!(resolver.resolve("small", Some(&target("blog")), false).is_none());
        assert!(resolver.resolve("small", None, false).is_none());
        assert_eq!(resolver.resolve("small", None, true), Some(opts(50)));
        assert!(resolver.resolve("large", None, true).is_none());
    }

    #[test]
    fn test_empty_definition_falls_through() {
        let mut resolver = AliasResolver::new();
        resolver.set("small", opts(50), None);
        resolver.set("small", OptionSet::new(), Some(&target("blog")));

        assert_eq!(resolver.resolve("small", Some(&target("blog")), true), Some(opts(50)));
    }

    #[test]
    fn test_all_merges_by_name() {
        let mut resolver = AliasResolver::new();
        resolver.set("small", opts(50), None);
        resolver.set("large", opts(500), None);
        resolver.set("small", opts(25), Some(&target("blog.Entry")));

        let all = resolver.all(Some(&target("blog.Entry.image")), true);
        assert_eq!(all.len(), 2);
        assert_eq!(all["small"], opts(25));
        assert_eq!(all["large"], opts(500));

        let scoped_only = resolver.all(Some(&target("blog.Entry.image")), false);
        assert_eq!(scoped_only.len(), 1);
    }

    #[test]
    fn test_from_config() {
        let mut config = AliasConfig::default();
        config.global.insert("small".to_string(), opts(50));
        config
            .targets
            .entry("blog.Entry.image".to_string())
            .or_default()
            .insert("small".to_string(), opts(10).with("bw", OptionValue::Boolean(true)));

        let resolver = AliasResolver::from_config(&config).unwrap();
        assert_eq!(resolver.len(), 2);

        let definitions = resolver.definitions();
        assert_eq!(definitions[0].scope, AliasScope::Global);
        assert_eq!(definitions[1].scope, AliasScope::Field);
        assert_eq!(definitions[1].target.as_deref(), Some("blog.Entry.image"));

        config.targets.insert("bad..target".to_string(), IndexMap::new());
        assert!(AliasResolver::from_config(&config).is_err());
    }
}
