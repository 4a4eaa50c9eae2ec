//! Per-source facade tying configuration, aliases and the pipeline together.

use crate::alias::{AliasResolver, AliasTarget};
use crate::core::error::{ThumbnailError, ThumbnailResult};
use crate::core::options::{normalize, OptionSet, ALIAS, QUALITY};
use crate::core::settings::{PreserveExtensions, ThumbnailSettings};
use crate::core::source::{SourceDescriptor, Storage};
use crate::core::types::ThumbnailArtifact;
use crate::execution::engine::GenerationPipeline;
use crate::filters::registry::StrategyRegistry;
use crate::naming::deriver::KeyDeriver;
use rayon::prelude::*;
use std::sync::Arc;

/// Builder for a [`Thumbnailer`].
///
/// Starts from process-wide defaults; every `with_*` call overrides one
/// setting for this instance only.
#[derive(Debug, Clone)]
pub struct ThumbnailerBuilder {
    source: SourceDescriptor,
    settings: ThumbnailSettings,
    registry: Option<Arc<StrategyRegistry>>,
    aliases: Arc<AliasResolver>,
    alias_target: Option<AliasTarget>,
}

impl ThumbnailerBuilder {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            settings: ThumbnailSettings::default(),
            registry: None,
            aliases: Arc::new(AliasResolver::new()),
            alias_target: None,
        }
    }

    /// Replace every setting at once.
    pub fn with_settings(mut self, settings: ThumbnailSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_basedir(mut self, basedir: impl Into<String>) -> Self {
        self.settings.basedir = basedir.into();
        self
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.settings.subdir = subdir.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.prefix = prefix.into();
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.settings.quality = quality;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.settings.extension = extension.into();
        self
    }

    pub fn with_preserve_extensions(mut self, preserve: PreserveExtensions) -> Self {
        self.settings.preserve_extensions = preserve;
        self
    }

    pub fn with_transparency_extension(mut self, extension: impl Into<String>) -> Self {
        self.settings.transparency_extension = extension.into();
        self
    }

    /// Naming strategy id, resolved when the thumbnailer is built.
    pub fn with_namer(mut self, namer: impl Into<String>) -> Self {
        self.settings.namer = namer.into();
        self
    }

    pub fn with_source_generators<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.source_generators = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_processors<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.processors = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Options merged under every request.
    pub fn with_default_options(mut self, options: OptionSet) -> Self {
        self.settings.default_options = options;
        self
    }

    /// Resolve strategies against `registry` instead of the built-ins.
    pub fn with_registry(mut self, registry: Arc<StrategyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_aliases(mut self, aliases: Arc<AliasResolver>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Target (`app`, `app.Model` or `app.Model.field`) used for alias lookups.
    pub fn with_alias_target(mut self, target: AliasTarget) -> Self {
        self.alias_target = Some(target);
        self
    }

    /// Resolve every strategy id and build the thumbnailer.
    pub fn build(self) -> ThumbnailResult<Thumbnailer> {
        if self.source.name().is_empty() {
            return Err(ThumbnailError::InvalidSourceName);
        }

        let registry: &StrategyRegistry = match &self.registry {
            Some(registry) => registry,
            None => StrategyRegistry::builtin(),
        };
        let generators = registry.resolve_generators(&self.settings.source_generators)?;
        let processors = registry.resolve_processors(&self.settings.processors)?;
        let namer = registry.resolve_namer(&self.settings.namer)?;

        log::debug!(
            "Thumbnailer for '{}' uses namer '{}', {} generators, {} processors",
            self.source.name(),
            namer.id(),
            generators.len(),
            processors.len()
        );

        let settings = Arc::new(self.settings);
        let deriver = KeyDeriver::new(settings.clone(), namer);
        Ok(Thumbnailer {
            source: self.source,
            settings,
            pipeline: GenerationPipeline::new(generators, processors, deriver),
            aliases: self.aliases,
            alias_target: self.alias_target,
        })
    }
}

/// Generates and names thumbnails for one source.
///
/// Configuration is fixed at construction; every call owns its own option
/// set and image, so one thumbnailer can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct Thumbnailer {
    source: SourceDescriptor,
    settings: Arc<ThumbnailSettings>,
    pipeline: GenerationPipeline,
    aliases: Arc<AliasResolver>,
    alias_target: Option<AliasTarget>,
}

impl Thumbnailer {
    pub fn builder(source: SourceDescriptor) -> ThumbnailerBuilder {
        ThumbnailerBuilder::new(source)
    }

    /// Thumbnailer with default settings for a source read through `storage`.
    pub fn named(name: impl Into<String>, storage: Arc<dyn Storage>) -> ThumbnailResult<Self> {
        Self::builder(SourceDescriptor::named(name, storage)).build()
    }

    /// Thumbnailer with default settings for in-memory source bytes.
    pub fn remote(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ThumbnailResult<Self> {
        Self::builder(SourceDescriptor::remote(name, bytes)).build()
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn settings(&self) -> &ThumbnailSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn alias_target(&self) -> Option<&AliasTarget> {
        self.alias_target.as_ref()
    }

    /// Merge `raw` over this instance's defaults and validate it.
    pub fn normalize_options(&self, raw: &OptionSet) -> ThumbnailResult<OptionSet> {
        let mut defaults = self.settings.default_options.clone();
        if !defaults.contains(QUALITY) {
            defaults.insert(QUALITY, self.settings.quality as i64);
        }
        normalize(raw, &defaults)
    }

    /// Generate a thumbnail. Nothing is read from or written to a cache.
    ///
    /// With `silent`, failing source generators are skipped and only an
    /// exhausted chain is an error.
    pub fn get_thumbnail(
        &self,
        options: &OptionSet,
        silent: bool,
    ) -> ThumbnailResult<ThumbnailArtifact> {
        let options = self.normalize_options(options)?;
        self.pipeline.run(&self.source, &options, silent)
    }

    /// Derive a thumbnail's storage key without touching the source.
    pub fn get_thumbnail_name(
        &self,
        options: &OptionSet,
        transparent: bool,
    ) -> ThumbnailResult<String> {
        let options = self.normalize_options(options)?;
        Ok(self
            .pipeline
            .deriver()
            .derive_name(self.source.name(), &options, transparent))
    }

    /// Options for `alias`, tagged with its name. `None` when no such alias
    /// is visible to this thumbnailer's target.
    pub fn alias_options(&self, alias: &str) -> Option<OptionSet> {
        self.aliases
            .resolve(alias, self.alias_target.as_ref(), true)
            .map(|options| options.with(ALIAS, alias))
    }

    /// Generate the thumbnail for a named alias, forgiving decoder failures.
    ///
    /// `Ok(None)` is a lookup miss.
    pub fn lookup_by_alias(&self, alias: &str) -> ThumbnailResult<Option<ThumbnailArtifact>> {
        match self.alias_options(alias) {
            Some(options) => self.get_thumbnail(&options, true).map(Some),
            None => {
                log::debug!("No alias '{}' for '{}'", alias, self.source.name());
                Ok(None)
            }
        }
    }

    /// Generate every alias visible to this thumbnailer, in parallel.
    ///
    /// Results keep alias definition order.
    pub fn generate_all_aliases(
        &self,
        include_global: bool,
    ) -> Vec<(String, ThumbnailResult<ThumbnailArtifact>)> {
        let aliases: Vec<(String, OptionSet)> = self
            .aliases
            .all(self.alias_target.as_ref(), include_global)
            .into_iter()
            .collect();

        aliases
            .into_par_iter()
            .map(|(name, options)| {
                let options = options.with(ALIAS, name.as_str());
                let result = self.get_thumbnail(&options, true);
                (name, result)
            })
            .collect()
    }
}
