//! Built-in naming strategies.
//!
//! A namer returns the bare filename for a thumbnail; the deriver adds the
//! configured prefix and directories around it.

use crate::core::options::OptionSet;
use crate::core::settings::ThumbnailSettings;
use crate::naming::deriver::extension_of;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Everything a namer may consult.
#[derive(Debug, Clone, Copy)]
pub struct NamerContext<'a> {
    /// The thumbnailer's resolved configuration.
    pub settings: &'a ThumbnailSettings,
    /// Source filename without its directory.
    pub source_filename: &'a str,
    /// Extension chosen for the thumbnail.
    pub extension: &'a str,
    /// Full normalized option set (including uppercase metadata keys).
    pub options: &'a OptionSet,
    /// Canonical tokens of `options`.
    pub prepared_options: &'a [String],
}

/// A naming strategy.
pub trait Namer: Send + Sync {
    /// Registry id.
    fn id(&self) -> &str;

    /// Bare thumbnail filename.
    fn name(&self, ctx: &NamerContext<'_>) -> String;
}

/// Register the built-in namers.
pub fn register(registry: &mut crate::filters::registry::StrategyRegistry) {
    registry.register_namer(Arc::new(DefaultNamer));
    registry.register_namer(Arc::new(HashedNamer));
    registry.register_namer(Arc::new(SourceHashedNamer));
    registry.register_namer(Arc::new(AliasNamer));
}

/// Namer backed by a closure, for strategies registered at startup.
pub struct FnNamer<F> {
    id: String,
    f: F,
}

impl<F> FnNamer<F>
where
    F: Fn(&NamerContext<'_>) -> String + Send + Sync,
{
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> Namer for FnNamer<F>
where
    F: Fn(&NamerContext<'_>) -> String + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self, ctx: &NamerContext<'_>) -> String {
        (self.f)(ctx)
    }
}

/// `source.ext.<opts>.ext`, or just `source.ext[.ext]` when the directory
/// templates already carry the options.
#[derive(Debug, Clone, Copy)]
pub struct DefaultNamer;

impl Namer for DefaultNamer {
    fn id(&self) -> &str {
        "default"
    }

    fn name(&self, ctx: &NamerContext<'_>) -> String {
        let mut parts = vec![ctx.source_filename.to_string()];
        if ctx.settings.templates_use_opts() {
            if ctx.extension != extension_of(ctx.source_filename) {
                parts.push(ctx.extension.to_string());
            }
        } else {
            parts.push(ctx.prepared_options.join("_"));
            parts.push(ctx.extension.to_string());
        }
        parts.join(".")
    }
}

/// Short hash of the source filename and every token.
#[derive(Debug, Clone, Copy)]
pub struct HashedNamer;

impl Namer for HashedNamer {
    fn id(&self) -> &str {
        "hashed"
    }

    fn name(&self, ctx: &NamerContext<'_>) -> String {
        let mut parts = vec![ctx.source_filename];
        parts.extend(ctx.prepared_options.iter().map(String::as_str));
        format!("{}.{}", short_hash(&parts.join(":"), 9), ctx.extension)
    }
}

/// `<source hash>_<size>_<options hash>.ext`, so every thumbnail of a source
/// shares a filename prefix.
#[derive(Debug, Clone, Copy)]
pub struct SourceHashedNamer;

impl Namer for SourceHashedNamer {
    fn id(&self) -> &str {
        "source_hashed"
    }

    fn name(&self, ctx: &NamerContext<'_>) -> String {
        let source_hash = short_hash(ctx.source_filename, 6);
        let (size, rest): (&str, &[String]) = match ctx.prepared_options.split_first() {
            Some((first, rest)) => (first.as_str(), rest),
            None => ("", &[]),
        };
        let options_hash = short_hash(&rest.join(":"), 6);
        format!("{}_{}_{}.{}", source_hash, size, options_hash, ctx.extension)
    }
}

/// `source.ALIAS.ext`, for requests that came through an alias.
#[derive(Debug, Clone, Copy)]
pub struct AliasNamer;

impl Namer for AliasNamer {
    fn id(&self) -> &str {
        "alias"
    }

    fn name(&self, ctx: &NamerContext<'_>) -> String {
        let alias = ctx.options.alias().unwrap_or("");
        [ctx.source_filename, alias, ctx.extension].join(".")
    }
}

/// URL-safe base64 of the first `bytes` bytes of the SHA-256 digest.
fn short_hash(text: &str, bytes: usize) -> String {
    let digest = Sha256::digest(text.as_bytes());
    URL_SAFE.encode(&digest[..bytes])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ALIAS;

    fn tokens() -> Vec<String> {
        vec!["100x100".to_string(), "q85".to_string(), "crop".to_string()]
    }

    fn context<'a>(
        settings: &'a ThumbnailSettings,
        options: &'a OptionSet,
        prepared: &'a [String],
        extension: &'a str,
    ) -> NamerContext<'a> {
        NamerContext {
            settings,
            source_filename: "photo.png",
            extension,
            options,
            prepared_options: prepared,
        }
    }

    #[test]
    fn test_default_namer() {
        let settings = ThumbnailSettings::default();
        let options = OptionSet::new();
        let prepared = tokens();
        let ctx = context(&settings, &options, &prepared, "jpg");
        assert_eq!(DefaultNamer.name(&ctx), "photo.png.100x100_q85_crop.jpg");
    }

    #[test]
    fn test_default_namer_with_opts_template() {
        let settings = ThumbnailSettings {
            subdir: "{opts}".to_string(),
            ..ThumbnailSettings::default()
        };
        let options = OptionSet::new();
        let prepared = tokens();

        let same = context(&settings, &options, &prepared, "png");
        assert_eq!(DefaultNamer.name(&same), "photo.png");

        let different = context(&settings, &options, &prepared, "jpg");
        assert_eq!(DefaultNamer.name(&different), "photo.png.jpg");
    }

    #[test]
    fn test_hashed_namers_are_stable() {
        let settings = ThumbnailSettings::default();
        let options = OptionSet::new();
        let prepared = tokens();
        let ctx = context(&settings, &options, &prepared, "jpg");

        let first = HashedNamer.name(&ctx);
        assert_eq!(first, HashedNamer.name(&ctx));
        assert!(first.ends_with(".jpg"));
        assert_eq!(first.len(), 12 + ".jpg".len());

        let source_hashed = SourceHashedNamer.name(&ctx);
        let prefix = format!("{}_100x100_", short_hash("photo.png", 6));
        assert!(source_hashed.starts_with(&prefix));
        assert_eq!(source_hashed.len(), prefix.len() + 8 + ".jpg".len());
    }

    #[test]
    fn test_source_hashed_shares_prefix() {
        let settings = ThumbnailSettings::default();
        let options = OptionSet::new();
        let small = vec!["50x50".to_string()];
        let large = vec!["500x500".to_string(), "q90".to_string()];

        let a = SourceHashedNamer.name(&context(&settings, &options, &small, "jpg"));
        let b = SourceHashedNamer.name(&context(&settings, &options, &large, "jpg"));
        assert_eq!(a[..8], b[..8]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_alias_namer() {
        let settings = ThumbnailSettings::default();
        let options = OptionSet::new().with(ALIAS, "small");
        let prepared = tokens();
        let ctx = context(&settings, &options, &prepared, "jpg");
        assert_eq!(AliasNamer.name(&ctx), "photo.png.small.jpg");

        let untagged = OptionSet::new();
        let ctx = context(&settings, &untagged, &prepared, "jpg");
        assert_eq!(AliasNamer.name(&ctx), "photo.png..jpg");
    }

    #[test]
    fn test_fn_namer() {
        let namer = FnNamer::new("upper", |ctx: &NamerContext<'_>| {
            format!("{}.{}", ctx.source_filename.to_uppercase(), ctx.extension)
        });
        let settings = ThumbnailSettings::default();
        let options = OptionSet::new();
        let prepared = tokens();
        let ctx = context(&settings, &options, &prepared, "jpg");
        assert_eq!(namer.id(), "upper");
        assert_eq!(namer.name(&ctx), "PHOTO.PNG.jpg");
    }
}
