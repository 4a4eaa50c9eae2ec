//! # thumbkit - Deterministic Thumbnail Generation
//!
//! thumbkit turns a source image and a set of transformation options into an
//! encoded thumbnail plus a storage key that is stable for equal options.
//! A caller's cache can check that key before anything is decoded.
//!
//! ## Features
//!
//! - **Canonical options**: logically equal option sets always produce the same tokens
//! - **Scoped aliases**: named option sets resolved from field to model to app to global
//! - **Pluggable strategies**: source generators, processors and namers are registered by id
//! - **Silent or strict decoding**: choose whether a failing decoder stops the chain
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use thumbkit::prelude::*;
//!
//! let thumbnailer = Thumbnailer::builder(SourceDescriptor::remote("photos/cat.png", bytes))
//!     .with_basedir("thumbs")
//!     .build()?;
//!
//! let options = OptionSet::new()
//!     .with_size(Some(100), Some(100))
//!     .with("crop", true);
//!
//! // Naming never touches the source.
//! let key = thumbnailer.get_thumbnail_name(&options, false)?;
//! assert_eq!(key, "thumbs/photos/cat.png.100x100_q85_crop.jpg");
//!
//! let artifact = thumbnailer.get_thumbnail(&options, false)?;
//! assert_eq!(artifact.name, key);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: option sets, settings, sources and error handling
//! - [`alias`]: scoped alias resolution
//! - [`naming`]: the key deriver and naming strategies
//! - [`filters`]: strategy traits, the registry and built-in generators/processors
//! - [`execution`]: the generation pipeline and encoder
//! - [`thumbnailer`]: the per-source facade

#![warn(clippy::all)]

pub mod alias;
pub mod core;
pub mod execution;
pub mod filters;
pub mod naming;
pub mod thumbnailer;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use thumbkit::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{Color, DecodedImage, OptionValue, Size, ThumbnailArtifact};
    pub use crate::core::options::{normalize, OptionSet, ALIAS, QUALITY, SIZE, SUBSAMPLING};
    pub use crate::core::settings::{Config, PreserveExtensions, ThumbnailSettings};
    pub use crate::core::source::{FileSystemStorage, SourceDescriptor, Storage};

    // Errors
    pub use crate::core::error::{
        ConfigError, EncodingError, StrategyKind, ThumbnailError, ThumbnailResult,
    };

    // Aliases
    pub use crate::alias::{AliasConfig, AliasDefinition, AliasResolver, AliasScope, AliasTarget};

    // Naming
    pub use crate::naming::{FnNamer, KeyDeriver, Namer, NamerContext};

    // Strategies
    pub use crate::filters::registry::{RegistryBuilder, StrategyRegistry};
    pub use crate::filters::strategy::{GeneratorOutcome, Processor, SourceContent, SourceGenerator};

    // Execution
    pub use crate::execution::engine::{GenerationPipeline, Stage};

    // Facade
    pub use crate::thumbnailer::{Thumbnailer, ThumbnailerBuilder};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "thumbkit");
    }

    #[test]
    fn test_config_to_names() {
        let config = Config::from_toml_str(
            r#"
            [thumbnails]
            basedir = "thumbs"
            subdir = "{opts}"

            [aliases.global.avatar]
            size = [48, 48]
            crop = true
            "#,
        )
        .unwrap();
        let aliases = Arc::new(AliasResolver::from_config(&config.aliases).unwrap());

        let thumbnailer = Thumbnailer::builder(SourceDescriptor::name_only("users/me.png"))
            .with_settings(config.thumbnails)
            .with_aliases(aliases)
            .build()
            .unwrap();

        let options = thumbnailer.alias_options("avatar").unwrap();
        let name = thumbnailer.get_thumbnail_name(&options, false).unwrap();
        assert_eq!(name, "thumbs/users/48x48_q85_crop/me.png.jpg");
    }

    #[test]
    fn test_custom_processor_in_pipeline() {
        struct Invert;

        impl Processor for Invert {
            fn id(&self) -> &str {
                "invert"
            }

            fn process(&self, image: DecodedImage, _options: &OptionSet) -> DecodedImage {
                let mut img = image.into_image();
                img.invert();
                DecodedImage::new(img)
            }
        }

        let registry = Arc::new(RegistryBuilder::new().processor(Arc::new(Invert)).build());
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let source = SourceDescriptor::remote("dark.png", bytes.into_inner());
        let thumbnailer = Thumbnailer::builder(source)
            .with_registry(registry)
            .with_processors(["colorspace", "invert"])
            .with_extension("png")
            .build()
            .unwrap();
        let artifact = thumbnailer
            .get_thumbnail(&OptionSet::new().with_size(Some(8), Some(8)), false)
            .unwrap();

        let decoded = image::load_from_memory(&artifact.data).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(3, 3), &image::Rgb([255, 255, 255]));
    }
}
