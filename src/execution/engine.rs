//! Generation pipeline implementation.
//!
//! One call moves through `Acquire → SizeCheck → GenerateSource → Process →
//! Encode` and either yields an artifact or stops at the first failure.
//! Nothing is retried.

use crate::core::error::{ThumbnailError, ThumbnailResult};
use crate::core::options::{OptionSet, DEFAULT_SUBSAMPLING, QUALITY, SUBSAMPLING};
use crate::core::source::SourceDescriptor;
use crate::core::types::{DecodedImage, ThumbnailArtifact};
use crate::execution::encode::{encode, EncodeParams};
use crate::filters::strategy::{GeneratorOutcome, Processor, SourceContent, SourceGenerator};
use crate::naming::deriver::{extension_of, split_name, KeyDeriver};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Acquire,
    SizeCheck,
    GenerateSource,
    Process,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquire => "acquire",
            Stage::SizeCheck => "size-check",
            Stage::GenerateSource => "generate-source",
            Stage::Process => "process",
            Stage::Encode => "encode",
        };
        f.write_str(name)
    }
}

/// Run source generators in priority order until one succeeds.
///
/// `NotApplicable` always moves on to the next generator. A `Failure` moves on
/// only when `silent` is set; otherwise it is returned immediately as
/// [`ThumbnailError::SourceGenerator`]. When nothing succeeds the result is
/// [`ThumbnailError::InvalidImageFormat`].
pub fn dispatch_generators(
    generators: &[Arc<dyn SourceGenerator>],
    source: &SourceContent<'_>,
    options: &OptionSet,
    silent: bool,
) -> ThumbnailResult<DecodedImage> {
    for generator in generators {
        match generator.generate(source, options) {
            GeneratorOutcome::Success(image) => {
                log::debug!(
                    "Source generator '{}' decoded '{}' ({}x{})",
                    generator.id(),
                    source.name,
                    image.width(),
                    image.height()
                );
                return Ok(image);
            }
            GeneratorOutcome::NotApplicable => {
                log::debug!("Source generator '{}' skipped '{}'", generator.id(), source.name);
            }
            GeneratorOutcome::Failure(reason) if silent => {
                log::warn!(
                    "Source generator '{}' failed for '{}': {}",
                    generator.id(),
                    source.name,
                    reason
                );
            }
            GeneratorOutcome::Failure(reason) => {
                return Err(ThumbnailError::SourceGenerator {
                    generator: generator.id().to_string(),
                    name: source.name.to_string(),
                    reason,
                });
            }
        }
    }

    Err(ThumbnailError::InvalidImageFormat {
        name: source.name.to_string(),
    })
}

/// Apply processors in order.
pub fn apply_processors(
    processors: &[Arc<dyn Processor>],
    image: DecodedImage,
    options: &OptionSet,
) -> DecodedImage {
    processors.iter().fold(image, |image, processor| {
        let before = (image.width(), image.height());
        let image = processor.process(image, options);
        if before != (image.width(), image.height()) {
            log::debug!(
                "Processor '{}' resized {}x{} -> {}x{}",
                processor.id(),
                before.0,
                before.1,
                image.width(),
                image.height()
            );
        }
        image
    })
}

/// Resolved strategy chain plus the key deriver that names its output.
#[derive(Clone)]
pub struct GenerationPipeline {
    generators: Vec<Arc<dyn SourceGenerator>>,
    processors: Vec<Arc<dyn Processor>>,
    deriver: KeyDeriver,
}

impl fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("generators", &self.generator_ids())
            .field("processors", &self.processor_ids())
            .field("deriver", &self.deriver)
            .finish()
    }
}

impl GenerationPipeline {
    pub fn new(
        generators: Vec<Arc<dyn SourceGenerator>>,
        processors: Vec<Arc<dyn Processor>>,
        deriver: KeyDeriver,
    ) -> Self {
        Self {
            generators,
            processors,
            deriver,
        }
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    /// Ids of the resolved source generators, in dispatch order.
    pub fn generator_ids(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.id()).collect()
    }

    pub fn processor_ids(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.id()).collect()
    }

    /// Generate a thumbnail of `source` for already-normalised `options`.
    pub fn run(
        &self,
        source: &SourceDescriptor,
        options: &OptionSet,
        silent: bool,
    ) -> ThumbnailResult<ThumbnailArtifact> {
        let started = Instant::now();
        let name = source.name();

        log::debug!("[{}] {}: {}", Stage::Acquire, name, options.opts_text());
        let data = source.read()?;

        log::debug!("[{}] {}", Stage::SizeCheck, name);
        options.size()?;

        log::debug!("[{}] {} ({} bytes)", Stage::GenerateSource, name, data.len());
        let content = SourceContent { name, data: &data };
        let image = dispatch_generators(&self.generators, &content, options, silent)?;

        log::debug!("[{}] {}", Stage::Process, name);
        let image = apply_processors(&self.processors, image, options);

        log::debug!("[{}] {}", Stage::Encode, name);
        let transparent = image.has_alpha();
        let (_, filename) = split_name(name);
        let extension = self
            .deriver
            .select_extension(&extension_of(filename), transparent);
        let params = EncodeParams {
            extension: &extension,
            quality: options
                .get_integer(QUALITY)
                .unwrap_or(self.deriver.settings().quality as i64),
            subsampling: options
                .get_integer(SUBSAMPLING)
                .unwrap_or(DEFAULT_SUBSAMPLING),
        };
        let (quality, subsampling) = params.validate()?;
        let data = encode(image.image(), &params)?;

        let artifact = ThumbnailArtifact {
            name: self.deriver.derive_name(name, options, transparent),
            data,
            extension,
            quality,
            subsampling,
            width: image.width(),
            height: image.height(),
            transparent,
            cacheable: !source.is_remote(),
        };
        log::info!(
            "Generated {} ({}x{}, {} bytes) in {:.1}ms",
            artifact.name,
            artifact.width,
            artifact.height,
            artifact.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(artifact)
    }
}
