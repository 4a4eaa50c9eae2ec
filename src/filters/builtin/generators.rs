//! Source generators: ImageDecoder, ExtensionHintDecoder

use crate::core::options::OptionSet;
use crate::core::types::DecodedImage;
use crate::filters::registry::StrategyRegistry;
use crate::filters::strategy::{GeneratorOutcome, SourceContent, SourceGenerator};
use crate::naming::deriver::{extension_of, split_name};
use image::ImageDecoder as _;
use image::{DynamicImage, ImageFormat, ImageReader, ImageResult};
use std::io::Cursor;
use std::sync::Arc;

/// Register source generators, highest priority first.
pub fn register(registry: &mut StrategyRegistry) {
    registry.register_generator(Arc::new(ImageDecoder));
    registry.register_generator(Arc::new(ExtensionHintDecoder));
}

/// Whether EXIF orientation should be applied (on unless `exif_orientation = false`).
fn apply_exif(options: &OptionSet) -> bool {
    options
        .get("exif_orientation")
        .and_then(|v| v.as_bool())
        .unwrap_or(true)
}

fn decode(data: &[u8], format: ImageFormat, orient: bool) -> ImageResult<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(data));
    reader.set_format(format);

    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    if orient {
        image.apply_orientation(orientation);
    }
    Ok(image)
}

fn outcome(result: ImageResult<DynamicImage>) -> GeneratorOutcome {
    match result {
        Ok(image) => GeneratorOutcome::Success(DecodedImage::new(image)),
        Err(e) => GeneratorOutcome::Failure(format!("Failed to decode image: {}", e)),
    }
}

/// Decodes any format recognisable from the leading bytes.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder;

impl SourceGenerator for ImageDecoder {
    fn id(&self) -> &str {
        "image"
    }

    fn generate(&self, source: &SourceContent<'_>, options: &OptionSet) -> GeneratorOutcome {
        if source.data.is_empty() {
            return GeneratorOutcome::NotApplicable;
        }
        match image::guess_format(source.data) {
            Ok(format) => outcome(decode(source.data, format, apply_exif(options))),
            Err(_) => GeneratorOutcome::NotApplicable,
        }
    }
}

/// Decodes using the format implied by the source name's extension, for
/// formats without a reliable signature (TGA, for instance).
#[derive(Debug, Clone, Copy)]
pub struct ExtensionHintDecoder;

impl SourceGenerator for ExtensionHintDecoder {
    fn id(&self) -> &str {
        "extension_hint"
    }

    fn generate(&self, source: &SourceContent<'_>, options: &OptionSet) -> GeneratorOutcome {
        let (_, filename) = split_name(source.name);
        let format = match ImageFormat::from_extension(extension_of(filename)) {
            Some(format) if format.reading_enabled() => format,
            _ => return GeneratorOutcome::NotApplicable,
        };
        if source.data.is_empty() {
            return GeneratorOutcome::Failure(format!("'{}' is empty", source.name));
        }
        outcome(decode(source.data, format, apply_exif(options)))
    }
}
