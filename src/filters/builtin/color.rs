//! Colorspace processor.

use crate::core::options::OptionSet;
use crate::core::types::{Color, DecodedImage};
use crate::filters::registry::StrategyRegistry;
use crate::filters::strategy::Processor;
use image::{ColorType, DynamicImage, RgbaImage};
use std::sync::Arc;

/// Register color processors.
pub fn register(registry: &mut StrategyRegistry) {
    registry.register_processor(Arc::new(Colorspace));
}

/// Normalises images to 8-bit L, LA, RGB or RGBA.
///
/// Options:
/// - `bw`: convert to grayscale
/// - `replace_alpha`: hex color to flatten transparency onto
#[derive(Debug, Clone, Copy)]
pub struct Colorspace;

impl Processor for Colorspace {
    fn id(&self) -> &str {
        "colorspace"
    }

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage {
        let replace_alpha = options.get_str("replace_alpha").and_then(Color::parse_hex);
        DecodedImage::new(convert(image.into_image(), options.flag("bw"), replace_alpha))
    }
}

/// Paint `image` over a solid `background`.
pub(crate) fn flatten(image: &DynamicImage, background: Color) -> DynamicImage {
    let mut base = RgbaImage::from_pixel(image.width(), image.height(), background.to_rgba());
    image::imageops::overlay(&mut base, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(base)
}

/// Convert to the 8-bit mode the rest of the pipeline expects.
///
/// Grayscale sources (or `bw`) end up as L/LA, everything else as RGB/RGBA.
/// Alpha is kept unless `replace_alpha` flattens it away.
pub(crate) fn convert(image: DynamicImage, bw: bool, replace_alpha: Option<Color>) -> DynamicImage {
    let transparent = image.color().has_alpha();
    let grayscale = matches!(
        image.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    );

    let (image, keep_alpha) = match (transparent, replace_alpha) {
        (true, Some(background)) => (flatten(&image, background), false),
        (transparent, _) => (image, transparent),
    };

    let target = match (grayscale || bw, keep_alpha) {
        (true, true) => ColorType::La8,
        (true, false) => ColorType::L8,
        (false, true) => ColorType::Rgba8,
        (false, false) => ColorType::Rgb8,
    };
    if image.color() == target {
        return image;
    }

    match target {
        ColorType::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, LumaA, Rgb, RgbImage, Rgba};

    fn rgba(pixel: [u8; 4]) -> DecodedImage {
        DecodedImage::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba(pixel))))
    }

    #[test]
    fn test_opaque_rgb_unchanged() {
        let image =
            DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))));
        let out = Colorspace.process(image, &OptionSet::new());
        assert_eq!(out.image().color(), ColorType::Rgb8);
    }

    #[test]
    fn test_alpha_kept_by_default() {
        let out = Colorspace.process(rgba([10, 20, 30, 128]), &OptionSet::new());
        assert!(out.has_alpha());
    }

    #[test]
    fn test_bw() {
        let options = OptionSet::new().with("bw", true);
        let out = Colorspace.process(rgba([10, 20, 30, 255]), &options);
        assert_eq!(out.image().color(), ColorType::La8);

        let gray = DecodedImage::new(DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(
            2,
            2,
            LumaA([5, 255]),
        )));
        let out = Colorspace.process(gray, &OptionSet::new());
        assert_eq!(out.image().color(), ColorType::La8);
    }

    #[test]
    fn test_replace_alpha() {
        let options = OptionSet::new().with("replace_alpha", "#ffffff");
        let out = Colorspace.process(rgba([0, 0, 0, 0]), &options);
        assert!(!out.has_alpha());
        assert_eq!(out.image().to_rgb8().get_pixel(1, 1), &Rgb([255, 255, 255]));
    }
}
