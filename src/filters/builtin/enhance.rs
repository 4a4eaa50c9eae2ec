//! Enhancement processor: detail and sharpen kernels.

use crate::core::options::OptionSet;
use crate::core::types::DecodedImage;
use crate::filters::registry::StrategyRegistry;
use crate::filters::strategy::Processor;
use std::sync::Arc;

/// Register enhancement processors.
pub fn register(registry: &mut StrategyRegistry) {
    registry.register_processor(Arc::new(Filters));
}

// Kernels are normalised by their sum when applied.
const DETAIL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 10.0, -1.0, 0.0, -1.0, 0.0];
const SHARPEN: [f32; 9] = [-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0];

/// Applies `detail` then `sharpen`, each when its option is truthy.
#[derive(Debug, Clone, Copy)]
pub struct Filters;

impl Processor for Filters {
    fn id(&self) -> &str {
        "filters"
    }

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage {
        let (detail, sharpen) = (options.flag("detail"), options.flag("sharpen"));
        if !detail && !sharpen {
            return image;
        }

        let mut img = image.into_image();
        if detail {
            img = img.filter3x3(&DETAIL);
        }
        if sharpen {
            img = img.filter3x3(&SHARPEN);
        }
        DecodedImage::new(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};

    fn stripe() -> DecodedImage {
        let mut image = GrayImage::from_pixel(9, 9, Luma([100]));
        for y in 0..9 {
            image.put_pixel(4, y, Luma([160]));
        }
        DecodedImage::new(DynamicImage::ImageLuma8(image))
    }

    #[test]
    fn test_noop_without_flags() {
        let out = Filters.process(stripe(), &OptionSet::new());
        assert_eq!(out.image().to_luma8().get_pixel(4, 4), &Luma([160]));
    }

    #[test]
    fn test_flat_regions_unchanged() {
        let options = OptionSet::new().with("sharpen", true).with("detail", true);
        let out = Filters.process(stripe(), &options);
        assert_eq!(out.image().to_luma8().get_pixel(1, 4), &Luma([100]));
    }

    #[test]
    fn test_sharpen_boosts_edges() {
        let out = Filters.process(stripe(), &OptionSet::new().with("sharpen", true));
        let luma = out.image().to_luma8();
        assert!(luma.get_pixel(4, 4).0[0] > 160);
        assert!(luma.get_pixel(3, 4).0[0] < 100);
        assert_eq!((out.width(), out.height()), (9, 9));
    }
}
