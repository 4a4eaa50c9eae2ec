//! Geometry processors: Autocrop, ScaleAndCrop, Background

use crate::core::options::OptionSet;
use crate::core::types::{Color, DecodedImage, OptionValue};
use crate::filters::builtin::color;
use crate::filters::registry::StrategyRegistry;
use crate::filters::strategy::Processor;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GrayImage, RgbaImage};
use std::sync::Arc;

/// Bounds for the `zoom` percentage.
const ZOOM_RANGE: (i64, i64) = (-99, 1000);

/// Upscaling never grows the longest side past this.
const MAX_SCALED_SIDE: f64 = 16384.0;

/// Register geometry processors.
pub fn register(registry: &mut StrategyRegistry) {
    registry.register_processor(Arc::new(Autocrop));
    registry.register_processor(Arc::new(ScaleAndCrop));
}

/// Register the padding processor. It runs after `filters`, so it is
/// registered separately.
pub fn register_background(registry: &mut StrategyRegistry) {
    registry.register_processor(Arc::new(Background));
}

/// Trims borders that are (nearly) white.
///
/// Transparent images are flattened onto white first, so fully transparent
/// borders are trimmed too.
#[derive(Debug, Clone, Copy)]
pub struct Autocrop;

impl Processor for Autocrop {
    fn id(&self) -> &str {
        "autocrop"
    }

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage {
        if !options.flag("autocrop") {
            return image;
        }

        let img = image.into_image();
        let luma = if img.color().has_alpha() {
            color::flatten(&img, Color::WHITE).to_luma8()
        } else {
            img.to_luma8()
        };
        let luma = imageproc::filter::median_filter(&luma, 1, 1);

        match content_bounds(&luma) {
            Some((left, top, right, bottom)) => {
                DecodedImage::new(img.crop_imm(left, top, right - left, bottom - top))
            }
            None => DecodedImage::new(img),
        }
    }
}

/// Bounding box `(left, top, right, bottom)` of every non-white pixel.
fn content_bounds(luma: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in luma.enumerate_pixels() {
        if pixel.0[0] == 255 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x + 1, y + 1),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x + 1), b.max(y + 1)),
        });
    }
    bounds
}

/// How `scale_and_crop` trims the overflow after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Fit inside the target; nothing is cropped.
    Off,
    /// Fill the target and crop around the focal point.
    Focal,
    /// Fill the target but never crop.
    Scale,
    /// Crop away the lowest-entropy edges.
    Smart,
    /// Crop a percentage from the given edges; `true` means from the far edge.
    Edge {
        x: Option<(bool, u32)>,
        y: Option<(bool, u32)>,
    },
}

impl CropMode {
    /// Interpret the `crop` option.
    pub fn from_options(options: &OptionSet) -> Self {
        match options.get("crop") {
            None => CropMode::Off,
            Some(value) if value.is_falsy() => CropMode::Off,
            Some(OptionValue::String(text)) => match text.as_str() {
                "scale" => CropMode::Scale,
                "smart" => CropMode::Smart,
                other => parse_edge(other).unwrap_or(CropMode::Focal),
            },
            Some(_) => CropMode::Focal,
        }
    }

    pub fn is_on(self) -> bool {
        self != CropMode::Off
    }
}

/// Parse `"[-]X,[-]Y"`, where either side may be empty.
fn parse_edge(text: &str) -> Option<CropMode> {
    fn side(part: &str) -> Option<Option<(bool, u32)>> {
        if part.is_empty() {
            return Some(None);
        }
        let (from_end, digits) = match part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, part),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(|pct| Some((from_end, pct)))
    }

    let (x, y) = text.split_once(',')?;
    let (x, y) = (side(x)?, side(y)?);
    if x.is_none() && y.is_none() {
        return None;
    }
    Some(CropMode::Edge { x, y })
}

/// Focal point in percent of each axis, defaulting to the centre.
fn focal_point(options: &OptionSet) -> (i64, i64) {
    let axis = |value: Option<&OptionValue>| value.and_then(OptionValue::as_integer).unwrap_or(50);
    let (x, y) = match options.get("target") {
        Some(OptionValue::String(text)) => match text.split_once(',') {
            Some((x, y)) => (
                x.trim().parse().unwrap_or(50),
                y.trim().parse().unwrap_or(50),
            ),
            None => (50, 50),
        },
        Some(OptionValue::List(items)) => (axis(items.first()), axis(items.get(1))),
        _ => (50, 50),
    };
    (x.clamp(0, 100), y.clamp(0, 100))
}

/// Shannon entropy of the luma histogram.
fn entropy(image: &DynamicImage) -> f64 {
    let luma = image.to_luma8();
    let mut histogram = [0u64; 256];
    for pixel in luma.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total = luma.pixels().len() as f64;
    if total == 0.0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Decide how much to take from the start and end of an axis.
fn compare_entropy(start: f64, end: f64, slice: u32, difference: u32) -> (u32, u32) {
    if end != 0.0 && (start / end - 1.0).abs() < 0.01 {
        if difference >= slice * 2 {
            return (slice, slice);
        }
        let half = slice / 2;
        return (half, slice - half);
    }
    if start > end {
        (0, slice)
    } else {
        (slice, 0)
    }
}

fn smart_box(image: &DynamicImage, mut diff_x: u32, mut diff_y: u32) -> (u32, u32, u32, u32) {
    let (width, height) = (image.width(), image.height());
    let (mut left, mut top, mut right, mut bottom) = (0, 0, width, height);

    while diff_x > 0 {
        let slice = diff_x.min((diff_x / 5).max(10));
        let start = entropy(&image.crop_imm(left, 0, slice, height));
        let end = entropy(&image.crop_imm(right - slice, 0, slice, height));
        let (add, remove) = compare_entropy(start, end, slice, diff_x);
        left += add;
        right -= remove;
        diff_x -= add + remove;
    }
    while diff_y > 0 {
        let slice = diff_y.min((diff_y / 5).max(10));
        let start = entropy(&image.crop_imm(0, top, width, slice));
        let end = entropy(&image.crop_imm(0, bottom - slice, width, slice));
        let (add, remove) = compare_entropy(start, end, slice, diff_y);
        top += add;
        bottom -= remove;
        diff_y -= add + remove;
    }
    (left, top, right, bottom)
}

/// Scales to the target size, then crops the overflow.
///
/// Options: `size`, `crop`, `upscale`, `zoom`, `target`.
#[derive(Debug, Clone, Copy)]
pub struct ScaleAndCrop;

impl Processor for ScaleAndCrop {
    fn id(&self) -> &str {
        "scale_and_crop"
    }

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage {
        let size = match options.size() {
            Ok(size) => size,
            Err(_) => return image,
        };
        if image.width() == 0 || image.height() == 0 {
            return image;
        }

        let mut crop = CropMode::from_options(options);
        let (source_x, source_y) = (image.width() as f64, image.height() as f64);
        let (mut target_x, mut target_y) = (size.width as f64, size.height as f64);

        let (ratio_x, ratio_y) = (target_x / source_x, target_y / source_y);
        let mut scale = if crop.is_on() || target_x == 0.0 || target_y == 0.0 {
            ratio_x.max(ratio_y)
        } else {
            ratio_x.min(ratio_y)
        };

        // One-axis targets
        if target_x == 0.0 {
            target_x = (source_x * scale).round();
        } else if target_y == 0.0 {
            target_y = (source_y * scale).round();
        }

        let zoom = options
            .get_integer("zoom")
            .unwrap_or(0)
            .clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
        if zoom != 0 {
            if !crop.is_on() {
                target_x = (source_x * scale).round();
                target_y = (source_y * scale).round();
                crop = CropMode::Focal;
            }
            scale *= (100 + zoom) as f64 / 100.0;
        }

        scale = scale.min((MAX_SCALED_SIDE / source_x.max(source_y)).max(1.0));

        let mut img = image.into_image();
        if scale < 1.0 || (scale > 1.0 && options.flag("upscale")) {
            let width = ((source_x * scale).round() as u32).max(1);
            let height = ((source_y * scale).round() as u32).max(1);
            img = img.resize_exact(width, height, FilterType::Lanczos3);
        }

        if !crop.is_on() {
            return DecodedImage::new(img);
        }

        let (width, height) = (img.width(), img.height());
        let (target_x, target_y) = (target_x as u32, target_y as u32);
        let diff_x = width - width.min(target_x);
        let diff_y = height - height.min(target_y);
        if crop == CropMode::Scale || (diff_x == 0 && diff_y == 0) {
            return DecodedImage::new(img);
        }

        let (left, top, right, bottom) = match crop {
            CropMode::Smart => smart_box(&img, diff_x, diff_y),
            mode => {
                let (fx, fy) = focal_point(options);
                let mut x_range = focal_box(width, target_x, fx, diff_x);
                let mut y_range = focal_box(height, target_y, fy, diff_y);
                if let CropMode::Edge { x, y } = mode {
                    if let Some(edge) = x {
                        x_range = edge_box(width, target_x, diff_x, edge);
                    }
                    if let Some(edge) = y {
                        y_range = edge_box(height, target_y, diff_y, edge);
                    }
                }
                (x_range.0, y_range.0, x_range.1, y_range.1)
            }
        };

        DecodedImage::new(img.crop_imm(left, top, right - left, bottom - top))
    }
}

/// `(start, end)` along one axis, keeping the focal point (in percent) as
/// centred as the bounds allow.
fn focal_box(source: u32, target: u32, focal_pct: i64, diff: u32) -> (u32, u32) {
    if diff == 0 {
        return (0, source);
    }
    let (source, target) = (source as i64, target as i64);
    let focal = source * focal_pct / 100;
    let start = (focal - target / 2).min(source - target).max(0);
    let end = source.min(start + target);
    (start as u32, end as u32)
}

fn edge_box(source: u32, target: u32, diff: u32, (from_end, pct): (bool, u32)) -> (u32, u32) {
    let offset = ((target as u64 * pct as u64 / 100) as u32).min(diff);
    if from_end {
        (diff - offset, source - offset)
    } else {
        (offset, source - (diff - offset))
    }
}

/// Pads images smaller than the target onto a solid background.
///
/// Only applies when both target dimensions are set. The result is exactly
/// the target size with the image centred.
#[derive(Debug, Clone, Copy)]
pub struct Background;

impl Processor for Background {
    fn id(&self) -> &str {
        "background"
    }

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage {
        let background = match options.get_str("background").and_then(Color::parse_hex) {
            Some(color) => color,
            None if options.flag("pad") => Color::WHITE,
            None => return image,
        };
        let size = match options.size() {
            Ok(size) if size.is_bounded() => size,
            _ => return image,
        };
        let (x, y) = (image.width(), image.height());
        if x >= size.width && y >= size.height {
            return image;
        }

        let img = color::convert(image.into_image(), options.flag("bw"), Some(background));
        let mut canvas = RgbaImage::from_pixel(size.width, size.height, background.to_rgba());
        let offset_x = (size.width as i64 - x as i64).div_euclid(2);
        let offset_y = (size.height as i64 - y as i64).div_euclid(2);
        image::imageops::overlay(&mut canvas, &img.to_rgba8(), offset_x, offset_y);

        let canvas = DynamicImage::ImageRgba8(canvas);
        DecodedImage::new(match img.color() {
            ColorType::L8 => DynamicImage::ImageLuma8(canvas.to_luma8()),
            ColorType::La8 => DynamicImage::ImageLumaA8(canvas.to_luma_alpha8()),
            ColorType::Rgba8 => canvas,
            _ => DynamicImage::ImageRgb8(canvas.to_rgb8()),
        })
    }
}
