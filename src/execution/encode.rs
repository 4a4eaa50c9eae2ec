//! Final encode step.
//!
//! JPEG goes through `jpeg-encoder` so quality and chroma subsampling are
//! honoured; every other supported extension is written by `image`.

use crate::core::error::{EncodingError, EncodingResult};
use image::{ColorType, DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType as JpegColorType, Encoder, SamplingFactor};
use std::io::Cursor;

/// Encoder parameters for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams<'a> {
    /// Target extension, lowercase, without the dot.
    pub extension: &'a str,
    pub quality: i64,
    /// 0 = 4:4:4, 1 = 4:2:2, 2 = 4:2:0.
    pub subsampling: i64,
}

impl EncodeParams<'_> {
    /// Check quality and subsampling, returning them in encoder form.
    pub fn validate(&self) -> EncodingResult<(u8, u8)> {
        if !(1..=100).contains(&self.quality) {
            return Err(EncodingError::InvalidQuality {
                quality: self.quality,
            });
        }
        if !(0..=2).contains(&self.subsampling) {
            return Err(EncodingError::InvalidSubsampling {
                subsampling: self.subsampling,
            });
        }
        Ok((self.quality as u8, self.subsampling as u8))
    }
}

/// Image format written for a thumbnail extension.
pub fn format_for_extension(extension: &str) -> EncodingResult<ImageFormat> {
    let format = match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        "png" => ImageFormat::Png,
        "gif" => ImageFormat::Gif,
        "bmp" => ImageFormat::Bmp,
        "tif" | "tiff" => ImageFormat::Tiff,
        "webp" => ImageFormat::WebP,
        _ => {
            return Err(EncodingError::UnsupportedFormat {
                extension: extension.to_string(),
            })
        }
    };
    Ok(format)
}

/// Encode `image` for `params.extension`.
pub fn encode(image: &DynamicImage, params: &EncodeParams<'_>) -> EncodingResult<Vec<u8>> {
    let (quality, subsampling) = params.validate()?;
    match format_for_extension(params.extension)? {
        ImageFormat::Jpeg => encode_jpeg(image, quality, subsampling),
        format => encode_with_image(image, format),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8, subsampling: u8) -> EncodingResult<Vec<u8>> {
    let too_large = || EncodingError::DimensionsTooLarge {
        width: image.width(),
        height: image.height(),
        format: "JPEG".to_string(),
    };
    let width = u16::try_from(image.width()).map_err(|_| too_large())?;
    let height = u16::try_from(image.height()).map_err(|_| too_large())?;

    // JPEG has no alpha; grayscale stays single-channel.
    let (pixels, color) = match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            (image.to_luma8().into_raw(), JpegColorType::Luma)
        }
        _ => (image.to_rgb8().into_raw(), JpegColorType::Rgb),
    };

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, quality);
    encoder.set_sampling_factor(match subsampling {
        0 => SamplingFactor::R_4_4_4,
        1 => SamplingFactor::R_4_2_2,
        _ => SamplingFactor::R_4_2_0,
    });
    encoder
        .encode(&pixels, width, height, color)
        .map_err(|e| EncodingError::Codec {
            format: "JPEG".to_string(),
            error: e.to_string(),
        })?;
    Ok(buffer)
}

fn encode_with_image(image: &DynamicImage, format: ImageFormat) -> EncodingResult<Vec<u8>> {
    // The GIF and WebP writers only take RGB(A).
    let converted;
    let image = match (format, image.color()) {
        (ImageFormat::Gif | ImageFormat::WebP, ColorType::L8) => {
            converted = DynamicImage::ImageRgb8(image.to_rgb8());
            &converted
        }
        (ImageFormat::Gif | ImageFormat::WebP, ColorType::La8) => {
            converted = DynamicImage::ImageRgba8(image.to_rgba8());
            &converted
        }
        _ => image,
    };

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| EncodingError::Codec {
            format: format!("{:?}", format),
            error: e.to_string(),
        })?;
    Ok(buffer.into_inner())
}
