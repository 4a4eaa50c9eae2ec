//! Core value types that flow through thumbnail generation.
//!
//! Option values use an enum so that canonical serialisation can match on a
//! closed set of shapes. Images are wrapped with the metadata the naming and
//! encode steps need.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single option value.
///
/// Deserialises untagged so TOML/JSON option tables read naturally
/// (`crop = true`, `size = [100, 0]`, `quality = 90`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Whether the value counts as "unset" for canonical tokens.
    pub fn is_falsy(&self) -> bool {
        match self {
            OptionValue::Boolean(b) => !b,
            OptionValue::Integer(i) => *i == 0,
            OptionValue::Float(f) => *f == 0.0,
            OptionValue::String(s) => s.is_empty(),
            OptionValue::List(items) => items.is_empty(),
        }
    }

    /// Attempt numeric coercion. Strings are parsed; booleans and lists are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OptionValue::Integer(i) => Some(*i as f64),
            OptionValue::Float(f) if f.is_finite() => Some(*f),
            OptionValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Try to get this value as an integer. Whole floats and numeric strings coerce.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            OptionValue::Integer(i) => Some(*i),
            other => other
                .as_number()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64),
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        if let OptionValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let OptionValue::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Boolean(b) => write!(f, "{}", b),
            OptionValue::Integer(i) => write!(f, "{}", i),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::String(s) => f.write_str(s),
            OptionValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Boolean(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Integer(value as i64)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Integer(value as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(value: Vec<T>) -> Self {
        OptionValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Validated target size. A zero component means "unconstrained on that axis".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both axes constrained.
    pub fn is_bounded(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Canonical `WxH` token.
    pub fn token(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// In-memory image produced by a source generator and replaced by processors.
///
/// Never persisted; each generation call owns its own instance.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
}

impl DecodedImage {
    /// Wrap a decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the pixel buffer carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Borrow the pixel data.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Take ownership of the pixel data.
    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

/// The encoded thumbnail and the key it should be stored under.
///
/// Persistence is the caller's job; `name` is the cache key.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailArtifact {
    /// Derived storage path.
    pub name: String,
    /// Encoded bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Extension the bytes were encoded for.
    pub extension: String,
    /// Quality passed to the encoder.
    pub quality: u8,
    /// JPEG chroma subsampling mode (0 = 4:4:4, 1 = 4:2:2, 2 = 4:2:0).
    pub subsampling: u8,
    pub width: u32,
    pub height: u32,
    /// Whether the processed image carried transparency.
    pub transparent: bool,
    /// False for remote sources, which have no stable identity.
    pub cacheable: bool,
}

impl ThumbnailArtifact {
    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// RGBA color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut parts = hex.chars().map(|c| channel(&format!("{c}{c}")));
                Some(Color::rgb(parts.next()??, parts.next()??, parts.next()??))
            }
            6 | 8 => {
                let r = channel(hex.get(0..2)?)?;
                let g = channel(hex.get(2..4)?)?;
                let b = channel(hex.get(4..6)?)?;
                let a = if hex.len() == 8 {
                    channel(hex.get(6..8)?)?
                } else {
                    255
                };
                Some(Color { r, g, b, a })
            }
            _ => None,
        }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage, RgbaImage};

    #[test]
    fn test_falsy_values() {
        assert!(OptionValue::Boolean(false).is_falsy());
        assert!(OptionValue::Integer(0).is_falsy());
        assert!(OptionValue::String(String::new()).is_falsy());
        assert!(OptionValue::List(vec![]).is_falsy());
        assert!(!OptionValue::Boolean(true).is_falsy());
        assert!(!OptionValue::from("smart").is_falsy());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(OptionValue::from("50").as_number(), Some(50.0));
        assert_eq!(OptionValue::from(" 7.5 ").as_number(), Some(7.5));
        assert_eq!(OptionValue::from("wide").as_number(), None);
        assert_eq!(OptionValue::Boolean(true).as_number(), None);
        assert_eq!(OptionValue::Float(90.0).as_integer(), Some(90));
        assert_eq!(OptionValue::Float(90.5).as_integer(), None);
    }

    #[test]
    fn test_list_display() {
        let value = OptionValue::from(vec![10, 20]);
        assert_eq!(value.to_string(), "10,20");
    }

    #[test]
    fn test_decoded_image_alpha() {
        let rgb = DecodedImage::new(DynamicImage::ImageRgb8(RgbImage::new(4, 3)));
        assert!(!rgb.has_alpha());
        assert_eq!((rgb.width(), rgb.height()), (4, 3));

        let rgba = DecodedImage::new(DynamicImage::ImageRgba8(RgbaImage::new(2, 2)));
        assert!(rgba.has_alpha());
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(
            Color::parse_hex("#00000080"),
            Some(Color { r: 0, g: 0, b: 0, a: 128 })
        );
        assert_eq!(Color::parse_hex("#ggg"), None);
        assert_eq!(Color::parse_hex("#12345"), None);
    }
}
