//! Error types for thumbkit.
//!
//! Uses thiserror for structured errors with context. Every fatal condition
//! carries what a caller needs for a precise diagnostic: the source name, the
//! offending size, or the target format.

use thiserror::Error;

/// Formats an optional dimension the way diagnostics print it.
fn dim(value: &Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

/// Top-level error type for thumbnail generation.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("The source image has an invalid size ({}x{})", dim(.width), dim(.height))]
    InvalidSize {
        width: Option<f64>,
        height: Option<f64>,
    },

    #[error("The source file does not appear to be an image: '{name}'")]
    InvalidImageFormat { name: String },

    #[error("No readable source available for '{name}'")]
    MissingSource { name: String },

    #[error("Source generator '{generator}' failed for '{name}': {reason}")]
    SourceGenerator {
        generator: String,
        name: String,
        reason: String,
    },

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Unknown {kind} strategy '{id}'")]
    UnknownStrategy { kind: StrategyKind, id: String },

    #[error("A relative name must be provided for the source")]
    InvalidSourceName,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Kind of registered strategy, used in lookup diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Generator,
    Processor,
    Namer,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrategyKind::Generator => "source generator",
            StrategyKind::Processor => "processor",
            StrategyKind::Namer => "namer",
        };
        f.write_str(name)
    }
}

/// Errors from the final encode step.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Unsupported thumbnail extension '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Quality {quality} is outside 1..=100")]
    InvalidQuality { quality: i64 },

    #[error("Subsampling mode {subsampling} is not one of 0, 1, 2")]
    InvalidSubsampling { subsampling: i64 },

    #[error("Image {width}x{height} is too large for {format}")]
    DimensionsTooLarge {
        width: u32,
        height: u32,
        format: String,
    },

    #[error("Cannot encode {format}: {error}")]
    Codec { format: String, error: String },
}

/// Errors while loading settings or alias tables.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid alias target '{target}': {reason}")]
    InvalidAliasTarget { target: String, reason: String },

    #[error("Failed to read configuration from {path}: {error}")]
    Io { path: String, error: std::io::Error },
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ThumbnailError {
    /// Whether this error was raised before any decode work began.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ThumbnailError::InvalidSize { .. }
                | ThumbnailError::MissingSource { .. }
                | ThumbnailError::InvalidSourceName
        )
    }

    /// Name of the source involved, if the error carries one.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            ThumbnailError::InvalidImageFormat { name }
            | ThumbnailError::MissingSource { name }
            | ThumbnailError::SourceGenerator { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Result type alias for thumbnail operations.
pub type ThumbnailResult<T> = Result<T, ThumbnailError>;

/// Result type alias for the encode step.
pub type EncodingResult<T> = Result<T, EncodingError>;
