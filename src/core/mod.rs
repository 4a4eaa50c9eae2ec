//! Core types for thumbkit.
//!
//! This module contains the foundational pieces every stage builds on:
//! - Option values, sizes, decoded images and artifacts
//! - Option sets and their canonical token form
//! - Settings and configuration loading
//! - Sources and the storage collaborator
//! - Error types

pub mod types;
pub mod options;
pub mod settings;
pub mod source;
pub mod error;

// Re-export commonly used types
pub use types::{Color, DecodedImage, OptionValue, Size, ThumbnailArtifact};
pub use options::{normalize, OptionSet};
pub use settings::{Config, PreserveExtensions, ThumbnailSettings};
pub use source::{FileSystemStorage, SourceDescriptor, Storage};
pub use error::{ConfigError, EncodingError, StrategyKind, ThumbnailError, ThumbnailResult};
