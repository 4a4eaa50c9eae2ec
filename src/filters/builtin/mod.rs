//! Built-in strategy implementations.
//!
//! This module contains the generators and processors that ship with thumbkit.

mod color;
mod enhance;
mod generators;
mod transform;

use crate::filters::registry::StrategyRegistry;

/// Register all built-in generators and processors.
///
/// Processors are registered in their default pipeline order.
pub fn register_all(registry: &mut StrategyRegistry) {
    generators::register(registry);
    color::register(registry);
    transform::register(registry);
    enhance::register(registry);
    transform::register_background(registry);
}

// Re-export for direct access
pub use color::Colorspace;
pub use enhance::Filters;
pub use generators::{ExtensionHintDecoder, ImageDecoder};
pub use transform::{Autocrop, Background, CropMode, ScaleAndCrop};
