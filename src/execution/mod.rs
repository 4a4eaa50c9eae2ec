//! Generation pipeline module.
//!
//! This module runs source generators and processors over a source and
//! encodes the result.

pub mod engine;
pub mod encode;

pub use engine::{apply_processors, dispatch_generators, GenerationPipeline, Stage};
pub use encode::{encode, format_for_extension, EncodeParams};
