//! Strategy traits for the generation pipeline.
//!
//! Source generators decode raw bytes; processors transform the decoded image.
//! Both are looked up by id in a [`StrategyRegistry`](crate::filters::registry::StrategyRegistry).

use crate::core::options::OptionSet;
use crate::core::types::DecodedImage;

/// Raw source bytes handed to generators after acquisition.
#[derive(Debug, Clone, Copy)]
pub struct SourceContent<'a> {
    /// Logical relative name of the source.
    pub name: &'a str,
    /// Full source bytes.
    pub data: &'a [u8],
}

/// Result of one source generator attempt.
#[derive(Debug)]
pub enum GeneratorOutcome {
    /// Decoded successfully; remaining generators are skipped.
    Success(DecodedImage),
    /// This generator does not handle the source.
    NotApplicable,
    /// The generator handles the source but failed.
    Failure(String),
}

impl GeneratorOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GeneratorOutcome::Success(_))
    }
}

/// Decodes source bytes into an image.
pub trait SourceGenerator: Send + Sync {
    /// Registry id.
    fn id(&self) -> &str;

    /// Attempt to decode `source`.
    fn generate(&self, source: &SourceContent<'_>, options: &OptionSet) -> GeneratorOutcome;
}

/// Transforms a decoded image.
///
/// Processors see the full option set and ignore options they do not use.
pub trait Processor: Send + Sync {
    /// Registry id.
    fn id(&self) -> &str;

    fn process(&self, image: DecodedImage, options: &OptionSet) -> DecodedImage;
}
