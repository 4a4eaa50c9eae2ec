//! Strategy module.
//!
//! Contains the strategy traits, the strategy registry and the built-in
//! generators and processors.

pub mod strategy;
pub mod registry;
pub mod builtin;

pub use registry::{RegistryBuilder, StrategyRegistry};
pub use strategy::{GeneratorOutcome, Processor, SourceContent, SourceGenerator};
