//! Named, scoped option sets.
//!
//! Aliases are looked up from the most specific scope (`field`) to the least
//! specific (`global`); the first match wins outright.

pub mod resolver;

pub use resolver::{AliasConfig, AliasDefinition, AliasResolver, AliasScope, AliasTarget};
