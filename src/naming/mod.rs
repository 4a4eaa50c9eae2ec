//! Thumbnail naming.
//!
//! The deriver turns a source name and an option set into a storage key; the
//! namers decide the filename part of it.

pub mod deriver;
pub mod namers;

pub use deriver::{extension_of, join_key, split_name, KeyDeriver};
pub use namers::{
    AliasNamer, DefaultNamer, FnNamer, HashedNamer, Namer, NamerContext, SourceHashedNamer,
};
