//! Mapping resolver: idempotent creation of short-key mappings with
//! bounded collision retry, and point lookups for redirects.

pub mod resolver;

pub use resolver::{MappingResolver, ResolverSettings, WriteMode};
