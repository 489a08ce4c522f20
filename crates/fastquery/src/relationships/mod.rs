//! Relationships Module - Relation metadata and the schema capability

pub mod metadata;
pub mod registry;
pub mod traits;

pub use metadata::*;
pub use registry::*;
pub use traits::*;
