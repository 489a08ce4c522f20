//! Query specification: what a single backend fetch should return

pub mod types;
pub mod builder;
pub mod pagination;
pub mod sql_generation;

pub use types::*;
pub use builder::*;
pub use pagination::*;
pub use sql_generation::quote_identifier;
