//! Core types and aggregation rules for the BionicPRO reports service.

pub mod auth;
pub mod error;
pub mod identity;
pub mod records;
pub mod report;
pub mod rollup;
pub mod source;
pub mod stats;
pub mod window;

pub use auth::*;
pub use error::{Error, Result};
pub use identity::IdentityFilter;
pub use records::*;
pub use report::*;
pub use window::*;
