//! # realty-shared
//!
//! Types shared by the store and the HTTP server: id newtypes, the enums
//! persisted as text columns, field limits, and form validation.

pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use types::*;
