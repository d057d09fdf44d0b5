//! Shared error plumbing for the revocation backend.

pub mod error;

pub use error::{RevocError, Result};
