//! Shared types for the auth portal workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
