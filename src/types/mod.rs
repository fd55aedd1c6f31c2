//! Shared types for the enrollment engine

pub mod error;

pub use error::{ElimuError, Result};
