//! Shared error and result types used throughout the install engine.

pub mod error;

pub use error::{ErrorContext, PantryError, RecoverySuggestion, user_friendly_error};
