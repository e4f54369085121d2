//! Core types and error handling for nametag
//!
//! This module holds the pieces every other module leans on: the typed
//! [`UpdateError`] and the [`ErrorContext`] used to render failures for
//! command-line users.

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
