//! Core types for the pharmacy system.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod role;
pub mod transaction;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{Page, Role};
pub use transaction::TransactionType;
