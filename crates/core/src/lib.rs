//! Pharmacy Core - Shared domain types.
//!
//! This crate provides the types shared by every pharmacy component:
//! - `web` - Inventory ledger, registries and the role-gated web interface
//! - `cli` - Command-line tools for migrations, user bootstrap and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access. Enabling the `postgres` feature adds `sqlx` encodings so the same
//! types can be bound and decoded directly by repositories.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, roles and page access, transaction types, emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
