//! Pharmacy Inventory library.
//!
//! The stock ledger, reference-data registries, authentication and the
//! role-gated page controllers, exposed as a library so the binary, the CLI
//! and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
