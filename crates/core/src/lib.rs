//! Oakhouse Core - Shared domain types.
//!
//! Used by:
//! - `storefront` - The public JSON API (shop, checkout, admin endpoints)
//! - `cli` - Migrations and account management
//!
//! # Architecture
//!
//! Types only: no I/O, no database access, no HTTP clients. The optional
//! `postgres` feature adds `sqlx` encoding for the ID and email newtypes.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, and payment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
