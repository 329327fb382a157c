//! Cornerstore Core - Shared types and cart domain logic.
//!
//! This crate provides the types used across all Cornerstore components:
//! - `storefront` - JSON REST API (catalog, cart, checkout, orders)
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Line-item mutation and total computation live here
//! so they can be tested without any storage behind them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, quantities and statuses
//! - [`cart`] - Line items and the total computation over a price lookup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{LineItem, LineItemError, LineItems};
pub use types::*;
