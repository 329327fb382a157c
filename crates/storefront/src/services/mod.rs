//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and bearer tokens
//! - `catalog` - Product CRUD with validation
//! - `cart` - Cart mutations, checkout and order history
//! - `payments` - Payment processor client
//!
//! Services borrow the stores they need and are built per request; they hold
//! no state of their own beyond what [`crate::state::AppState`] owns.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod payments;
