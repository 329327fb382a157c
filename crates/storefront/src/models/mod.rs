//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types and
//! from the JSON shapes returned by handlers.

pub mod cart;
pub mod product;
pub mod user;

pub use cart::{CartOrder, CartView, OrderView};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{CurrentUser, User};
