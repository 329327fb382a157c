//! Cart/order lifecycle status.

use serde::{Deserialize, Serialize};

/// Status of a cart/order record.
///
/// A record starts life as `Cart` and moves to `Paid` exactly once at
/// checkout. There is no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cart_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Open, mutable cart.
    #[default]
    Cart,
    /// Finalized order.
    Paid,
}

impl CartStatus {
    /// Whether line items may still change.
    #[must_use]
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Cart)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Cart, Self::Paid))
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cart => write!(f, "cart"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}
