//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cornerstore_core::{Email, UserId};

/// A registered shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized email address.
    pub email: Email,
    /// When the user registered.
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

/// Identity resolved from a bearer token.
///
/// Handlers trust this id as given; it was signed by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    /// The authenticated user's ID.
    pub id: UserId,
}
