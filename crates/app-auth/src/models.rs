//! Wire types shared with the data service.

use serde::{Deserialize, Serialize};

/// A signed-in user as the data service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Outcome of a successful credential exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub user: User,
    pub token: String,
}
