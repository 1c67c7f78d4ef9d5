//! User records kept alongside jobs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user. Jobs never reference one while there is no auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Input for creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
