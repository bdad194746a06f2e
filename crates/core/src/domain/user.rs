use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// The caller's identity, passed explicitly into service operations rather
/// than read from ambient state. `anonymous()` is the unauthenticated marker
/// services must reject on booking creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn known(email: impl Into<String>) -> Self {
        Self { email: Some(email.into()) }
    }

    pub fn anonymous() -> Self {
        Self { email: None }
    }

    pub fn is_anonymous(&self) -> bool {
        match &self.email {
            None => true,
            Some(email) => email.trim().is_empty(),
        }
    }
}
