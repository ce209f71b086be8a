use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Profile;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Public part of a profile returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub is_approved: bool,
}

impl From<&Profile> for PublicUser {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            email: p.email.clone(),
            is_approved: p.is_approved,
        }
    }
}

/// Returned after register: the account exists but cannot log in until an
/// admin approves it.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}
