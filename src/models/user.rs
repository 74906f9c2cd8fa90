use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's role as the spreadsheet records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The user object carried in a successful `authenticate` reply.
///
/// User records live entirely in the spreadsheet; this is the only shape
/// of them this layer ever interprets.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    /// The unique username.
    pub username: String,
    /// The email recorded for the user.
    #[serde(default)]
    pub email: String,
    /// The user's role.
    pub role: Role,
}

/// The request payload for creating a user through the admin API.
///
/// Fields default to empty so missing ones surface as validation errors
/// rather than rejected bodies.
#[derive(Deserialize, Debug)]
pub struct NewUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// The request payload for updating a user through the admin API.
#[derive(Deserialize, Debug)]
pub struct UpdateUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Left blank to keep the stored password.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}
