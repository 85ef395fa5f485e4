use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::Validate;

/// Role of an identity. `Admin` satisfies every requirement, `BasicUser`
/// only a `BasicUser` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "Basic User")]
    BasicUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::BasicUser => "Basic User",
        }
    }

    pub fn satisfies(self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::BasicUser => required == Role::BasicUser,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Basic User" => Ok(Role::BasicUser),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Public view of an identity record; the password hash never leaves the
/// identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email_address: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Request body for `POST /api/users/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email_address: String,
    pub password: String,
    pub role: Role,
}

/// Request body for `PUT /api/users/<username>/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /validateToken`.
#[derive(Debug, Deserialize, Serialize)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username) && username != "." && username != ".."
}

fn check_profile(username: &str, email: &str) -> Result<(), String> {
    if !is_valid_username(username) {
        return Err("'username' must be 1-64 characters of letters, digits, '_', '.' or '-'".into());
    }
    if !is_valid_email(email) {
        return Err(format!("'{email}' is not a valid 'email_address'"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("'password' must be at least {MIN_PASSWORD_LEN} characters long"));
    }
    Ok(())
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), String> {
        check_profile(&self.username, &self.email_address)?;
        check_password(&self.password)
    }
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<(), String> {
        check_profile(&self.username, &self.email_address)?;
        match &self.password {
            Some(p) => check_password(p),
            None => Ok(()),
        }
    }
}

impl Validate for LoginRequest {}

impl Validate for ValidateTokenRequest {}
