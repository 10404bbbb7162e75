use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const EMAIL_MAX_LEN: usize = 254;

/// Demo-grade email validation: one `@`, non-empty sides, bounded length.
pub fn parse_email(input: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError("email must not be empty".to_string()));
    }
    if s.len() > EMAIL_MAX_LEN {
        return Err(ValidationError(format!(
            "email exceeds max length {EMAIL_MAX_LEN}"
        )));
    }
    if s.chars().any(char::is_whitespace) {
        return Err(ValidationError("email must not contain spaces".to_string()));
    }
    match s.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(s.to_ascii_lowercase())
        }
        _ => Err(ValidationError("email must look like user@host".to_string())),
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(input.trim())
            .map(Self)
            .map_err(|e| ValidationError(format!("invalid user id: {e}")))
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full server-side user record. The password hash never leaves the store;
/// wire responses go through [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub website: Option<String>,
}

/// Profile fields a user may change. Identity and credentials are not
/// updatable through this path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.username.is_none() && self.website.is_none()
    }
}

impl UserRecord {
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            username: self.username.clone(),
            website: self.website.clone(),
        }
    }

    /// Applies only the fields the update actually carries.
    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(full_name) = &update.full_name {
            self.full_name = Some(full_name.clone());
        }
        if let Some(username) = &update.username {
            self.username = Some(username.clone());
        }
        if let Some(website) = &update.website {
            self.website = Some(website.clone());
        }
    }
}
