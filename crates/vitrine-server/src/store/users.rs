use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use tokio::sync::Mutex;
use vitrine_model::{parse_email, ProfileUpdate, UserId, UserRecord, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStoreError {
    EmailTaken,
    InvalidEmail(ValidationError),
    EmptyPassword,
}

impl Display for UserStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStoreError::EmailTaken => write!(f, "email already registered"),
            UserStoreError::InvalidEmail(e) => write!(f, "invalid email: {e}"),
            UserStoreError::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for UserStoreError {}

/// In-memory demo user registry. Users do not survive a restart; the only
/// durable state in this app is branding.
pub struct UserStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
}

impl UserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, email: &str, password: &str) -> Result<UserRecord, UserStoreError> {
        let email = parse_email(email).map_err(UserStoreError::InvalidEmail)?;
        if password.is_empty() {
            return Err(UserStoreError::EmptyPassword);
        }
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == email) {
            return Err(UserStoreError::EmailTaken);
        }
        let salt = format!("{:032x}", rand::random::<u128>());
        let record = UserRecord {
            id: UserId::random(),
            password_hash: hash_password(password, &salt),
            password_salt: salt,
            email,
            full_name: None,
            username: None,
            website: None,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    pub async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let needle = email.trim().to_ascii_lowercase();
        let users = self.users.lock().await;
        users.values().find(|u| u.email == needle).cloned()
    }

    pub async fn get(&self, id: UserId) -> Option<UserRecord> {
        self.users.lock().await.get(&id).cloned()
    }

    /// Applies the provided fields only; absent users return `None`.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Option<UserRecord> {
        let mut users = self.users.lock().await;
        let record = users.get_mut(&id)?;
        record.apply_update(update);
        Some(record.clone())
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[must_use]
pub fn verify_password(record: &UserRecord, password: &str) -> bool {
    hash_password(password, &record.password_salt) == record.password_hash
}
