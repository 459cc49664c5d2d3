use crate::error::AuthError;
use crate::progress::ProgressStore;
use crate::storage::KeyValueStore;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Longest lifetime a session is given, whatever is asked for
pub const MAX_SESSION_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// User data structure representing a registered application user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable identifier, used as the key of the user's progress record
    pub id: String,

    /// Email address (login name)
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,
}

/// Login form data
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

/// Signup form data
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
}

/// User session data
#[derive(Debug, Clone)]
pub struct Session {
    /// Id of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Registered users, kept in a single JSON file keyed by email
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users_file: PathBuf,
}

impl UserDirectory {
    /// Open the users file, creating it and its directory if they don't exist
    ///
    /// # Errors
    /// * Returns an error if the directory or file cannot be created
    pub fn open(users_file: impl AsRef<Path>) -> Result<Self, AuthError> {
        let users_file = users_file.as_ref().to_path_buf();

        if let Some(dir) = users_file.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                create_dir_all(dir).map_err(|e| AuthError::Database(e.to_string()))?;
            }
        }

        if !users_file.exists() {
            let mut file =
                File::create(&users_file).map_err(|e| AuthError::Database(e.to_string()))?;
            file.write_all(b"{}")
                .map_err(|e| AuthError::Database(e.to_string()))?;
        }

        Ok(Self { users_file })
    }

    /// Get all registered users, keyed by email
    ///
    /// # Errors
    /// * Returns an error if the users file cannot be read or parsed
    pub fn get_users(&self) -> Result<HashMap<String, User>, AuthError> {
        let contents = fs::read_to_string(&self.users_file)
            .map_err(|_| AuthError::Database("Failed to read users file".to_string()))?;

        serde_json::from_str(&contents)
            .map_err(|_| AuthError::Database("Failed to parse users data".to_string()))
    }

    /// Write the users map back to disk
    pub fn save_users(&self, users: &HashMap<String, User>) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(users)
            .map_err(|_| AuthError::Database("Failed to serialize users data".to_string()))?;

        fs::write(&self.users_file, json)
            .map_err(|_| AuthError::Database("Failed to write users data".to_string()))
    }

    /// Register a new user
    ///
    /// # Errors
    /// * `MissingFields` if the email or password is empty
    /// * `PasswordMismatch` if the confirmation differs from the password
    /// * `PasswordTooShort` if the password has fewer than [`MIN_PASSWORD_LEN`] characters
    /// * `EmailTaken` if the email is already registered
    pub fn register_user(&self, form: &SignupForm) -> Result<User, AuthError> {
        let email = form.email.trim();
        if email.is_empty() || form.password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        let mut users = self.get_users()?;
        if users.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: hash_password(&form.password)?,
        };

        users.insert(email.to_string(), user.clone());
        self.save_users(&users)?;
        info!("Registered user {}", user.id);

        Ok(user)
    }

    /// Check login credentials
    ///
    /// # Errors
    /// * `InvalidCredentials` if no user has this email or the password is wrong
    pub fn verify_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.get_users()?;

        match users.get(email.trim()) {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AuthError> {
        Ok(self.get_users()?.into_values().find(|user| user.id == user_id))
    }
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err(AuthError::Database("Password hashing failed".to_string())),
    }
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AuthError::Database("Invalid password hash format".to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Create a new session for an authenticated user
///
/// Lifetimes above [`MAX_SESSION_LIFETIME`] are cut down to it.
///
/// # Returns
/// * `String` - A unique session ID
pub fn create_session(user_id: &str, lifetime: Duration) -> String {
    let session_id = Uuid::new_v4().to_string();
    let session = Session {
        user_id: user_id.to_string(),
        expires_at: SystemTime::now() + lifetime.min(MAX_SESSION_LIFETIME),
    };

    match SESSIONS.write() {
        Ok(mut sessions) => {
            sessions.insert(session_id.clone(), session);
        }
        Err(_) => warn!("Session table poisoned, session for {} not stored", user_id),
    }

    session_id
}

/// Validate a session
///
/// Expired sessions are dropped.
///
/// # Returns
/// * `Option<String>` - The user id for the session if valid, None otherwise
pub fn validate_session(session_id: &str) -> Option<String> {
    let mut sessions = SESSIONS.write().ok()?;

    match sessions.get(session_id) {
        Some(session) if session.expires_at > SystemTime::now() => Some(session.user_id.clone()),
        Some(_) => {
            sessions.remove(session_id);
            None
        }
        None => None,
    }
}

/// Remove a session, returning the user it belonged to
pub fn end_session(session_id: &str) -> Option<String> {
    let mut sessions = SESSIONS.write().ok()?;
    sessions.remove(session_id).map(|session| session.user_id)
}

/// Remove every session of a user, returning how many there were
pub fn end_user_sessions(user_id: &str) -> usize {
    let Ok(mut sessions) = SESSIONS.write() else {
        warn!("Session table poisoned, sessions of {} not ended", user_id);
        return 0;
    };
    let before = sessions.len();
    sessions.retain(|_, session| session.user_id != user_id);
    before - sessions.len()
}

/// Log a session out
///
/// Signs the user out everywhere: the given session and every other session of
/// the same user end, and the locally stored progress of the user is purged.
/// Unknown or already ended sessions are ignored.
pub fn logout<S: KeyValueStore>(session_id: &str, progress: &ProgressStore<S>) -> Option<String> {
    let user_id = end_session(session_id)?;
    end_user_sessions(&user_id);
    progress.purge(&user_id);
    info!("Logged out user {}", user_id);
    Some(user_id)
}
