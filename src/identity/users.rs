//! User registry: registration, password verification, and the
//! first-time-setup transaction that seeds `root`.

use std::collections::BTreeMap;

use super::kdf::{self, PasswordHash};
use super::{validate_username, Error, Result};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: Option<PasswordHash>,
    pub primary_group: String,
}

#[derive(Debug, Default)]
pub struct UserManager {
    users: BTreeMap<String, UserRecord>,
}

impl UserManager {
    pub fn new() -> Self {
        let mut users = BTreeMap::new();
        users.insert(
            "root".to_string(),
            UserRecord { username: "root".to_string(), password_hash: None, primary_group: "root".to_string() },
        );
        Self { users }
    }

    pub fn exists(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    /// Registers a new, non-reserved user with their own primary group of
    /// the same name (the group itself is created by the caller via
    /// `GroupManager`, keeping the two registries independent).
    pub fn register(&mut self, username: &str, password: Option<&str>, iterations: u32) -> Result<()> {
        validate_username(username)?;
        if self.exists(username) {
            return Err(Error::UserExists);
        }
        let password_hash = password.map(|p| kdf::hash_password(p, iterations));
        self.users.insert(
            username.to_string(),
            UserRecord { username: username.to_string(), password_hash, primary_group: username.to_string() },
        );
        Ok(())
    }

    pub fn remove(&mut self, username: &str) -> Result<()> {
        if username == "root" {
            return Err(Error::NotPermitted);
        }
        self.users.remove(username).ok_or(Error::UserNotFound).map(|_| ())
    }

    pub fn set_password(&mut self, username: &str, password: &str, iterations: u32) -> Result<()> {
        let record = self.users.get_mut(username).ok_or(Error::UserNotFound)?;
        record.password_hash = Some(kdf::hash_password(password, iterations));
        Ok(())
    }

    pub fn verify_password(&self, username: &str, password: &str, iterations: u32) -> Result<()> {
        let record = self.users.get(username).ok_or(Error::UserNotFound)?;
        match &record.password_hash {
            Some(hash) if kdf::verify_password(password, hash, iterations) => Ok(()),
            Some(_) => Err(Error::AuthenticationFailed),
            // A passwordless account (pre-onboarding) never authenticates via password.
            None => Err(Error::AuthenticationFailed),
        }
    }

    pub fn has_password(&self, username: &str) -> bool {
        self.users.get(username).map(|u| u.password_hash.is_some()).unwrap_or(false)
    }

    /// `usermod -g`: repoints a user's primary group. Does not validate that
    /// the group exists --- callers check that against `GroupManager` first.
    pub fn set_primary_group(&mut self, username: &str, group: &str) -> Result<()> {
        let record = self.users.get_mut(username).ok_or(Error::UserNotFound)?;
        record.primary_group = group.to_string();
        Ok(())
    }
}
