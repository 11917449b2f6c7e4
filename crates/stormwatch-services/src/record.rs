//! The single user record: who to alert and for which city.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stormwatch_core::StorageError;
use stormwatch_notify::Contact;

/// City and contact details entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub city: String,
    /// International format with a leading "+"
    pub phone: String,
    pub email: String,
}

impl UserRecord {
    pub fn new(
        city: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into().trim().to_string(),
            phone: phone.into().trim().to_string(),
            email: email.into().trim().to_string(),
        }
    }

    pub fn contact(&self) -> Contact {
        Contact::new(self.phone.clone(), self.email.clone())
    }

    /// Form-level checks applied before a record is saved.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.city.is_empty() || self.phone.is_empty() || self.email.is_empty() {
            problems.push("Please fill in all fields".to_string());
        }
        if !self.phone.is_empty() && !is_international_phone(&self.phone) {
            problems.push(format!(
                "Invalid phone number {}: use '+' followed by 10 to 15 digits",
                self.phone
            ));
        }
        if !self.email.is_empty() && !is_plausible_email(&self.email) {
            problems.push(format!("Invalid email address {}", self.email));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn is_international_phone(phone: &str) -> bool {
    match phone.strip_prefix('+') {
        Some(digits) => {
            (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// `local@domain.tld` with exactly one '@' and a dot inside the domain.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return false;
    }
    match domain.split_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Storage for the single user record.
pub trait UserRecordStore: Send + Sync {
    /// The stored record, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<UserRecord>, StorageError>;

    /// Replace the stored record.
    fn save(&self, record: &UserRecord) -> Result<(), StorageError>;
}

/// Record kept as a pretty-printed JSON object in one file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

impl UserRecordStore for JsonFileStore {
    fn load(&self) -> Result<Option<UserRecord>, StorageError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    path: self.display_path(),
                    message: e.to_string(),
                })
            }
        };

        let record: UserRecord =
            serde_json::from_str(&json).map_err(|e| StorageError::Corruption(e.to_string()))?;

        tracing::debug!("Loaded user record from {:?}", self.path);
        Ok(Some(record))
    }

    fn save(&self, record: &UserRecord) -> Result<(), StorageError> {
        let write_failed = |e: &dyn std::fmt::Display| StorageError::WriteFailed {
            path: self.display_path(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_failed(&e))?;
        }

        let json = serde_json::to_string_pretty(record).map_err(|e| write_failed(&e))?;

        fs::write(&self.path, json).map_err(|e| write_failed(&e))?;

        tracing::info!("Saved user record for {} at {:?}", record.city, self.path);
        Ok(())
    }
}

/// In-process store, for hosts that keep the record elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<UserRecord>>,
}

impl MemoryStore {
    pub fn with_record(record: UserRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl UserRecordStore for MemoryStore {
    fn load(&self) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &UserRecord) -> Result<(), StorageError> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }
}
