//! User entity and its validated field types
//!
//! Names are trimmed then held to 2..=50 characters. Emails are trimmed,
//! checked against a conservative address pattern and have their domain
//! lowercased so the unique constraint sees one spelling per mailbox.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

/// Minimum length for first/last names
pub const MIN_NAME_LEN: usize = 2;

/// Maximum length for first/last names
pub const MAX_NAME_LEN: usize = 50;

/// Maximum length for an email address (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

/// local-part@domain, domain needs at least one dot and well-formed labels
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("invalid email regex")
});

/// Persisted user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl User {
    /// Apply the provided fields of `changes`, leaving the rest untouched.
    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.as_str().to_owned();
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.as_str().to_owned();
        }
        if let Some(email) = &changes.email {
            self.email = email.as_str().to_owned();
        }
    }
}

/// All users plus their count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    pub count: usize,
    pub users: Vec<User>,
}

impl From<Vec<User>> for UserList {
    fn from(users: Vec<User>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}

/// Validated first or last name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName(String);

impl PersonName {
    /// Create a name, trimming surrounding whitespace.
    ///
    /// # Example
    /// ```
    /// use userctl_server::models::PersonName;
    ///
    /// assert_eq!(PersonName::new("first_name", "  Ada ").unwrap().as_str(), "Ada");
    /// assert!(PersonName::new("first_name", "A").is_err());
    /// ```
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        let len = trimmed.chars().count();

        if len == 0 {
            return Err(ValidationError::Empty { field });
        }
        if len < MIN_NAME_LEN {
            return Err(ValidationError::TooShort {
                field,
                min: MIN_NAME_LEN,
            });
        }
        if len > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated, normalized email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse an email address.
    ///
    /// # Example
    /// ```
    /// use userctl_server::models::EmailAddress;
    ///
    /// let email = EmailAddress::new("ada@Example.COM").unwrap();
    /// assert_eq!(email.as_str(), "ada@example.com");
    /// assert!(EmailAddress::new("not-an-email").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }
        if !EMAIL_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must be a valid email address",
            });
        }

        // The pattern guarantees exactly one '@'
        let normalized = match trimmed.split_once('@') {
            Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
            None => trimmed.to_owned(),
        };

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated input for creating a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: EmailAddress,
}

impl NewUser {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            first_name: PersonName::new("first_name", first_name)?,
            last_name: PersonName::new("last_name", last_name)?,
            email: EmailAddress::new(email)?,
        })
    }
}

/// Validated partial update. `None` means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub email: Option<EmailAddress>,
}

impl UserChanges {
    /// True when no field was provided.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}
