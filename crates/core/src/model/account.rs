use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::AccountId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccountError {
    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("email must contain '@': {0}")]
    InvalidEmail(String),

    #[error("name cannot be empty")]
    EmptyName,

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Educator,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Educator => "educator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "educator" => Ok(Role::Educator),
            other => Err(AccountError::UnknownRole(other.to_owned())),
        }
    }
}

//
// ─── ACCOUNT ───────────────────────────────────────────────────────────────────
//

/// A registered user as seen by the rest of the system.
///
/// Never carries the credential; that lives only in the storage layer's
/// account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    email: String,
    name: String,
    role: Role,
}

/// Canonical form used for uniqueness checks and lookups.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl Account {
    /// # Errors
    ///
    /// Returns `AccountError` if the email is empty or lacks '@', or the name is blank.
    pub fn new(
        id: AccountId,
        email: impl AsRef<str>,
        name: impl Into<String>,
        role: Role,
    ) -> Result<Self, AccountError> {
        let email = normalize_email(email.as_ref());
        if email.is_empty() {
            return Err(AccountError::EmptyEmail);
        }
        if !email.contains('@') {
            return Err(AccountError::InvalidEmail(email));
        }

        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(AccountError::EmptyName);
        }

        Ok(Self {
            id,
            email,
            name: name.to_owned(),
            role,
        })
    }

    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
