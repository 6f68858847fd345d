use std::fmt;

/// Coarse error category shared by every service error.
///
/// Presentation code matches on this to pick a toast, redirect, or inline
/// message; the error's `Display` output carries the human-readable detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Unknown account, course, or enrollment.
    NotFound,
    /// The caller does not own the record or has the wrong role.
    Forbidden,
    /// Rejected user input (empty required field, out-of-range value).
    Validation,
    /// An uploaded file could not be read.
    Ingestion,
    /// A uniqueness rule was violated (e.g. duplicate email).
    Conflict,
    /// No active session.
    Unauthenticated,
    /// Login with an unknown email or a wrong password.
    InvalidCredentials,
    /// Backend failure unrelated to the caller's input.
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Validation => "validation",
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
