//! Error types and exit codes for tnscli
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error, I/O error or partial failure of a bulk operation
//! - 2: Configuration or usage error
//! - 3: Network, directory or database error
//! - 4: Lookup error (alias not found)

use thiserror::Error;

pub type TnsResult<T> = Result<T, TnsError>;

#[derive(Debug, Error)]
pub enum TnsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Probe(String),

    #[error("{message} ({failed} of {total} failed)")]
    PartialFailure {
        message: String,
        failed: usize,
        total: usize,
    },

    #[error("Credential storage error: {0}")]
    Credential(String),
}

impl TnsError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TnsError::Config(_) | TnsError::Parse(_) => 2,
            TnsError::Directory(_) | TnsError::Database(_) | TnsError::Probe(_) => 3,
            TnsError::NotFound(_) => 4,
            TnsError::Io(_) | TnsError::PartialFailure { .. } | TnsError::Credential(_) => 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self, use_color: bool) {
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }
    }
}

impl From<std::io::Error> for TnsError {
    fn from(e: std::io::Error) -> Self {
        TnsError::Io(e.to_string())
    }
}

impl From<ldap3::LdapError> for TnsError {
    fn from(e: ldap3::LdapError) -> Self {
        TnsError::Directory(e.to_string())
    }
}

impl From<oracle::Error> for TnsError {
    fn from(e: oracle::Error) -> Self {
        TnsError::Database(e.to_string())
    }
}

impl From<serde_yaml::Error> for TnsError {
    fn from(e: serde_yaml::Error) -> Self {
        TnsError::Config(format!("YAML error: {}", e))
    }
}

impl From<serde_json::Error> for TnsError {
    fn from(e: serde_json::Error) -> Self {
        TnsError::Io(format!("JSON error: {}", e))
    }
}

impl From<keyring::Error> for TnsError {
    fn from(e: keyring::Error) -> Self {
        TnsError::Credential(e.to_string())
    }
}

impl From<regex::Error> for TnsError {
    fn from(e: regex::Error) -> Self {
        TnsError::Config(format!("invalid search pattern: {}", e))
    }
}
