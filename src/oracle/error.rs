//! Driver errors with the vendor error code kept apart from the text

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// ORA-01017: invalid username/password; logon denied
pub const ORA_INVALID_LOGIN: i32 = 1017;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverError {
    /// ORA number when the failure came from the database or the Net layer
    pub code: Option<i32>,
    pub message: String,
    pub hint: Option<String>,
}

impl DriverError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        let hint = code.and_then(hint_for).map(str::to_string);
        Self {
            code,
            message: message.into(),
            hint,
        }
    }

    /// An error without a vendor code (client library missing, bad input)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn is_invalid_login(&self) -> bool {
        self.code == Some(ORA_INVALID_LOGIN)
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DriverError {}

impl From<oracle::Error> for DriverError {
    fn from(e: oracle::Error) -> Self {
        let message = e.to_string();
        let code = e
            .db_error()
            .map(|d| d.code())
            .filter(|c| *c != 0)
            .or_else(|| code_from_text(&message));
        DriverError::new(code, message)
    }
}

impl From<DriverError> for crate::error::TnsError {
    fn from(e: DriverError) -> Self {
        crate::error::TnsError::Database(e.message)
    }
}

fn hint_for(code: i32) -> Option<&'static str> {
    match code {
        1017 => Some("Listener and service are up, the login was rejected."),
        12154 => Some("Could not resolve the connect identifier."),
        12170 => Some("Connection timed out. Check network and firewall."),
        12514 => Some("Listener does not know the requested service."),
        12541 => Some("No listener at specified host:port. Verify the address."),
        12545 => Some("Target host or object does not exist."),
        _ => None,
    }
}

/// Picks the first `ORA-nnnnn` out of an error text
pub fn code_from_text(text: &str) -> Option<i32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"ORA-(\d{5})").expect("valid ORA regex"));
    re.captures(text)?.get(1)?.as_str().parse().ok()
}
