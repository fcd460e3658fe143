//! TCP liveness check for a single address

use serde::Serialize;
use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_PORTCHECK_TIMEOUT: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Refused,
    Timeout,
    Unknown,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PortState::Open => "is OPEN",
            PortState::Refused => "is CLOSED/REFUSED (no service)",
            PortState::Timeout => "TIMEOUT (blocked)",
            PortState::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

/// Classifies a connect error, by kind where the platform reports one and
/// by message text otherwise
pub fn classify_error(err: &io::Error) -> PortState {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => PortState::Refused,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => PortState::Timeout,
        _ => classify_text(&err.to_string()),
    }
}

/// Text heuristic: "refused" or "timeout"/"timed out"
pub fn classify_text(message: &str) -> PortState {
    let lower = message.to_lowercase();
    if lower.contains("refused") {
        PortState::Refused
    } else if lower.contains("timeout") || lower.contains("timed out") {
        PortState::Timeout
    } else {
        PortState::Unknown
    }
}

/// Connects once to `address` (`host:port`) and closes again.
///
/// # Returns
/// The state and, for anything but `Open`, the underlying error text
pub fn check_address(address: &str, timeout: Duration) -> (PortState, Option<String>) {
    let targets: Vec<SocketAddr> = match address.to_socket_addrs() {
        Ok(t) => t.collect(),
        Err(e) => return (classify_error(&e), Some(e.to_string())),
    };
    let Some(target) = targets.first() else {
        return (PortState::Unknown, Some(format!("{} did not resolve", address)));
    };

    log::debug!("dialing {} ({})", address, target);
    match TcpStream::connect_timeout(target, timeout) {
        Ok(stream) => {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            (PortState::Open, None)
        }
        Err(e) => {
            log::debug!("{}: {}", address, e);
            (classify_error(&e), Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_classify_kinds() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_error(&refused), PortState::Refused);
        let timeout = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(classify_error(&timeout), PortState::Timeout);
    }

    #[test]
    fn test_classify_text_fallback() {
        let err = io::Error::new(io::ErrorKind::Other, "dial tcp: i/o timeout");
        assert_eq!(classify_error(&err), PortState::Timeout);
        assert_eq!(classify_text("connect: connection refused"), PortState::Refused);
        assert_eq!(classify_text("no route to host"), PortState::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(PortState::Refused.to_string(), "is CLOSED/REFUSED (no service)");
        assert_eq!(PortState::Timeout.to_string(), "TIMEOUT (blocked)");
    }

    #[test]
    fn test_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (state, detail) = check_address(&addr, Duration::from_secs(2));
        assert_eq!(state, PortState::Open);
        assert!(detail.is_none());
    }

    #[test]
    fn test_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let (state, _) = check_address(&addr, Duration::from_secs(2));
        assert_eq!(state, PortState::Refused);
    }
}
