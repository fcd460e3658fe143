/// Oracle session handling behind a small driver seam
///
/// The prober only needs "open a session" and "read one string". Both live
/// behind `SqlDriver`/`SqlSession` so tests can replace the database.
use super::client::ensure_client;
use super::error::DriverError;
use crate::tns::format::collapse_whitespace;
use oracle::{Connection, Connector};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use std::time::Duration;

/// An open database session
pub trait SqlSession {
    /// Runs a query returning a single string column and reads the first row.
    /// NULL comes back as an empty string.
    fn query_string(&mut self, sql: &str) -> Result<String, DriverError>;
}

/// Opens database sessions
pub trait SqlDriver {
    fn open(
        &self,
        user: &str,
        password: &str,
        connect_string: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SqlSession>, DriverError>;
}

fn timeout_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\(\s*(TRANSPORT_CONNECT_TIMEOUT|CONNECT_TIMEOUT)\s*=\s*([^)]*)\)")
            .expect("valid timeout parameter regex")
    })
}

fn description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*DESCRIPTION\s*=").expect("valid description regex"))
}

fn ezconnect_timeout_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([?&]connect_timeout=)([^&]*)").expect("valid ezconnect timeout regex")
    })
}

const TIMEOUT_PARAMS: [&str; 2] = ["CONNECT_TIMEOUT", "TRANSPORT_CONNECT_TIMEOUT"];

/// Bounds connection setup by `timeout` (at least one second).
///
/// Every `(DESCRIPTION=` block, also inside a `DESCRIPTION_LIST`, gets
/// `CONNECT_TIMEOUT` and `TRANSPORT_CONNECT_TIMEOUT`; values already present
/// are lowered to the timeout when larger. EZConnect strings get
/// `?connect_timeout=n`. A bare net service name is returned unchanged.
pub fn with_connect_timeout(connect_string: &str, timeout: Duration) -> String {
    let secs = timeout.as_secs().max(1);
    if !connect_string.trim_start().starts_with('(') {
        return ezconnect_with_timeout(connect_string, secs);
    }

    let capped = timeout_param_re().replace_all(connect_string, |c: &Captures<'_>| {
        format!("({}={})", &c[1], cap_value(&c[2], secs))
    });
    inject_missing(&capped, secs)
}

/// Keeps `value` when it is within `secs`, otherwise returns `secs`.
/// Understands plain seconds and the `ms`, `sec` and `min` units.
fn cap_value(value: &str, secs: u64) -> String {
    let value = value.trim();
    let digits = value.chars().take_while(|c| c.is_ascii_digit()).count();
    let amount: Option<u64> = value[..digits].parse().ok();
    let millis = match (amount, value[digits..].trim().to_lowercase().as_str()) {
        (Some(n), "" | "s" | "sec") => n.checked_mul(1000),
        (Some(n), "ms") => Some(n),
        (Some(n), "min") => n.checked_mul(60_000),
        _ => None,
    };
    match millis {
        Some(ms) if ms > 0 && ms <= secs * 1000 => value.to_string(),
        _ => secs.to_string(),
    }
}

/// Adds the timeout parameters a `DESCRIPTION` block lacks, right after its
/// opening
fn inject_missing(desc: &str, secs: u64) -> String {
    let mut out = String::with_capacity(desc.len() + 64);
    let mut copied = 0;
    for m in description_re().find_iter(desc) {
        let block = &desc[m.end()..block_end(desc, m.start())];
        let present: Vec<String> = timeout_param_re()
            .captures_iter(block)
            .map(|c| c[1].to_uppercase())
            .collect();

        out.push_str(&desc[copied..m.end()]);
        for name in TIMEOUT_PARAMS {
            if !present.iter().any(|p| p == name) {
                out.push_str(&format!("({}={})", name, secs));
            }
        }
        copied = m.end();
    }
    out.push_str(&desc[copied..]);
    out
}

/// Index just past the parenthesis closing the one at `start`
fn block_end(text: &str, start: usize) -> usize {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(start) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    text.len()
}

/// `host[:port]/service[?params]`
fn ezconnect_with_timeout(connect_string: &str, secs: u64) -> String {
    if !connect_string.contains('/') && !connect_string.contains(':') {
        return connect_string.to_string();
    }
    if ezconnect_timeout_re().is_match(connect_string) {
        return ezconnect_timeout_re()
            .replace_all(connect_string, |c: &Captures<'_>| {
                format!("{}{}", &c[1], cap_value(&c[2], secs))
            })
            .into_owned();
    }
    let sep = if connect_string.contains('?') { '&' } else { '?' };
    format!("{}{}connect_timeout={}", connect_string, sep, secs)
}

/// `SqlDriver` on top of the `oracle` crate
#[derive(Debug, Clone, Default)]
pub struct OracleDriver {
    client_dir: Option<String>,
}

impl OracleDriver {
    /// # Arguments
    /// * `client_dir` - Instant Client directory, `None` for the system loader
    pub fn new(client_dir: Option<String>) -> Self {
        Self { client_dir }
    }
}

impl SqlDriver for OracleDriver {
    fn open(
        &self,
        user: &str,
        password: &str,
        connect_string: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SqlSession>, DriverError> {
        ensure_client(self.client_dir.as_deref());

        let target = with_connect_timeout(&collapse_whitespace(connect_string), timeout);
        log::debug!("connecting as {} to {}", user, target);

        let conn = Connector::new(user, password, target.as_str())
            .connect()
            .map_err(|e| {
                let err = DriverError::from(e);
                if err.message.contains("DPI-1047") {
                    log::error!("Oracle Instant Client library could not be loaded");
                }
                err
            })?;

        conn.set_call_timeout(Some(timeout))?;
        log::debug!("session opened as {}", user);
        Ok(Box::new(OracleSession { conn }))
    }
}

/// Represents an open Oracle connection
pub struct OracleSession {
    conn: Connection,
}

impl SqlSession for OracleSession {
    fn query_string(&mut self, sql: &str) -> Result<String, DriverError> {
        log::debug!("query: {}", sql);
        let value = self.conn.query_row_as::<Option<String>>(sql, &[])?;
        Ok(value.unwrap_or_default())
    }
}

impl Drop for OracleSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.close() {
            log::debug!("closing session: {}", e);
        }
    }
}
