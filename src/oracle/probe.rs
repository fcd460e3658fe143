//! Reachability probe
//!
//! Opens a session against a descriptor and classifies the outcome. A login
//! rejected with ORA-01017 counts as reachable: the listener answered and the
//! service handed the request to authentication. Every other failure counts
//! as unreachable.

use super::connection::SqlDriver;
use super::error::DriverError;
use crate::credentials::ProbeCredentials;
use crate::tns::format::collapse_whitespace;
use crate::tns::TnsEntries;
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

pub const DEFAULT_CHECK_TIMEOUT: u64 = 15;

/// Query run after a successful open
pub const SYSDATE_QUERY: &str =
    "select 'DB is open, sysdate:'||to_char(sysdate,'YYYY-MM-DD HH24:MI:SS') from dual";

/// Query run with `--dbhost`: `host:instance:container`
pub const DBHOST_QUERY: &str = "select sys_context('USERENV','SERVER_HOST')||':'||sys_context('USERENV','INSTANCE_NAME')||':'||nvl(sys_context('USERENV','CON_NAME'),'') as dbhost from dual";

pub const LOGIN_WARNING: &str = "Connect OK, but Login error, maybe expected";

/// How a probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Session opened and the query returned
    Open,
    /// Listener reached, login rejected with ORA-01017
    LoginRejected,
    /// Reachable, but host identity was requested and came back empty
    HostInfoMissing,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub reachable: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
    /// Text returned by the query: the sysdate line, or
    /// `host:instance:container` with `--dbhost`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ora_code: Option<i32>,
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ProbeOutcome {
    /// True when the alias counts as working
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ProbeStatus::Open | ProbeStatus::LoginRejected)
    }

    /// Human readable failure reason
    pub fn reason(&self) -> String {
        self.error_detail
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.status))
    }
}

/// One probe attempt
#[derive(Debug, Clone)]
pub struct ProbeRequest<'a> {
    pub desc: &'a str,
    pub credentials: &'a ProbeCredentials,
    pub timeout: Duration,
    /// Run the host identity query instead of the sysdate query
    pub dbhost: bool,
}

/// Classifies descriptors as reachable or not through a `SqlDriver`
pub struct Prober<'d> {
    driver: &'d dyn SqlDriver,
}

impl<'d> Prober<'d> {
    pub fn new(driver: &'d dyn SqlDriver) -> Self {
        Self { driver }
    }

    /// Probes one descriptor. Never retries.
    pub fn probe(&self, req: &ProbeRequest<'_>) -> ProbeOutcome {
        let start = Instant::now();
        let connect_string = collapse_whitespace(req.desc);
        let user = &req.credentials.username;
        log::debug!("probing as {} with timeout {:?}", user, req.timeout);

        let result = self
            .driver
            .open(user, &req.credentials.password, &connect_string, req.timeout)
            .and_then(|mut session| {
                let sql = if req.dbhost { DBHOST_QUERY } else { SYSDATE_QUERY };
                session.query_string(sql)
            });

        let mut outcome = match result {
            Ok(text) => {
                log::info!("{}", text);
                ProbeOutcome {
                    status: ProbeStatus::Open,
                    reachable: true,
                    elapsed: start.elapsed(),
                    host_info: Some(text),
                    error_detail: None,
                    ora_code: None,
                }
            }
            Err(e) if e.is_invalid_login() => {
                log::warn!("{}", LOGIN_WARNING);
                ProbeOutcome {
                    status: ProbeStatus::LoginRejected,
                    reachable: true,
                    elapsed: start.elapsed(),
                    host_info: None,
                    error_detail: None,
                    ora_code: e.code,
                }
            }
            Err(e) => unreachable_outcome(e, start.elapsed()),
        };

        let host_missing = outcome
            .host_info
            .as_deref()
            .map_or(true, |h| h.trim().trim_matches(':').is_empty());
        if req.dbhost && outcome.reachable && host_missing {
            outcome.status = ProbeStatus::HostInfoMissing;
            outcome.error_detail = Some(
                "database is available, but could not extract host info, maybe login failed"
                    .to_string(),
            );
        }
        outcome
    }

    /// Probes every entry in alias order.
    ///
    /// `on_result` is called after each alias so callers can print progress.
    pub fn check_all<F>(
        &self,
        entries: &TnsEntries,
        credentials: &ProbeCredentials,
        timeout: Duration,
        dbhost: bool,
        mut on_result: F,
    ) -> CheckReport
    where
        F: FnMut(&AliasOutcome),
    {
        let mut report = CheckReport::default();
        for entry in entries.iter() {
            log::debug!("checking {}", entry.name);
            let outcome = self.probe(&ProbeRequest {
                desc: &entry.desc,
                credentials,
                timeout,
                dbhost,
            });
            let result = AliasOutcome {
                alias: entry.name.clone(),
                outcome,
            };
            on_result(&result);
            report.results.push(result);
        }
        report
    }
}

fn unreachable_outcome(e: DriverError, elapsed: Duration) -> ProbeOutcome {
    log::info!("probe failed: {}", e);
    let detail = match &e.hint {
        Some(hint) => format!("{} ({})", e.message.trim(), hint),
        None => e.message.trim().to_string(),
    };
    ProbeOutcome {
        status: ProbeStatus::Unreachable,
        reachable: false,
        elapsed,
        host_info: None,
        error_detail: Some(detail),
        ora_code: e.code,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AliasOutcome {
    pub alias: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// Results of a bulk check, in alias order
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub results: Vec<AliasOutcome>,
}

impl CheckReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn ok(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.ok()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AliasOutcome> {
        self.results.iter().filter(|r| !r.outcome.is_ok())
    }

    /// `<n> entries checked, <ok> ok, <failed> failed`
    pub fn summary(&self) -> String {
        format!(
            "{} entries checked, {} ok, {} failed",
            self.total(),
            self.ok(),
            self.failed()
        )
    }
}
