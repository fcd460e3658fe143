/// Integration tests for the reachability probe and bulk check
///
/// A scripted driver stands in for the database: the descriptor's HOST
/// decides how the connection attempt ends.
/// Run these tests with: cargo test --test probe_tests
use std::thread;
use std::time::{Duration, Instant};
use tns_cli_lib::commands::check::{check_all, check_one, CheckArgs};
use tns_cli_lib::credentials::ProbeCredentials;
use tns_cli_lib::oracle::{DriverError, ProbeRequest, ProbeStatus, Prober, SqlDriver, SqlSession};
use tns_cli_lib::tns::{TnsEntries, TnsEntry};
use tns_cli_lib::TnsError;

struct ScriptedSession {
    host: String,
}

impl SqlSession for ScriptedSession {
    fn query_string(&mut self, sql: &str) -> Result<String, DriverError> {
        if sql.contains("SERVER_HOST") {
            Ok(format!("{}:XE1:XEPDB1", self.host))
        } else {
            Ok("DB is open, sysdate:2024-05-01 10:00:00".to_string())
        }
    }
}

/// `HOST=open*` opens, `HOST=auth*` rejects the login, anything else has no listener
struct ScriptedDriver;

impl SqlDriver for ScriptedDriver {
    fn open(
        &self,
        _user: &str,
        _password: &str,
        connect_string: &str,
        _timeout: Duration,
    ) -> Result<Box<dyn SqlSession>, DriverError> {
        assert!(
            !connect_string.contains(char::is_whitespace),
            "descriptor must reach the driver without whitespace"
        );
        if connect_string.contains("HOST=open") {
            Ok(Box::new(ScriptedSession {
                host: "dbnode1".to_string(),
            }))
        } else if connect_string.contains("HOST=auth") {
            Err(DriverError::new(
                Some(1017),
                "ORA-01017: invalid username/password; logon denied",
            ))
        } else {
            Err(DriverError::new(Some(12541), "ORA-12541: TNS:no listener"))
        }
    }
}

/// Gives up after the requested timeout, like a connect to a dropped port
struct StalledDriver;

impl SqlDriver for StalledDriver {
    fn open(
        &self,
        _user: &str,
        _password: &str,
        _connect_string: &str,
        timeout: Duration,
    ) -> Result<Box<dyn SqlSession>, DriverError> {
        thread::sleep(timeout);
        Err(DriverError::new(Some(12170), "ORA-12170: TNS:Connect timeout occurred"))
    }
}

fn desc(host: &str) -> String {
    format!(
        "(DESCRIPTION =\n  (ADDRESS = (PROTOCOL = TCP)(HOST = {})(PORT = 1521))\n  (CONNECT_DATA = (SERVICE_NAME = xe)))",
        host
    )
}

fn entries(hosts: &[(&str, &str)]) -> TnsEntries {
    hosts
        .iter()
        .map(|(alias, host)| TnsEntry::new(*alias, desc(host), "tnsnames.ora:1"))
        .collect()
}

#[test]
fn test_wrong_credentials_still_reachable() {
    let creds = ProbeCredentials::probe_default();
    let d = desc("auth1");
    let outcome = Prober::new(&ScriptedDriver).probe(&ProbeRequest {
        desc: &d,
        credentials: &creds,
        timeout: Duration::from_secs(1),
        dbhost: false,
    });

    assert!(outcome.reachable);
    assert_eq!(outcome.status, ProbeStatus::LoginRejected);
    assert_eq!(outcome.ora_code, Some(1017));
    println!("✓ login rejected counts as reachable");
}

#[test]
fn test_no_listener_unreachable() {
    let creds = ProbeCredentials::probe_default();
    let d = desc("down1");
    let outcome = Prober::new(&ScriptedDriver).probe(&ProbeRequest {
        desc: &d,
        credentials: &creds,
        timeout: Duration::from_secs(1),
        dbhost: false,
    });

    assert!(!outcome.reachable);
    assert_eq!(outcome.status, ProbeStatus::Unreachable);
    assert!(outcome.reason().contains("ORA-12541"));
}

#[test]
fn test_bulk_check_aggregates_failures() {
    let entries = entries(&[
        ("E_OK", "open1"),
        ("A_OK", "open2"),
        ("D_DOWN", "down1"),
        ("B_AUTH", "auth1"),
        ("C_DOWN", "down2"),
    ]);
    let args = CheckArgs {
        all: true,
        timeout: 1,
        ..Default::default()
    };
    let mut out = Vec::new();

    let err = check_all(
        &mut out,
        &ScriptedDriver,
        &entries,
        &ProbeCredentials::probe_default(),
        &args,
    )
    .unwrap_err();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("A_OK:  OK-> "));
    assert!(lines[1].starts_with("B_AUTH:  OK-> "));
    assert!(lines[2].starts_with("C_DOWN:  ERROR: ORA-12541"));
    assert!(lines[3].starts_with("D_DOWN:  ERROR: "));
    assert!(lines[4].starts_with("E_OK:  OK-> "));
    assert_eq!(lines[5], "5 entries checked, 3 ok, 2 failed");
    assert!(lines[7].starts_with("  C_DOWN: "));
    assert!(lines[8].starts_with("  D_DOWN: "));

    match err {
        TnsError::PartialFailure { failed, total, .. } => {
            assert_eq!(failed, 2);
            assert_eq!(total, 5);
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
    assert_eq!(err_exit_code(2, 5), 1);
}

fn err_exit_code(failed: usize, total: usize) -> i32 {
    TnsError::PartialFailure {
        message: "some checks failed".into(),
        failed,
        total,
    }
    .exit_code()
}

#[test]
fn test_bulk_check_json() {
    let entries = entries(&[("A", "open1"), ("B", "down1")]);
    let args = CheckArgs {
        all: true,
        json: true,
        timeout: 1,
        ..Default::default()
    };
    let mut out = Vec::new();

    let result = check_all(
        &mut out,
        &ScriptedDriver,
        &entries,
        &ProbeCredentials::probe_default(),
        &args,
    );

    assert!(result.is_err());
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["results"][0]["alias"], "A");
    assert_eq!(json["results"][1]["status"], "unreachable");
}

#[test]
fn test_single_check_dbhost() {
    let entries = entries(&[("XE.local", "open1")]);
    let mut entries_with_domain = TnsEntries::new(Some("local".into()));
    for e in entries.iter() {
        entries_with_domain.insert(e.clone());
    }
    let args = CheckArgs {
        alias: Some("XE".into()),
        dbhost: true,
        timeout: 1,
        ..Default::default()
    };
    let mut out = Vec::new();

    check_one(
        &mut out,
        &ScriptedDriver,
        &entries_with_domain,
        &ProbeCredentials::probe_default(),
        &args,
        None,
    )
    .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "XE.local -> dbnode1:XE1:XEPDB1\n");
}

#[test]
fn test_single_check_dbhost_after_login_error() {
    let entries = entries(&[("XE", "auth1")]);
    let args = CheckArgs {
        dbhost: true,
        timeout: 1,
        ..Default::default()
    };
    let mut out = Vec::new();

    let err = check_one(
        &mut out,
        &ScriptedDriver,
        &entries,
        &ProbeCredentials::probe_default(),
        &args,
        Some("XE"),
    )
    .unwrap_err();

    assert!(err.to_string().contains("could not extract host info"));
    assert!(out.is_empty());
}

#[test]
fn test_unreachable_reported_within_timeout() {
    let entries = entries(&[("A", "dropped1"), ("B", "dropped2"), ("C", "dropped3")]);
    let timeout = Duration::from_millis(100);
    let start = Instant::now();

    let report = Prober::new(&StalledDriver).check_all(
        &entries,
        &ProbeCredentials::probe_default(),
        timeout,
        false,
        |_| {},
    );

    let elapsed = start.elapsed();
    assert_eq!(report.failed(), 3);
    for r in &report.results {
        assert_eq!(r.outcome.status, ProbeStatus::Unreachable);
        assert_eq!(r.outcome.ora_code, Some(12170));
        assert!(r.outcome.elapsed < timeout + Duration::from_millis(500));
    }
    assert!(
        elapsed < timeout * 3 + Duration::from_secs(1),
        "bulk check took {:?}",
        elapsed
    );
    println!("✓ 3 stalled aliases reported in {:?}", elapsed);
}
