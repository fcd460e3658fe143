//! `tnscli service check`

use super::{find_entry, Context};
use crate::credentials::{resolve_probe_credentials, CredentialManager, ProbeCredentials};
use crate::error::{TnsError, TnsResult};
use crate::oracle::probe::DEFAULT_CHECK_TIMEOUT;
use crate::oracle::{AliasOutcome, CheckReport, OracleDriver, ProbeRequest, Prober, SqlDriver};
use crate::tns::TnsEntries;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Alias to check (or use --service)
    pub alias: Option<String>,

    /// Check every alias
    #[arg(long, short = 'a')]
    pub all: bool,

    /// User for the connect test (default: probe account)
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Password for the connect test
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Seconds to wait for each connection
    #[arg(long, short = 't', default_value_t = DEFAULT_CHECK_TIMEOUT)]
    pub timeout: u64,

    /// Report host, instance and container of the database
    #[arg(long)]
    pub dbhost: bool,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: CheckArgs, flag: Option<&str>, ctx: &Context) -> TnsResult<()> {
    let entries = ctx.load_entries()?;
    let credentials = resolve_probe_credentials(
        args.user.as_deref(),
        args.password.as_deref(),
        |k| std::env::var(k).ok(),
        || CredentialManager::get_probe_credentials().ok(),
    );
    log::debug!("probe credentials from {:?}", credentials.source);
    let driver = OracleDriver::new(ctx.settings.oracle_client.clone());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.all {
        check_all(&mut out, &driver, &entries, &credentials, &args)
    } else {
        check_one(&mut out, &driver, &entries, &credentials, &args, flag)
    }
}

/// Probes one alias
pub fn check_one<W: Write>(
    out: &mut W,
    driver: &dyn SqlDriver,
    entries: &TnsEntries,
    credentials: &ProbeCredentials,
    args: &CheckArgs,
    flag: Option<&str>,
) -> TnsResult<()> {
    let entry = find_entry(entries, args.alias.as_deref(), flag)?;
    let outcome = Prober::new(driver).probe(&ProbeRequest {
        desc: &entry.desc,
        credentials,
        timeout: Duration::from_secs(args.timeout),
        dbhost: args.dbhost,
    });
    let result = AliasOutcome {
        alias: entry.name.clone(),
        outcome,
    };

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else if result.outcome.is_ok() {
        match result.outcome.host_info.as_deref() {
            Some(info) if args.dbhost => writeln!(out, "{} -> {}", result.alias, info)?,
            _ => writeln!(out, "OK, service {} reachable", result.alias)?,
        }
    }

    if result.outcome.is_ok() {
        Ok(())
    } else {
        Err(TnsError::Probe(format!(
            "service {} NOT reachable: {}",
            result.alias,
            result.outcome.reason()
        )))
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [AliasOutcome],
    total: usize,
    ok: usize,
    failed: usize,
}

/// Probes every alias, prints one line each, then the summary and failures
pub fn check_all<W: Write>(
    out: &mut W,
    driver: &dyn SqlDriver,
    entries: &TnsEntries,
    credentials: &ProbeCredentials,
    args: &CheckArgs,
) -> TnsResult<()> {
    let prober = Prober::new(driver);
    let timeout = Duration::from_secs(args.timeout);
    let mut write_error = None;

    let report = prober.check_all(entries, credentials, timeout, args.dbhost, |r| {
        if args.json || write_error.is_some() {
            return;
        }
        if let Err(e) = writeln!(out, "{}", progress_line(r, args.dbhost)) {
            write_error = Some(e);
        }
    });
    if let Some(e) = write_error {
        return Err(e.into());
    }

    if args.json {
        let json = JsonReport {
            results: &report.results,
            total: report.total(),
            ok: report.ok(),
            failed: report.failed(),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        write_summary(out, &report)?;
    }

    if report.failed() > 0 {
        return Err(TnsError::PartialFailure {
            message: "some checks failed".to_string(),
            failed: report.failed(),
            total: report.total(),
        });
    }
    Ok(())
}

/// `alias:  OK-> 1.234s` or `alias:  ERROR: reason`
pub fn progress_line(r: &AliasOutcome, dbhost: bool) -> String {
    if r.outcome.is_ok() {
        match r.outcome.host_info.as_deref() {
            Some(info) if dbhost => format!("{}:  OK-> {:.3?} {}", r.alias, r.outcome.elapsed, info),
            _ => format!("{}:  OK-> {:.3?}", r.alias, r.outcome.elapsed),
        }
    } else {
        format!("{}:  ERROR: {}", r.alias, r.outcome.reason())
    }
}

fn write_summary<W: Write>(out: &mut W, report: &CheckReport) -> TnsResult<()> {
    writeln!(out, "{}", report.summary())?;
    if report.failed() > 0 {
        writeln!(out, "failed:")?;
        for f in report.failures() {
            writeln!(out, "  {}: {}", f.alias, f.outcome.reason())?;
        }
    }
    Ok(())
}
