//! Command line surface
//!
//! Each command group lives in its own module with an `Args` struct and an
//! `execute` function, dispatched from `run`.

pub mod check;
pub mod creds;
pub mod ldap;
pub mod list;
pub mod service;
pub mod version;

use crate::config::Settings;
use crate::error::{TnsError, TnsResult};
use crate::logging;
use crate::tns::{read_tnsnames, TnsEntries, TnsEntry};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tnscli - check, list and sync Oracle TNS entries
#[derive(Parser, Debug)]
#[command(name = "tnscli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options valid for every command
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Config file (default: $HOME/etc/tnscli.yaml or ./tnscli.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with tnsnames.ora, sqlnet.ora, ldap.ora
    #[arg(long = "tns_admin", short = 'A', global = true)]
    pub tns_admin: Option<PathBuf>,

    /// tnsnames.ora to read (default: <tns_admin>/tnsnames.ora)
    #[arg(long, short = 'f', global = true)]
    pub filename: Option<PathBuf>,

    /// Log debug messages
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log info messages
    #[arg(long, global = true)]
    pub info: bool,

    /// Plain log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Oracle Instant Client directory
    #[arg(long = "oracle-client", global = true)]
    pub oracle_client: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List TNS aliases
    List(list::ListArgs),

    /// Check, inspect and port-scan a single service (or all)
    Service(service::ServiceArgs),

    /// Read, write or clear TNS entries in an LDAP directory
    Ldap(ldap::LdapArgs),

    /// Manage the probe account in the OS keychain
    Creds(creds::CredsArgs),

    /// Show version and build info
    Version,
}

/// Settings and switches for one invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
}

impl Context {
    pub fn use_color(&self) -> bool {
        !self.settings.no_color
    }

    /// Reads the configured tnsnames.ora; fails without entries
    pub fn load_entries(&self) -> TnsResult<TnsEntries> {
        load_entries_from(&self.settings.tnsnames_path())
    }
}

/// Reads entries from a file; an unreadable or empty file is a config error
pub fn load_entries_from(path: &std::path::Path) -> TnsResult<TnsEntries> {
    let entries = read_tnsnames(path).map_err(|e| match e {
        TnsError::Io(msg) => TnsError::Config(format!("cannot proceed without tns entries: {}", msg)),
        other => other,
    })?;
    if entries.is_empty() {
        return Err(TnsError::Config(format!(
            "cannot proceed without tns entries, none found in {}",
            path.display()
        )));
    }
    Ok(entries)
}

/// Looks up an alias given as argument or with `--service`
pub fn find_entry<'a>(
    entries: &'a TnsEntries,
    positional: Option<&str>,
    flag: Option<&str>,
) -> TnsResult<&'a TnsEntry> {
    let alias = positional
        .or(flag)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            TnsError::Config("dont have a service to check, use --service to provide".to_string())
        })?;
    entries
        .get_entry(alias)
        .ok_or_else(|| TnsError::NotFound(format!("alias {} not found", alias)))
}

/// Command line flags on top of file and environment settings
pub fn apply_globals(settings: &mut Settings, global: &GlobalArgs) {
    if let Some(dir) = &global.tns_admin {
        settings.tns_admin = Some(dir.clone());
    }
    if let Some(file) = &global.filename {
        settings.filename = Some(file.clone());
    }
    if let Some(dir) = &global.oracle_client {
        settings.oracle_client = Some(dir.clone());
    }
    settings.debug |= global.debug;
    settings.info |= global.info;
    settings.no_color |= global.no_color;
}

/// Loads settings, sets up logging and runs the command
pub fn run(cli: Cli) -> TnsResult<()> {
    let mut settings = Settings::load(cli.global.config.as_deref())?;
    apply_globals(&mut settings, &cli.global);
    logging::init(
        logging::level_for(settings.debug, settings.info),
        !settings.no_color,
    )?;
    log::debug!("tns_admin is {}", settings.tns_admin_dir().display());

    let ctx = Context { settings };
    match cli.command {
        Commands::List(args) => list::execute(args, &ctx),
        Commands::Service(args) => service::execute(args, &ctx),
        Commands::Ldap(args) => ldap::execute(args, &ctx),
        Commands::Creds(args) => creds::execute(args),
        Commands::Version => version::execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_globals() {
        let mut settings = Settings::default();
        let cli = Cli::parse_from(["tnscli", "--tns_admin", "/x", "--info", "list"]);
        apply_globals(&mut settings, &cli.global);
        assert_eq!(settings.tns_admin, Some(PathBuf::from("/x")));
        assert!(settings.info);
        assert!(!settings.debug);
    }

    #[test]
    fn test_find_entry_errors() {
        let entries: TnsEntries =
            vec![TnsEntry::new("XE", "(DESCRIPTION=(ADDRESS=(HOST=h)(PORT=1)))", "f:1")]
                .into_iter()
                .collect();
        let err = find_entry(&entries, None, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = find_entry(&entries, Some("NOPE"), None).unwrap_err();
        assert_eq!(err.to_string(), "alias NOPE not found");
        assert_eq!(err.exit_code(), 4);
        assert_eq!(find_entry(&entries, None, Some("xe")).unwrap().name, "XE");
    }

    #[test]
    fn test_load_entries_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_entries_from(&dir.path().join("tnsnames.ora")).unwrap_err();
        assert!(err.to_string().contains("cannot proceed without tns entries"));
    }
}
