//! `tnscli ldap read|write|clear`

use super::{load_entries_from, version, Context};
use crate::config::LdapSettings;
use crate::directory::ldap::LdapTarget;
use crate::directory::{DirectoryClient, LdapDirectory, LdapOptions, Reconciler};
use crate::error::{TnsError, TnsResult};
use crate::tns::format::write_entries;
use clap::{Args, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct LdapArgs {
    #[command(flatten)]
    pub connection: LdapFlags,

    #[command(subcommand)]
    pub command: LdapCommands,
}

/// Directory connection flags; unset flags fall back to config and ldap.ora
#[derive(Args, Debug, Default, Clone)]
pub struct LdapFlags {
    /// Directory server host
    #[arg(long = "ldap.host", global = true)]
    pub host: Option<String>,

    /// Directory server port (default 389, 636 with TLS)
    #[arg(long = "ldap.port", global = true)]
    pub port: Option<u16>,

    /// Base DN below which the Oracle context lives
    #[arg(long = "ldap.base", global = true)]
    pub base: Option<String>,

    /// Oracle context DN (default: looked up below the base)
    #[arg(long = "ldap.oraclectx", global = true)]
    pub oraclectx: Option<String>,

    /// DN to bind with
    #[arg(long = "ldap.binddn", global = true)]
    pub binddn: Option<String>,

    /// Password for the bind DN
    #[arg(long = "ldap.bindpassword", global = true)]
    pub bindpassword: Option<String>,

    /// Use LDAPS
    #[arg(long = "ldap.tls", global = true)]
    pub tls: bool,

    /// Skip certificate verification
    #[arg(long = "ldap.insecure", global = true)]
    pub insecure: bool,

    /// Seconds to wait for the directory
    #[arg(long = "ldap.timeout", global = true)]
    pub timeout: Option<u64>,
}

impl LdapFlags {
    /// Flags on top of the configured directory settings
    pub fn apply(&self, settings: &mut LdapSettings) {
        if let Some(v) = &self.host {
            settings.host = Some(v.clone());
        }
        if let Some(v) = self.port {
            settings.port = v;
        }
        if let Some(v) = &self.base {
            settings.base = Some(v.clone());
        }
        if let Some(v) = &self.oraclectx {
            settings.oraclectx = Some(v.clone());
        }
        if let Some(v) = &self.binddn {
            settings.binddn = Some(v.clone());
        }
        if let Some(v) = &self.bindpassword {
            settings.bindpassword = Some(v.clone());
        }
        if let Some(v) = self.timeout {
            settings.timeout = v;
        }
        settings.tls |= self.tls;
        settings.insecure |= self.insecure;
    }
}

#[derive(Subcommand, Debug)]
pub enum LdapCommands {
    /// Print all directory entries in tnsnames format
    Read(ReadArgs),

    /// Make the directory match a tnsnames file
    Write(WriteArgs),

    /// Delete all entries of the Oracle context
    Clear,
}

#[derive(Args, Debug, Default)]
pub struct ReadArgs {
    /// Write to this file instead of stdout
    #[arg(long = "ldap.tnstarget")]
    pub tnstarget: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct WriteArgs {
    /// tnsnames file to publish (default: the configured tnsnames.ora)
    #[arg(long = "ldap.tnssource")]
    pub tnssource: Option<PathBuf>,
}

pub fn execute(args: LdapArgs, ctx: &Context) -> TnsResult<()> {
    let mut settings = ctx.settings.ldap.clone();
    args.connection.apply(&mut settings);

    match args.command {
        LdapCommands::Read(a) => {
            let target = a.tnstarget.or_else(|| settings.tnstarget.clone());
            let (mut dir, context) = connect(&settings, ctx)?;
            read(&mut dir, &context, target)
        }
        LdapCommands::Write(a) => {
            log::info!("{}", version::version_line());
            let source = a
                .tnssource
                .or_else(|| settings.tnssource.clone())
                .unwrap_or_else(|| ctx.settings.tnsnames_path());
            let entries = load_entries_from(&source)?;
            let (mut dir, context) = connect(&settings, ctx)?;
            let tally = Reconciler::new(&mut dir, context).sync(&entries)?;
            println!("{}", tally.summary());
            if !tally.is_clean() {
                return Err(TnsError::PartialFailure {
                    message: "some entries were skipped".to_string(),
                    failed: tally.skipped(),
                    total: tally.total(),
                });
            }
            Ok(())
        }
        LdapCommands::Clear => {
            let (mut dir, context) = connect(&settings, ctx)?;
            let report = Reconciler::new(&mut dir, context).clear()?;
            println!("{}", report.summary());
            for (alias, reason) in &report.failed {
                println!("  {}: {}", alias, reason);
            }
            if !report.failed.is_empty() {
                return Err(TnsError::PartialFailure {
                    message: "some entries could not be deleted".to_string(),
                    failed: report.failed.len(),
                    total: report.deleted + report.failed.len(),
                });
            }
            Ok(())
        }
    }
}

/// Connects to the first reachable server and finds the Oracle context
fn connect(settings: &LdapSettings, ctx: &Context) -> TnsResult<(LdapDirectory, String)> {
    let target = LdapTarget::resolve(settings, &ctx.settings.tns_admin_dir())?;
    let options = LdapOptions::from_settings(settings);
    let mut dir = LdapDirectory::connect_first(&target.servers, &options)?;

    let context = match (target.context, target.base) {
        (Some(context), _) => context,
        (None, Some(base)) => dir.resolve_context(&base)?,
        (None, None) => {
            return Err(TnsError::Config(
                "no base DN, use --ldap.base or --ldap.oraclectx".to_string(),
            ))
        }
    };
    log::info!("using {} at {}", context, dir.server().url());
    Ok((dir, context))
}

/// Writes all entries of the context in tnsnames format
pub fn read(
    dir: &mut dyn DirectoryClient,
    context: &str,
    target: Option<PathBuf>,
) -> TnsResult<()> {
    let entries = dir.read(context)?;
    match target {
        Some(path) => {
            let file = File::create(&path)
                .map_err(|e| TnsError::Io(format!("cannot create {}: {}", path.display(), e)))?;
            let mut out = BufWriter::new(file);
            writeln!(out, "# {} entries read from {}\n", entries.len(), context)?;
            let n = write_entries(&mut out, entries.values(), true, None)?;
            out.flush()?;
            println!("{} entries written to {}", n, path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let n = write_entries(&mut out, entries.values(), true, None)?;
            out.flush()?;
            log::info!("{} entries read from {}", n, context);
        }
    }
    Ok(())
}
