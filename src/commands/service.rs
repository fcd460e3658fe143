//! `tnscli service ...`

use super::{check, find_entry, Context};
use crate::error::TnsResult;
use crate::ports::racinfo::RacInfo;
use crate::ports::resolver::parse_nameserver;
use crate::ports::tcp::DEFAULT_PORTCHECK_TIMEOUT;
use crate::ports::{
    check_ports, expand_addresses, PortState, RacResolver, ResolverSettings, ServiceAddress,
};
use crate::tns::format::{format_tns_info, jdbc_url};
use crate::tns::TnsEntry;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Alias to work on
    #[arg(long, global = true)]
    pub service: Option<String>,

    #[command(subcommand)]
    pub command: ServiceCommands,
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// Check that a service (or every service) accepts connections
    Check(check::CheckArgs),

    /// Show details of a service
    Info(InfoArgs),

    /// Check TCP reachability of every address of a service
    Portcheck(PortcheckArgs),
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(subcommand)]
    pub command: InfoCommands,
}

#[derive(Subcommand, Debug)]
pub enum InfoCommands {
    /// List the addresses a service resolves to
    Ports(PortsArgs),

    /// Print the tnsnames entry
    Tns(AliasArg),

    /// Print a JDBC thin URL
    Jdbc(AliasArg),
}

#[derive(Args, Debug, Default)]
pub struct AliasArg {
    /// Alias (or use --service)
    pub alias: Option<String>,
}

/// DNS and cluster mapping switches
#[derive(Args, Debug, Default, Clone)]
pub struct ResolverArgs {
    /// Cluster address mapping (default: <tns_admin>/racinfo.ini)
    #[arg(long)]
    pub racinfo: Option<PathBuf>,

    /// DNS server as ip[:port]
    #[arg(long)]
    pub nameserver: Option<String>,

    /// Do not resolve host names
    #[arg(long)]
    pub nodns: bool,

    /// Only use IPv4 addresses
    #[arg(long)]
    pub ipv4: bool,

    /// Query DNS over TCP
    #[arg(long)]
    pub dnstcp: bool,
}

impl ResolverArgs {
    pub fn settings(&self, timeout: Duration) -> TnsResult<ResolverSettings> {
        let nameserver = self.nameserver.as_deref().map(parse_nameserver).transpose()?;
        Ok(ResolverSettings {
            nameserver,
            ipv4_only: self.ipv4,
            use_tcp: self.dnstcp,
            dns_enabled: !self.nodns,
            timeout,
        })
    }
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    pub alias: Option<String>,

    #[command(flatten)]
    pub resolver: ResolverArgs,
}

#[derive(Args, Debug)]
pub struct PortcheckArgs {
    pub alias: Option<String>,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Seconds to wait for each connection
    #[arg(long, default_value_t = DEFAULT_PORTCHECK_TIMEOUT)]
    pub timeout: u64,
}

pub fn execute(args: ServiceArgs, ctx: &Context) -> TnsResult<()> {
    let flag = args.service.as_deref();
    match args.command {
        ServiceCommands::Check(check_args) => check::execute(check_args, flag, ctx),
        ServiceCommands::Info(info) => match info.command {
            InfoCommands::Ports(a) => execute_ports(a, flag, ctx),
            InfoCommands::Tns(a) => execute_info(a, flag, ctx, format_tns_info),
            InfoCommands::Jdbc(a) => execute_info(a, flag, ctx, jdbc_url),
        },
        ServiceCommands::Portcheck(a) => execute_portcheck(a, flag, ctx),
    }
}

fn execute_info(
    args: AliasArg,
    flag: Option<&str>,
    ctx: &Context,
    render: fn(&TnsEntry) -> String,
) -> TnsResult<()> {
    let entries = ctx.load_entries()?;
    let entry = find_entry(&entries, args.alias.as_deref(), flag)?;
    println!("{}", render(entry));
    Ok(())
}

fn addresses_for(
    entry: &TnsEntry,
    resolver_args: &ResolverArgs,
    timeout: Duration,
    ctx: &Context,
) -> TnsResult<Vec<ServiceAddress>> {
    let racinfo_path = resolver_args
        .racinfo
        .clone()
        .unwrap_or_else(|| ctx.settings.tns_admin_dir().join("racinfo.ini"));
    let racinfo = RacInfo::read(&racinfo_path)?;
    let resolver = RacResolver::from_settings(racinfo, &resolver_args.settings(timeout)?)?;
    expand_addresses(entry, &resolver)
}

fn execute_ports(args: PortsArgs, flag: Option<&str>, ctx: &Context) -> TnsResult<()> {
    let entries = ctx.load_entries()?;
    let entry = find_entry(&entries, args.alias.as_deref(), flag)?;
    let timeout = Duration::from_secs(DEFAULT_PORTCHECK_TIMEOUT);
    let addresses = addresses_for(entry, &args.resolver, timeout, ctx)?;

    println!("Alias {} uses {} addresses", entry.name, addresses.len());
    for a in &addresses {
        println!("{} ({})", a.host, a.address);
    }
    Ok(())
}

fn execute_portcheck(args: PortcheckArgs, flag: Option<&str>, ctx: &Context) -> TnsResult<()> {
    let entries = ctx.load_entries()?;
    let entry = find_entry(&entries, args.alias.as_deref(), flag)?;
    let timeout = Duration::from_secs(args.timeout.max(1));
    let addresses = addresses_for(entry, &args.resolver, timeout, ctx)?;

    println!("Alias {} uses {} addresses", entry.name, addresses.len());
    let results = check_ports(&addresses, timeout);
    for r in &results {
        println!("{}", r.line());
    }
    let open = results.iter().filter(|r| r.state == PortState::Open).count();
    log::info!("{} of {} addresses open", open, results.len());
    Ok(())
}
