//! Cluster address expansion
//!
//! Turns a cluster host into its member addresses using racinfo.ini and,
//! when DNS is enabled, A/AAAA and SRV lookups. Resolver behaviour is set
//! through `ResolverSettings` per call site, never through process state.

use super::racinfo::{split_host_port, RacInfo};
use super::ServiceAddress;
use crate::error::{TnsError, TnsResult};
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig,
    ResolverOpts,
};
use hickory_resolver::Resolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_DNS_PORT: u16 = 53;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Query this server instead of the system resolvers
    pub nameserver: Option<SocketAddr>,
    pub ipv4_only: bool,
    pub use_tcp: bool,
    pub dns_enabled: bool,
    pub timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            nameserver: None,
            ipv4_only: false,
            use_tcp: false,
            dns_enabled: true,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Parses `ip` or `ip:port` (`[v6]:port` for IPv6)
pub fn parse_nameserver(value: &str) -> TnsResult<SocketAddr> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    value
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
        .map_err(|_| TnsError::Config(format!("invalid nameserver '{}', expected ip[:port]", value)))
}

/// Expands a cluster host into concrete addresses.
/// An empty result means "no expansion applies".
pub trait ClusterResolver {
    fn expand(&self, host: &str, port: &str) -> Vec<ServiceAddress>;
}

/// DNS queries needed for expansion
pub trait HostLookup {
    fn lookup_ip(&self, host: &str) -> TnsResult<Vec<IpAddr>>;

    /// SRV targets as `(host, port)`
    fn lookup_srv(&self, name: &str) -> TnsResult<Vec<(String, u16)>>;
}

/// `HostLookup` backed by hickory
pub struct DnsLookup {
    resolver: Resolver,
}

impl DnsLookup {
    pub fn new(settings: &ResolverSettings) -> TnsResult<Self> {
        let (config, mut opts) = resolver_config(settings, || {
            hickory_resolver::system_conf::read_system_conf()
                .map_err(|e| TnsError::Config(format!("cannot read system resolver config: {}", e)))
        })?;

        opts.timeout = settings.timeout;
        if settings.ipv4_only {
            opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        }
        let resolver = Resolver::new(config, opts)?;
        Ok(Self { resolver })
    }
}

/// Name servers from `settings`, or from `system` when none is given.
/// With `use_tcp` only the TCP entries are kept.
fn resolver_config(
    settings: &ResolverSettings,
    system: impl FnOnce() -> TnsResult<(ResolverConfig, ResolverOpts)>,
) -> TnsResult<(ResolverConfig, ResolverOpts)> {
    match settings.nameserver {
        Some(ns) => {
            let group = NameServerConfigGroup::from_ips_clear(&[ns.ip()], ns.port(), true);
            let group = if settings.use_tcp { tcp_only(&group) } else { group };
            log::debug!("using nameserver {} (tcp={})", ns, settings.use_tcp);
            Ok((ResolverConfig::from_parts(None, vec![], group), ResolverOpts::default()))
        }
        None => {
            let (config, opts) = system()?;
            if !settings.use_tcp {
                return Ok((config, opts));
            }
            let config = ResolverConfig::from_parts(
                config.domain().cloned(),
                config.search().to_vec(),
                tcp_only(config.name_servers()),
            );
            Ok((config, opts))
        }
    }
}

fn tcp_only(servers: &[NameServerConfig]) -> NameServerConfigGroup {
    servers
        .iter()
        .filter(|ns| ns.protocol == Protocol::Tcp)
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

impl HostLookup for DnsLookup {
    fn lookup_ip(&self, host: &str) -> TnsResult<Vec<IpAddr>> {
        let found = self
            .resolver
            .lookup_ip(host)
            .map_err(|e| TnsError::Probe(format!("lookup {}: {}", host, e)))?;
        Ok(found.iter().collect())
    }

    fn lookup_srv(&self, name: &str) -> TnsResult<Vec<(String, u16)>> {
        let found = self
            .resolver
            .srv_lookup(name)
            .map_err(|e| TnsError::Probe(format!("SRV lookup {}: {}", name, e)))?;
        Ok(found
            .iter()
            .map(|srv| {
                let target = srv.target().to_utf8();
                (target.trim_end_matches('.').to_string(), srv.port())
            })
            .collect())
    }
}

/// racinfo.ini first, then SRV records
pub struct RacResolver<L: HostLookup> {
    racinfo: RacInfo,
    lookup: Option<L>,
    ipv4_only: bool,
}

impl RacResolver<DnsLookup> {
    /// Builds the resolver; with DNS disabled no lookups are made
    pub fn from_settings(racinfo: RacInfo, settings: &ResolverSettings) -> TnsResult<Self> {
        let lookup = if settings.dns_enabled {
            Some(DnsLookup::new(settings)?)
        } else {
            None
        };
        Ok(Self::new(racinfo, lookup, settings.ipv4_only))
    }
}

impl<L: HostLookup> RacResolver<L> {
    pub fn new(racinfo: RacInfo, lookup: Option<L>, ipv4_only: bool) -> Self {
        Self {
            racinfo,
            lookup,
            ipv4_only,
        }
    }

    /// One address per IP of `host`; the bare name when it cannot be resolved
    fn resolve_all(&self, host: &str, port: &str) -> Vec<ServiceAddress> {
        let Some(lookup) = self.lookup.as_ref() else {
            return vec![ServiceAddress::new(host, port, format!("{}:{}", host, port))];
        };
        match lookup.lookup_ip(host) {
            Ok(ips) if !ips.is_empty() => {
                let found: Vec<ServiceAddress> = ips
                    .into_iter()
                    .filter(|ip| !self.ipv4_only || ip.is_ipv4())
                    .map(|ip| ServiceAddress::new(host, port, ip_port(ip, port)))
                    .collect();
                if found.is_empty() {
                    log::debug!("{} has no IPv4 address, using the name", host);
                    return vec![ServiceAddress::new(host, port, format!("{}:{}", host, port))];
                }
                found
            }
            Ok(_) => {
                log::warn!("{} has no addresses", host);
                vec![ServiceAddress::new(host, port, format!("{}:{}", host, port))]
            }
            Err(e) => {
                log::warn!("{}", e);
                vec![ServiceAddress::new(host, port, format!("{}:{}", host, port))]
            }
        }
    }
}

/// `ip:port`, bracketing IPv6
fn ip_port(ip: IpAddr, port: &str) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{}:{}", v4, port),
        IpAddr::V6(v6) => format!("[{}]:{}", v6, port),
    }
}

impl<L: HostLookup> ClusterResolver for RacResolver<L> {
    fn expand(&self, host: &str, port: &str) -> Vec<ServiceAddress> {
        if host.parse::<IpAddr>().is_ok() {
            log::debug!("{} is an IP address, no expansion", host);
            return Vec::new();
        }

        if let Some(members) = self.racinfo.addresses(host) {
            log::debug!("{} members configured for {}", members.len(), host);
            return members
                .iter()
                .flat_map(|(key, value)| {
                    let (h, p) = split_host_port(value, port);
                    log::debug!("{}: {} -> {}:{}", host, key, h, p);
                    self.resolve_all(h, p)
                })
                .collect();
        }

        let Some(lookup) = self.lookup.as_ref() else {
            return Vec::new();
        };
        match lookup.lookup_srv(host) {
            Ok(targets) => targets
                .into_iter()
                .flat_map(|(target, srv_port)| self.resolve_all(&target, &srv_port.to_string()))
                .collect(),
            Err(e) => {
                log::debug!("no SRV records for {}: {}", host, e);
                Vec::new()
            }
        }
    }
}
