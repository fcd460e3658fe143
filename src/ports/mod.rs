//! Address expansion and port checks for one alias
//!
//! Each `(HOST, PORT)` of a descriptor is expanded through a
//! `ClusterResolver`; servers without an expansion keep their own address.
//! Order follows the descriptor, then the expansion.

pub mod racinfo;
pub mod resolver;
pub mod tcp;

use crate::error::{TnsError, TnsResult};
use crate::tns::TnsEntry;
use serde::Serialize;
use std::time::Duration;

pub use resolver::{ClusterResolver, RacResolver, ResolverSettings};
pub use tcp::PortState;

/// A concrete endpoint to dial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAddress {
    pub host: String,
    pub port: String,
    /// `ip:port` after resolution, `host:port` otherwise
    pub address: String,
}

impl ServiceAddress {
    pub fn new(host: impl Into<String>, port: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            address: address.into(),
        }
    }
}

/// Expands all servers of an entry
///
/// # Returns
/// The addresses in descriptor order; an error when the descriptor names no host
pub fn expand_addresses(
    entry: &TnsEntry,
    resolver: &dyn ClusterResolver,
) -> TnsResult<Vec<ServiceAddress>> {
    if entry.servers.is_empty() {
        return Err(TnsError::NotFound(format!("no hosts found for alias {}", entry.name)));
    }
    log::info!("Alias {} uses {} hosts", entry.name, entry.servers.len());

    let mut addresses = Vec::new();
    for server in &entry.servers {
        let expanded = resolver.expand(&server.host, &server.port);
        if expanded.is_empty() {
            log::debug!("no expansion for {}, using it as is", server.address());
            addresses.push(ServiceAddress::new(&server.host, &server.port, server.address()));
        } else {
            log::debug!("{} expanded to {} addresses", server.host, expanded.len());
            addresses.extend(expanded);
        }
    }
    log::info!("Alias {} uses {} addresses", entry.name, addresses.len());
    Ok(addresses)
}

/// One checked address
#[derive(Debug, Clone, Serialize)]
pub struct PortCheck {
    #[serde(flatten)]
    pub address: ServiceAddress,
    pub state: PortState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PortCheck {
    /// `host (address) <state>`
    pub fn line(&self) -> String {
        format!("{} ({}) {}", self.address.host, self.address.address, self.state)
    }
}

/// Dials every address in order, one after the other
pub fn check_ports(addresses: &[ServiceAddress], timeout: Duration) -> Vec<PortCheck> {
    addresses
        .iter()
        .map(|a| {
            let (state, detail) = tcp::check_address(&a.address, timeout);
            PortCheck {
                address: a.clone(),
                state,
                detail,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoExpansion;

    impl ClusterResolver for NoExpansion {
        fn expand(&self, _host: &str, _port: &str) -> Vec<ServiceAddress> {
            Vec::new()
        }
    }

    #[test]
    fn test_no_hosts() {
        let entry = TnsEntry::new("X", "(DESCRIPTION=(CONNECT_DATA=(SID=X)))", "f:1");
        let err = expand_addresses(&entry, &NoExpansion).unwrap_err();
        assert_eq!(err.to_string(), "no hosts found for alias X");
    }

    #[test]
    fn test_fallback_per_server() {
        let entry = TnsEntry::new(
            "X",
            "(DESCRIPTION=(ADDRESS=(HOST=a)(PORT=1521))(ADDRESS=(HOST=b)(PORT=1522)))",
            "f:1",
        );
        let addrs = expand_addresses(&entry, &NoExpansion).unwrap();
        assert_eq!(
            addrs,
            vec![
                ServiceAddress::new("a", "1521", "a:1521"),
                ServiceAddress::new("b", "1522", "b:1522")
            ]
        );
    }

    #[test]
    fn test_port_check_line() {
        let check = PortCheck {
            address: ServiceAddress::new("db", "1521", "10.0.0.1:1521"),
            state: PortState::Open,
            detail: None,
        };
        assert_eq!(check.line(), "db (10.0.0.1:1521) is OPEN");
    }
}
