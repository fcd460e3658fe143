//! ldap.ora reader
//!
//! ```text
//! DIRECTORY_SERVERS = (ldap1:389:636, ldap2:1389)
//! DEFAULT_ADMIN_CONTEXT = "dc=oracle,dc=local"
//! ```

use super::ldap::LdapServer;
use crate::error::{TnsError, TnsResult};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapOra {
    pub servers: Vec<LdapServer>,
    pub admin_context: Option<String>,
}

fn servers_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)DIRECTORY_SERVERS\s*=\s*\(([^)]*)\)").expect("valid servers regex")
    })
}

fn context_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?im)^\s*DEFAULT_ADMIN_CONTEXT\s*=\s*"?([^"\r\n]*)"?"#).expect("valid context regex")
    })
}

impl LdapOra {
    /// Reads `<dir>/ldap.ora`; a missing file gives an empty result
    pub fn read(dir: &Path) -> TnsResult<Self> {
        let path = dir.join("ldap.ora");
        if !path.exists() {
            log::debug!("{} not found", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| TnsError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let ora = Self::parse(&text)?;
        log::info!(
            "{} directory servers read from {}",
            ora.servers.len(),
            path.display()
        );
        Ok(ora)
    }

    pub fn parse(text: &str) -> TnsResult<Self> {
        let text: String = text
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");

        let mut servers = Vec::new();
        if let Some(list) = servers_re().captures(&text).and_then(|c| c.get(1)) {
            for item in list.as_str().split(',').map(str::trim).filter(|s| !s.is_empty()) {
                servers.push(parse_server(item)?);
            }
        }

        let admin_context = context_re()
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            servers,
            admin_context,
        })
    }
}

/// `host:port[:sslport]`; with an SSL port that port is used with TLS
fn parse_server(item: &str) -> TnsResult<LdapServer> {
    let parts: Vec<&str> = item.split(':').map(str::trim).collect();
    let port = |s: &str| {
        s.parse::<u16>()
            .map_err(|_| TnsError::Parse(format!("invalid port '{}' in ldap.ora entry '{}'", s, item)))
    };
    match parts.as_slice() {
        [host] => Ok(LdapServer::new(*host, 389, false)),
        [host, p] => Ok(LdapServer::new(*host, port(*p)?, false)),
        [host, _, ssl] => Ok(LdapServer::new(*host, port(*ssl)?, true)),
        _ => Err(TnsError::Parse(format!("invalid ldap.ora server entry '{}'", item))),
    }
}
