//! `DirectoryClient` on top of `ldap3`
//!
//! The async client is driven from a current-thread tokio runtime owned by
//! the handle, so callers see plain blocking calls.

use super::ldap_ora::LdapOra;
use super::{
    base_for_context, context_for_base, entry_dn, DirectoryClient, DirectoryEntries, CONTEXT_CLASS, DESC_ATTRIBUTE,
    NET_SERVICE_CLASS,
};
use crate::config::LdapSettings;
use crate::error::{TnsError, TnsResult};
use crate::tns::{short_alias, TnsEntry};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Runtime;

/// One directory server address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapServer {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl LdapServer {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    pub fn url(&self) -> String {
        let scheme = if self.tls { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Bind and transport options shared by all servers
#[derive(Debug, Clone, Default)]
pub struct LdapOptions {
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl LdapOptions {
    pub fn from_settings(settings: &LdapSettings) -> Self {
        Self {
            bind_dn: settings.binddn.clone().filter(|d| !d.is_empty()),
            bind_password: settings.bindpassword.clone(),
            insecure: settings.insecure,
            timeout: Duration::from_secs(settings.timeout),
        }
    }
}

/// Where to connect and which context to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapTarget {
    pub servers: Vec<LdapServer>,
    pub base: Option<String>,
    pub context: Option<String>,
}

impl LdapTarget {
    /// Servers from `--ldap.host`, otherwise from `<tns_admin>/ldap.ora`
    pub fn resolve(settings: &LdapSettings, tns_admin: &Path) -> TnsResult<Self> {
        if let Some(host) = settings.host.as_deref().filter(|h| !h.is_empty()) {
            return Ok(Self {
                servers: vec![LdapServer::new(host, settings.effective_port(), settings.tls)],
                base: settings
                    .base
                    .clone()
                    .or_else(|| settings.oraclectx.as_deref().map(base_for_context)),
                context: settings.oraclectx.clone(),
            });
        }

        let ora = LdapOra::read(tns_admin)?;
        if ora.servers.is_empty() {
            return Err(TnsError::Config("no Ldap Servers configured".to_string()));
        }
        let base = settings.base.clone().or_else(|| ora.admin_context.clone());
        let context = settings
            .oraclectx
            .clone()
            .or_else(|| ora.admin_context.as_deref().map(context_for_base));
        Ok(Self {
            servers: ora.servers,
            base,
            context,
        })
    }
}

/// An open, bound directory connection
pub struct LdapDirectory {
    rt: Runtime,
    ldap: Ldap,
    timeout: Duration,
    server: LdapServer,
}

impl LdapDirectory {
    /// Connects and binds to one server. Without a bind DN the session stays
    /// anonymous.
    pub fn connect(server: &LdapServer, options: &LdapOptions) -> TnsResult<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let url = server.url();
        log::debug!("connecting to {}", url);

        let settings = LdapConnSettings::new()
            .set_conn_timeout(options.timeout)
            .set_no_tls_verify(options.insecure);

        let ldap = rt.block_on(async {
            let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
                .await
                .map_err(|e| TnsError::Directory(format!("cannot connect to {}: {}", url, e)))?;
            tokio::spawn(async move {
                if let Err(e) = conn.drive().await {
                    log::warn!("LDAP connection driver error: {}", e);
                }
            });

            if let Some(bind_dn) = options.bind_dn.as_deref() {
                let password = options.bind_password.as_deref().unwrap_or("");
                log::debug!("binding as {}", bind_dn);
                let result = ldap
                    .with_timeout(options.timeout)
                    .simple_bind(bind_dn, password)
                    .await
                    .map_err(|e| TnsError::Directory(format!("bind as {} failed: {}", bind_dn, e)))?;
                if result.rc == 49 {
                    return Err(TnsError::Directory(format!(
                        "bind as {} failed: invalid credentials",
                        bind_dn
                    )));
                }
                check_result(result, &format!("bind as {}", bind_dn))?;
            }
            Ok::<Ldap, TnsError>(ldap)
        })?;

        log::info!("connected to {}", url);
        Ok(Self {
            rt,
            ldap,
            timeout: options.timeout,
            server: server.clone(),
        })
    }

    /// Tries each server in order and returns the first that binds
    pub fn connect_first(servers: &[LdapServer], options: &LdapOptions) -> TnsResult<Self> {
        let mut last_error = None;
        for server in servers {
            match Self::connect(server, options) {
                Ok(dir) => return Ok(dir),
                Err(e) => {
                    log::warn!("{}: {}", server.url(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| TnsError::Config("no Ldap Servers configured".to_string())))
    }

    pub fn server(&self) -> &LdapServer {
        &self.server
    }

    fn search(&mut self, base: &str, filter: &str, attrs: Vec<&str>) -> TnsResult<Vec<SearchEntry>> {
        let timeout = self.timeout;
        let ldap = &mut self.ldap;
        let (entries, _res) = self.rt.block_on(async {
            ldap.with_timeout(timeout)
                .search(base, Scope::Subtree, filter, attrs)
                .await?
                .success()
        })?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        let ldap = &mut self.ldap;
        if let Err(e) = self.rt.block_on(ldap.unbind()) {
            log::debug!("unbind: {}", e);
        }
    }
}

/// Maps a non-zero result code to an error naming the operation
fn check_result(result: LdapResult, what: &str) -> TnsResult<()> {
    match result.rc {
        0 => Ok(()),
        32 => Err(TnsError::Directory(format!("{}: no such object", what))),
        68 => Err(TnsError::Directory(format!("{}: entry already exists", what))),
        rc => Err(TnsError::Directory(format!("{}: rc={} {}", what, rc, result.text))),
    }
}

/// First value of an attribute, matching the name case-insensitively
fn attr_value<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.first())
        .map(String::as_str)
}

impl DirectoryClient for LdapDirectory {
    fn read(&mut self, context: &str) -> TnsResult<DirectoryEntries> {
        let filter = format!("(objectClass={})", NET_SERVICE_CLASS);
        let found = self.search(context, &filter, vec!["cn", DESC_ATTRIBUTE])?;
        let entries = collect_entries(found);
        log::info!("{} entries read from {}", entries.len(), context);
        Ok(entries)
    }

    fn add(&mut self, context: &str, alias: &str, desc: &str) -> TnsResult<()> {
        let dn = entry_dn(alias, context);
        let attrs = vec![
            ("objectClass", HashSet::from(["top", NET_SERVICE_CLASS])),
            ("cn", HashSet::from([alias])),
            (DESC_ATTRIBUTE, HashSet::from([desc])),
        ];
        let timeout = self.timeout;
        let ldap = &mut self.ldap;
        let result = self
            .rt
            .block_on(async { ldap.with_timeout(timeout).add(&dn, attrs).await })?;
        check_result(result, &format!("add {}", dn))?;
        log::info!("{} added", dn);
        Ok(())
    }

    fn modify(&mut self, dn: &str, alias: &str, desc: &str) -> TnsResult<()> {
        let mods = vec![Mod::Replace(DESC_ATTRIBUTE, HashSet::from([desc]))];
        let timeout = self.timeout;
        let ldap = &mut self.ldap;
        let result = self
            .rt
            .block_on(async { ldap.with_timeout(timeout).modify(dn, mods).await })?;
        check_result(result, &format!("modify {}", dn))?;
        log::info!("{} ({}) modified", dn, alias);
        Ok(())
    }

    fn delete(&mut self, dn: &str, alias: &str) -> TnsResult<()> {
        let timeout = self.timeout;
        let ldap = &mut self.ldap;
        let result = self
            .rt
            .block_on(async { ldap.with_timeout(timeout).delete(dn).await })?;
        check_result(result, &format!("delete {}", dn))?;
        log::info!("{} ({}) deleted", dn, alias);
        Ok(())
    }

    fn resolve_context(&mut self, base: &str) -> TnsResult<String> {
        let filter = format!("(objectClass={})", CONTEXT_CLASS);
        let found = self.search(base, &filter, vec!["cn"])?;
        let context = found
            .into_iter()
            .next()
            .map(|e| e.dn)
            .ok_or_else(|| TnsError::NotFound(format!("no Oracle context found below {}", base)))?;
        log::info!("using Oracle context {}", context);
        Ok(context)
    }
}

/// Directory entries keyed by short alias; on a collision the later one wins
fn collect_entries(found: Vec<SearchEntry>) -> DirectoryEntries {
    let mut entries = DirectoryEntries::new();
    for e in found {
        let Some(cn) = attr_value(&e.attrs, "cn") else {
            log::warn!("{} has no cn, ignored", e.dn);
            continue;
        };
        let desc = attr_value(&e.attrs, DESC_ATTRIBUTE).unwrap_or_default();
        let entry = TnsEntry::new(cn, desc, e.dn.clone());
        let alias = short_alias(cn);
        if let Some(prev) = entries.get(&alias) {
            log::warn!(
                "{} and {} share the short alias {}, using {}",
                prev.location,
                e.dn,
                alias,
                e.dn
            );
        }
        entries.insert(alias, entry);
    }
    entries
}
