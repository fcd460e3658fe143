//! TNS entry store
//!
//! In-memory mapping from alias to connect descriptor. Produced by the
//! `reader` module and consumed by the prober, the directory reconciler and
//! the port enumerator.

pub mod format;
pub mod reader;

use serde::Serialize;
use std::collections::BTreeMap;

pub use reader::{read_default_domain, read_tnsnames};

/// One `(HOST=..)(PORT=..)` pair taken from a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: String,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }

    /// `host:port` as used for dialing
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A named database access point (a tnsnames.ora record or a directory entry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TnsEntry {
    /// Alias as written, may carry a domain suffix (`XE.local`)
    pub name: String,

    /// Raw connect descriptor text
    pub desc: String,

    /// SERVICE_NAME or SID from the descriptor
    pub service: String,

    /// Address pairs in descriptor order
    pub servers: Vec<ServerAddress>,

    /// `file:line` for file entries, DN for directory entries
    pub location: String,
}

impl TnsEntry {
    /// Creates an entry and extracts service and servers from the descriptor
    pub fn new(name: impl Into<String>, desc: impl Into<String>, location: impl Into<String>) -> Self {
        let desc = desc.into();
        Self {
            name: name.into(),
            service: reader::extract_service(&desc),
            servers: reader::extract_servers(&desc),
            desc,
            location: location.into(),
        }
    }
}

/// Strips any domain suffix and case-folds an alias: `XE.local` -> `xe`
pub fn short_alias(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.find('.') {
        Some(idx) => lower[..idx].to_string(),
        None => lower,
    }
}

/// Alias-keyed entry collection with an optional default domain
#[derive(Debug, Clone, Default)]
pub struct TnsEntries {
    entries: BTreeMap<String, TnsEntry>,
    default_domain: Option<String>,
}

impl TnsEntries {
    pub fn new(default_domain: Option<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_domain: default_domain.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Inserts an entry, replacing a previous one with the same alias
    pub fn insert(&mut self, entry: TnsEntry) -> Option<TnsEntry> {
        self.entries.insert(entry.name.to_uppercase(), entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_domain(&self) -> Option<&str> {
        self.default_domain.as_deref()
    }

    /// Entries in sorted alias order
    pub fn iter(&self) -> impl Iterator<Item = &TnsEntry> {
        self.entries.values()
    }

    /// Looks up an alias.
    ///
    /// An exact (case-insensitive) match wins. A bare alias without a dot is
    /// retried with the default domain appended. A full alias that does not
    /// match exactly is not found.
    pub fn get_entry(&self, alias: &str) -> Option<&TnsEntry> {
        let key = alias.trim().to_uppercase();
        if let Some(entry) = self.entries.get(&key) {
            return Some(entry);
        }
        if key.contains('.') {
            return None;
        }
        let domain = self.default_domain.as_deref()?;
        let full = format!("{}.{}", key, domain.to_uppercase());
        log::debug!("alias {} not found, trying {}", alias, full);
        self.entries.get(&full)
    }
}

impl FromIterator<TnsEntry> for TnsEntries {
    fn from_iter<I: IntoIterator<Item = TnsEntry>>(iter: I) -> Self {
        let mut entries = TnsEntries::new(None);
        for e in iter {
            entries.insert(e);
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> TnsEntry {
        TnsEntry::new(
            name,
            "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=db1)(PORT=1521))(CONNECT_DATA=(SERVICE_NAME=XE)))",
            "tnsnames.ora:1",
        )
    }

    #[test]
    fn test_short_alias() {
        assert_eq!(short_alias("XE.local"), "xe");
        assert_eq!(short_alias("xe"), "xe");
        assert_eq!(short_alias(" DB_T.ora.local "), "db_t");
    }

    #[test]
    fn test_get_entry_exact_and_case_insensitive() {
        let mut entries = TnsEntries::new(Some("local".into()));
        entries.insert(entry("XE.local"));
        assert!(entries.get_entry("XE.local").is_some());
        assert!(entries.get_entry("xe.LOCAL").is_some());
    }

    #[test]
    fn test_get_entry_default_domain() {
        let mut entries = TnsEntries::new(Some("local".into()));
        entries.insert(entry("XE.local"));
        let found = entries.get_entry("XE").expect("short alias should resolve");
        assert_eq!(found.name, "XE.local");
    }

    #[test]
    fn test_get_entry_rejects_wrong_full_alias() {
        let mut entries = TnsEntries::new(Some("local".into()));
        entries.insert(entry("XE.local"));
        assert!(entries.get_entry("XE.other").is_none());

        let no_domain: TnsEntries = vec![entry("XE.local")].into_iter().collect();
        assert!(no_domain.get_entry("XE").is_none());
    }

    #[test]
    fn test_entry_extracts_servers() {
        let e = entry("XE");
        assert_eq!(e.service, "XE");
        assert_eq!(e.servers, vec![ServerAddress::new("db1", "1521")]);
        assert_eq!(e.servers[0].address(), "db1:1521");
    }
}
