//! Directory (LDAP) mirror of TNS entries
//!
//! Oracle Net keeps service names as `orclNetService` entries below
//! `cn=OracleContext,<base>`, one entry per alias with the descriptor in
//! `orclNetDescString`.

pub mod ldap;
pub mod ldap_ora;
pub mod reconcile;

use crate::error::TnsResult;
use crate::tns::TnsEntry;
use std::collections::BTreeMap;

pub use ldap::{LdapDirectory, LdapOptions, LdapServer};
pub use reconcile::{ClearReport, ReconcileStatus, Reconciler, WorkTally};

pub const ORACLE_CONTEXT_RDN: &str = "cn=OracleContext";
pub const NET_SERVICE_CLASS: &str = "orclNetService";
pub const CONTEXT_CLASS: &str = "orclContext";
pub const DESC_ATTRIBUTE: &str = "orclNetDescString";

/// Directory entries keyed by short alias (see `tns::short_alias`).
/// `TnsEntry::location` holds the entry DN.
pub type DirectoryEntries = BTreeMap<String, TnsEntry>;

/// Directory primitives used by the reconciler and the `ldap` commands
pub trait DirectoryClient {
    /// All net service entries below `context`
    fn read(&mut self, context: &str) -> TnsResult<DirectoryEntries>;

    /// Creates `cn=<alias>,<context>`
    fn add(&mut self, context: &str, alias: &str, desc: &str) -> TnsResult<()>;

    /// Replaces the descriptor of an existing entry
    fn modify(&mut self, dn: &str, alias: &str, desc: &str) -> TnsResult<()>;

    fn delete(&mut self, dn: &str, alias: &str) -> TnsResult<()>;

    /// Finds the Oracle context DN below `base`
    fn resolve_context(&mut self, base: &str) -> TnsResult<String>;
}

/// `cn=<alias>,<context>` with the alias escaped for use in a DN
pub fn entry_dn(alias: &str, context: &str) -> String {
    format!("cn={},{}", escape_dn_value(alias), context)
}

/// `cn=OracleContext,<base>` unless `base` already is a context
pub fn context_for_base(base: &str) -> String {
    if base.to_lowercase().starts_with(&ORACLE_CONTEXT_RDN.to_lowercase()) {
        base.to_string()
    } else {
        format!("{},{}", ORACLE_CONTEXT_RDN, base)
    }
}

/// Base DN of a context: strips a leading `cn=OracleContext,`
pub fn base_for_context(context: &str) -> String {
    let prefix = format!("{},", ORACLE_CONTEXT_RDN.to_lowercase());
    if context.to_lowercase().starts_with(&prefix) {
        context[prefix.len()..].to_string()
    } else {
        context.to_string()
    }
}

/// Escapes RFC 4514 special characters in an RDN value
pub fn escape_dn_value(value: &str) -> String {
    let count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);
    for (i, ch) in value.chars().enumerate() {
        let edge = i == 0 || i + 1 == count;
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if edge => result.push_str("\\20"),
            '#' if i == 0 => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_dn() {
        assert_eq!(
            entry_dn("xe", "cn=OracleContext,dc=example,dc=com"),
            "cn=xe,cn=OracleContext,dc=example,dc=com"
        );
        assert_eq!(entry_dn("a,b", "c"), "cn=a\\,b,c");
    }

    #[test]
    fn test_context_and_base() {
        assert_eq!(context_for_base("dc=oracle,dc=local"), "cn=OracleContext,dc=oracle,dc=local");
        assert_eq!(
            context_for_base("cn=OracleContext,dc=oracle,dc=local"),
            "cn=OracleContext,dc=oracle,dc=local"
        );
        assert_eq!(base_for_context("cn=OracleContext,dc=oracle,dc=local"), "dc=oracle,dc=local");
        assert_eq!(base_for_context("dc=x"), "dc=x");
    }

    #[test]
    fn test_escape_dn_value() {
        assert_eq!(escape_dn_value("xe"), "xe");
        assert_eq!(escape_dn_value(" x "), "\\20x\\20");
        assert_eq!(escape_dn_value("#1"), "\\231");
    }
}
