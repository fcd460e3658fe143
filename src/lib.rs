//! tnscli library
//!
//! Check, list and publish Oracle TNS entries: a reachability probe that
//! works without valid credentials, a reconciler that mirrors tnsnames.ora
//! into an LDAP directory, and address expansion for clustered services.

pub mod commands;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod ports;
pub mod tns;

pub use error::{TnsError, TnsResult};
