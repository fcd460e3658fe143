//! Oracle database access for the reachability probe
//!
//! This module provides Instant Client loading, the driver seam and the
//! probe itself.

pub mod client;
pub mod connection;
pub mod error;
pub mod probe;

pub use connection::{OracleDriver, SqlDriver, SqlSession};
pub use error::DriverError;
pub use probe::{AliasOutcome, CheckReport, ProbeOutcome, ProbeRequest, ProbeStatus, Prober};
