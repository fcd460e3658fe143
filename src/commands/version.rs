//! `tnscli version`

use crate::error::TnsResult;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, set by the release build
pub fn commit() -> &'static str {
    option_env!("TNSCLI_GIT_COMMIT").unwrap_or("snapshot")
}

pub fn build_date() -> &'static str {
    option_env!("TNSCLI_BUILD_DATE").unwrap_or("undefined")
}

/// `tnscli version 0.1.0 (snapshot - undefined)`
pub fn version_line() -> String {
    format!("{} version {} ({} - {})", NAME, VERSION, commit(), build_date())
}

pub fn execute() -> TnsResult<()> {
    println!("{}", version_line());
    Ok(())
}
