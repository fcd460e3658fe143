//! Logger setup
//!
//! Diagnostics go through the `log` macros to stderr. Command results are
//! printed to stdout by the commands themselves.

use crate::error::{TnsError, TnsResult};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Picks the log level from the debug/info switches
pub fn level_for(debug: bool, info: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else if info {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    }
}

/// Installs the global logger. Can only succeed once per process.
pub fn init(level: LevelFilter, use_color: bool) -> TnsResult<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::BrightBlack);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let stamp = chrono::Local::now().to_rfc2822();
            if use_color {
                out.finish(format_args!(
                    "{} [{}] {}: {}",
                    stamp,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} [{}] {}: {}",
                    stamp,
                    record.level(),
                    record.target(),
                    message
                ))
            }
        })
        .level(level)
        // dependency chatter stays out of --info output
        .level_for("ldap3", level.min(LevelFilter::Warn))
        .level_for("hickory_proto", level.min(LevelFilter::Warn))
        .level_for("hickory_resolver", level.min(LevelFilter::Warn))
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| TnsError::Config(format!("logger already initialized: {}", e)))?;

    log::debug!("logging initialized at level {}", level);
    Ok(())
}
