//! Minimal tnsnames.ora reader
//!
//! Splits `alias[,alias2] = (...)` records on balanced parentheses and keeps
//! the descriptor text as written. This is not a grammar parser: only the
//! server list and service name are picked out of each descriptor.

use super::{ServerAddress, TnsEntries, TnsEntry};
use crate::error::{TnsError, TnsResult};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const DEFAULT_PORT: &str = "1521";

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*ADDRESS\s*=").expect("valid address regex"))
}

fn host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*HOST\s*=\s*([^)\s]+)\s*\)").expect("valid host regex"))
}

fn port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*PORT\s*=\s*([^)\s]+)\s*\)").expect("valid port regex"))
}

fn service_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\(\s*(?:SERVICE_NAME|SID)\s*=\s*([^)\s]+)\s*\)").expect("valid service regex")
    })
}

fn domain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*NAMES\.DEFAULT_DOMAIN\s*=\s*([^\s#]+)").expect("valid domain regex")
    })
}

/// Extracts every host/port pair in descriptor order.
///
/// Each `(ADDRESS=` block contributes at most one pair. A descriptor without
/// explicit address blocks is scanned as a whole.
pub fn extract_servers(desc: &str) -> Vec<ServerAddress> {
    let starts: Vec<usize> = address_re().find_iter(desc).map(|m| m.end()).collect();
    let segments: Vec<&str> = if starts.is_empty() {
        vec![desc]
    } else {
        starts
            .iter()
            .enumerate()
            .map(|(i, start)| {
                let end = starts.get(i + 1).copied().unwrap_or(desc.len());
                &desc[*start..end]
            })
            .collect()
    };

    segments
        .into_iter()
        .filter_map(|segment| {
            let host = host_re().captures(segment)?.get(1)?.as_str().to_string();
            let port = port_re()
                .captures(segment)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| DEFAULT_PORT.to_string());
            Some(ServerAddress { host, port })
        })
        .collect()
}

/// SERVICE_NAME, or SID when no service name is given
pub fn extract_service(desc: &str) -> String {
    service_re()
        .captures(desc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Reads `NAMES.DEFAULT_DOMAIN` from `sqlnet.ora` in the given directory
pub fn read_default_domain(dir: &Path) -> Option<String> {
    let path = dir.join("sqlnet.ora");
    let text = fs::read_to_string(&path).ok()?;
    let domain = domain_re()
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())?;
    log::debug!("default domain {} from {}", domain, path.display());
    Some(domain)
}

/// Reads a tnsnames.ora file, following IFILE includes.
///
/// The default domain is taken from `sqlnet.ora` next to the file.
///
/// # Returns
/// The entry store, or an error when the top-level file cannot be read
pub fn read_tnsnames(path: &Path) -> TnsResult<TnsEntries> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut entries = TnsEntries::new(read_default_domain(&dir));
    let mut visited = HashSet::new();
    read_file(path, &mut entries, &mut visited, true)?;
    log::info!("{} TNS entries read from {}", entries.len(), path.display());
    Ok(entries)
}

fn read_file(
    path: &Path,
    entries: &mut TnsEntries,
    visited: &mut HashSet<PathBuf>,
    top_level: bool,
) -> TnsResult<()> {
    let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(key) {
        log::debug!("{} already read, skipping", path.display());
        return Ok(());
    }

    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if top_level => {
            return Err(TnsError::Io(format!("cannot read {}: {}", path.display(), e)));
        }
        Err(e) => {
            log::warn!("IFILE {} not readable: {}", path.display(), e);
            return Ok(());
        }
    };

    let location = path.display().to_string();
    for record in split_records(&text)? {
        match record {
            Record::Include { target, .. } => {
                let target = PathBuf::from(target);
                let target = if target.is_relative() {
                    path.parent().map(|p| p.join(&target)).unwrap_or(target)
                } else {
                    target
                };
                log::debug!("IFILE {} included from {}", target.display(), location);
                read_file(&target, entries, visited, false)?;
            }
            Record::Entry { names, desc, line } => {
                for name in names {
                    let entry = TnsEntry::new(name, desc.clone(), format!("{}:{}", location, line));
                    if let Some(old) = entries.insert(entry) {
                        log::warn!("alias {} at {} redefined", old.name, old.location);
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Record {
    Include { target: String, line: usize },
    Entry { names: Vec<String>, desc: String, line: usize },
}

/// Splits file text into records. Lines outside a record that are not
/// `key = (...)` or `IFILE = path` are ignored.
fn split_records(text: &str) -> TnsResult<Vec<Record>> {
    let chars: Vec<char> = text.chars().collect();
    let mut records = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // key part up to '=' on the same line
        let start_line = line;
        let key_start = i;
        while i < chars.len() && chars[i] != '=' && chars[i] != '\n' {
            i += 1;
        }
        if i >= chars.len() || chars[i] == '\n' {
            log::debug!("line {}: no '=' found, ignored", start_line);
            continue;
        }
        let key: String = chars[key_start..i].iter().collect();
        let key = key.trim().to_string();
        i += 1;

        if key.eq_ignore_ascii_case("IFILE") {
            let value_start = i;
            while i < chars.len() && chars[i] != '\n' && chars[i] != '#' {
                i += 1;
            }
            let value: String = chars[value_start..i].iter().collect();
            let target = value.trim().trim_matches('"').trim_matches('\'').to_string();
            if !target.is_empty() {
                records.push(Record::Include { target, line: start_line });
            }
            continue;
        }

        while i < chars.len() && chars[i].is_whitespace() {
            if chars[i] == '\n' {
                line += 1;
            }
            i += 1;
        }
        if i >= chars.len() || chars[i] != '(' {
            // plain key=value setting, not a descriptor
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let mut depth = 0usize;
        let mut desc = String::new();
        while i < chars.len() {
            let c = chars[i];
            match c {
                '#' => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '\n' => line += 1,
                _ => {}
            }
            desc.push(c);
            i += 1;
            if depth == 0 {
                break;
            }
        }
        if depth != 0 {
            return Err(TnsError::Parse(format!(
                "unbalanced parentheses in entry '{}' starting at line {}",
                key, start_line
            )));
        }

        let names: Vec<String> = key
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            log::warn!("line {}: descriptor without alias ignored", start_line);
            continue;
        }
        records.push(Record::Entry {
            names,
            desc,
            line: start_line,
        });
    }
    Ok(records)
}
