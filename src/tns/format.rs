//! Output formatting for TNS entries (list, info, ldap read)

use super::TnsEntry;
use crate::error::{TnsError, TnsResult};
use regex::{Regex, RegexBuilder};
use std::io::Write;

/// Collapses every run of whitespace out of a descriptor.
///
/// Embedded newlines and indentation must not reach the driver.
pub fn collapse_whitespace(desc: &str) -> String {
    desc.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalizes descriptor indentation for display
pub fn format_desc(desc: &str) -> String {
    desc.replace('\r', " ")
        .replace('\n', "\n  ")
        .replace("(ADDRESS_LIST", "  (ADDRESS_LIST")
        .replace("(CONNECT_DATA", "  (CONNECT_DATA")
}

/// `alias=  <descriptor>`
pub fn format_entry(entry: &TnsEntry) -> String {
    format!("{}=  {}", entry.name, format_desc(&entry.desc))
}

/// Location comment followed by the entry
pub fn format_tns_info(entry: &TnsEntry) -> String {
    format!("# Location: {} \n{}", entry.location, format_entry(entry))
}

/// JDBC thin URL built from the whitespace-free descriptor
pub fn jdbc_url(entry: &TnsEntry) -> String {
    format!("jdbc:oracle:thin:@{}", collapse_whitespace(&entry.desc))
}

/// Builds the case-insensitive alias filter used by `list --search`
pub fn search_pattern(search: &str) -> TnsResult<Regex> {
    Ok(RegexBuilder::new(search).case_insensitive(true).build()?)
}

/// Writes entries one per line (or as full records with `complete`)
///
/// # Returns
/// Number of entries written; with a filter and no match an error
pub fn write_entries<'a, W, I>(
    out: &mut W,
    entries: I,
    complete: bool,
    filter: Option<&Regex>,
) -> TnsResult<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a TnsEntry>,
{
    let mut count = 0;
    for entry in entries {
        if let Some(re) = filter {
            if !re.is_match(&entry.name) {
                continue;
            }
        }
        if complete {
            writeln!(out, "{}\n", format_entry(entry))?;
        } else {
            writeln!(out, "{}", entry.name)?;
        }
        count += 1;
    }

    if count == 0 {
        if let Some(re) = filter {
            return Err(TnsError::NotFound(format!("no alias with '{}' found", re.as_str())));
        }
    }
    Ok(count)
}
