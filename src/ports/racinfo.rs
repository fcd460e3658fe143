//! racinfo.ini: cluster name to node/VIP/SCAN addresses
//!
//! ```text
//! [MYRAC.RAC.LAN]
//! scan=myrac.rac.lan:1521
//! vip1=vip1.rac.lan:1521
//! ```

use crate::error::{TnsError, TnsResult};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RacInfo {
    /// Lower-cased section name to `key=value` lines in file order
    sections: BTreeMap<String, Vec<(String, String)>>,
}

impl RacInfo {
    /// Reads a racinfo file; a missing file means no mapping
    pub fn read(path: &Path) -> TnsResult<Self> {
        if !path.exists() {
            log::debug!("{} not found, no cluster mapping", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| TnsError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        let info = Self::parse(&text)?;
        log::debug!("{} cluster sections in {}", info.sections.len(), path.display());
        Ok(info)
    }

    pub fn parse(text: &str) -> TnsResult<Self> {
        let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_lowercase();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(TnsError::Parse(format!(
                    "racinfo line {}: expected key=value, got '{}'",
                    no + 1,
                    line
                )));
            };
            let Some(section) = current.as_ref() else {
                log::warn!("racinfo line {}: '{}' outside a section, ignored", no + 1, line);
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            sections
                .entry(section.clone())
                .or_default()
                .push((key.trim().to_string(), value.to_string()));
        }
        Ok(Self { sections })
    }

    /// Addresses configured for a cluster host (case-insensitive)
    pub fn addresses(&self, host: &str) -> Option<&[(String, String)]> {
        self.sections
            .get(&host.trim().to_lowercase())
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Splits `host[:port]`, using `default_port` when none is given
pub fn split_host_port<'a>(value: &'a str, default_port: &'a str) -> (&'a str, &'a str) {
    match value.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            (host, port)
        }
        _ => (value, default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "; cluster list
[MYRAC.RAC.LAN]
scan=myrac.rac.lan:1521
vip1=vip1.rac.lan:1521
vip2 = vip2.rac.lan

[other]
";

    #[test]
    fn test_parse() {
        let info = RacInfo::parse(SAMPLE).unwrap();
        let addrs = info.addresses("myrac.rac.lan").unwrap();
        assert_eq!(addrs.len(), 3);
        assert_eq!(addrs[0], ("scan".to_string(), "myrac.rac.lan:1521".to_string()));
        assert_eq!(addrs[2].1, "vip2.rac.lan");
        assert!(info.addresses("other").is_none());
        assert!(info.addresses("unknown").is_none());
    }

    #[test]
    fn test_invalid_line() {
        assert!(RacInfo::parse("[x]\nnot a pair\n").is_err());
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("h:1522", "1521"), ("h", "1522"));
        assert_eq!(split_host_port("h", "1521"), ("h", "1521"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = RacInfo::read(&dir.path().join("racinfo.ini")).unwrap();
        assert!(info.is_empty());
    }
}
