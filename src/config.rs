//! Settings for tnscli
//!
//! Values come from `tnscli.yaml` (in `$HOME/etc` or the current directory),
//! then `TNSCLI_*` environment variables, then command line flags. The
//! command layer applies the flags on top of what `Settings::load` returns.

use crate::error::{TnsError, TnsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "tnscli.yaml";
pub const ENV_PREFIX: &str = "TNSCLI_";
pub const DEFAULT_TNS_ADMIN: &str = "/opt/oracle/network/admin";
pub const DEFAULT_LDAP_TIMEOUT: u64 = 20;

/// Directory connection settings (`ldap.*` keys)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapSettings {
    pub host: Option<String>,
    pub port: u16,
    pub base: Option<String>,
    pub oraclectx: Option<String>,
    pub binddn: Option<String>,
    pub bindpassword: Option<String>,
    pub tls: bool,
    pub insecure: bool,
    pub timeout: u64,
    pub tnstarget: Option<PathBuf>,
    pub tnssource: Option<PathBuf>,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: 0,
            base: None,
            oraclectx: None,
            binddn: None,
            bindpassword: None,
            tls: false,
            insecure: false,
            timeout: DEFAULT_LDAP_TIMEOUT,
            tnstarget: None,
            tnssource: None,
        }
    }
}

impl LdapSettings {
    /// Port to dial; 0 means the protocol default
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.tls) {
            (0, true) => 636,
            (0, false) => 389,
            (p, _) => p,
        }
    }
}

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tns_admin: Option<PathBuf>,
    pub filename: Option<PathBuf>,
    pub debug: bool,
    pub info: bool,
    pub no_color: bool,
    pub oracle_client: Option<String>,
    pub ldap: LdapSettings,
}

impl Settings {
    /// Loads the config file (if any) and applies environment overrides
    ///
    /// # Arguments
    /// * `explicit` - File given with `--config`; it must exist
    pub fn load(explicit: Option<&Path>) -> TnsResult<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    log::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                    Self::default()
                }
            },
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Parses a YAML config file
    pub fn from_file(path: &Path) -> TnsResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TnsError::Config(format!("cannot read config {}: {}", path.display(), e)))?;
        let settings = Self::from_yaml(&text)?;
        log::debug!("config loaded from {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> TnsResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies `TNSCLI_*` variables; `ldap.host` maps to `TNSCLI_LDAP_HOST`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.is_empty())
        };
        let flag = |name: &str| var(name).map(|v| parse_bool(&v));

        if let Some(v) = var("TNS_ADMIN") {
            self.tns_admin = Some(PathBuf::from(v));
        }
        if let Some(v) = var("FILENAME") {
            self.filename = Some(PathBuf::from(v));
        }
        if let Some(v) = flag("DEBUG") {
            self.debug = v;
        }
        if let Some(v) = flag("INFO") {
            self.info = v;
        }
        if let Some(v) = flag("NO_COLOR") {
            self.no_color = v;
        }
        if let Some(v) = var("ORACLE_CLIENT") {
            self.oracle_client = Some(v);
        }

        let ldap = &mut self.ldap;
        if let Some(v) = var("LDAP_HOST") {
            ldap.host = Some(v);
        }
        if let Some(v) = var("LDAP_PORT") {
            match v.parse() {
                Ok(p) => ldap.port = p,
                Err(_) => log::warn!("ignoring invalid {}LDAP_PORT '{}'", ENV_PREFIX, v),
            }
        }
        if let Some(v) = var("LDAP_BASE") {
            ldap.base = Some(v);
        }
        if let Some(v) = var("LDAP_ORACLECTX") {
            ldap.oraclectx = Some(v);
        }
        if let Some(v) = var("LDAP_BINDDN") {
            ldap.binddn = Some(v);
        }
        if let Some(v) = var("LDAP_BINDPASSWORD") {
            ldap.bindpassword = Some(v);
        }
        if let Some(v) = flag("LDAP_TLS") {
            ldap.tls = v;
        }
        if let Some(v) = flag("LDAP_INSECURE") {
            ldap.insecure = v;
        }
        if let Some(v) = var("LDAP_TIMEOUT") {
            match v.parse() {
                Ok(t) => ldap.timeout = t,
                Err(_) => log::warn!("ignoring invalid {}LDAP_TIMEOUT '{}'", ENV_PREFIX, v),
            }
        }
    }

    /// Directory holding tnsnames.ora, sqlnet.ora, ldap.ora and racinfo.ini
    pub fn tns_admin_dir(&self) -> PathBuf {
        resolve_tns_admin(self.tns_admin.as_deref(), |k| std::env::var(k).ok())
    }

    /// The tnsnames.ora file to read
    pub fn tnsnames_path(&self) -> PathBuf {
        match &self.filename {
            Some(f) => f.clone(),
            None => self.tns_admin_dir().join("tnsnames.ora"),
        }
    }
}

/// Configured value, else `$TNS_ADMIN`, else `$ORACLE_HOME/network/admin`,
/// else `/opt/oracle/network/admin`
pub fn resolve_tns_admin<F>(configured: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    if let Some(dir) = lookup("TNS_ADMIN").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(home) = lookup("ORACLE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join("network").join("admin");
    }
    PathBuf::from(DEFAULT_TNS_ADMIN)
}

fn find_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("etc").join(CONFIG_FILE_NAME));
    }
    candidates.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    candidates.into_iter().find(|p| p.is_file())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_yaml() {
        let yaml = "
tns_admin: /etc/oracle
debug: true
ldap:
  host: ldap.example.com
  port: 1389
  base: dc=example,dc=com
";
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.tns_admin, Some(PathBuf::from("/etc/oracle")));
        assert!(s.debug);
        assert_eq!(s.ldap.host.as_deref(), Some("ldap.example.com"));
        assert_eq!(s.ldap.port, 1389);
        assert_eq!(s.ldap.timeout, DEFAULT_LDAP_TIMEOUT);
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Settings::from_yaml("ldap: [unclosed");
        assert!(matches!(result, Err(TnsError::Config(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut s = Settings::from_yaml("ldap:\n  host: filehost\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("TNSCLI_LDAP_HOST", "envhost"),
            ("TNSCLI_LDAP_TLS", "true"),
            ("TNSCLI_INFO", "1"),
        ]
        .into_iter()
        .collect();
        s.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.ldap.host.as_deref(), Some("envhost"));
        assert!(s.ldap.tls);
        assert!(s.info);
        assert_eq!(s.ldap.effective_port(), 636);
    }

    #[test]
    fn test_resolve_tns_admin() {
        let env: HashMap<&str, &str> = [("ORACLE_HOME", "/u01/app/oracle")].into_iter().collect();
        let dir = resolve_tns_admin(None, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(dir, PathBuf::from("/u01/app/oracle/network/admin"));

        let dir = resolve_tns_admin(None, |_| None);
        assert_eq!(dir, PathBuf::from(DEFAULT_TNS_ADMIN));

        let dir = resolve_tns_admin(Some(Path::new("/x")), |_| Some("/y".into()));
        assert_eq!(dir, PathBuf::from("/x"));
    }
}
