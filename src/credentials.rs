/// Probe account management for tnscli
///
/// The reachability probe needs a user and password. They come from the
/// command line, then `TNSCLI_USER`/`TNSCLI_PASSWORD`, then the OS keychain,
/// and finally a fixed low-privilege account that is not expected to exist.
use crate::error::{TnsError, TnsResult};
use keyring::Entry;
use serde::Serialize;

/// Keychain service identifier for the probe account
const KEYCHAIN_SERVICE_PROBE: &str = "tnscli:probe";

/// Account used when nothing else is configured. A login with it usually
/// fails with ORA-01017, which still proves the service is up.
pub const DEFAULT_PROBE_USER: &str = "C##TCHECK";
pub const DEFAULT_PROBE_PASSWORD: &str = "tcheck_probe";

/// Where the probe credentials were taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Flags,
    Environment,
    Keychain,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCredentials {
    pub username: String,
    pub password: String,
    pub source: CredentialSource,
}

impl ProbeCredentials {
    pub fn probe_default() -> Self {
        Self {
            username: DEFAULT_PROBE_USER.to_string(),
            password: DEFAULT_PROBE_PASSWORD.to_string(),
            source: CredentialSource::Default,
        }
    }
}

/// Manager for the probe account stored in the keychain
pub struct CredentialManager;

impl CredentialManager {
    /// Stores the probe account in the keychain
    ///
    /// # Storage format
    /// - Username key: `tnscli:probe` / `username`
    /// - Password key: `tnscli:probe` / `password`
    pub fn set_probe_credentials(username: &str, password: &str) -> TnsResult<()> {
        if username.is_empty() {
            return Err(TnsError::Credential("Username cannot be empty".to_string()));
        }
        if password.is_empty() {
            return Err(TnsError::Credential("Password cannot be empty".to_string()));
        }

        Entry::new(KEYCHAIN_SERVICE_PROBE, "username")?.set_password(username)?;
        Entry::new(KEYCHAIN_SERVICE_PROBE, "password")?.set_password(password)?;

        log::info!("Stored probe credentials for user {}", username);
        Ok(())
    }

    /// Retrieves the probe account from the keychain
    ///
    /// # Returns
    /// `Ok((username, password))` if both are stored
    pub fn get_probe_credentials() -> TnsResult<(String, String)> {
        let username = Entry::new(KEYCHAIN_SERVICE_PROBE, "username")?
            .get_password()
            .map_err(|e| TnsError::Credential(format!("no probe user stored: {}", e)))?;
        let password = Entry::new(KEYCHAIN_SERVICE_PROBE, "password")?
            .get_password()
            .map_err(|e| TnsError::Credential(format!("no probe password stored: {}", e)))?;
        Ok((username, password))
    }

    /// Deletes the stored probe account; missing entries are ignored
    pub fn delete_probe_credentials() -> TnsResult<()> {
        for key in ["username", "password"] {
            if let Ok(entry) = Entry::new(KEYCHAIN_SERVICE_PROBE, key) {
                let _ = entry.delete_password();
            }
        }
        log::info!("Deleted probe credentials");
        Ok(())
    }

    pub fn has_probe_credentials() -> bool {
        Self::get_probe_credentials().is_ok()
    }
}

/// Picks the credentials for a probe run.
///
/// A user given without a password (or the reverse) on one level is
/// completed from the fixed probe account, not from a lower level.
pub fn resolve_probe_credentials<F, K>(
    user: Option<&str>,
    password: Option<&str>,
    env: F,
    keychain: K,
) -> ProbeCredentials
where
    F: Fn(&str) -> Option<String>,
    K: FnOnce() -> Option<(String, String)>,
{
    let complete = |u: Option<String>, p: Option<String>, source| ProbeCredentials {
        username: u.unwrap_or_else(|| DEFAULT_PROBE_USER.to_string()),
        password: p.unwrap_or_else(|| DEFAULT_PROBE_PASSWORD.to_string()),
        source,
    };

    let user = user.filter(|u| !u.is_empty()).map(str::to_string);
    let password = password.filter(|p| !p.is_empty()).map(str::to_string);
    if user.is_some() || password.is_some() {
        return complete(user, password, CredentialSource::Flags);
    }

    let env_user = env("TNSCLI_USER").filter(|u| !u.is_empty());
    let env_password = env("TNSCLI_PASSWORD").filter(|p| !p.is_empty());
    if env_user.is_some() || env_password.is_some() {
        return complete(env_user, env_password, CredentialSource::Environment);
    }

    if let Some((u, p)) = keychain() {
        log::debug!("using probe credentials from keychain for {}", u);
        return complete(Some(u), Some(p), CredentialSource::Keychain);
    }

    ProbeCredentials::probe_default()
}
