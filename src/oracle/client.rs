/// Oracle Instant Client detection and loading
///
/// The `oracle` crate finds `libclntsh` through the system loader. When a
/// client directory is configured (or found under `$ORACLE_HOME`) the library
/// is loaded from there once with `RTLD_GLOBAL` so later connections reuse it.
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Static reference to the Oracle client library (loaded via libloading)
static ORACLE_CLIENT: OnceLock<Mutex<Option<libloading::Library>>> = OnceLock::new();

/// Oracle client library filename
#[cfg(target_os = "macos")]
pub const ORACLE_LIB_NAME: &str = "libclntsh.dylib";

#[cfg(target_os = "windows")]
pub const ORACLE_LIB_NAME: &str = "oci.dll";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const ORACLE_LIB_NAME: &str = "libclntsh.so";

fn expand_home(p: &str) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(p)
}

/// Resolves the Oracle client directory
///
/// # Arguments
/// * `custom_path` - Directory from `--oracle-client` or the config file
/// * `oracle_home` - Value of `$ORACLE_HOME`, if set
///
/// # Returns
/// The first directory that holds the client library. A custom path is
/// returned even without the library so diagnostics name it.
pub fn resolve_client_path(custom_path: Option<&str>, oracle_home: Option<&str>) -> Option<PathBuf> {
    if let Some(path_str) = custom_path.filter(|p| !p.is_empty()) {
        return Some(expand_home(path_str));
    }

    let home = oracle_home.filter(|h| !h.is_empty())?;
    let home = expand_home(home);
    [home.join("lib"), home]
        .into_iter()
        .find(|dir| dir.join(ORACLE_LIB_NAME).exists())
}

/// Checks that the client library exists in `client_dir`
pub fn check_client_ready(client_dir: &Path) -> bool {
    let lib_path = client_dir.join(ORACLE_LIB_NAME);
    if !lib_path.exists() {
        log::debug!("Oracle client library not found at: {:?}", lib_path);
        return false;
    }
    if !lib_path.is_file() {
        log::warn!("Oracle client library path exists but is not a file: {:?}", lib_path);
        return false;
    }
    log::debug!("Oracle client library found: {:?}", lib_path);
    true
}

/// Loads the client library from `client_dir` and keeps it loaded
///
/// # Returns
/// `Ok(())` if loaded (or already loaded), otherwise the loader error
pub fn prime_client(client_dir: &Path) -> Result<(), String> {
    if is_client_primed() {
        return Ok(());
    }
    let lib_path = client_dir.join(ORACLE_LIB_NAME);
    if !lib_path.exists() {
        return Err(format!(
            "Oracle client library not found at: {}",
            lib_path.display()
        ));
    }

    // symbols must be global for the oracle crate's own dlopen to reuse them
    #[cfg(unix)]
    let library = unsafe {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        let unix_lib = UnixLibrary::open(Some(&lib_path), RTLD_NOW | RTLD_GLOBAL)
            .map_err(|e| format!("Failed to load Oracle client library: {}", e))?;
        libloading::Library::from(unix_lib)
    };

    #[cfg(not(unix))]
    let library = unsafe {
        libloading::Library::new(&lib_path)
            .map_err(|e| format!("Failed to load Oracle client library: {}", e))?
    };

    let mutex = ORACLE_CLIENT.get_or_init(|| Mutex::new(None));
    let mut guard = mutex
        .lock()
        .map_err(|e| format!("Failed to acquire lock on Oracle client: {}", e))?;
    *guard = Some(library);

    log::info!("Oracle client library loaded from: {:?}", lib_path);
    Ok(())
}

/// Checks if the Oracle client has been primed (loaded)
pub fn is_client_primed() -> bool {
    if let Some(mutex) = ORACLE_CLIENT.get() {
        if let Ok(guard) = mutex.lock() {
            return guard.is_some();
        }
    }
    false
}

/// Best effort priming before the first connection. Failures are logged and
/// the system loader is left to find the library.
pub fn ensure_client(custom_path: Option<&str>) {
    let oracle_home = std::env::var("ORACLE_HOME").ok();
    let Some(dir) = resolve_client_path(custom_path, oracle_home.as_deref()) else {
        log::debug!("no Oracle client directory configured, using system loader");
        return;
    };
    if !check_client_ready(&dir) {
        log::warn!("no Oracle client library in {}", dir.display());
        return;
    }
    if let Err(e) = prime_client(&dir) {
        log::warn!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_client_path_custom() {
        let custom = "/opt/oracle/instantclient";
        let path = resolve_client_path(Some(custom), Some("/ignored"));
        assert_eq!(path, Some(PathBuf::from(custom)));
    }

    #[test]
    fn test_resolve_client_path_oracle_home() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib").join(ORACLE_LIB_NAME), b"").unwrap();
        let home = dir.path().to_string_lossy().to_string();
        assert_eq!(resolve_client_path(None, Some(&home)), Some(dir.path().join("lib")));
    }

    #[test]
    fn test_resolve_client_path_none() {
        assert_eq!(resolve_client_path(None, None), None);
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().to_string_lossy().to_string();
        assert_eq!(resolve_client_path(None, Some(&home)), None);
    }

    #[test]
    fn test_prime_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!check_client_ready(dir.path()));
        assert!(prime_client(dir.path()).is_err() || is_client_primed());
    }
}
