/// Integration tests for the stored probe account
///
/// These use the platform keychain and are ignored by default.
/// Run these tests with: cargo test --test credential_tests -- --ignored
use tns_cli_lib::credentials::{resolve_probe_credentials, CredentialManager, CredentialSource};

const TEST_USERNAME: &str = "C##TCHECK_TEST";
const TEST_PASSWORD: &str = "test_password_123";

#[test]
#[ignore]
fn test_store_and_retrieve_probe_credentials() {
    let _ = CredentialManager::delete_probe_credentials();

    CredentialManager::set_probe_credentials(TEST_USERNAME, TEST_PASSWORD)
        .expect("Should successfully store credentials");
    println!("✓ Credentials stored to keychain");

    let (username, password) =
        CredentialManager::get_probe_credentials().expect("Should retrieve credentials");
    assert_eq!(username, TEST_USERNAME);
    assert_eq!(password, TEST_PASSWORD);
    assert!(CredentialManager::has_probe_credentials());
    println!("✓ Credentials retrieved from keychain");

    let resolved = resolve_probe_credentials(
        None,
        None,
        |_| None,
        || CredentialManager::get_probe_credentials().ok(),
    );
    assert_eq!(resolved.source, CredentialSource::Keychain);
    assert_eq!(resolved.username, TEST_USERNAME);

    CredentialManager::delete_probe_credentials().expect("Should delete credentials");
    assert!(!CredentialManager::has_probe_credentials());
    println!("✓ Credentials deleted from keychain");
}
