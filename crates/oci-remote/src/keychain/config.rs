//! Credential config file (`$DOCKER_CONFIG/config.json`, default `~/.docker/config.json`).
//!
//! Read fresh on every resolution. A missing file and a malformed body both
//! yield an empty config, so resolution degrades to anonymous access.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::authn::Authenticator;
use crate::error::{RegistryError, RegistryResult};

/// Environment variable naming the config directory.
pub const CONFIG_DIR_ENV: &str = "DOCKER_CONFIG";

/// File name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Config directory: `$DOCKER_CONFIG`, else `~/.docker`.
pub fn config_dir() -> RegistryResult<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".docker"))
        .ok_or_else(|| RegistryError::Config {
            message: format!(
                "cannot determine home directory and {} is not set",
                CONFIG_DIR_ENV
            ),
        })
}

/// Full path of the credential config file.
pub fn config_path() -> RegistryResult<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Parsed credential config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialConfig {
    /// Exact-host → helper name.
    #[serde(default, rename = "credHelpers")]
    pub cred_helpers: HashMap<String, String>,

    /// Default helper for every host.
    #[serde(default, rename = "credStore", alias = "credsStore")]
    pub cred_store: Option<String>,

    /// Host variant → inline credentials.
    #[serde(default)]
    pub auths: HashMap<String, AuthEntry>,
}

/// Inline credentials from the `auths` map.
#[derive(Clone, Default, Deserialize)]
pub struct AuthEntry {
    /// base64 of `username:password`.
    #[serde(default)]
    pub auth: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default, rename = "identitytoken")]
    pub identity_token: Option<String>,
}

impl CredentialConfig {
    /// Parse a config body; malformed JSON (including non-UTF-8 bytes) yields
    /// an empty config.
    pub fn parse(content: impl AsRef<[u8]>, origin: &Path) -> Self {
        match serde_json::from_slice(content.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %origin.display(),
                    error = %e,
                    "unable to parse credential config, falling back to anonymous"
                );
                Self::default()
            }
        }
    }

    /// Load a config file; a missing file yields an empty config.
    ///
    /// A file that exists but cannot be read is an error.
    pub async fn load(path: &Path) -> RegistryResult<Self> {
        match tokio::fs::read(path).await {
            Ok(content) => Ok(Self::parse(content, path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credential config");
                Ok(Self::default())
            }
            Err(e) => Err(RegistryError::Config {
                message: format!("failed to read {}: {}", path.display(), e),
            }),
        }
    }
}

impl AuthEntry {
    /// Decode into an authenticator.
    ///
    /// Precedence: identity token, then the encoded `auth` string (sent as
    /// stored), then username/password. An entry with none of these is
    /// unsupported and resolves anonymous.
    pub fn authenticator(&self) -> Authenticator {
        if let Some(token) = non_empty(&self.identity_token) {
            return Authenticator::bearer(token);
        }

        if let Some(encoded) = non_empty(&self.auth) {
            return Authenticator::encoded_basic(encoded.trim());
        }

        match (non_empty(&self.username), self.password.as_deref()) {
            (Some(username), Some(password)) => Authenticator::basic(username, password),
            _ => {
                warn!("unsupported inline auth entry, ignoring it");
                Authenticator::Anonymous
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// Keep secrets out of Debug output.
impl std::fmt::Debug for AuthEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEntry")
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "identity_token",
                &self.identity_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        std::env::remove_var(CONFIG_DIR_ENV);
        let not_set = config_dir().unwrap();

        std::env::set_var(CONFIG_DIR_ENV, "/path/to/.docker");
        let set = config_dir().unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(set, PathBuf::from("/path/to/.docker"));
        assert_ne!(not_set, set);
        assert!(not_set.ends_with(".docker"));
    }

    #[test]
    #[serial]
    fn test_config_path_under_dir() {
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/docker-config");
        let path = config_path().unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);

        assert_eq!(path, PathBuf::from("/tmp/docker-config/config.json"));
    }

    #[test]
    fn test_parse_full_config() {
        let config = CredentialConfig::parse(
            r#"{
                "credHelpers": {"gcr.io": "gcloud"},
                "credStore": "desktop",
                "auths": {"https://index.docker.io/v1/": {"auth": "Zm9vOmJhcg=="}}
            }"#,
            Path::new("config.json"),
        );

        assert_eq!(config.cred_helpers.get("gcr.io").map(String::as_str), Some("gcloud"));
        assert_eq!(config.cred_store.as_deref(), Some("desktop"));
        assert!(config.auths.contains_key("https://index.docker.io/v1/"));
    }

    #[test]
    fn test_parse_accepts_docker_creds_store_spelling() {
        let config = CredentialConfig::parse(r#"{"credsStore": "osxkeychain"}"#, Path::new("c"));
        assert_eq!(config.cred_store.as_deref(), Some("osxkeychain"));
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        let config = CredentialConfig::parse("}{", Path::new("config.json"));
        assert!(config.cred_helpers.is_empty());
        assert!(config.cred_store.is_none());
        assert!(config.auths.is_empty());
    }

    #[test]
    fn test_parse_invalid_utf8_is_empty() {
        let config =
            CredentialConfig::parse(b"{\"auths\": \xff\xfe}", Path::new("config.json"));
        assert!(config.auths.is_empty());
        assert!(config.cred_store.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_utf8_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{\"auths\": \xff\xfe}").unwrap();

        let config = CredentialConfig::load(&path).await.unwrap();
        assert!(config.auths.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = CredentialConfig::load(&dir.path().join("config.json"))
            .await
            .unwrap();
        assert!(config.auths.is_empty());
    }

    #[tokio::test]
    async fn test_load_directory_is_read_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read.
        let path = dir.path().join("config.json");
        std::fs::create_dir(&path).unwrap();

        let result = CredentialConfig::load(&path).await;
        assert!(matches!(result, Err(RegistryError::Config { .. })));
    }

    #[test]
    fn test_auth_entry_forms_agree() {
        let encoded = AuthEntry {
            auth: Some("Zm9vOmJhcg==".into()),
            ..Default::default()
        };
        let split = AuthEntry {
            username: Some("foo".into()),
            password: Some("bar".into()),
            ..Default::default()
        };

        assert_eq!(
            encoded.authenticator().authorization(),
            split.authenticator().authorization()
        );
        assert_eq!(
            encoded.authenticator().authorization().as_deref(),
            Some("Basic Zm9vOmJhcg==")
        );
    }

    #[test]
    fn test_auth_entry_identity_token_wins() {
        let entry = AuthEntry {
            auth: Some("Zm9vOmJhcg==".into()),
            identity_token: Some("refresh-me".into()),
            ..Default::default()
        };
        assert_eq!(entry.authenticator(), Authenticator::bearer("refresh-me"));
    }

    #[test]
    fn test_auth_entry_encoded_value_passed_through() {
        // Unpadded base64 is not decoded and re-encoded.
        let entry = AuthEntry {
            auth: Some("Zm9vOmJhcg".into()),
            ..Default::default()
        };
        assert_eq!(
            entry.authenticator().authorization().as_deref(),
            Some("Basic Zm9vOmJhcg")
        );
    }

    #[test]
    fn test_auth_entry_without_credentials_is_anonymous() {
        assert!(AuthEntry::default().authenticator().is_anonymous());

        let username_only = AuthEntry {
            username: Some("foo".into()),
            ..Default::default()
        };
        assert!(username_only.authenticator().is_anonymous());
    }
}
