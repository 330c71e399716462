//! Keychain: maps a registry host to an [`Authenticator`].
//!
//! Resolution order, first match wins:
//! 1. a per-host credential helper (`credHelpers`)
//! 2. the default credential helper (`credStore`)
//! 3. inline credentials (`auths`) under any recognized form of the host
//! 4. anonymous
//!
//! The config file is re-read on every call. A missing or malformed file is
//! treated as empty; a named helper that fails is an error.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::authn::Authenticator;
use crate::error::RegistryResult;

pub mod config;
pub mod helper;

pub use config::{config_dir, config_path, AuthEntry, CredentialConfig};
pub use helper::{invoke_helper, HelperOutput, HelperRunner, ProcessRunner};

/// Credential resolution policy.
#[derive(Clone)]
pub struct Keychain {
    /// Fixed config directory; `None` resolves it from the environment per call.
    config_dir: Option<PathBuf>,
    runner: Arc<dyn HelperRunner>,
}

impl Keychain {
    /// Keychain reading `$DOCKER_CONFIG` (or `~/.docker`) and spawning real helpers.
    pub fn new() -> Self {
        Self {
            config_dir: None,
            runner: Arc::new(ProcessRunner),
        }
    }

    /// Read the config from `dir` instead of the environment.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Run credential helpers through `runner`.
    pub fn with_runner(mut self, runner: Arc<dyn HelperRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Resolve credentials for `host` (e.g. `gcr.io`, `localhost:5000`).
    pub async fn resolve(&self, host: &str) -> RegistryResult<Authenticator> {
        let dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => match config_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    warn!(error = %e, "no credential config directory, falling back to anonymous");
                    return Ok(Authenticator::Anonymous);
                }
            },
        };

        let config = CredentialConfig::load(&dir.join(config::CONFIG_FILE_NAME)).await?;
        self.resolve_with(&config, host).await
    }

    /// Apply the precedence rules to an already loaded config.
    pub async fn resolve_with(
        &self,
        config: &CredentialConfig,
        host: &str,
    ) -> RegistryResult<Authenticator> {
        let forms = host_forms(host);

        if let Some(helper) = forms.iter().find_map(|form| config.cred_helpers.get(form)) {
            debug!(host = %host, helper = %helper, "using per-host credential helper");
            return invoke_helper(self.runner.as_ref(), helper, host).await;
        }

        if let Some(helper) = config.cred_store.as_deref().filter(|h| !h.is_empty()) {
            debug!(host = %host, helper = %helper, "using default credential store");
            return invoke_helper(self.runner.as_ref(), helper, host).await;
        }

        if let Some((form, entry)) = forms
            .iter()
            .find_map(|form| config.auths.get(form).map(|entry| (form, entry)))
        {
            debug!(host = %host, key = %form, "using inline credentials");
            return Ok(entry.authenticator());
        }

        debug!(host = %host, "no credentials configured, using anonymous");
        Ok(Authenticator::Anonymous)
    }
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("config_dir", &self.config_dir)
            .finish_non_exhaustive()
    }
}

/// Every key under which config entries for `host` may be stored.
///
/// Only forms of this exact host are produced, so entries for other hosts
/// can never match.
pub fn host_forms(host: &str) -> Vec<String> {
    vec![
        host.to_string(),
        format!("https://{}", host),
        format!("http://{}", host),
        format!("https://{}/v1/", host),
        format!("https://{}/v2/", host),
        format!("http://{}/v1/", host),
        format!("http://{}/v2/", host),
    ]
}
