//! Credential helper protocol.
//!
//! A helper named `<name>` is the program `docker-credential-<name>`. It is
//! run as `docker-credential-<name> get` with the registry host on stdin and
//! answers on stdout with `{"ServerURL": ..., "Username": ..., "Secret": ...}`.
//! A username of `<token>` marks the secret as an identity token.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::authn::{Authenticator, HelperAuth, HelperCredential};
use crate::error::{RegistryError, RegistryResult};

/// Program name prefix for credential helpers.
pub const HELPER_PREFIX: &str = "docker-credential-";

/// Helpers print this (and exit non-zero) when they hold nothing for the host.
const NOT_FOUND_MESSAGE: &str = "credentials not found in native keychain";

/// Username marking `Secret` as an identity token.
const TOKEN_USERNAME: &str = "<token>";

/// Raw result of one helper run.
#[derive(Debug, Clone, Default)]
pub struct HelperOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a helper program's `get` operation for a host.
#[async_trait]
pub trait HelperRunner: Send + Sync {
    async fn get(&self, program: &str, host: &str) -> io::Result<HelperOutput>;
}

/// Spawns real helper processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl HelperRunner for ProcessRunner {
    async fn get(&self, program: &str, host: &str) -> io::Result<HelperOutput> {
        let mut child = tokio::process::Command::new(program)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(host.as_bytes()).await {
                Ok(()) => {}
                // Exit status and stdout decide; the helper need not read stdin.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!(program = %program, "helper closed stdin without reading it");
                }
                Err(e) => return Err(e),
            }
            // EOF tells the helper the request is complete.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        Ok(HelperOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Deserialize)]
struct HelperResponse {
    #[serde(rename = "Username", default)]
    username: String,
    #[serde(rename = "Secret", default)]
    secret: String,
}

/// Query helper `helper` for `host` and wrap the answer.
pub async fn invoke_helper(
    runner: &dyn HelperRunner,
    helper: &str,
    host: &str,
) -> RegistryResult<Authenticator> {
    let program = format!("{}{}", HELPER_PREFIX, helper);
    debug!(program = %program, host = %host, "invoking credential helper");

    let failed = |message: String| RegistryError::HelperInvocation {
        helper: helper.to_string(),
        message,
    };

    let output = runner
        .get(&program, host)
        .await
        .map_err(|e| failed(format!("failed to run {}: {}", program, e)))?;

    let stdout = output.stdout.trim();
    let credential = if !output.success {
        if stdout == NOT_FOUND_MESSAGE {
            debug!(helper = %helper, host = %host, "helper has no credentials for host");
            HelperCredential::NotFound
        } else {
            let detail = if output.stderr.trim().is_empty() {
                stdout
            } else {
                output.stderr.trim()
            };
            return Err(failed(format!("{} exited with failure: {}", program, detail)));
        }
    } else {
        let response: HelperResponse = serde_json::from_str(stdout)
            .map_err(|e| failed(format!("unparseable output from {}: {}", program, e)))?;

        if response.username == TOKEN_USERNAME {
            HelperCredential::IdentityToken(response.secret)
        } else {
            HelperCredential::Basic {
                username: response.username,
                secret: response.secret,
            }
        }
    };

    Ok(Authenticator::Helper(HelperAuth {
        helper: helper.to_string(),
        host: host.to_string(),
        credential,
    }))
}
