//! Error types for the registry client.

use serde::Deserialize;

/// Registry client errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Network or connection failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Response status outside the set the operation expects.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Content hash does not match the expected or advertised digest.
    #[error("digest mismatch for {subject}: expected {expected}, got {actual}")]
    DigestMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    /// Malformed or unsupported digest string.
    #[error("invalid digest {digest:?}: {reason}")]
    InvalidDigest { digest: String, reason: String },

    /// Manifest body could not be interpreted.
    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    /// Image config body could not be interpreted.
    #[error("invalid image config: {message}")]
    InvalidConfig { message: String },

    /// A named credential helper failed to run or returned unusable output.
    #[error("credential helper {helper:?} failed: {message}")]
    HelperInvocation { helper: String, message: String },

    /// Local configuration could not be located or read.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RegistryError {
    /// Whether a caller-imposed retry could reasonably succeed.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Structured diagnostics from a registry error body, if it carried any.
    ///
    /// Registries answer failures with `{"errors": [{"code", "message", "detail"}]}`.
    pub fn registry_errors(&self) -> Vec<RegistryDiagnostic> {
        match self {
            Self::UnexpectedStatus { body, .. } => serde_json::from_str::<ErrorEnvelope>(body)
                .map(|envelope| envelope.errors)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// One entry of a registry error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryDiagnostic {
    /// Error code, e.g. `MANIFEST_UNKNOWN`.
    pub code: String,

    #[serde(default)]
    pub message: String,

    /// Free-form detail, kept as raw JSON text.
    #[serde(default, deserialize_with = "detail_as_text")]
    pub detail: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<RegistryDiagnostic>,
}

fn detail_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
