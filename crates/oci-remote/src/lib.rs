//! Container registry client.
//!
//! This crate provides:
//!
//! - Keychain credential resolution from the local credential config
//!   (per-host helpers, default credential store, inline `auths`, anonymous)
//! - Credential helper invocation (`docker-credential-<name> get`)
//! - Remote image access: manifest, config and blob fetches over HTTP with
//!   per-instance caching of manifest and config bytes
//! - Digest verification of everything fetched
//!
//! # Quick Start
//!
//! ```no_run
//! use oci_remote::{ClientConfig, Digest, Keychain, Reference, RemoteImage};
//!
//! # async fn example() -> Result<(), oci_remote::RegistryError> {
//! let digest: Digest =
//!     "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".parse()?;
//! let reference = Reference::with_digest("gcr.io", "project/app", digest);
//!
//! let auth = Keychain::new().resolve(reference.registry().host()).await?;
//! let image = RemoteImage::with_config(reference, auth, &ClientConfig::from_env())?;
//!
//! let config = image.config_file().await?;
//! for layer in image.layers().await? {
//!     let bytes = image.blob(&layer.digest).await?.into_bytes().await?;
//!     println!("{} {} bytes ({})", layer.digest, bytes.len(), config.os);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `DOCKER_CONFIG` | Directory holding `config.json` (default: `~/.docker`) |
//! | `OCI_REMOTE_TIMEOUT` | Request timeout in seconds (default: 30) |

pub mod authn;
pub mod client;
pub mod digest;
pub mod error;
pub mod keychain;
pub mod reference;
pub mod types;
pub mod verify;

// Re-export main types
pub use authn::{Authenticator, HelperAuth, HelperCredential};
pub use client::{BlobBody, BlobReader, RemoteImage};
pub use digest::{Algorithm, Digest};
pub use error::{RegistryDiagnostic, RegistryError, RegistryResult};
pub use keychain::{
    config_dir, config_path, CredentialConfig, HelperOutput, HelperRunner, Keychain,
    ProcessRunner,
};
pub use reference::{Identifier, Reference, Registry};
pub use types::{media_type, ClientConfig, ConfigFile, Descriptor, Manifest};
pub use verify::VerifyingReader;
