//! Remote image access.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.
//!
//! The manifest and config bytes are fetched lazily and cached for the life of
//! the [`RemoteImage`]. Each cache slot has its own lock, held across the whole
//! fetch, verify and store sequence, so a slot is fetched at most once however
//! many tasks ask for it concurrently. Blobs are never cached.

use std::io;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use tokio::sync::Mutex;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::authn::Authenticator;
use crate::digest::Digest;
use crate::error::{RegistryError, RegistryResult};
use crate::reference::Reference;
use crate::types::{media_type, ClientConfig, ConfigFile, Descriptor, Manifest};
use crate::verify::VerifyingReader;

mod helpers;
mod http;

use helpers::{content_digest, endpoint_url, verify_manifest};
use http::HttpBackend;

/// Raw blob body as an async byte stream.
pub type BlobBody = StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>;

/// Blob body that verifies its digest when closed.
pub type BlobReader = VerifyingReader<BlobBody>;

/// One image in a remote registry.
#[derive(Debug)]
pub struct RemoteImage {
    reference: Reference,
    http: HttpBackend,
    manifest: Mutex<Option<Bytes>>,
    config: Mutex<Option<Bytes>>,
}

impl RemoteImage {
    /// Access `reference` through `client`, authorizing every request with `auth`.
    pub fn new(reference: Reference, auth: Authenticator, client: reqwest::Client) -> Self {
        Self {
            reference,
            http: HttpBackend { client, auth },
            manifest: Mutex::new(None),
            config: Mutex::new(None),
        }
    }

    /// Like [`RemoteImage::new`], building the HTTP client from `config`.
    pub fn with_config(
        reference: Reference,
        auth: Authenticator,
        config: &ClientConfig,
    ) -> RegistryResult<Self> {
        Ok(Self::new(reference, auth, config.build_client()?))
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Always Docker schema 2.
    ///
    /// Manifest lists and OCI indexes are not told apart.
    pub fn media_type(&self) -> &'static str {
        media_type::DOCKER_MANIFEST_SCHEMA2
    }

    /// Raw manifest bytes, verified against the reference's digest.
    pub async fn raw_manifest(&self) -> RegistryResult<Bytes> {
        let mut slot = self.manifest.lock().await;
        if let Some(raw) = slot.as_ref() {
            return Ok(raw.clone());
        }

        let identifier = self.reference.identifier().to_string();
        let url = endpoint_url(&self.reference, "manifests", &identifier);
        debug!(reference = %self.reference, "fetching manifest");

        let response = self.http.get(&url, Some(self.media_type())).await?;
        let advertised = content_digest(response.headers());
        let raw = response.bytes().await.map_err(|e| RegistryError::Transport {
            message: format!("failed to read manifest body: {}", e),
        })?;

        let digest = verify_manifest(&self.reference, &raw, advertised.as_deref())?;
        debug!(reference = %self.reference, digest = %digest, size = raw.len(), "manifest verified");

        *slot = Some(raw.clone());
        Ok(raw)
    }

    /// Raw config blob bytes, fetched via the manifest's config descriptor.
    pub async fn raw_config_file(&self) -> RegistryResult<Bytes> {
        let mut slot = self.config.lock().await;
        if let Some(raw) = slot.as_ref() {
            return Ok(raw.clone());
        }

        let manifest = self.manifest().await?;
        debug!(reference = %self.reference, digest = %manifest.config.digest, "fetching config");
        let raw = self.blob(&manifest.config.digest).await?.into_bytes().await?;

        *slot = Some(raw.clone());
        Ok(raw)
    }

    /// Stream a blob; its digest is checked when the reader is closed.
    ///
    /// Callers must call [`VerifyingReader::close`] (or use
    /// [`VerifyingReader::into_bytes`]) even when stopping early, otherwise
    /// the content is never verified.
    pub async fn blob(&self, digest: &Digest) -> RegistryResult<BlobReader> {
        let url = endpoint_url(&self.reference, "blobs", &digest.to_string());
        debug!(digest = %digest, "fetching blob");

        let response = self.http.get(&url, None).await?;
        let body: BoxStream<'static, io::Result<Bytes>> =
            response.bytes_stream().map_err(io::Error::other).boxed();

        Ok(VerifyingReader::new(StreamReader::new(body), digest.clone()))
    }

    /// Parsed manifest.
    pub async fn manifest(&self) -> RegistryResult<Manifest> {
        Manifest::from_slice(&self.raw_manifest().await?)
    }

    /// SHA-256 digest of the raw manifest.
    pub async fn digest(&self) -> RegistryResult<Digest> {
        Ok(Digest::sha256_of(&self.raw_manifest().await?))
    }

    /// Digest of the config blob.
    pub async fn config_name(&self) -> RegistryResult<Digest> {
        Ok(self.manifest().await?.config.digest)
    }

    /// Parsed image config.
    pub async fn config_file(&self) -> RegistryResult<ConfigFile> {
        ConfigFile::from_slice(&self.raw_config_file().await?)
    }

    /// Layer descriptors, in manifest order.
    pub async fn layers(&self) -> RegistryResult<Vec<Descriptor>> {
        Ok(self.manifest().await?.layers)
    }
}
