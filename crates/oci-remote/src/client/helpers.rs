//! Pure helpers: endpoint URLs and manifest digest checks (no HTTP, no status logic).

use reqwest::header::HeaderMap;

use crate::digest::{Algorithm, Digest};
use crate::error::{RegistryError, RegistryResult};
use crate::reference::Reference;

/// Response header carrying the registry's view of the manifest digest.
pub(crate) const CONTENT_DIGEST_HEADER: &str = "docker-content-digest";

/// `{scheme}://{host}/v2/{repository}/{resource}/{identifier}`
pub(crate) fn endpoint_url(reference: &Reference, resource: &str, identifier: &str) -> String {
    let registry = reference.registry();
    format!(
        "{}://{}/v2/{}/{}/{}",
        registry.scheme(),
        registry.host(),
        reference.repository(),
        resource,
        identifier
    )
}

pub(crate) fn content_digest(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_DIGEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check a freshly fetched manifest body.
///
/// Digest references must match the pinned digest exactly. Tag references are
/// checked against `Docker-Content-Digest` when the registry sent one; with
/// no header there is nothing to compare against.
pub(crate) fn verify_manifest(
    reference: &Reference,
    raw: &[u8],
    advertised: Option<&str>,
) -> RegistryResult<Digest> {
    if let Some(pinned) = reference.pinned_digest() {
        let computed = Digest::compute(pinned.algorithm(), raw);
        if &computed != pinned {
            return Err(RegistryError::DigestMismatch {
                subject: format!("manifest {}", reference),
                expected: pinned.to_string(),
                actual: computed.to_string(),
            });
        }
        return Ok(computed);
    }

    let computed = Digest::compute(Algorithm::Sha256, raw);
    if let Some(advertised) = advertised {
        if advertised != computed.to_string() {
            return Err(RegistryError::DigestMismatch {
                subject: format!("manifest {} (Docker-Content-Digest)", reference),
                expected: advertised.to_string(),
                actual: computed.to_string(),
            });
        }
    }
    Ok(computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_endpoint_url() {
        let reference = Reference::with_tag("gcr.io", "project/app", "v1");
        assert_eq!(
            endpoint_url(&reference, "manifests", "v1"),
            "https://gcr.io/v2/project/app/manifests/v1"
        );

        let local = Reference::with_tag("localhost:5000", "app", "latest");
        assert_eq!(
            endpoint_url(&local, "blobs", "sha256:abc"),
            "http://localhost:5000/v2/app/blobs/sha256:abc"
        );
    }

    #[test]
    fn test_content_digest_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_digest(&headers), None);

        headers.insert(CONTENT_DIGEST_HEADER, HeaderValue::from_static(""));
        assert_eq!(content_digest(&headers), None);

        headers.insert(CONTENT_DIGEST_HEADER, HeaderValue::from_static("sha256:abc"));
        assert_eq!(content_digest(&headers).as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn test_verify_pinned() {
        let raw = b"{\"schemaVersion\":2}";
        let digest = Digest::sha256_of(raw);
        let reference = Reference::with_digest("gcr.io", "app", digest.clone());

        assert_eq!(verify_manifest(&reference, raw, None).unwrap(), digest);
        assert!(matches!(
            verify_manifest(&reference, b"tampered", None),
            Err(RegistryError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_pinned_ignores_header() {
        // The pin is authoritative; a stale header does not matter.
        let raw = b"manifest";
        let reference = Reference::with_digest("gcr.io", "app", Digest::sha256_of(raw));
        assert!(verify_manifest(&reference, raw, Some("sha256:bogus")).is_ok());
    }

    #[test]
    fn test_verify_tag_against_header() {
        let raw = b"manifest";
        let reference = Reference::with_tag("gcr.io", "app", "latest");
        let digest = Digest::sha256_of(raw).to_string();

        assert!(verify_manifest(&reference, raw, Some(&digest)).is_ok());
        assert!(verify_manifest(&reference, raw, None).is_ok());
        assert!(matches!(
            verify_manifest(&reference, raw, Some("sha256:0000")),
            Err(RegistryError::DigestMismatch { .. })
        ));
    }
}
