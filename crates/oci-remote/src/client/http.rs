//! HTTP layer: authorization header and status mapping.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::debug;

use crate::authn::Authenticator;
use crate::error::{RegistryError, RegistryResult};

/// HTTP backend for making requests (holds reqwest client and credentials).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) auth: Authenticator,
}

impl HttpBackend {
    /// GET `url`, requiring `200 OK`.
    ///
    /// Any other status becomes [`RegistryError::UnexpectedStatus`] carrying
    /// the registry's response body. Nothing is retried.
    pub(crate) async fn get(
        &self,
        url: &str,
        accept: Option<&str>,
    ) -> RegistryResult<reqwest::Response> {
        debug!(url = %url, "GET");

        let mut request = self.client.get(url);
        if let Some(value) = self.auth.authorization() {
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %url, error = %e, "failed to read error response body");
                String::new()
            }
        };
        debug!(url = %url, status = status.as_u16(), "unexpected status");
        Err(RegistryError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}
