//! Registry authenticators.
//!
//! An [`Authenticator`] turns a resolved credential into a single wire-ready
//! `Authorization` header value:
//! - anonymous: no header at all
//! - basic: `Basic base64(username:password)`, or a pre-encoded value as stored
//! - bearer / identity token: `Bearer <token>`
//!
//! Credentials obtained from a credential helper keep the helper name and host
//! they were resolved for, so callers can tell where they came from.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Authentication for one registry.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Authenticator {
    /// No credentials.
    #[default]
    Anonymous,

    /// Username and password.
    Basic { username: String, password: String },

    /// Already encoded `base64(username:password)`, sent as stored.
    EncodedBasic { auth: String },

    /// Identity or registry token.
    Bearer { token: String },

    /// Credentials returned by an external credential helper.
    Helper(HelperAuth),
}

/// Credentials produced by a credential helper, tagged with their origin.
#[derive(Clone, PartialEq, Eq)]
pub struct HelperAuth {
    /// Helper name as configured (`docker-credential-<helper>`).
    pub helper: String,

    /// Registry host the helper was queried for.
    pub host: String,

    pub credential: HelperCredential,
}

/// What a credential helper handed back.
#[derive(Clone, PartialEq, Eq)]
pub enum HelperCredential {
    Basic { username: String, secret: String },
    IdentityToken(String),
    /// The helper knows nothing about the host.
    NotFound,
}

impl Authenticator {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn encoded_basic(auth: impl Into<String>) -> Self {
        Self::EncodedBasic { auth: auth.into() }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// The `Authorization` header value, or `None` for anonymous access.
    pub fn authorization(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => Some(basic_value(username, password)),
            Self::EncodedBasic { auth } => Some(format!("Basic {}", auth)),
            Self::Bearer { token } => Some(bearer_value(token)),
            Self::Helper(helper) => match &helper.credential {
                HelperCredential::Basic { username, secret } => {
                    Some(basic_value(username, secret))
                }
                HelperCredential::IdentityToken(token) => Some(bearer_value(token)),
                HelperCredential::NotFound => None,
            },
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.authorization().is_none()
    }

    /// Helper origin, if these credentials came from a credential helper.
    pub fn helper(&self) -> Option<&HelperAuth> {
        match self {
            Self::Helper(helper) => Some(helper),
            _ => None,
        }
    }
}

fn basic_value(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

fn bearer_value(token: &str) -> String {
    format!("Bearer {}", token)
}

// Secrets never reach Debug output (and therefore never reach logs).
impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::EncodedBasic { .. } => f.debug_struct("EncodedBasic").finish_non_exhaustive(),
            Self::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
            Self::Helper(helper) => f.debug_tuple("Helper").field(helper).finish(),
        }
    }
}

impl fmt::Debug for HelperAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.credential {
            HelperCredential::Basic { .. } => "basic",
            HelperCredential::IdentityToken(_) => "identity-token",
            HelperCredential::NotFound => "not-found",
        };
        f.debug_struct("HelperAuth")
            .field("helper", &self.helper)
            .field("host", &self.host)
            .field("credential", &kind)
            .finish()
    }
}
