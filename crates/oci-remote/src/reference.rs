//! Image references.
//!
//! Parsing and validating reference strings is the caller's job; this module
//! only carries the already-split parts:
//! - registry host (`gcr.io`, `localhost:5000`)
//! - repository path (`library/ubuntu`)
//! - identifier: a tag or a pinned digest

use std::fmt;

use crate::digest::Digest;

/// A registry host, optionally with a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registry(String);

impl Registry {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    /// Host as written, e.g. `localhost:5000`.
    pub fn host(&self) -> &str {
        &self.0
    }

    /// URL scheme used to reach this registry.
    ///
    /// Loopback and `.local`/`.localhost` registries are plain `http`.
    pub fn scheme(&self) -> &'static str {
        if is_insecure_host(&self.0) {
            "http"
        } else {
            "https"
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_insecure_host(host: &str) -> bool {
    let name = strip_port(host);
    name == "localhost"
        || name == "::1"
        || name.starts_with("127.")
        || name.ends_with(".localhost")
        || name.ends_with(".local")
}

fn strip_port(host: &str) -> &str {
    // [::1]:5000 style
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Tag or digest part of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Tag(String),
    Digest(Digest),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.write_str(tag),
            Self::Digest(digest) => write!(f, "{}", digest),
        }
    }
}

/// An image reference: registry, repository and tag or digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    registry: Registry,
    repository: String,
    identifier: Identifier,
}

impl Reference {
    /// Reference by tag, e.g. `gcr.io/project/app:v1`.
    pub fn with_tag(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: Registry::new(registry),
            repository: repository.into(),
            identifier: Identifier::Tag(tag.into()),
        }
    }

    /// Reference pinned to a manifest digest, e.g. `gcr.io/project/app@sha256:...`.
    pub fn with_digest(
        registry: impl Into<String>,
        repository: impl Into<String>,
        digest: Digest,
    ) -> Self {
        Self {
            registry: Registry::new(registry),
            repository: repository.into(),
            identifier: Identifier::Digest(digest),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The pinned digest, if this is a digest reference.
    pub fn pinned_digest(&self) -> Option<&Digest> {
        match &self.identifier {
            Identifier::Digest(digest) => Some(digest),
            Identifier::Tag(_) => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.identifier {
            Identifier::Tag(_) => ':',
            Identifier::Digest(_) => '@',
        };
        write!(
            f,
            "{}/{}{}{}",
            self.registry, self.repository, separator, self.identifier
        )
    }
}
