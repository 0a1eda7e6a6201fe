//! Target references for bundle pushes.

use std::fmt;
use std::str::FromStr;

use oci_distribution::Reference;

use crate::{Error, Result};

/// Where a bundle is published: a repository plus the tag the index is
/// pushed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetReference {
    registry: String,
    repository: String,
    tag: String,
}

impl TargetReference {
    /// Create a reference from its parts.
    #[must_use]
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parse `registry/repository:tag`.
    ///
    /// Registry defaults follow `oci-distribution`. A tag is required and a
    /// digest is refused, since the index is pushed by tag and its digest is
    /// only known after encoding.
    pub fn parse(reference: &str) -> Result<Self> {
        let parsed: Reference = reference
            .parse()
            .map_err(|e: oci_distribution::ParseError| {
                Error::invalid_reference(reference, e.to_string())
            })?;

        let tag = parsed
            .tag()
            .ok_or_else(|| Error::invalid_reference(reference, "a tag is required"))?;
        if parsed.digest().is_some() {
            return Err(Error::invalid_reference(
                reference,
                "a digest is not allowed in a push target",
            ));
        }

        Ok(Self::new(parsed.registry(), parsed.repository(), tag))
    }

    /// Registry host.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Tag the index is pushed under.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The untagged repository, `registry/repository`.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// The tagged reference, `registry/repository:tag`.
    #[must_use]
    pub fn tagged(&self) -> String {
        format!("{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

impl FromStr for TargetReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}
