//! CNAB bundle document model.
//!
//! The model follows the CNAB `bundle.json` layout. Sections this crate does
//! not interpret (actions, parameters, definitions, ...) are carried as raw
//! JSON so a bundle survives a load/encode cycle without losing data.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A CNAB bundle descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// CNAB runtime version this bundle targets (e.g. `v1.0.0`).
    pub schema_version: String,
    /// Bundle name.
    pub name: String,
    /// Bundle version.
    pub version: String,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Search keywords, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Bundle maintainers, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    /// Images implementing the bundle actions, in declaration order.
    #[serde(default)]
    pub invocation_images: Vec<InvocationImage>,
    /// Component images keyed by component name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, Image>,
    /// Custom actions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, Value>,
    /// Credential declarations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<String, Value>,
    /// Parameter declarations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,
    /// Output declarations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Value>,
    /// JSON schema definitions referenced by parameters and outputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Value>,
    /// Extension data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Value>,
    /// SPDX license expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Extensions a runtime must understand to install the bundle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_extensions: Vec<String>,
}

impl Bundle {
    /// Create a bundle with the required identity fields set.
    #[must_use]
    pub fn new(
        schema_version: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: schema_version.into(),
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Parse a bundle from `bundle.json` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load a bundle from a `bundle.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_slice(&data)
    }
}

/// A bundle maintainer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    /// Maintainer name.
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Maintainer {
    /// Create a maintainer with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the contact email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the contact URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Fields shared by invocation and component images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseImage {
    /// Image kind, `oci` or `docker` in practice.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_type: String,
    /// Image reference.
    pub image: String,
    /// Manifest digest the author expects the image to have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_digest: Option<String>,
    /// Manifest size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Manifest media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl BaseImage {
    /// Create a base image from a type and a reference.
    #[must_use]
    pub fn new(image_type: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            image_type: image_type.into(),
            image: image.into(),
            ..Self::default()
        }
    }
}

/// An image implementing the bundle's install/upgrade/uninstall actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationImage {
    /// Image location and metadata.
    #[serde(flatten)]
    pub base: BaseImage,
}

impl InvocationImage {
    /// Create an invocation image.
    #[must_use]
    pub fn new(image_type: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            base: BaseImage::new(image_type, image),
        }
    }

    /// Set the expected manifest digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.base.content_digest = Some(digest.into());
        self
    }
}

/// A named component image deployed by the bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image location and metadata.
    #[serde(flatten)]
    pub base: BaseImage,
    /// What the component is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Image {
    /// Create a component image.
    #[must_use]
    pub fn new(image_type: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            base: BaseImage::new(image_type, image),
            description: None,
        }
    }

    /// Set the expected manifest digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.base.content_digest = Some(digest.into());
        self
    }
}
