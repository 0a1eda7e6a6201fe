//! The bundle manifest index.
//!
//! The index ties the graph together: the config manifest first, then one
//! entry per invocation image in bundle order, then one entry per component
//! sorted by name. Every entry is tagged with its role so a puller can find
//! the pieces again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotations::{COMPONENT_NAME, ManifestType};
use crate::{Descriptor, Result, media_type};

/// An OCI image index describing a whole bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestIndex {
    /// Always 2.
    pub schema_version: u32,
    /// Only set for the Docker manifest list rendition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Config, invocation and component descriptors, in that order.
    pub manifests: Vec<Descriptor>,
    /// Bundle metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ManifestIndex {
    /// Media type to push this document with.
    #[must_use]
    pub fn push_media_type(&self) -> &str {
        self.media_type.as_deref().unwrap_or(media_type::OCI_INDEX)
    }

    /// Encode the index as compact JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Encode the index and describe the resulting bytes.
    pub fn encode(&self) -> Result<(Vec<u8>, Descriptor)> {
        let bytes = self.to_vec()?;
        let descriptor = Descriptor::for_content(self.push_media_type(), &bytes);
        Ok((bytes, descriptor))
    }

    /// The same index presented as a Docker manifest list.
    #[must_use]
    pub fn to_docker_manifest_list(&self) -> Self {
        Self {
            media_type: Some(media_type::DOCKER_MANIFEST_LIST.to_string()),
            ..self.clone()
        }
    }

    /// Parse an index document.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// The config manifest entry.
    #[must_use]
    pub fn config(&self) -> Option<&Descriptor> {
        self.manifests
            .iter()
            .find(|d| ManifestType::of(d) == Some(ManifestType::Config))
    }

    /// Invocation image entries, in bundle order.
    pub fn invocations(&self) -> impl Iterator<Item = &Descriptor> {
        self.manifests
            .iter()
            .filter(|d| ManifestType::of(d) == Some(ManifestType::Invocation))
    }

    /// The entry of a named component.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Descriptor> {
        self.manifests.iter().find(|d| {
            ManifestType::of(d) == Some(ManifestType::Component)
                && d.annotation(COMPONENT_NAME) == Some(name)
        })
    }
}

/// Assembles a [`ManifestIndex`] with the entry order and role annotations
/// fixed regardless of the order pieces are added in.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    config: Descriptor,
    invocations: Vec<Descriptor>,
    components: BTreeMap<String, Descriptor>,
    annotations: BTreeMap<String, String>,
}

impl IndexBuilder {
    /// Start an index around the config manifest descriptor.
    #[must_use]
    pub fn new(config: Descriptor) -> Self {
        Self {
            config,
            invocations: Vec::new(),
            components: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Append an invocation image.
    #[must_use]
    pub fn invocation(mut self, descriptor: Descriptor) -> Self {
        self.invocations.push(descriptor);
        self
    }

    /// Add a component image. A second descriptor for the same name replaces
    /// the first.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.components.insert(name.into(), descriptor);
        self
    }

    /// Set the index-level annotations.
    #[must_use]
    pub fn annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Produce the index.
    #[must_use]
    pub fn build(self) -> ManifestIndex {
        let mut manifests =
            Vec::with_capacity(1 + self.invocations.len() + self.components.len());

        manifests.push(entry(ManifestType::Config, self.config));
        manifests.extend(
            self.invocations
                .into_iter()
                .map(|d| entry(ManifestType::Invocation, d)),
        );
        manifests.extend(self.components.into_iter().map(|(name, d)| {
            entry(ManifestType::Component, d).with_annotation(COMPONENT_NAME, name)
        }));

        debug!(entries = manifests.len(), "Assembled bundle index");

        ManifestIndex {
            schema_version: 2,
            media_type: None,
            manifests,
            annotations: self.annotations,
        }
    }
}

/// An index entry for `descriptor`: its content plus the role annotation
/// and nothing else.
fn entry(role: ManifestType, descriptor: Descriptor) -> Descriptor {
    role.annotate(Descriptor::new(
        descriptor.media_type,
        descriptor.digest,
        descriptor.size,
    ))
}
