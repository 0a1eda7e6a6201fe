//! Manifest shapes for the bundle configuration blob.
//!
//! A registry only stores a blob if some manifest references it, so the
//! canonical bundle is wrapped in an image manifest. Registries differ in
//! which manifest shapes they accept; [`ManifestShape::CATALOG`] lists the
//! alternatives from most modern to most compatible. Every shape references
//! the same blob digest and size.

use std::fmt;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::trace;

use crate::{Descriptor, Digest, Result, media_type};

const SCHEMA_VERSION: u32 = 2;

/// A way of wrapping the bundle configuration blob in a pushable manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestShape {
    /// OCI manifest carrying the CNAB artifact type and config media type.
    CnabArtifact,
    /// Plain OCI image manifest with a generic image config.
    OciImage,
    /// Docker schema 2 manifest posing as a single-layer container image.
    ///
    /// Config and the only layer both point at the bundle blob, so registries
    /// that validate manifests against container image schemas accept it.
    DockerV2,
}

impl ManifestShape {
    /// All shapes, in the order they should be tried.
    pub const CATALOG: [Self; 3] = [Self::CnabArtifact, Self::OciImage, Self::DockerV2];

    /// The most compatible shape.
    pub const LEGACY: Self = Self::DockerV2;

    /// Media type of the wrapper manifest.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::CnabArtifact | Self::OciImage => media_type::OCI_MANIFEST,
            Self::DockerV2 => media_type::DOCKER_MANIFEST,
        }
    }

    /// Media type the wrapped blob is declared with.
    #[must_use]
    pub const fn config_media_type(self) -> &'static str {
        match self {
            Self::CnabArtifact => media_type::CNAB_CONFIG,
            Self::OciImage => media_type::OCI_CONFIG,
            Self::DockerV2 => media_type::DOCKER_CONFIG,
        }
    }

    /// Render the wrapper manifest for a blob with the given digest and size.
    pub fn wrap(self, digest: &Digest, size: u64) -> Result<Vec<u8>> {
        let blob = BlobRef {
            media_type: self.config_media_type(),
            digest,
            size,
        };

        let bytes = match self {
            Self::CnabArtifact | Self::OciImage => serde_json::to_vec(&OciManifest {
                schema_version: SCHEMA_VERSION,
                media_type: self.media_type(),
                artifact_type: (self == Self::CnabArtifact).then_some(media_type::CNAB_MANIFEST),
                config: blob,
                layers: Vec::new(),
            })?,
            Self::DockerV2 => {
                let layer = DockerBlobRef::from(blob);
                let manifest = DockerManifest {
                    schema_version: SCHEMA_VERSION,
                    media_type: self.media_type(),
                    config: layer,
                    layers: [layer],
                };
                // Docker distribution indents schema 2 manifests with three spaces.
                let mut out = Vec::new();
                let mut serializer = serde_json::Serializer::with_formatter(
                    &mut out,
                    PrettyFormatter::with_indent(b"   "),
                );
                manifest.serialize(&mut serializer)?;
                out
            }
        };

        trace!(shape = %self, size = bytes.len(), "Rendered config manifest");
        Ok(bytes)
    }
}

impl fmt::Display for ManifestShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CnabArtifact => "cnab-artifact",
            Self::OciImage => "oci-image",
            Self::DockerV2 => "docker-v2",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlobRef<'a> {
    media_type: &'a str,
    digest: &'a Digest,
    size: u64,
}

// Docker distribution writes size before digest.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerBlobRef<'a> {
    media_type: &'a str,
    size: u64,
    digest: &'a Digest,
}

impl<'a> From<BlobRef<'a>> for DockerBlobRef<'a> {
    fn from(blob: BlobRef<'a>) -> Self {
        Self {
            media_type: blob.media_type,
            size: blob.size,
            digest: blob.digest,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OciManifest<'a> {
    schema_version: u32,
    media_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_type: Option<&'a str>,
    config: BlobRef<'a>,
    layers: Vec<BlobRef<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerManifest<'a> {
    schema_version: u32,
    media_type: &'a str,
    config: DockerBlobRef<'a>,
    layers: [DockerBlobRef<'a>; 1],
}

/// The bundle blob wrapped in one particular manifest shape.
#[derive(Debug, Clone)]
pub struct PreparedConfig {
    shape: ManifestShape,
    blob: Descriptor,
    manifest: Vec<u8>,
    manifest_descriptor: Descriptor,
}

impl PreparedConfig {
    /// Wrap `blob` using `shape`.
    ///
    /// The manifest descriptor is computed over the manifest's own bytes.
    pub fn new(shape: ManifestShape, blob: &[u8]) -> Result<Self> {
        let blob = Descriptor::for_content(shape.config_media_type(), blob);
        let manifest = shape.wrap(&blob.digest, blob.size)?;
        let manifest_descriptor = Descriptor::for_content(shape.media_type(), &manifest);
        Ok(Self {
            shape,
            blob,
            manifest,
            manifest_descriptor,
        })
    }

    /// The shape used.
    #[must_use]
    pub fn shape(&self) -> ManifestShape {
        self.shape
    }

    /// Descriptor of the bundle blob, typed for this shape.
    #[must_use]
    pub fn blob_descriptor(&self) -> &Descriptor {
        &self.blob
    }

    /// The rendered manifest.
    #[must_use]
    pub fn manifest(&self) -> &[u8] {
        &self.manifest
    }

    /// Descriptor of the rendered manifest.
    #[must_use]
    pub fn manifest_descriptor(&self) -> &Descriptor {
        &self.manifest_descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const BLOB: &[u8] = br#"{"name":"my-app","schemaVersion":"v1.0.0","version":"0.1.0"}"#;

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    // ==========================================================================
    // Catalog
    // ==========================================================================

    #[test]
    fn test_catalog_order() {
        assert_eq!(
            ManifestShape::CATALOG,
            [
                ManifestShape::CnabArtifact,
                ManifestShape::OciImage,
                ManifestShape::DockerV2
            ]
        );
        assert_eq!(ManifestShape::CATALOG.last(), Some(&ManifestShape::LEGACY));
    }

    #[test]
    fn test_media_types() {
        assert_eq!(ManifestShape::CnabArtifact.media_type(), media_type::OCI_MANIFEST);
        assert_eq!(ManifestShape::OciImage.media_type(), media_type::OCI_MANIFEST);
        assert_eq!(ManifestShape::DockerV2.media_type(), media_type::DOCKER_MANIFEST);
        assert_eq!(
            ManifestShape::CnabArtifact.config_media_type(),
            "application/vnd.cnab.config.v1+json"
        );
        assert_eq!(
            ManifestShape::DockerV2.config_media_type(),
            "application/vnd.docker.container.image.v1+json"
        );
    }

    // ==========================================================================
    // Rendering
    // ==========================================================================

    #[test]
    fn test_cnab_artifact_shape() {
        let digest = Digest::sha256(BLOB);
        let doc = parse(&ManifestShape::CnabArtifact.wrap(&digest, 62).unwrap());
        assert_eq!(doc["schemaVersion"], 2);
        assert_eq!(doc["mediaType"], media_type::OCI_MANIFEST);
        assert_eq!(doc["artifactType"], media_type::CNAB_MANIFEST);
        assert_eq!(doc["config"]["mediaType"], media_type::CNAB_CONFIG);
        assert_eq!(doc["config"]["digest"], digest.to_string());
        assert_eq!(doc["config"]["size"], 62);
        assert_eq!(doc["layers"], serde_json::json!([]));
    }

    #[test]
    fn test_oci_image_shape_has_no_artifact_type() {
        let digest = Digest::sha256(BLOB);
        let doc = parse(&ManifestShape::OciImage.wrap(&digest, 62).unwrap());
        assert!(doc.get("artifactType").is_none());
        assert_eq!(doc["config"]["mediaType"], media_type::OCI_CONFIG);
    }

    #[test]
    fn test_docker_shape_exact_bytes() {
        let digest: Digest =
            "sha256:dbe3480b9cb300f389e8d02e4a682f9107772468feb6845f912dc8deed6d76fd"
                .parse()
                .unwrap();
        let bytes = ManifestShape::DockerV2.wrap(&digest, 1596).unwrap();
        let expected = r#"{
   "schemaVersion": 2,
   "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
   "config": {
      "mediaType": "application/vnd.docker.container.image.v1+json",
      "size": 1596,
      "digest": "sha256:dbe3480b9cb300f389e8d02e4a682f9107772468feb6845f912dc8deed6d76fd"
   },
   "layers": [
      {
         "mediaType": "application/vnd.docker.container.image.v1+json",
         "size": 1596,
         "digest": "sha256:dbe3480b9cb300f389e8d02e4a682f9107772468feb6845f912dc8deed6d76fd"
      }
   ]
}"#;
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn test_docker_config_and_layer_are_identical() {
        let digest = Digest::sha256(BLOB);
        let doc = parse(&ManifestShape::DockerV2.wrap(&digest, 62).unwrap());
        let layers = doc["layers"].as_array().unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0], doc["config"]);
    }

    #[test]
    fn test_wrap_is_pure() {
        let digest = Digest::sha256(BLOB);
        for shape in ManifestShape::CATALOG {
            assert_eq!(shape.wrap(&digest, 62).unwrap(), shape.wrap(&digest, 62).unwrap());
        }
    }

    // ==========================================================================
    // PreparedConfig
    // ==========================================================================

    #[test]
    fn test_prepared_config_descriptors() {
        for shape in ManifestShape::CATALOG {
            let prepared = PreparedConfig::new(shape, BLOB).unwrap();
            assert_eq!(prepared.shape(), shape);

            let blob = prepared.blob_descriptor();
            assert_eq!(blob.media_type, shape.config_media_type());
            assert_eq!(blob.digest, Digest::sha256(BLOB));
            assert_eq!(blob.size, BLOB.len() as u64);

            let manifest = prepared.manifest_descriptor();
            assert_eq!(manifest.media_type, shape.media_type());
            assert_eq!(manifest.digest, Digest::sha256(prepared.manifest()));
            assert_eq!(manifest.size, prepared.manifest().len() as u64);
            assert_ne!(manifest.digest, blob.digest);
        }
    }

    #[test]
    fn test_shapes_produce_distinct_manifests() {
        let digests: std::collections::HashSet<_> = ManifestShape::CATALOG
            .iter()
            .map(|shape| {
                PreparedConfig::new(*shape, BLOB)
                    .unwrap()
                    .manifest_descriptor()
                    .digest
                    .clone()
            })
            .collect();
        assert_eq!(digests.len(), ManifestShape::CATALOG.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(ManifestShape::CnabArtifact.to_string(), "cnab-artifact");
        assert_eq!(ManifestShape::OciImage.to_string(), "oci-image");
        assert_eq!(ManifestShape::DockerV2.to_string(), "docker-v2");
    }
}
