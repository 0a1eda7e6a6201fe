//! [`Resolver`] backed by an OCI distribution registry.
//!
//! Uses `oci-distribution` for registry operations.

use async_trait::async_trait;
use cnab_oci_converter::{Descriptor, media_type};
use http::HeaderValue;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference, RegistryOperation};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{Pusher, RemoteError, Resolver};

/// Manifest media types accepted when resolving an image.
const ACCEPTED_MANIFESTS: [&str; 4] = [
    media_type::OCI_MANIFEST,
    media_type::OCI_INDEX,
    media_type::DOCKER_MANIFEST,
    media_type::DOCKER_MANIFEST_LIST,
];

/// Registry connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    /// Talk plain HTTP instead of HTTPS.
    pub insecure: bool,
    /// Username for basic auth.
    pub username: Option<String>,
    /// Password or token for basic auth.
    pub password: Option<String>,
}

impl RegistryConfig {
    /// Read settings from `CNAB_OCI_INSECURE`, `REGISTRY_USERNAME` and
    /// `REGISTRY_PASSWORD`.
    #[must_use]
    pub fn from_env() -> Self {
        let insecure = std::env::var("CNAB_OCI_INSECURE")
            .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        Self {
            insecure,
            username: std::env::var("REGISTRY_USERNAME").ok(),
            password: std::env::var("REGISTRY_PASSWORD").ok(),
        }
    }

    fn auth(&self) -> RegistryAuth {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                RegistryAuth::Basic(username.clone(), password.clone())
            }
            _ => RegistryAuth::Anonymous,
        }
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            protocol: if self.insecure {
                ClientProtocol::Http
            } else {
                ClientProtocol::Https
            },
            ..Default::default()
        }
    }
}

/// Resolves and pushes content through an OCI registry.
pub struct RegistryResolver {
    client: Client,
    auth: RegistryAuth,
}

impl Default for RegistryResolver {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl RegistryResolver {
    /// Create a resolver with the given settings.
    #[must_use]
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            client: Client::new(config.client_config()),
            auth: config.auth(),
        }
    }
}

#[async_trait]
impl Resolver for RegistryResolver {
    async fn resolve(&self, reference: &str) -> Result<Descriptor, RemoteError> {
        let parsed = parse_reference(reference)?;
        debug!(%reference, "Resolving manifest");

        let (manifest, digest) = self
            .client
            .pull_manifest_raw(&parsed, &self.auth, &ACCEPTED_MANIFESTS)
            .await
            .map_err(|e| RemoteError::transport(reference, e.to_string()))?;

        let descriptor = Descriptor::for_content(manifest_media_type(&manifest), &manifest);
        if descriptor.digest.to_string() != digest {
            return Err(RemoteError::transport(
                reference,
                format!(
                    "registry reported digest {digest} but manifest hashes to {}",
                    descriptor.digest
                ),
            ));
        }

        trace!(%reference, size = descriptor.size, media_type = %descriptor.media_type, "Fetched manifest");
        Ok(descriptor)
    }

    async fn pusher(&self, reference: &str) -> Result<Box<dyn Pusher>, RemoteError> {
        let parsed = parse_reference(reference)?;
        Ok(Box::new(RegistryPusher {
            client: self.client.clone(),
            auth: self.auth.clone(),
            by_tag: names_version(reference),
            reference: parsed,
        }))
    }
}

struct RegistryPusher {
    client: Client,
    auth: RegistryAuth,
    reference: Reference,
    by_tag: bool,
}

#[async_trait]
impl Pusher for RegistryPusher {
    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<Descriptor, RemoteError> {
        let target = self.reference.whole();
        let digest = descriptor.digest.to_string();

        self.client
            .auth(&self.reference, &self.auth, RegistryOperation::Push)
            .await
            .map_err(|e| RemoteError::rejected(&target, e.to_string()))?;

        if media_type::is_manifest(&descriptor.media_type) {
            let manifest_ref = if self.by_tag {
                self.reference.clone()
            } else {
                Reference::with_digest(
                    self.reference.registry().to_string(),
                    self.reference.repository().to_string(),
                    digest.clone(),
                )
            };
            let content_type = HeaderValue::from_str(&descriptor.media_type)
                .map_err(|e| RemoteError::rejected(&target, e.to_string()))?;

            debug!(reference = %target, %digest, media_type = %descriptor.media_type, "Pushing manifest");
            self.client
                .push_manifest_raw(&manifest_ref, content.to_vec(), content_type)
                .await
                .map_err(|e| RemoteError::rejected(&target, e.to_string()))?;
        } else {
            debug!(reference = %target, %digest, size = content.len(), "Pushing blob");
            self.client
                .push_blob(&self.reference, content, &digest)
                .await
                .map_err(|e| RemoteError::rejected(&target, e.to_string()))?;
        }

        Ok(Descriptor::for_content(descriptor.media_type.clone(), content))
    }
}

/// Parse an image reference string.
fn parse_reference(image: &str) -> Result<Reference, RemoteError> {
    image.parse().map_err(|e: oci_distribution::ParseError| {
        RemoteError::invalid_reference(image, e.to_string())
    })
}

/// Whether the last path segment carries a tag or digest.
fn names_version(reference: &str) -> bool {
    let name = reference.rsplit('/').next().unwrap_or(reference);
    name.contains(':') || name.contains('@')
}

/// Media type declared by a manifest document, falling back on its
/// structure when the field is absent.
fn manifest_media_type(manifest: &[u8]) -> String {
    let Ok(document) = serde_json::from_slice::<serde_json::Value>(manifest) else {
        return media_type::OCI_MANIFEST.to_string();
    };

    if let Some(declared) = document.get("mediaType").and_then(serde_json::Value::as_str) {
        return declared.to_string();
    }

    if document.get("manifests").is_some() {
        media_type::OCI_INDEX.to_string()
    } else {
        media_type::OCI_MANIFEST.to_string()
    }
}
