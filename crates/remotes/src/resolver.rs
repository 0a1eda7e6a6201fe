//! Registry capabilities the orchestrator is parameterized over.

use async_trait::async_trait;
use cnab_oci_converter::Descriptor;

use crate::RemoteError;

/// Looks up published content and hands out pushers.
///
/// Implementations wrap a registry client; tests substitute recording
/// doubles. Neither method retries.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Describe the content already published at `reference` without
    /// downloading image layers.
    async fn resolve(&self, reference: &str) -> Result<Descriptor, RemoteError>;

    /// Create a pusher targeting `reference`, which is either a bare
    /// repository or a repository with a tag.
    async fn pusher(&self, reference: &str) -> Result<Box<dyn Pusher>, RemoteError>;
}

/// Uploads content to the reference it was created for.
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Upload `content`, described by `descriptor`, and return the
    /// descriptor the registry now serves it under.
    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<Descriptor, RemoteError>;
}
