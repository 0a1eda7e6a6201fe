//! Shared fixtures and registry doubles for push tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cnab_oci_bundle::{Bundle, Image, InvocationImage, Maintainer, RelocationMap};
use cnab_oci_converter::{Descriptor, Digest, media_type};
use cnab_oci_remotes::{Pusher, RemoteError, Resolver, TargetReference};

pub const TARGET: &str = "my.registry/namespace/my-app:my-tag";
pub const REPOSITORY: &str = "my.registry/namespace/my-app";

pub const INVOCATION: &str = "my.registry/namespace/my-app-invoc";
pub const IMAGE_1: &str = "my.registry/namespace/image-1";
pub const ANOTHER_IMAGE: &str = "my.registry/namespace/another-image";

pub const RELOCATED_INVOCATION: &str = "my.registry/namespace/my-app@sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0341";
pub const RELOCATED_IMAGE_1: &str = "my.registry/namespace/my-app@sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0342";
pub const RELOCATED_ANOTHER_IMAGE: &str = "my.registry/namespace/my-app@sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0343";

/// Route test logs through the test writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("cnab_oci_remotes=debug")
        .try_init();
}

pub fn target() -> TargetReference {
    TargetReference::parse(TARGET).unwrap()
}

/// The `my-app` bundle: one invocation image and two components.
pub fn make_bundle() -> Bundle {
    let mut bundle = Bundle::new("v1.0.0", "my-app", "0.1.0");
    bundle.description = Some("description".to_string());
    bundle.keywords = vec!["keyword1".to_string(), "keyword2".to_string()];
    bundle.maintainers.push(
        Maintainer::new("docker")
            .with_email("docker@docker.com")
            .with_url("docker.com"),
    );
    bundle
        .invocation_images
        .push(InvocationImage::new("docker", INVOCATION));
    bundle
        .images
        .insert("image-1".to_string(), Image::new("oci", IMAGE_1));
    bundle
        .images
        .insert("another-image".to_string(), Image::new("oci", ANOTHER_IMAGE));
    bundle
}

pub fn make_relocation_map() -> RelocationMap {
    [
        (INVOCATION, RELOCATED_INVOCATION),
        (IMAGE_1, RELOCATED_IMAGE_1),
        (ANOTHER_IMAGE, RELOCATED_ANOTHER_IMAGE),
    ]
    .into_iter()
    .collect()
}

pub fn descriptor(media_type: &str, digest: &str, size: u64) -> Descriptor {
    Descriptor::new(media_type, digest.parse::<Digest>().unwrap(), size)
}

pub fn invocation_descriptor() -> Descriptor {
    descriptor(
        media_type::DOCKER_MANIFEST,
        "sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0341",
        506,
    )
}

pub fn image_1_descriptor() -> Descriptor {
    descriptor(
        media_type::OCI_MANIFEST,
        "sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0342",
        507,
    )
}

pub fn another_image_descriptor() -> Descriptor {
    descriptor(
        media_type::OCI_MANIFEST,
        "sha256:d59a1aa7866258751a261bae525a1842c7ff0662d4f34a355d5f36826abc0343",
        507,
    )
}

/// A resolver that knows the relocated `my-app` images.
pub fn make_resolver() -> RecordingResolver {
    RecordingResolver::new()
        .with_image(RELOCATED_INVOCATION, invocation_descriptor())
        .with_image(RELOCATED_IMAGE_1, image_1_descriptor())
        .with_image(RELOCATED_ANOTHER_IMAGE, another_image_descriptor())
}

// =============================================================================
// Recording registry double
// =============================================================================

/// What a scripted push does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Store the content.
    Accept,
    /// Refuse the content with a message.
    Reject(&'static str),
    /// Report that the content was stored under a different digest.
    Corrupt,
    /// Report cancellation.
    Cancel,
    /// Never complete.
    Hang,
}

/// One push attempt, recorded whether or not it succeeded.
#[derive(Debug, Clone)]
pub struct PushRecord {
    pub reference: String,
    pub descriptor: Descriptor,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct Recorded {
    resolved: Vec<String>,
    pushers: Vec<String>,
    pushes: Vec<PushRecord>,
    outcomes: VecDeque<Outcome>,
}

/// Resolver double that records every call and plays scripted push
/// outcomes in order. Pushes beyond the script are accepted.
#[derive(Debug, Clone, Default)]
pub struct RecordingResolver {
    images: BTreeMap<String, Descriptor>,
    state: Arc<Mutex<Recorded>>,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, reference: &str, descriptor: Descriptor) -> Self {
        self.images.insert(reference.to_string(), descriptor);
        self
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        self.state.lock().unwrap().outcomes.extend(outcomes);
        self
    }

    pub fn resolved(&self) -> Vec<String> {
        self.state.lock().unwrap().resolved.clone()
    }

    pub fn pusher_references(&self) -> Vec<String> {
        self.state.lock().unwrap().pushers.clone()
    }

    pub fn pushes(&self) -> Vec<PushRecord> {
        self.state.lock().unwrap().pushes.clone()
    }

    /// Push attempts with the given media type.
    pub fn pushes_of(&self, media_type: &str) -> Vec<PushRecord> {
        self.pushes()
            .into_iter()
            .filter(|push| push.descriptor.media_type == media_type)
            .collect()
    }
}

#[async_trait]
impl Resolver for RecordingResolver {
    async fn resolve(&self, reference: &str) -> Result<Descriptor, RemoteError> {
        self.state
            .lock()
            .unwrap()
            .resolved
            .push(reference.to_string());
        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(reference.to_string()))
    }

    async fn pusher(&self, reference: &str) -> Result<Box<dyn Pusher>, RemoteError> {
        self.state
            .lock()
            .unwrap()
            .pushers
            .push(reference.to_string());
        Ok(Box::new(RecordingPusher {
            reference: reference.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingPusher {
    reference: String,
    state: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl Pusher for RecordingPusher {
    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<Descriptor, RemoteError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.pushes.push(PushRecord {
                reference: self.reference.clone(),
                descriptor: descriptor.clone(),
                content: content.to_vec(),
            });
            state.outcomes.pop_front().unwrap_or(Outcome::Accept)
        };

        match outcome {
            Outcome::Accept => Ok(Descriptor::for_content(descriptor.media_type.clone(), content)),
            Outcome::Reject(message) => Err(RemoteError::rejected(&self.reference, message)),
            Outcome::Corrupt => Ok(Descriptor::for_content(
                descriptor.media_type.clone(),
                b"something else entirely",
            )),
            Outcome::Cancel => Err(RemoteError::Cancelled),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
