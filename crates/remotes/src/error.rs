//! Error types for bundle publishing.
//!
//! [`RemoteError`] is what resolver and pusher adapters report. [`Error`] is
//! what [`push`](crate::push) reports: every variant names the stage it
//! happened in and, where relevant, the reference and manifest shape.

use std::fmt;

use cnab_oci_converter::ManifestShape;
use thiserror::Error;

/// Result type for bundle publishing.
pub type Result<T> = std::result::Result<T, Error>;

/// Stages of a bundle push, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Rewriting image references through the relocation map.
    Relocating,
    /// Encoding the bundle as canonical JSON.
    Serializing,
    /// Pushing the bundle blob and its config manifest.
    PushingConfig,
    /// Resolving invocation and component image descriptors.
    ResolvingImages,
    /// Building the bundle index.
    AssemblingIndex,
    /// Pushing the bundle index under the tagged reference.
    PushingIndex,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Relocating => "relocating images",
            Self::Serializing => "serializing bundle",
            Self::PushingConfig => "pushing config",
            Self::ResolvingImages => "resolving images",
            Self::AssemblingIndex => "assembling index",
            Self::PushingIndex => "pushing index",
        })
    }
}

/// A piece of content the orchestrator pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The canonical bundle blob, typed for a manifest shape.
    ConfigBlob(ManifestShape),
    /// The manifest wrapping the bundle blob.
    ConfigManifest(ManifestShape),
    /// The OCI image index.
    Index,
    /// The Docker manifest list rendition of the index.
    ManifestList,
}

impl Artifact {
    /// The stage that pushes this artifact.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::ConfigBlob(_) | Self::ConfigManifest(_) => Stage::PushingConfig,
            Self::Index | Self::ManifestList => Stage::PushingIndex,
        }
    }

    /// The manifest shape, for config artifacts.
    #[must_use]
    pub const fn shape(self) -> Option<ManifestShape> {
        match self {
            Self::ConfigBlob(shape) | Self::ConfigManifest(shape) => Some(shape),
            Self::Index | Self::ManifestList => None,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigBlob(shape) => write!(f, "config blob ({shape})"),
            Self::ConfigManifest(shape) => write!(f, "config manifest ({shape})"),
            Self::Index => f.write_str("OCI index"),
            Self::ManifestList => f.write_str("Docker manifest list"),
        }
    }
}

/// Errors reported by [`Resolver`](crate::Resolver) and
/// [`Pusher`](crate::Pusher) implementations.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The reference could not be parsed.
    #[error("Invalid image reference '{reference}': {message}")]
    InvalidReference {
        /// The reference as given.
        reference: String,
        /// Parser message.
        message: String,
    },

    /// Nothing is published at the reference.
    #[error("Content not found at '{0}'")]
    NotFound(String),

    /// The registry refused the content.
    #[error("Registry rejected content for '{reference}': {message}")]
    Rejected {
        /// Target reference.
        reference: String,
        /// Registry message.
        message: String,
    },

    /// The request did not complete.
    #[error("Registry request for '{reference}' failed: {message}")]
    Transport {
        /// Target reference.
        reference: String,
        /// Transport message.
        message: String,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Create an invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a rejection error.
    #[must_use]
    pub fn rejected(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while pushing a bundle.
#[derive(Error, Debug)]
pub enum Error {
    /// The bundle could not be encoded canonically.
    #[error("Failed to serialize bundle: {0}")]
    Serialization(#[from] cnab_oci_bundle::Error),

    /// A manifest or index document could not be built.
    #[error("Failed to build manifest while {stage}: {source}")]
    Conversion {
        /// Stage the failure happened in.
        stage: Stage,
        /// Underlying conversion error.
        #[source]
        source: cnab_oci_converter::Error,
    },

    /// The target reference is unusable.
    #[error("Invalid target reference '{reference}': {message}")]
    InvalidReference {
        /// The reference as given.
        reference: String,
        /// What is wrong with it.
        message: String,
    },

    /// The bundle cannot be published as given.
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    /// An invocation or component image could not be resolved.
    #[error("Failed to resolve image '{reference}': {source}")]
    Resolution {
        /// The (relocated) image reference.
        reference: String,
        /// Adapter error.
        #[source]
        source: RemoteError,
    },

    /// Content does not have the digest it was expected to have.
    #[error("Digest mismatch for '{reference}' while {stage}: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Stage the mismatch was detected in.
        stage: Stage,
        /// Reference the content lives at.
        reference: String,
        /// The digest declared or computed locally.
        expected: String,
        /// The digest reported by the registry.
        actual: String,
    },

    /// The registry refused a push.
    #[error("Failed to push {artifact} to '{reference}': {source}")]
    PushRejected {
        /// What was being pushed.
        artifact: Artifact,
        /// Target reference.
        reference: String,
        /// Adapter error.
        #[source]
        source: RemoteError,
    },

    /// The caller cancelled the push.
    #[error("Push cancelled while {stage}")]
    Cancelled {
        /// Stage that was in flight.
        stage: Stage,
    },
}

impl Error {
    /// Create a conversion error.
    #[must_use]
    pub fn conversion(stage: Stage, source: cnab_oci_converter::Error) -> Self {
        Self::Conversion { stage, source }
    }

    /// Create an invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a push rejection error.
    #[must_use]
    pub fn push_rejected(artifact: Artifact, reference: impl Into<String>, source: RemoteError) -> Self {
        Self::PushRejected {
            artifact,
            reference: reference.into(),
            source,
        }
    }

    /// Create a digest mismatch error.
    #[must_use]
    pub fn digest_mismatch(
        stage: Stage,
        reference: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::DigestMismatch {
            stage,
            reference: reference.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether the caller cancelled the push.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The stage the error happened in, when it happened during a push.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Serialization(_) => Some(Stage::Serializing),
            Self::InvalidBundle(_) => Some(Stage::Relocating),
            Self::Resolution { .. } => Some(Stage::ResolvingImages),
            Self::Conversion { stage, .. }
            | Self::DigestMismatch { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::PushRejected { artifact, .. } => Some(artifact.stage()),
            Self::InvalidReference { .. } => None,
        }
    }
}
