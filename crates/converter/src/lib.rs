//! Conversion of CNAB bundles into an OCI manifest graph.
//!
//! This crate provides the pure half of bundle publishing:
//! - [`Digest`] and [`Descriptor`], computed from the exact bytes pushed
//! - [`ManifestShape`], the catalog of manifests the bundle blob can be
//!   wrapped in, and [`PreparedConfig`] holding one wrapped rendition
//! - [`IndexBuilder`] and [`ManifestIndex`], the top-level document that
//!   ties config, invocation images and components together
//!
//! Nothing here performs I/O; pushing is done by `cnab-oci-remotes`.

#![warn(missing_docs)]

pub mod annotations;
mod descriptor;
mod digest;
mod error;
mod index;
pub mod media_type;
mod shape;

pub use annotations::{ManifestType, bundle_annotations};
pub use descriptor::Descriptor;
pub use digest::{Digest, Digester, SHA256};
pub use error::{Error, Result};
pub use index::{IndexBuilder, ManifestIndex};
pub use shape::{ManifestShape, PreparedConfig};
