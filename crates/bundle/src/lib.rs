//! CNAB bundle model for OCI publishing.
//!
//! This crate provides:
//! - The [`Bundle`] document model (`bundle.json`)
//! - [`RelocationMap`] and [`relocate`] for pointing image references at
//!   their published copies
//! - [`to_canonical_json`], the deterministic encoding whose digest
//!   identifies the bundle in a registry
//!
//! # Example
//!
//! ```ignore
//! use cnab_oci_bundle::{Bundle, RelocationMap, relocate, to_canonical_json};
//!
//! let bundle = Bundle::from_path("bundle.json")?;
//! let map = RelocationMap::from_path("relocation-mapping.json")?;
//! let bytes = to_canonical_json(&relocate(&bundle, &map))?;
//! ```

#![warn(missing_docs)]

mod canonical;
mod error;
mod relocation;
mod types;

pub use canonical::{encode, to_canonical_json};
pub use error::{Error, Result};
pub use relocation::{RelocationMap, relocate};
pub use types::{BaseImage, Bundle, Image, InvocationImage, Maintainer};
