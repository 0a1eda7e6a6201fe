//! Image relocation.
//!
//! A relocation map records where each image referenced by a bundle was
//! actually published, so that manifests point at the copies rather than the
//! locations the bundle was authored against.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Bundle, Error, Result};

/// Mapping from original image reference to relocated image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelocationMap(BTreeMap<String, String>);

impl RelocationMap {
    /// Create an empty relocation map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `relocation-mapping.json` document.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load a `relocation-mapping.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_slice(&data)
    }

    /// Record that `original` was published at `relocated`.
    pub fn insert(&mut self, original: impl Into<String>, relocated: impl Into<String>) {
        self.0.insert(original.into(), relocated.into());
    }

    /// The relocated reference for `original`, if any.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.0.get(original).map(String::as_str)
    }

    /// Resolve a reference, falling back to the original when unmapped.
    #[must_use]
    pub fn resolve<'a>(&'a self, original: &'a str) -> &'a str {
        self.get(original).unwrap_or(original)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RelocationMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Return a copy of `bundle` with image references rewritten through `map`.
///
/// Only `invocationImages[].image` and `images.*.image` change.
#[must_use]
pub fn relocate(bundle: &Bundle, map: &RelocationMap) -> Bundle {
    let mut relocated = bundle.clone();

    for invocation in &mut relocated.invocation_images {
        if let Some(target) = map.get(&invocation.base.image) {
            trace!(from = %invocation.base.image, to = %target, "Relocating invocation image");
            invocation.base.image = target.to_string();
        }
    }

    for (name, image) in &mut relocated.images {
        if let Some(target) = map.get(&image.base.image) {
            trace!(component = %name, from = %image.base.image, to = %target, "Relocating component image");
            image.base.image = target.to_string();
        }
    }

    relocated
}
