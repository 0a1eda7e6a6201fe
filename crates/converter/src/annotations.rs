//! Annotation keys and the bundle metadata carried on the index.

use std::collections::BTreeMap;
use std::fmt;

use cnab_oci_bundle::Bundle;

use crate::{Descriptor, Result, media_type};

/// Role of an entry in the index `manifests` array.
pub const MANIFEST_TYPE: &str = "io.cnab.manifest.type";
/// Component name of a `component` entry.
pub const COMPONENT_NAME: &str = "io.cnab.component.name";
/// Bundle keywords, as a JSON array string with HTML characters escaped.
pub const KEYWORDS: &str = "io.cnab.keywords";
/// CNAB runtime version the bundle targets.
pub const RUNTIME_VERSION: &str = "io.cnab.runtime_version";
/// Artifact type marker.
pub const ARTIFACT_TYPE: &str = "org.opencontainers.artifactType";
/// Bundle maintainers, as a JSON array string with HTML characters escaped.
pub const AUTHORS: &str = "org.opencontainers.image.authors";
/// Bundle description.
pub const DESCRIPTION: &str = "org.opencontainers.image.description";
/// Bundle name.
pub const TITLE: &str = "org.opencontainers.image.title";
/// Bundle version.
pub const VERSION: &str = "org.opencontainers.image.version";

/// The role a descriptor plays in a bundle index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestType {
    /// The manifest wrapping the bundle configuration.
    Config,
    /// An invocation image.
    Invocation,
    /// A component image.
    Component,
}

impl ManifestType {
    /// Annotation value for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Invocation => "invocation",
            Self::Component => "component",
        }
    }

    /// Tag `descriptor` with this role.
    #[must_use]
    pub fn annotate(self, descriptor: Descriptor) -> Descriptor {
        descriptor.with_annotation(MANIFEST_TYPE, self.as_str())
    }

    /// Read the role a descriptor was tagged with.
    #[must_use]
    pub fn of(descriptor: &Descriptor) -> Option<Self> {
        match descriptor.annotation(MANIFEST_TYPE)? {
            "config" => Some(Self::Config),
            "invocation" => Some(Self::Invocation),
            "component" => Some(Self::Component),
            _ => None,
        }
    }
}

impl fmt::Display for ManifestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index-level annotations describing `bundle`.
///
/// Fields that are empty in the bundle are left out; the artifact type is
/// always present.
pub fn bundle_annotations(bundle: &Bundle) -> Result<BTreeMap<String, String>> {
    let mut annotations = BTreeMap::new();

    if !bundle.keywords.is_empty() {
        annotations.insert(KEYWORDS.to_string(), json_annotation(&bundle.keywords)?);
    }
    if !bundle.schema_version.is_empty() {
        annotations.insert(RUNTIME_VERSION.to_string(), bundle.schema_version.clone());
    }
    annotations.insert(ARTIFACT_TYPE.to_string(), media_type::CNAB_MANIFEST.to_string());
    if !bundle.maintainers.is_empty() {
        annotations.insert(AUTHORS.to_string(), json_annotation(&bundle.maintainers)?);
    }
    if let Some(description) = bundle.description.as_deref().filter(|d| !d.is_empty()) {
        annotations.insert(DESCRIPTION.to_string(), description.to_string());
    }
    if !bundle.name.is_empty() {
        annotations.insert(TITLE.to_string(), bundle.name.clone());
    }
    if !bundle.version.is_empty() {
        annotations.insert(VERSION.to_string(), bundle.version.clone());
    }

    Ok(annotations)
}

/// Encode `value` as compact JSON with `<`, `>`, `&`, U+2028 and U+2029
/// written as `\uXXXX` escapes, matching what other CNAB tooling emits.
///
/// These characters can only occur inside JSON strings, so replacing them
/// in the encoded text keeps the document valid.
fn json_annotation<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    if !json.contains(['<', '>', '&', '\u{2028}', '\u{2029}']) {
        return Ok(json);
    }

    let mut escaped = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnab_oci_bundle::Maintainer;

    #[test]
    fn test_full_metadata() {
        let mut bundle = Bundle::new("v1.0.0", "my-app", "0.1.0");
        bundle.description = Some("description".to_string());
        bundle.keywords = vec!["keyword1".to_string(), "keyword2".to_string()];
        bundle.maintainers.push(
            Maintainer::new("docker")
                .with_email("docker@docker.com")
                .with_url("docker.com"),
        );

        let annotations = bundle_annotations(&bundle).unwrap();
        assert_eq!(annotations[KEYWORDS], r#"["keyword1","keyword2"]"#);
        assert_eq!(annotations[RUNTIME_VERSION], "v1.0.0");
        assert_eq!(annotations[ARTIFACT_TYPE], "application/vnd.cnab.manifest.v1");
        assert_eq!(
            annotations[AUTHORS],
            r#"[{"name":"docker","email":"docker@docker.com","url":"docker.com"}]"#
        );
        assert_eq!(annotations[DESCRIPTION], "description");
        assert_eq!(annotations[TITLE], "my-app");
        assert_eq!(annotations[VERSION], "0.1.0");
        assert_eq!(annotations.len(), 7);
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut bundle = Bundle::new("", "", "");
        bundle.description = Some(String::new());
        let annotations = bundle_annotations(&bundle).unwrap();
        assert_eq!(annotations.len(), 1);
        assert!(annotations.contains_key(ARTIFACT_TYPE));
    }

    #[test]
    fn test_authors_omit_missing_contact_fields() {
        let mut bundle = Bundle::new("v1.0.0", "app", "1.0.0");
        bundle.maintainers.push(Maintainer::new("alice"));
        let annotations = bundle_annotations(&bundle).unwrap();
        assert_eq!(annotations[AUTHORS], r#"[{"name":"alice"}]"#);
    }

    #[test]
    fn test_html_characters_are_escaped() {
        let mut bundle = Bundle::new("v1.0.0", "app", "1.0.0");
        bundle.keywords = vec!["a<b>&c".to_string(), "line\u{2028}sep".to_string()];
        bundle
            .maintainers
            .push(Maintainer::new("Tom & Jerry").with_email("<tj@example.com>"));

        let annotations = bundle_annotations(&bundle).unwrap();
        assert_eq!(
            annotations[KEYWORDS],
            r#"["a\u003cb\u003e\u0026c","line\u2028sep"]"#
        );
        assert_eq!(
            annotations[AUTHORS],
            r#"[{"name":"Tom \u0026 Jerry","email":"\u003ctj@example.com\u003e"}]"#
        );

        let keywords: Vec<String> = serde_json::from_str(&annotations[KEYWORDS]).unwrap();
        assert_eq!(keywords, bundle.keywords);
    }

    #[test]
    fn test_manifest_type_round_trip() {
        for kind in [
            ManifestType::Config,
            ManifestType::Invocation,
            ManifestType::Component,
        ] {
            let desc = kind.annotate(Descriptor::for_content("a/b", b""));
            assert_eq!(desc.annotation(MANIFEST_TYPE), Some(kind.as_str()));
            assert_eq!(ManifestType::of(&desc), Some(kind));
        }
        assert_eq!(ManifestType::of(&Descriptor::for_content("a/b", b"")), None);
    }
}
