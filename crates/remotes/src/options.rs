//! Push configuration.

use cnab_oci_converter::ManifestShape;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Options controlling a bundle push.
///
/// ```
/// use cnab_oci_remotes::PushOptions;
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let options = PushOptions::default()
///     .with_fallback(false)
///     .with_cancellation(token.clone());
/// assert!(!options.allow_fallback);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushOptions {
    /// Try the whole manifest shape catalog instead of only the legacy
    /// Docker shape, and fall back to a Docker manifest list when the OCI
    /// index is refused.
    pub allow_fallback: bool,
    /// Cancels the push between and during registry calls.
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            allow_fallback: true,
            cancellation: CancellationToken::new(),
        }
    }
}

impl PushOptions {
    /// Enable or disable fallback.
    #[must_use]
    pub fn with_fallback(mut self, allow_fallback: bool) -> Self {
        self.allow_fallback = allow_fallback;
        self
    }

    /// Use `token` to cancel the push.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Shapes a push tries, in order: the whole catalog with fallback,
    /// otherwise only [`ManifestShape::LEGACY`].
    #[must_use]
    pub fn shapes(&self) -> &'static [ManifestShape] {
        if self.allow_fallback {
            &ManifestShape::CATALOG
        } else {
            &[ManifestShape::LEGACY]
        }
    }
}
