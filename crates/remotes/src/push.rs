//! Bundle push orchestration.
//!
//! A push runs these stages strictly in sequence:
//!
//! 1. Relocate image references and check the bundle is publishable
//! 2. Serialize the relocated bundle canonically
//! 3. Push the blob and a wrapper manifest under the untagged repository,
//!    walking the manifest shape catalog until the registry accepts one
//! 4. Resolve invocation and component images
//! 5. Assemble the bundle index
//! 6. Push the index under the tag
//!
//! Any failure ends the push. Content pushed by earlier stages is left in
//! the registry.

use std::collections::BTreeMap;
use std::future::Future;

use cnab_oci_bundle::{BaseImage, Bundle, RelocationMap, relocate, to_canonical_json};
use cnab_oci_converter::{
    Descriptor, IndexBuilder, ManifestIndex, ManifestShape, ManifestType, PreparedConfig,
    bundle_annotations,
};
use tracing::{debug, info, trace, warn};

use crate::error::{Artifact, Stage};
use crate::{Error, PushOptions, RemoteError, Resolver, Result, TargetReference};

/// Push `bundle` to `target` and return the descriptor of the pushed index.
///
/// Image references are rewritten through `relocation_map` before anything
/// else happens. With `allow_fallback` the whole manifest shape catalog is
/// tried for the config; without it only the legacy Docker shape is.
pub async fn push<R>(
    bundle: &Bundle,
    relocation_map: &RelocationMap,
    target: &TargetReference,
    resolver: &R,
    allow_fallback: bool,
) -> Result<Descriptor>
where
    R: Resolver + ?Sized,
{
    let options = PushOptions::default().with_fallback(allow_fallback);
    push_with_options(bundle, relocation_map, target, resolver, &options).await
}

/// Like [`push`], with full control over fallback and cancellation.
pub async fn push_with_options<R>(
    bundle: &Bundle,
    relocation_map: &RelocationMap,
    target: &TargetReference,
    resolver: &R,
    options: &PushOptions,
) -> Result<Descriptor>
where
    R: Resolver + ?Sized,
{
    info!(
        reference = %target,
        bundle = %bundle.name,
        version = %bundle.version,
        allow_fallback = options.allow_fallback,
        "Pushing bundle"
    );

    let session = Session {
        target,
        resolver,
        options,
    };

    debug!(stage = %Stage::Relocating, relocations = relocation_map.len(), "Relocating images");
    let relocated = relocate(bundle, relocation_map);
    if relocated.invocation_images.is_empty() {
        return Err(Error::InvalidBundle(format!(
            "bundle '{}' declares no invocation image",
            relocated.name
        )));
    }

    debug!(stage = %Stage::Serializing, "Serializing bundle");
    let blob = to_canonical_json(&relocated)?;
    trace!(size = blob.len(), "Serialized bundle");

    let config = session.push_config(&blob).await?;
    let images = session.resolve_images(&relocated).await?;

    debug!(stage = %Stage::AssemblingIndex, "Assembling index");
    let annotations = bundle_annotations(&relocated)
        .map_err(|e| Error::conversion(Stage::AssemblingIndex, e))?;
    let index = images.into_builder(config).annotations(annotations).build();

    let descriptor = session.push_index(&index).await?;

    info!(
        reference = %target,
        digest = %descriptor.digest,
        size = descriptor.size,
        media_type = %descriptor.media_type,
        "Pushed bundle"
    );
    Ok(descriptor)
}

/// Invocation and component descriptors, resolved from the relocated bundle.
struct ResolvedImages {
    invocations: Vec<Descriptor>,
    components: BTreeMap<String, Descriptor>,
}

impl ResolvedImages {
    fn into_builder(self, config: Descriptor) -> IndexBuilder {
        let builder = self
            .invocations
            .into_iter()
            .fold(IndexBuilder::new(config), IndexBuilder::invocation);
        self.components
            .into_iter()
            .fold(builder, |builder, (name, descriptor)| {
                builder.component(name, descriptor)
            })
    }
}

struct Session<'a, R: ?Sized> {
    target: &'a TargetReference,
    resolver: &'a R,
    options: &'a PushOptions,
}

impl<R> Session<'_, R>
where
    R: Resolver + ?Sized,
{
    /// Push the bundle blob wrapped in the first manifest shape the
    /// registry accepts. Once every shape is refused, the last refusal is
    /// returned.
    async fn push_config(&self, blob: &[u8]) -> Result<Descriptor> {
        let repository = self.target.repository();
        let mut last_rejection = None;

        for &shape in self.options.shapes() {
            match self.push_config_as(shape, &repository, blob).await {
                Ok(descriptor) => return Ok(descriptor),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    warn!(
                        %shape,
                        reference = %repository,
                        error = %err,
                        "Config shape rejected"
                    );
                    last_rejection = Some(err);
                }
            }
        }

        Err(last_rejection.unwrap_or_else(|| {
            Error::push_rejected(
                Artifact::ConfigManifest(ManifestShape::LEGACY),
                &repository,
                RemoteError::rejected(&repository, "no manifest shape to try"),
            )
        }))
    }

    async fn push_config_as(
        &self,
        shape: ManifestShape,
        repository: &str,
        blob: &[u8],
    ) -> Result<Descriptor> {
        debug!(stage = %Stage::PushingConfig, %shape, reference = %repository, "Pushing config");
        let prepared = PreparedConfig::new(shape, blob)
            .map_err(|e| Error::conversion(Stage::PushingConfig, e))?;

        self.push_content(
            repository,
            prepared.blob_descriptor(),
            blob,
            Artifact::ConfigBlob(shape),
        )
        .await?;
        let manifest = self
            .push_content(
                repository,
                prepared.manifest_descriptor(),
                prepared.manifest(),
                Artifact::ConfigManifest(shape),
            )
            .await?;

        debug!(%shape, digest = %manifest.digest, "Config accepted");
        Ok(ManifestType::Config.annotate(manifest))
    }

    async fn resolve_images(&self, bundle: &Bundle) -> Result<ResolvedImages> {
        debug!(
            stage = %Stage::ResolvingImages,
            invocations = bundle.invocation_images.len(),
            components = bundle.images.len(),
            "Resolving images"
        );

        let mut invocations = Vec::with_capacity(bundle.invocation_images.len());
        for invocation in &bundle.invocation_images {
            invocations.push(self.resolve_image(&invocation.base).await?);
        }

        let mut components = BTreeMap::new();
        for (name, component) in &bundle.images {
            components.insert(name.clone(), self.resolve_image(&component.base).await?);
        }

        Ok(ResolvedImages {
            invocations,
            components,
        })
    }

    async fn resolve_image(&self, image: &BaseImage) -> Result<Descriptor> {
        let reference = image.image.as_str();
        let descriptor = self
            .cancellable(Stage::ResolvingImages, self.resolver.resolve(reference))
            .await?
            .map_err(|source| Error::Resolution {
                reference: reference.to_string(),
                source,
            })?;

        if let Some(expected) = image.content_digest.as_deref() {
            let actual = descriptor.digest.to_string();
            if expected != actual {
                return Err(Error::digest_mismatch(
                    Stage::ResolvingImages,
                    reference,
                    expected,
                    actual,
                ));
            }
        }

        debug!(
            %reference,
            digest = %descriptor.digest,
            media_type = %descriptor.media_type,
            "Resolved image"
        );
        Ok(descriptor)
    }

    /// Push the index under the tag, retrying once as a Docker manifest
    /// list when fallback is enabled.
    async fn push_index(&self, index: &ManifestIndex) -> Result<Descriptor> {
        let reference = self.target.tagged();

        match self.push_document(&reference, index, Artifact::Index).await {
            Err(err) if self.options.allow_fallback && !err.is_cancelled() => {
                warn!(
                    %reference,
                    error = %err,
                    "OCI index rejected, trying Docker manifest list"
                );
                self.push_document(
                    &reference,
                    &index.to_docker_manifest_list(),
                    Artifact::ManifestList,
                )
                .await
            }
            result => result,
        }
    }

    async fn push_document(
        &self,
        reference: &str,
        index: &ManifestIndex,
        artifact: Artifact,
    ) -> Result<Descriptor> {
        debug!(stage = %Stage::PushingIndex, %reference, %artifact, "Pushing index");
        let (bytes, descriptor) = index
            .encode()
            .map_err(|e| Error::conversion(Stage::PushingIndex, e))?;
        trace!(%artifact, size = bytes.len(), "Encoded index");

        self.push_content(reference, &descriptor, &bytes, artifact)
            .await
    }

    /// Push one piece of content through a fresh pusher and check the
    /// registry stored what was sent.
    async fn push_content(
        &self,
        reference: &str,
        descriptor: &Descriptor,
        content: &[u8],
        artifact: Artifact,
    ) -> Result<Descriptor> {
        let stage = artifact.stage();

        let pusher = self
            .cancellable(stage, self.resolver.pusher(reference))
            .await?
            .map_err(|source| Error::push_rejected(artifact, reference, source))?;
        let pushed = self
            .cancellable(stage, pusher.push(descriptor, content))
            .await?
            .map_err(|source| Error::push_rejected(artifact, reference, source))?;

        if !pushed.same_content(descriptor) {
            return Err(Error::digest_mismatch(
                stage,
                reference,
                descriptor.digest.to_string(),
                pushed.digest.to_string(),
            ));
        }

        debug!(
            %reference,
            %artifact,
            media_type = %descriptor.media_type,
            digest = %descriptor.digest,
            size = descriptor.size,
            "Pushed content"
        );
        Ok(descriptor.clone())
    }

    /// Race an adapter call against the cancellation token.
    ///
    /// The outer result carries cancellation; the inner one is the adapter's
    /// own outcome.
    async fn cancellable<T>(
        &self,
        stage: Stage,
        call: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> Result<std::result::Result<T, RemoteError>> {
        tokio::select! {
            biased;
            () = self.options.cancellation.cancelled() => Err(Error::Cancelled { stage }),
            result = call => match result {
                Err(RemoteError::Cancelled) => Err(Error::Cancelled { stage }),
                other => Ok(other),
            },
        }
    }
}
