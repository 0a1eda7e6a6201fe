//! Publishing CNAB bundles to OCI registries.
//!
//! [`push`] turns a bundle into a graph of registry content: the canonical
//! bundle blob, a manifest wrapping it, and an image index tying the config
//! to the bundle's invocation and component images. Registries that refuse
//! the preferred manifest shapes are served progressively more conservative
//! ones.
//!
//! Registry access goes through the [`Resolver`] and [`Pusher`] traits.
//! [`RegistryResolver`] implements them over `oci-distribution`.
//!
//! ```no_run
//! use cnab_oci_bundle::{Bundle, RelocationMap};
//! use cnab_oci_remotes::{RegistryConfig, RegistryResolver, TargetReference, push};
//!
//! # async fn publish(bundle: &Bundle) -> cnab_oci_remotes::Result<()> {
//! let resolver = RegistryResolver::new(&RegistryConfig::from_env());
//! let target = TargetReference::parse("my.registry/namespace/my-app:0.1.0")?;
//! let index = push(bundle, &RelocationMap::new(), &target, &resolver, true).await?;
//! println!("{}", index.digest);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod options;
mod push;
mod reference;
mod registry;
mod resolver;

pub use error::{Artifact, Error, RemoteError, Result, Stage};
pub use options::PushOptions;
pub use push::{push, push_with_options};
pub use reference::TargetReference;
pub use registry::{RegistryConfig, RegistryResolver};
pub use resolver::{Pusher, Resolver};
