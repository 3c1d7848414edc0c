//! # itk-imageref
//!
//! Canonical container image references.
//!
//! Manifests name images with the same shorthand a container runtime
//! accepts: the registry domain and the tag may be omitted, and single
//! segment names on the default registry live under the official library
//! namespace. Canonicalization resolves that shorthand so every image is
//! identified by exactly one fully-qualified string.
//!
//! ## Format
//!
//! `{domain}/{repository}:{tag}`
//!
//! Examples:
//! - `alpine` -> `docker.io/library/alpine:latest`
//! - `nginx:1.25` -> `docker.io/library/nginx:1.25`
//! - `bitnami/redis` -> `docker.io/bitnami/redis:latest`
//! - `ghcr.io/org/app:v2` -> `ghcr.io/org/app:v2`
//! - `localhost:5000/app` -> `localhost:5000/app:latest`

mod error;
mod reference;

pub use error::ReferenceError;
pub use reference::{ImageRef, DEFAULT_DOMAIN, DEFAULT_TAG, OFFICIAL_LIBRARY};
