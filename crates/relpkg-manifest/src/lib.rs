//! Vendored package manifests for release packaging.
//!
//! A vendored package carries a small YAML manifest (`name`, `fingerprint`,
//! ordered `dependencies`). This crate decodes it through a pluggable
//! [`FileSystem`] and encodes it back into its canonical form
//! ([`VendoredManifest::as_bytes`]), rejecting manifests whose name or
//! fingerprint is empty.

pub mod fs;
pub mod manifest;
pub mod types;

pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use manifest::{ManifestError, ValidationError, VendoredManifest};
pub use types::{Fingerprint, PackageName};
