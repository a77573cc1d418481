use crate::fs::FileSystem;
use crate::types::{Fingerprint, PackageName};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read vendored package manifest '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "failed to parse vendored package manifest: {}",
        describe_decode_error(.source, *.line, *.column)
    )]
    Decode {
        #[source]
        source: serde_yaml::Error,
        /// 1-based line of the fault, or of the document root when the
        /// decoder reported no position.
        line: usize,
        column: usize,
    },
    #[error("failed to serialize vendored package manifest: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ManifestError {
    fn decode(source: serde_yaml::Error, input: &[u8]) -> Self {
        let (line, column) = match source.location() {
            Some(loc) => (loc.line(), loc.column()),
            None => root_position(input),
        };
        ManifestError::Decode {
            source,
            line,
            column,
        }
    }
}

fn describe_decode_error(source: &serde_yaml::Error, line: usize, column: usize) -> String {
    // serde_yaml already renders its own mark when it has one.
    if source.location().is_some() {
        source.to_string()
    } else {
        format!("{source} at line {line} column {column}")
    }
}

/// Position where the document's root node starts, skipping blank lines,
/// comments, directives and a leading `---`. Defaults to line 1 column 1.
fn root_position(input: &[u8]) -> (usize, usize) {
    let text = String::from_utf8_lossy(input);
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
            continue;
        }
        let indent = raw.len() - trimmed.len();
        if trimmed == "---" {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("--- ") {
            let body = rest.trim_start();
            if body.is_empty() || body.starts_with('#') {
                continue;
            }
            let offset = trimmed.len() - body.len();
            return (idx + 1, indent + offset + 1);
        }
        return (idx + 1, indent + 1);
    }
    (1, 1)
}

/// A required field was empty when the manifest was about to be persisted.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expected non-empty package name")]
    EmptyName,
    #[error("Expected non-empty package fingerprint")]
    EmptyFingerprint,
}

/// Manifest of a package vendored into a release from another release.
///
/// Decoding is permissive: missing keys become empty values and unknown keys
/// are ignored. Required fields are only checked by [`VendoredManifest::as_bytes`].
///
/// Field declaration order is the serialized key order.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VendoredManifest {
    pub name: PackageName,
    pub fingerprint: Fingerprint,
    #[serde(deserialize_with = "null_as_empty")]
    pub dependencies: Vec<PackageName>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PackageName>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<PackageName>>::deserialize(deserializer)?.unwrap_or_default())
}

impl VendoredManifest {
    pub fn new(
        name: impl Into<PackageName>,
        fingerprint: impl Into<Fingerprint>,
        dependencies: impl IntoIterator<Item = impl Into<PackageName>>,
    ) -> Self {
        Self {
            name: name.into(),
            fingerprint: fingerprint.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    /// Read and decode the manifest stored at `path`.
    pub fn from_path(path: impl AsRef<Path>, fs: &dyn FileSystem) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        debug!("reading vendored package manifest {}", path.display());
        let bytes = fs.read_file(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_yaml::from_slice(bytes).map_err(|e| ManifestError::decode(e, bytes))
    }

    /// Check the fields that must be set before the manifest is persisted.
    /// Name is checked before fingerprint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.fingerprint.is_empty() {
            return Err(ValidationError::EmptyFingerprint);
        }
        Ok(())
    }

    /// Validate and encode into canonical YAML.
    pub fn as_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        self.validate()?;
        let yaml = serde_yaml::to_string(self).map_err(ManifestError::Encode)?;
        debug!(
            "encoded vendored package manifest '{}' ({} bytes, {} dependencies)",
            self.name,
            yaml.len(),
            self.dependencies.len()
        );
        Ok(yaml.into_bytes())
    }
}
