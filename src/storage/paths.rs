//! Deterministic file naming for captured exchanges

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hyper::{Method, Uri};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{MAPPING_EXTENSION, MAX_VERSIONS};
use crate::{MockwireError, Result};

/// Resource token used when a path has no non-id segment
pub const ROOT_RESOURCE: &str = "root";

/// Characters replaced by `_` in every path component
const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Logical identity of a captured exchange on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    scenario: String,
    service: String,
    method: String,
    resource: String,
    id: Option<String>,
}

impl RecordedFile {
    /// Derive the file identity for a call
    #[must_use]
    pub fn new(scenario: &str, service: &str, method: &Method, uri: &Uri) -> Self {
        let (resource, id) = resource_tokens(uri.path());
        Self {
            scenario: scenario.to_string(),
            service: service.to_string(),
            method: method.as_str().to_ascii_lowercase(),
            resource,
            id,
        }
    }

    /// Resource token: last non-id path segment
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Last id-shaped path segment, if any
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// `{method}_{resource}[_{id}]`, sanitized
    #[must_use]
    pub fn base_name(&self) -> String {
        let raw = match &self.id {
            Some(id) => format!("{}_{}_{id}", self.method, self.resource),
            None => format!("{}_{}", self.method, self.resource),
        };
        sanitize_file_name(&raw)
    }

    /// `{scenario}/{service}/{base}[_{suffix}].json`
    #[must_use]
    pub fn relative_path(&self, suffix: Option<&str>) -> PathBuf {
        let file_name = match suffix {
            Some(suffix) => format!(
                "{}_{}.{MAPPING_EXTENSION}",
                self.base_name(),
                sanitize_file_name(suffix)
            ),
            None => format!("{}.{MAPPING_EXTENSION}", self.base_name()),
        };

        PathBuf::from(sanitize_file_name(&self.scenario))
            .join(sanitize_file_name(&self.service))
            .join(file_name)
    }
}

/// Outcome of resolving where a capture belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Path under the mock data root
    pub path: PathBuf,
    /// Path relative to the mock data root
    pub relative: PathBuf,
    /// True if an identical mapping already exists there
    pub unchanged: bool,
}

/// Resolves capture paths under a mock data root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mock data root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pick the version-suffixed path for `content`
    ///
    /// Version 0 carries no suffix. Each existing file is compared as JSON
    /// with `content`: an equal one is returned unchanged, a different one
    /// moves the search to the next version.
    ///
    /// # Errors
    ///
    /// Returns error if `content` is not JSON, a file cannot be read, or
    /// every version up to [`MAX_VERSIONS`] is taken
    pub async fn resolve_versioned(&self, file: &RecordedFile, content: &str) -> Result<Resolved> {
        let new_value: Value = serde_json::from_str(content)?;

        for version in 0..MAX_VERSIONS {
            let suffix = (version > 0).then(|| version.to_string());
            let relative = file.relative_path(suffix.as_deref());
            let path = self.root.join(&relative);

            match self.existing_matches(&path, &new_value).await? {
                None => {
                    return Ok(Resolved {
                        path,
                        relative,
                        unchanged: false,
                    })
                }
                Some(true) => {
                    debug!("Identical mapping already at {}", relative.display());
                    return Ok(Resolved {
                        path,
                        relative,
                        unchanged: true,
                    });
                }
                Some(false) => {
                    debug!("Mapping at {} differs, trying next version", relative.display());
                }
            }
        }

        Err(MockwireError::Other(format!(
            "No free version for {} after {MAX_VERSIONS} attempts",
            file.base_name()
        )))
    }

    /// Path suffixed with a request fingerprint
    ///
    /// # Errors
    ///
    /// Returns error if `content` is not JSON or an existing file cannot be read
    pub async fn resolve_hashed(
        &self,
        file: &RecordedFile,
        fingerprint: &str,
        content: &str,
    ) -> Result<Resolved> {
        let new_value: Value = serde_json::from_str(content)?;
        let relative = file.relative_path(Some(fingerprint));
        let path = self.root.join(&relative);
        let unchanged = self.existing_matches(&path, &new_value).await? == Some(true);

        Ok(Resolved {
            path,
            relative,
            unchanged,
        })
    }

    /// `None` if nothing is stored at `path`, otherwise whether it equals `value`
    async fn existing_matches(&self, path: &Path, value: &Value) -> Result<Option<bool>> {
        match tokio::fs::read(path).await {
            Ok(existing) => Ok(Some(
                serde_json::from_slice::<Value>(&existing).is_ok_and(|v| v == *value),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Split a URL path into its resource token and optional id token
///
/// The resource is the last segment that is not id-shaped; the id is the
/// last id-shaped segment.
#[must_use]
pub fn resource_tokens(path: &str) -> (String, Option<String>) {
    let segments: Vec<&str> = path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let resource = segments
        .iter()
        .rev()
        .find(|s| !is_id_segment(s))
        .map_or_else(|| ROOT_RESOURCE.to_string(), |s| (*s).to_string());

    let id = segments
        .iter()
        .rev()
        .find(|s| is_id_segment(s))
        .map(|s| (*s).to_string());

    (resource, id)
}

/// Whether a path segment has the 8-4-4-4-12 hex-grouped identifier shape
#[must_use]
pub fn is_id_segment(segment: &str) -> bool {
    segment.len() == 36 && Uuid::try_parse(segment).is_ok()
}

/// Replace filesystem-reserved and control characters with `_`
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
