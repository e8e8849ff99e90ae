//! In-memory mapping table for the stand-in server

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use hyper::header::HeaderMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::wildcard::wildcard_match;
use crate::network::http::{decoded_path, query_params};
use crate::network::OutboundRequest;
use crate::recording::{Matcher, MappingDocument, NamedMatchers, RequestMatcher, ResponseModel};
use crate::storage::MAPPING_EXTENSION;
use crate::Result;

/// Replay statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MappingStats {
    /// Registered mappings
    pub mappings: usize,
    /// Requests answered from a mapping
    pub hits: u64,
    /// Requests no mapping matched
    pub misses: u64,
}

/// Ordered set of mappings; the first registered match wins
#[derive(Default)]
pub struct MappingSet {
    mappings: RwLock<Vec<MappingDocument>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MappingSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping
    pub async fn register_mapping(&self, mapping: MappingDocument) {
        debug!(
            "Registered mapping {:?} {}",
            mapping.request.methods, mapping.request.path
        );
        self.mappings.write().await.push(mapping);
    }

    /// Load every stored mapping of `service` across all scenarios under
    /// `root` (`<root>/*/<service>/**/*.json`), in path order
    ///
    /// Files that are not mapping documents are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be listed or a file cannot be read
    pub async fn load_dir(&self, root: &Path, service: &str) -> Result<usize> {
        let mut files = Vec::new();
        for scenario_dir in list_dir(root).await? {
            let service_dir = scenario_dir.join(service);
            if !tokio::fs::metadata(&service_dir)
                .await
                .is_ok_and(|m| m.is_dir())
            {
                continue;
            }
            collect_mappings(&service_dir, &mut files).await?;
        }
        files.sort();

        let mut loaded = 0;
        for file in files {
            let text = tokio::fs::read_to_string(&file).await?;
            match MappingDocument::from_json(&text) {
                Ok(mapping) => {
                    self.register_mapping(mapping).await;
                    loaded += 1;
                }
                Err(e) => warn!("Skipping {}: {}", file.display(), e),
            }
        }

        info!(
            "Loaded {} mappings for {} from {}",
            loaded,
            service,
            root.display()
        );
        Ok(loaded)
    }

    /// Response of the first mapping matching `request`
    pub async fn find(&self, request: &OutboundRequest) -> Option<ResponseModel> {
        let found = self
            .mappings
            .read()
            .await
            .iter()
            .find(|m| matches_request(&m.request, request))
            .map(|m| m.response.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Number of registered mappings
    pub async fn len(&self) -> usize {
        self.mappings.read().await.len()
    }

    /// True if no mapping is registered
    pub async fn is_empty(&self) -> bool {
        self.mappings.read().await.is_empty()
    }

    /// Get replay statistics
    pub async fn stats(&self) -> MappingStats {
        MappingStats {
            mappings: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Every mapping file under `dir`, including subdirectories
async fn collect_mappings(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == MAPPING_EXTENSION) {
                files.push(path);
            }
        }
    }
    Ok(())
}

fn matches_request(matcher: &RequestMatcher, request: &OutboundRequest) -> bool {
    if !matcher
        .methods
        .iter()
        .any(|m| m.eq_ignore_ascii_case(request.method.as_str()))
    {
        return false;
    }

    if matcher.path != decoded_path(&request.uri) {
        return false;
    }

    if !matcher
        .headers
        .iter()
        .all(|named| matches_values(named, &header_values(&request.headers, &named.name)))
    {
        return false;
    }

    let params = query_params(&request.uri);
    if !matcher.params.iter().all(|named| {
        matches_values(
            named,
            params.get(&named.name).map_or(&[][..], Vec::as_slice),
        )
    }) {
        return false;
    }

    matcher.body.as_ref().map_or(true, |body| {
        matches(&body.matcher, &String::from_utf8_lossy(&request.body))
    })
}

/// Every matcher must accept at least one of the values
fn matches_values(named: &NamedMatchers, values: &[String]) -> bool {
    named
        .matchers
        .iter()
        .all(|m| values.iter().any(|v| matches(m, v)))
}

fn matches(matcher: &Matcher, value: &str) -> bool {
    wildcard_match(&matcher.pattern, value, matcher.ignore_case)
}

fn header_values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect()
}
