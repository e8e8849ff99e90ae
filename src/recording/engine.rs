//! Recording engine for capturing exchanges

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use super::capture::capture_exchange;
use crate::config::NamingStrategy;
use crate::fingerprint::{fingerprint_request, fingerprint_suffix};
use crate::network::{OutboundRequest, UpstreamResponse};
use crate::registry::ServiceRegistry;
use crate::scenario::Scenario;
use crate::storage::{save, PathResolver, RecordedFile};
use crate::Result;

/// Where a recorded exchange ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Path under the mock data root
    pub path: PathBuf,
    /// Path relative to the mock data root
    pub relative: PathBuf,
    /// False if an identical mapping was already stored
    pub written: bool,
}

/// Recording engine: capture, resolve a path, persist
pub struct RecordingEngine {
    resolver: PathResolver,
    naming: NamingStrategy,
    written: AtomicUsize,
    unchanged: AtomicUsize,
}

impl RecordingEngine {
    /// Create a new recording engine
    #[must_use]
    pub fn new(mock_data_dir: PathBuf, naming: NamingStrategy) -> Self {
        Self {
            resolver: PathResolver::new(mock_data_dir),
            naming,
            written: AtomicUsize::new(0),
            unchanged: AtomicUsize::new(0),
        }
    }

    /// Record a request/response exchange made within `scenario`
    ///
    /// # Errors
    ///
    /// Returns error if the exchange cannot be attributed to a service, the
    /// response body is not JSON, or the mapping cannot be written
    pub async fn record_interaction(
        &self,
        scenario: &Scenario,
        registry: &ServiceRegistry,
        request: &OutboundRequest,
        response: &UpstreamResponse,
    ) -> Result<RecordOutcome> {
        let captured = capture_exchange(registry, request, response)?;
        let content = captured.document.to_pretty_json()?;

        let file = RecordedFile::new(
            scenario.name(),
            &captured.service,
            &request.method,
            &request.uri,
        );

        let resolved = match self.naming {
            NamingStrategy::Versioned => self.resolver.resolve_versioned(&file, &content).await?,
            NamingStrategy::RequestHash => {
                let hash = fingerprint_request(&request.headers, &request.body);
                self.resolver
                    .resolve_hashed(&file, &fingerprint_suffix(&hash), &content)
                    .await?
            }
        };

        if resolved.unchanged {
            self.unchanged.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Recording unchanged: {} (scenario: {})",
                resolved.relative.display(),
                scenario.name()
            );
        } else {
            save(&resolved.path, &content).await?;
            self.written.fetch_add(1, Ordering::Relaxed);
            info!(
                "Recorded {} {} -> {} (scenario: {})",
                request.method,
                request.uri,
                resolved.relative.display(),
                scenario.name()
            );
        }

        Ok(RecordOutcome {
            written: !resolved.unchanged,
            path: resolved.path,
            relative: resolved.relative,
        })
    }

    /// Number of mapping files written
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    /// Number of captures that matched an existing mapping
    #[must_use]
    pub fn unchanged_count(&self) -> usize {
        self.unchanged.load(Ordering::Relaxed)
    }
}
