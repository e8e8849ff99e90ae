//! Outbound call pipeline: tag, route, guard, send, capture

use std::sync::Arc;

use tracing::debug;

use crate::network::{OutboundRequest, Transport, UpstreamResponse};
use crate::proxy::dispatch;
use crate::recording::{RecordOutcome, RecordingEngine};
use crate::registry::ServiceRegistry;
use crate::scenario::CallContext;
use crate::{MockwireError, Result};

/// Upstream response plus where it was recorded, if it was
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Response as received
    pub response: UpstreamResponse,
    /// Set when the call went to the real upstream
    pub recorded: Option<RecordOutcome>,
}

/// Runs every outbound call of the system under test
pub struct Harness<T> {
    registry: Arc<ServiceRegistry>,
    recorder: RecordingEngine,
    transport: T,
}

impl<T: Transport> Harness<T> {
    /// Create a harness over a registry, a recording engine and a transport
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>, recorder: RecordingEngine, transport: T) -> Self {
        Self {
            registry,
            recorder,
            transport,
        }
    }

    /// Send one outbound call within `ctx`
    ///
    /// # Errors
    ///
    /// Returns the routing or guard rejection before any network I/O, the
    /// transport error if the call fails, or the capture error if a
    /// recording call cannot be persisted
    pub async fn send(&self, ctx: &CallContext, request: OutboundRequest) -> Result<Exchange> {
        let mut request = request;
        ctx.tag(&mut request.headers)?;

        let destination = dispatch(&self.registry, ctx, &request.uri)?;
        debug!(
            "{} {} -> {} (record: {})",
            request.method, request.uri, destination.uri, destination.record
        );

        if !destination.record {
            request.uri = destination.uri;
            let response = self.transport.send(request).await?;
            return Ok(Exchange {
                response,
                recorded: None,
            });
        }

        let scenario = ctx
            .current_scenario()
            .ok_or_else(|| MockwireError::UnmockedRequest {
                url: request.uri.to_string(),
            })?;

        let response = self.transport.send(request.clone()).await?;
        let outcome = self
            .recorder
            .record_interaction(scenario, &self.registry, &request, &response)
            .await?;

        Ok(Exchange {
            response,
            recorded: Some(outcome),
        })
    }

    /// Service registry
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Recording engine
    #[must_use]
    pub fn recorder(&self) -> &RecordingEngine {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use hyper::{Method, StatusCode};
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::config::NamingStrategy;
    use crate::registry::ServiceConfiguration;
    use crate::scenario::{Scenario, SCENARIO_HEADER};

    /// Answers every call with a fixed JSON body and remembers what it saw
    #[derive(Default)]
    struct FakeTransport {
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl Transport for FakeTransport {
        async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
            self.seen.lock().unwrap().push(request);
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                headers,
                body: Bytes::from_static(
                    br#"{"contents":{"translated":"Lost a planet, master obiwan has."}}"#,
                ),
            })
        }
    }

    fn harness(dir: &TempDir) -> Harness<FakeTransport> {
        let registry = ServiceRegistry::new(vec![ServiceConfiguration::new(
            "FunTranslations",
            "http://127.0.0.1:9091",
            "https://api.funtranslations.com",
        )
        .unwrap()])
        .unwrap();

        Harness::new(
            Arc::new(registry),
            RecordingEngine::new(dir.path().to_path_buf(), NamingStrategy::Versioned),
            FakeTransport::default(),
        )
    }

    fn yoda(url: &str) -> OutboundRequest {
        OutboundRequest::new(Method::POST, url.parse().unwrap())
            .body("text=Master Obiwan has lost a planet.")
    }

    #[tokio::test]
    async fn test_recording_call_is_forwarded_and_captured() {
        let dir = TempDir::new().unwrap();
        let harness = harness(&dir);
        let ctx = CallContext::for_scenario(Scenario::new("yoda-happy-path", true).unwrap());

        let exchange = harness
            .send(&ctx, yoda("https://api.funtranslations.com/translate/yoda"))
            .await
            .unwrap();

        let outcome = exchange.recorded.unwrap();
        assert!(outcome.written);
        assert!(dir
            .path()
            .join("yoda-happy-path/FunTranslations/post_yoda.json")
            .exists());

        let seen = harness.transport.seen.lock().unwrap();
        assert_eq!(
            seen[0].uri,
            "https://api.funtranslations.com/translate/yoda"
        );
        assert_eq!(seen[0].headers[SCENARIO_HEADER], "yoda-happy-path");
    }

    #[tokio::test]
    async fn test_replay_call_is_redirected_to_mock() {
        let dir = TempDir::new().unwrap();
        let harness = harness(&dir);
        let ctx = CallContext::for_scenario(Scenario::new("yoda-happy-path", false).unwrap());

        let exchange = harness
            .send(&ctx, yoda("https://api.funtranslations.com/translate/yoda?x=1"))
            .await
            .unwrap();

        assert!(exchange.recorded.is_none());
        let seen = harness.transport.seen.lock().unwrap();
        assert_eq!(seen[0].uri, "http://127.0.0.1:9091/translate/yoda?x=1");
        assert_eq!(harness.recorder().written_count(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_host_rejected_before_network() {
        let dir = TempDir::new().unwrap();
        let harness = harness(&dir);

        for recording in [true, false] {
            let ctx = CallContext::for_scenario(Scenario::new("s", recording).unwrap());
            let err = harness
                .send(&ctx, yoda("https://unknown.example.com/x"))
                .await
                .unwrap_err();
            assert!(err.is_wiring_gap());
        }

        assert!(harness.transport.seen.lock().unwrap().is_empty());
    }
}
