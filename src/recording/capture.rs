//! Turning a live exchange into a mapping document

use std::collections::BTreeMap;

use hyper::header::HeaderMap;

use super::mapping::{
    BodyMatcher, MappingDocument, Matcher, NamedMatchers, RequestMatcher, ResponseModel,
};
use crate::network::http::{decoded_path, query_params};
use crate::network::{OutboundRequest, UpstreamResponse};
use crate::registry::{ServiceConfiguration, ServiceRegistry};
use crate::{MockwireError, Result};

/// A mapping document attributed to the service that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedExchange {
    /// Logical name of the upstream service
    pub service: String,
    /// Request matcher and canned response
    pub document: MappingDocument,
}

/// Build the mapping document for a recorded call
///
/// # Errors
///
/// Returns `UnknownService` if no registered service claims the request URI
/// and `NonJsonBody` if a non-empty response body is not JSON
pub fn capture_exchange(
    registry: &ServiceRegistry,
    request: &OutboundRequest,
    response: &UpstreamResponse,
) -> Result<CapturedExchange> {
    let service = registry
        .find_by_uri(&request.uri)
        .ok_or_else(|| MockwireError::UnknownService {
            url: request.uri.to_string(),
        })?;

    let request_matcher = build_request(service, request);
    let response_model = build_response(service, response)?;

    Ok(CapturedExchange {
        service: service.name().to_string(),
        document: MappingDocument {
            request: request_matcher,
            response: response_model,
        },
    })
}

fn build_request(service: &ServiceConfiguration, request: &OutboundRequest) -> RequestMatcher {
    let headers = group_headers(&request.headers, |name| service.ignores_request_header(name));

    let body = (!request.body.is_empty()).then(|| BodyMatcher {
        matcher: Matcher::wildcard(String::from_utf8_lossy(&request.body)),
    });

    RequestMatcher {
        path: decoded_path(&request.uri),
        methods: vec![request.method.as_str().to_string()],
        headers: to_matchers(headers),
        params: to_matchers(query_params(&request.uri)),
        body,
    }
}

fn build_response(
    service: &ServiceConfiguration,
    response: &UpstreamResponse,
) -> Result<ResponseModel> {
    let headers = group_headers(&response.headers, |name| {
        service.ignores_response_header(name)
    });

    let body_as_json = if response.body.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&response.body).map_err(MockwireError::NonJsonBody)?)
    };

    Ok(ResponseModel {
        status_code: response.status.as_u16(),
        headers,
        body_as_json_indented: body_as_json.as_ref().map(|_| true),
        body_as_json,
    })
}

/// Header values by name, minus ignored names
fn group_headers(
    headers: &HeaderMap,
    ignored: impl Fn(&str) -> bool,
) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        if ignored(name.as_str()) {
            continue;
        }
        grouped
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    grouped
}

fn to_matchers(grouped: BTreeMap<String, Vec<String>>) -> Vec<NamedMatchers> {
    grouped
        .into_iter()
        .map(|(name, values)| NamedMatchers {
            name,
            matchers: values.into_iter().map(Matcher::wildcard).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, DATE};
    use hyper::{Method, StatusCode};
    use proptest::prelude::*;
    use serde_json::json;

    use crate::recording::WILDCARD_MATCHER;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(vec![ServiceConfiguration::new(
            "FunTranslations",
            "http://127.0.0.1:9091",
            "https://api.funtranslations.com",
        )
        .unwrap()
        .ignore_request_headers(["authorization", "traceparent"])
        .ignore_response_headers(["date"])])
        .unwrap()
    }

    fn yoda_request() -> OutboundRequest {
        OutboundRequest::new(
            Method::POST,
            "https://api.funtranslations.com/translate/yoda".parse().unwrap(),
        )
        .header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
        .header(AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
        .body("text=Master Obiwan has lost a planet.")
    }

    fn yoda_response() -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(DATE, HeaderValue::from_static("Sat, 18 Oct 2026 10:00:00 GMT"));
        UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(
                br#"{"contents":{"translated":"Lost a planet, master obiwan has."}}"#,
            ),
        }
    }

    #[test]
    fn test_capture_yoda() {
        let captured = capture_exchange(&registry(), &yoda_request(), &yoda_response()).unwrap();
        assert_eq!(captured.service, "FunTranslations");

        let request = &captured.document.request;
        assert_eq!(request.path, "/translate/yoda");
        assert_eq!(request.methods, vec!["POST"]);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers[0].name, "content-type");
        assert_eq!(
            request.body.as_ref().unwrap().matcher,
            Matcher::wildcard("text=Master Obiwan has lost a planet.")
        );

        let response = &captured.document.response;
        assert_eq!(response.status_code, 200);
        assert!(response.headers.contains_key("content-type"));
        assert!(!response.headers.contains_key("date"));
        assert_eq!(
            response.body_as_json,
            Some(json!({"contents": {"translated": "Lost a planet, master obiwan has."}}))
        );
        assert_eq!(response.body_as_json_indented, Some(true));
    }

    #[test]
    fn test_capture_unknown_service() {
        let request =
            OutboundRequest::new(Method::GET, "https://other.example.com/x".parse().unwrap());
        let err = capture_exchange(&registry(), &request, &yoda_response()).unwrap_err();
        assert!(matches!(err, MockwireError::UnknownService { .. }));
    }

    #[test]
    fn test_capture_non_json_body() {
        let mut response = yoda_response();
        response.body = Bytes::from_static(b"<html>nope</html>");

        let err = capture_exchange(&registry(), &yoda_request(), &response).unwrap_err();
        assert!(matches!(err, MockwireError::NonJsonBody(_)));
    }

    #[test]
    fn test_capture_empty_response_body() {
        let mut response = yoda_response();
        response.status = StatusCode::NO_CONTENT;
        response.body = Bytes::new();

        let captured = capture_exchange(&registry(), &yoda_request(), &response).unwrap();
        assert!(captured.document.response.body_as_json.is_none());
        assert!(captured.document.response.body_as_json_indented.is_none());
    }

    #[test]
    fn test_capture_decodes_path_and_query() {
        let request = OutboundRequest::new(
            Method::GET,
            "https://api.funtranslations.com/translate/caf%C3%A9?text=hello+there&lang=yoda&lang=sith"
                .parse()
                .unwrap(),
        );
        let captured = capture_exchange(&registry(), &request, &yoda_response()).unwrap();
        let matcher = &captured.document.request;

        assert_eq!(matcher.path, "/translate/café");
        assert!(matcher.body.is_none());
        assert_eq!(matcher.params.len(), 2);
        assert_eq!(matcher.params[0].name, "lang");
        assert_eq!(
            matcher.params[0].matchers,
            vec![Matcher::wildcard("yoda"), Matcher::wildcard("sith")]
        );
        assert_eq!(matcher.params[1].name, "text");
        assert_eq!(matcher.params[1].matchers[0].pattern, "hello there");
        assert_eq!(matcher.params[1].matchers[0].name, WILDCARD_MATCHER);
    }

    #[test]
    fn test_capture_is_deterministic() {
        let first = capture_exchange(&registry(), &yoda_request(), &yoda_response()).unwrap();
        let second = capture_exchange(&registry(), &yoda_request(), &yoda_response()).unwrap();
        assert_eq!(
            first.document.to_pretty_json().unwrap(),
            second.document.to_pretty_json().unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_ignored_headers_never_captured(
            names in prop::collection::vec("[a-z][a-z0-9-]{0,12}", 0..8),
            ignored in prop::collection::vec("[a-z][a-z0-9-]{0,12}", 0..4),
        ) {
            let service = ServiceConfiguration::new(
                "Svc",
                "http://127.0.0.1:9091",
                "http://real.example.com",
            )
            .unwrap()
            .ignore_request_headers(ignored.iter().map(|n| n.to_uppercase()))
            .ignore_response_headers(&ignored);
            let registry = ServiceRegistry::new(vec![service]).unwrap();

            let mut headers = HeaderMap::new();
            for name in names.iter().chain(ignored.iter()) {
                headers.append(
                    HeaderName::from_bytes(name.as_bytes()).unwrap(),
                    HeaderValue::from_static("v"),
                );
            }

            let mut request = OutboundRequest::new(
                Method::GET,
                "http://real.example.com/items".parse().unwrap(),
            );
            request.headers = headers.clone();
            let response = UpstreamResponse {
                status: StatusCode::OK,
                headers,
                body: Bytes::from_static(b"{}"),
            };

            let captured = capture_exchange(&registry, &request, &response).unwrap();
            for header in &captured.document.request.headers {
                prop_assert!(!ignored.contains(&header.name));
            }
            for name in captured.document.response.headers.keys() {
                prop_assert!(!ignored.contains(name));
            }
        }
    }
}
