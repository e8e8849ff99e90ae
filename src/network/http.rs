//! Body and response helpers shared by the client and the stand-in server

use std::collections::BTreeMap;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode, Uri};

use crate::{MockwireError, Result};

/// Create a plain-text HTTP response
///
/// # Panics
///
/// Panics if response builder fails (should never happen with valid inputs)
#[must_use]
pub fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("Failed to build response")
}

/// Create an error response
#[must_use]
pub fn error_response(error: &MockwireError) -> Response<Full<Bytes>> {
    let status = match error {
        MockwireError::DataTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        MockwireError::UnmockedRequest { .. } | MockwireError::MockedServerNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    text_response(status, &format!("Error: {error}"))
}

/// Read a whole body with size limit
///
/// # Errors
///
/// Returns error if body is too large or read fails
pub async fn read_body<B>(body: B, max_size: usize) -> Result<Bytes>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let collected = body
        .collect()
        .await
        .map_err(|e| MockwireError::Transport(format!("Failed to read body: {e}")))?;

    let bytes = collected.to_bytes();

    if bytes.len() > max_size {
        return Err(MockwireError::DataTooLarge {
            size: bytes.len(),
            limit: max_size,
        });
    }

    Ok(bytes)
}

/// URL-decoded request path; the raw path if it does not decode to UTF-8
#[must_use]
pub fn decoded_path(uri: &Uri) -> String {
    decode_component(uri.path())
}

/// Form-decoded query parameter values by name
#[must_use]
pub fn query_params(uri: &Uri) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let Some(query) = uri.query() else {
        return params;
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(&name.replace('+', " ")))
            .or_default()
            .push(decode_component(&value.replace('+', " ")));
    }
    params
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}
