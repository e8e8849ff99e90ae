//! Mapping document format shared with the stand-in server

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Matcher kind used for every captured field
pub const WILDCARD_MATCHER: &str = "WildcardMatcher";

/// A request matcher paired with a canned response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    /// Which requests this mapping answers
    pub request: RequestMatcher,
    /// What to answer them with
    pub response: ResponseModel,
}

/// Request half of a mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMatcher {
    /// URL-decoded request path, matched exactly
    pub path: String,
    /// Accepted HTTP methods
    pub methods: Vec<String>,
    /// Header matchers, sorted by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<NamedMatchers>,
    /// Query parameter matchers, sorted by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<NamedMatchers>,
    /// Body matcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcher>,
}

/// Matchers applied to every value of a named header or query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedMatchers {
    /// Header or parameter name
    pub name: String,
    /// One matcher per captured value
    pub matchers: Vec<Matcher>,
}

/// Body matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMatcher {
    /// Matcher over the raw body text
    pub matcher: Matcher,
}

/// A single pattern matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    /// Matcher kind
    pub name: String,
    /// Pattern; `*` and `?` are wildcards
    pub pattern: String,
    /// Case-insensitive comparison
    #[serde(default)]
    pub ignore_case: bool,
}

impl Matcher {
    /// Case-insensitive wildcard matcher over a literal captured value
    #[must_use]
    pub fn wildcard(pattern: impl Into<String>) -> Self {
        Self {
            name: WILDCARD_MATCHER.to_string(),
            pattern: pattern.into(),
            ignore_case: true,
        }
    }
}

/// Response half of a mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_json: Option<Value>,
    /// Whether the stand-in server should indent the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_as_json_indented: Option<bool>,
}

impl MappingDocument {
    /// Serialize with stable indentation
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a stored document
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a mapping document
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
