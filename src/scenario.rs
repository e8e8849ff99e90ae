//! Scenario context carried through every outbound call

use std::sync::Arc;

use dashmap::DashMap;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::{MockwireError, Result};

/// Header carrying the scenario name on inbound and outbound calls
pub const SCENARIO_HEADER: &str = "x-scenario";

/// Maximum scenario name length in bytes
pub const MAX_SCENARIO_NAME_LEN: usize = 255;

/// A named test scenario and its mode at the time it was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    name: String,
    recording: bool,
}

impl Scenario {
    /// Create a scenario snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the name cannot be used as a directory name
    pub fn new(name: impl Into<String>, recording: bool) -> Result<Self> {
        let name = name.into();
        validate_scenario_name(&name)?;
        Ok(Self { name, recording })
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if calls in this scenario go to real upstreams and are captured
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

/// Process-wide record of which scenarios are recording
///
/// Scenarios are declared implicitly: any name not toggled is in replay mode.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    recording: Arc<DashMap<String, bool>>,
}

impl ScenarioRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch a scenario between recording and replay
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid
    pub fn set_recording_mode(&self, name: &str, recording: bool) -> Result<()> {
        validate_scenario_name(name)?;
        debug!(scenario = name, recording, "Scenario mode set");
        self.recording.insert(name.to_string(), recording);
        Ok(())
    }

    /// Whether the named scenario is recording
    #[must_use]
    pub fn is_recording(&self, name: &str) -> bool {
        self.recording.get(name).is_some_and(|r| *r)
    }

    /// Snapshot of the named scenario
    ///
    /// # Errors
    ///
    /// Returns error if the name is invalid
    pub fn scenario(&self, name: &str) -> Result<Scenario> {
        Scenario::new(name, self.is_recording(name))
    }
}

/// Per-call context threaded from an inbound request to its outbound calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    scenario: Option<Scenario>,
}

impl CallContext {
    /// Context for a call that belongs to no scenario
    #[must_use]
    pub fn untagged() -> Self {
        Self::default()
    }

    /// Context for a call made within `scenario`
    #[must_use]
    pub fn for_scenario(scenario: Scenario) -> Self {
        Self {
            scenario: Some(scenario),
        }
    }

    /// Resolve the context of an inbound request from its scenario header
    ///
    /// A missing or blank header yields an untagged context.
    ///
    /// # Errors
    ///
    /// Returns error if the header is not valid text or names an invalid scenario
    pub fn from_inbound(headers: &HeaderMap, scenarios: &ScenarioRegistry) -> Result<Self> {
        let Some(value) = headers.get(SCENARIO_HEADER) else {
            return Ok(Self::untagged());
        };

        let name = value
            .to_str()
            .map_err(|e| MockwireError::InvalidScenarioName(e.to_string()))?
            .trim();

        if name.is_empty() {
            return Ok(Self::untagged());
        }

        Ok(Self::for_scenario(scenarios.scenario(name)?))
    }

    /// The scenario this call belongs to, if any
    #[must_use]
    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    /// True if the call belongs to a recording scenario
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.scenario.as_ref().is_some_and(Scenario::is_recording)
    }

    /// Add the scenario header to an outbound request
    ///
    /// A header already present is left untouched.
    ///
    /// # Errors
    ///
    /// Returns error if the scenario name is not a valid header value
    pub fn tag(&self, headers: &mut HeaderMap) -> Result<()> {
        let Some(scenario) = &self.scenario else {
            return Ok(());
        };

        let name = HeaderName::from_static(SCENARIO_HEADER);
        if headers.contains_key(&name) {
            return Ok(());
        }

        let value = HeaderValue::from_str(scenario.name())
            .map_err(|e| MockwireError::InvalidScenarioName(e.to_string()))?;
        headers.insert(name, value);
        Ok(())
    }
}

/// Validate a scenario name for use as a path component
///
/// # Errors
///
/// Returns error if the scenario name is invalid
pub fn validate_scenario_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MockwireError::InvalidScenarioName(
            "Scenario name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_SCENARIO_NAME_LEN {
        return Err(MockwireError::InvalidScenarioName(format!(
            "Scenario name too long: {} > {MAX_SCENARIO_NAME_LEN}",
            name.len()
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(MockwireError::InvalidScenarioName(
            "Scenario name cannot contain path separators".to_string(),
        ));
    }

    if name.starts_with('.') {
        return Err(MockwireError::InvalidScenarioName(
            "Scenario name cannot start with dot".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MockwireError::InvalidScenarioName(
            "Scenario name cannot contain null bytes".to_string(),
        ));
    }

    if name.contains("..") {
        return Err(MockwireError::InvalidScenarioName(
            "Scenario name cannot contain '..'".to_string(),
        ));
    }

    Ok(())
}
