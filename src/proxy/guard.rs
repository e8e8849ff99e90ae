//! Last line of defence against calls escaping to the network

use hyper::Uri;
use tracing::warn;

use crate::registry::ServiceRegistry;
use crate::scenario::CallContext;
use crate::{MockwireError, Result};

/// Admit a routed call only if it targets a stand-in server, or a real
/// upstream while its scenario is recording
///
/// # Errors
///
/// Returns `UnmockedRequest` for any other destination
pub fn admit(registry: &ServiceRegistry, ctx: &CallContext, uri: &Uri) -> Result<()> {
    if registry.is_mock_origin(uri) || (ctx.is_recording() && registry.is_real_origin(uri)) {
        return Ok(());
    }

    warn!(%uri, "Blocked unmocked outbound call");
    Err(MockwireError::UnmockedRequest {
        url: uri.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceConfiguration;
    use crate::scenario::Scenario;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(vec![ServiceConfiguration::new(
            "FunTranslations",
            "http://127.0.0.1:9091",
            "https://api.funtranslations.com",
        )
        .unwrap()])
        .unwrap()
    }

    #[test]
    fn test_mock_destination_always_admitted() {
        let uri: Uri = "http://127.0.0.1:9091/translate/yoda".parse().unwrap();
        assert!(admit(&registry(), &CallContext::untagged(), &uri).is_ok());
    }

    #[test]
    fn test_real_destination_needs_recording() {
        let uri: Uri = "https://api.funtranslations.com/translate/yoda".parse().unwrap();

        let replaying = CallContext::for_scenario(Scenario::new("s", false).unwrap());
        let err = admit(&registry(), &replaying, &uri).unwrap_err();
        assert!(matches!(err, MockwireError::UnmockedRequest { .. }));

        let recording = CallContext::for_scenario(Scenario::new("s", true).unwrap());
        assert!(admit(&registry(), &recording, &uri).is_ok());
    }

    #[test]
    fn test_unknown_destination_never_admitted() {
        let uri: Uri = "https://www.example.org/".parse().unwrap();
        let recording = CallContext::for_scenario(Scenario::new("s", true).unwrap());

        assert!(admit(&registry(), &recording, &uri).is_err());
        assert!(admit(&registry(), &CallContext::untagged(), &uri).is_err());
    }
}
