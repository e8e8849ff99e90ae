//! Routing decision for a single outbound call

use hyper::Uri;
use tracing::debug;

use crate::registry::ServiceRegistry;
use crate::scenario::CallContext;
use crate::Result;

/// Outcome of routing an outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send the request as-is to the real upstream
    ForwardToReal,
    /// Send the request to the stand-in server at this URI
    RedirectToMock(Uri),
    /// The call must not be made
    Reject,
}

/// Decide where an outbound call should go
///
/// Recording scenarios talk to real upstreams; everything else is pointed at
/// the service's stand-in server. Calls to hosts no service claims are
/// rejected in both modes.
///
/// # Errors
///
/// Returns error only if the redirected URI cannot be built
pub fn route(registry: &ServiceRegistry, ctx: &CallContext, uri: &Uri) -> Result<Decision> {
    let Some(service) = registry.find_by_uri(uri) else {
        debug!(%uri, "No service claims destination");
        return Ok(Decision::Reject);
    };

    if ctx.is_recording() {
        debug!(%uri, service = service.name(), "Routing to real upstream");
        return Ok(Decision::ForwardToReal);
    }

    let mocked = service.mock_origin().rebase(uri)?;
    debug!(%uri, %mocked, service = service.name(), "Routing to stand-in server");
    Ok(Decision::RedirectToMock(mocked))
}
