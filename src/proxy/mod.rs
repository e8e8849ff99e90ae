//! Destination decisions for outbound calls
//!
//! Routing picks where a call should go; the guard then checks the final
//! destination independently. Both are pure functions over the read-only
//! service registry and the call's scenario.

mod guard;
mod routing;

pub use guard::admit;
pub use routing::{route, Decision};

use hyper::Uri;
use tracing::{info, warn};

use crate::registry::ServiceRegistry;
use crate::scenario::CallContext;
use crate::{MockwireError, Result};

/// Where an admitted call will be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Final request URI
    pub uri: Uri,
    /// True if the call targets the real upstream and must be captured
    pub record: bool,
}

/// Route a call, then admit the routed destination
///
/// # Errors
///
/// Returns `MockedServerNotFound` when a replaying call has no stand-in
/// server, and `UnmockedRequest` when a recording call targets an
/// unregistered host or the guard refuses the routed destination.
pub fn dispatch(registry: &ServiceRegistry, ctx: &CallContext, uri: &Uri) -> Result<Destination> {
    let destination = match route(registry, ctx, uri)? {
        Decision::ForwardToReal => {
            info!(%uri, "Forwarding to real upstream for recording");
            Destination {
                uri: uri.clone(),
                record: true,
            }
        }
        Decision::RedirectToMock(mocked) => Destination {
            uri: mocked,
            record: false,
        },
        Decision::Reject => {
            warn!(%uri, recording = ctx.is_recording(), "Rejected outbound call");
            return Err(if ctx.is_recording() {
                MockwireError::UnmockedRequest {
                    url: uri.to_string(),
                }
            } else {
                MockwireError::MockedServerNotFound {
                    url: uri.to_string(),
                }
            });
        }
    };

    admit(registry, ctx, &destination.uri)?;
    Ok(destination)
}
