//! Recording engine for capturing HTTP exchanges as mapping documents

mod capture;
mod engine;
mod mapping;

pub use capture::{capture_exchange, CapturedExchange};
pub use engine::{RecordOutcome, RecordingEngine};
pub use mapping::{
    BodyMatcher, MappingDocument, Matcher, NamedMatchers, RequestMatcher, ResponseModel,
    WILDCARD_MATCHER,
};
