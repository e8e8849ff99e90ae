//! Stand-in server answering requests from recorded mappings

mod mappings;
mod server;
mod wildcard;

pub use mappings::{MappingSet, MappingStats};
pub use server::StandInServer;
pub use wildcard::wildcard_match;
