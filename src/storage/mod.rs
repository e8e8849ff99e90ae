//! File-backed store of captured mappings
//!
//! Layout: `<root>/<scenario>/<service>/<method>_<resource>[_<id>][_<suffix>].json`

mod paths;
mod writer;

pub use paths::{
    is_id_segment, resource_tokens, sanitize_file_name, PathResolver, RecordedFile, Resolved,
};
pub use writer::save;

/// Extension of mapping files
pub const MAPPING_EXTENSION: &str = "json";

/// Upper bound on versions tried for one recorded file
pub const MAX_VERSIONS: u32 = 10_000;
