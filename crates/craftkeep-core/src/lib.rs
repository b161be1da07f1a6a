//! Release lookup and version resolution for craftkeep.
//!
//! - [`ReleaseClient`] talks to the global version manifest and the
//!   distribution channel's build API.
//! - [`VersionResolver`] turns the installed version and maintenance policy
//!   into the next [`ResolvedArtifact`](craftkeep_backend::ResolvedArtifact).

mod release;
mod resolver;

/// HTTP release client, its configuration, and the pure manifest parsers.
pub use release::{
    DEFAULT_DISTRIBUTION_BASE_URL, DEFAULT_VERSION_MANIFEST_URL, ReleaseClient, ReleaseConfig,
    format_download_url, parse_latest_build, parse_latest_release,
};
/// Next-artifact resolution.
pub use resolver::VersionResolver;
