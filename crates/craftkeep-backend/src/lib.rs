mod error;
mod traits;
mod types;

pub use error::ReleaseError;
pub use traits::{ReleaseSource, Section, SettingsStore};
pub use types::{
    BuildInfo, ResolvedArtifact, Version, VersionComponent, VersionGroup, VersionParseError,
};
