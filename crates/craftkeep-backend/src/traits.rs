use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ReleaseError;
use crate::types::{BuildInfo, Version, VersionGroup};

/// Upstream release information for one distribution channel.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The version the global manifest currently advertises as latest release.
    async fn fetch_latest_upstream_release(&self) -> Result<Version, ReleaseError>;

    /// Whether the distribution channel publishes `group`. Never fails:
    /// anything other than a success response means "does not exist".
    async fn probe_version_group_exists(&self, group: VersionGroup) -> bool;

    /// The newest build of `group`.
    async fn fetch_latest_build(&self, group: VersionGroup) -> Result<BuildInfo, ReleaseError>;

    /// Download location of a build artifact. Pure formatting.
    fn build_download_url(&self, group: VersionGroup, build: u32, filename: &str) -> String;
}

/// One named configuration section.
pub type Section = Map<String, Value>;

/// Persistence of named configuration sections.
///
/// `save` replaces a whole section and must be all-or-nothing: a reader never
/// observes a partially written section.
pub trait SettingsStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns an empty section if it has never been saved.
    fn load(&self, section: &str) -> Result<Section, Self::Error>;

    fn save(&self, section: &str, data: Section) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FixedSource {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl ReleaseSource for FixedSource {
        async fn fetch_latest_upstream_release(&self) -> Result<Version, ReleaseError> {
            Ok(Version::new(1, 20, Some(4)))
        }

        async fn probe_version_group_exists(&self, _group: VersionGroup) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            false
        }

        async fn fetch_latest_build(&self, group: VersionGroup) -> Result<BuildInfo, ReleaseError> {
            Err(ReleaseError::NoBuildsAvailable { group })
        }

        fn build_download_url(&self, group: VersionGroup, build: u32, filename: &str) -> String {
            format!("mock://{group}/{build}/{filename}")
        }
    }

    #[tokio::test]
    async fn trait_objects_dispatch_to_implementation() {
        let source: Box<dyn ReleaseSource> = Box::new(FixedSource {
            probes: AtomicUsize::new(0),
        });

        let latest = source
            .fetch_latest_upstream_release()
            .await
            .expect("fixed release");
        assert_eq!(latest.group(), VersionGroup::new(1, 20));
        assert!(!source.probe_version_group_exists(VersionGroup::new(1, 21)).await);
        assert_eq!(
            source.build_download_url(VersionGroup::new(1, 20), 7, "a.jar"),
            "mock://1.20/7/a.jar"
        );
    }
}
