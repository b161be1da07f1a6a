use log::{debug, info};

use craftkeep_backend::{ReleaseError, ReleaseSource, ResolvedArtifact, Version, VersionGroup};
use craftkeep_settings::{InstallState, MaintenancePolicy};

/// Picks the next artifact to install for a server.
///
/// Each call performs at most one forward probe: the group right after the
/// installed one. When that group is not published yet, the installed group
/// is kept and its newest build is returned. Errors from the source are
/// passed through untouched and never retried here.
pub struct VersionResolver<S> {
    source: S,
}

impl<S: ReleaseSource> VersionResolver<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Resolve against persisted install state and maintenance policy.
    ///
    /// # Errors
    /// Propagates any [`ReleaseError`] raised by the release source.
    pub async fn resolve_next(
        &self,
        state: &InstallState,
        policy: &MaintenancePolicy,
    ) -> Result<ResolvedArtifact, ReleaseError> {
        self.resolve_from(
            state.current_version.as_ref(),
            policy.is_major_update_allowed(),
        )
        .await
    }

    /// Resolve from an optional installed version.
    ///
    /// # Errors
    /// Propagates any [`ReleaseError`] raised by the release source.
    pub async fn resolve_from(
        &self,
        current: Option<&Version>,
        allow_major_updates: bool,
    ) -> Result<ResolvedArtifact, ReleaseError> {
        let target = match current {
            None => {
                let latest = self.source.fetch_latest_upstream_release().await?;
                debug!("no installed version, targeting latest release {latest}");
                latest.group()
            }
            Some(version) => self.target_for(version.group(), allow_major_updates).await,
        };

        let build = self.source.fetch_latest_build(target).await?;
        let download_url = self
            .source
            .build_download_url(target, build.build, &build.filename);

        info!("resolved {target} build {} ({})", build.build, build.filename);

        Ok(ResolvedArtifact {
            target_version_group: target,
            build: build.build,
            download_url,
            source_filename: build.filename,
            sha256: build.sha256,
        })
    }

    async fn target_for(&self, current: VersionGroup, allow_major_updates: bool) -> VersionGroup {
        let Some(candidate) = current.next_candidate(allow_major_updates) else {
            debug!("no candidate after {current} without major updates, staying");
            return current;
        };

        if self.source.probe_version_group_exists(candidate).await {
            debug!("version group {candidate} is published, upgrading from {current}");
            candidate
        } else {
            debug!("version group {candidate} not published yet, staying on {current}");
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use craftkeep_backend::BuildInfo;

    use super::*;

    struct MockSource {
        latest_release: Result<Version, ReleaseError>,
        published: Vec<VersionGroup>,
        probes: Mutex<Vec<VersionGroup>>,
        build_fetches: Mutex<Vec<VersionGroup>>,
        empty_groups: Vec<VersionGroup>,
    }

    impl MockSource {
        fn new(latest_release: Version, published: &[VersionGroup]) -> Self {
            Self {
                latest_release: Ok(latest_release),
                published: published.to_vec(),
                probes: Mutex::new(Vec::new()),
                build_fetches: Mutex::new(Vec::new()),
                empty_groups: Vec::new(),
            }
        }

        fn probes(&self) -> Vec<VersionGroup> {
            self.probes.lock().expect("probe log lock").clone()
        }
    }

    #[async_trait]
    impl ReleaseSource for MockSource {
        async fn fetch_latest_upstream_release(&self) -> Result<Version, ReleaseError> {
            self.latest_release.clone()
        }

        async fn probe_version_group_exists(&self, group: VersionGroup) -> bool {
            self.probes.lock().expect("probe log lock").push(group);
            self.published.contains(&group)
        }

        async fn fetch_latest_build(&self, group: VersionGroup) -> Result<BuildInfo, ReleaseError> {
            self.build_fetches
                .lock()
                .expect("fetch log lock")
                .push(group);
            if self.empty_groups.contains(&group) {
                return Err(ReleaseError::NoBuildsAvailable { group });
            }
            let build = group.minor.wrapping_mul(10);
            Ok(BuildInfo {
                build,
                filename: format!("paper-{group}-{build}.jar"),
                sha256: None,
            })
        }

        fn build_download_url(&self, group: VersionGroup, build: u32, filename: &str) -> String {
            format!("https://dl.test/versions/{group}/builds/{build}/downloads/{filename}")
        }
    }

    fn installed(version: &str) -> InstallState {
        let mut state = InstallState::default();
        state.current_version = Some(version.parse().expect("valid version"));
        state.installed = true;
        state.install_timestamp = Some(Utc::now());
        state
    }

    fn policy(allow_major_updates: bool) -> MaintenancePolicy {
        MaintenancePolicy {
            allow_major_updates,
            ..MaintenancePolicy::default()
        }
    }

    #[tokio::test]
    async fn fresh_install_targets_latest_release_group() {
        let source = MockSource::new(Version::new(1, 20, Some(4)), &[]);
        let resolver = VersionResolver::new(source);

        let artifact = resolver
            .resolve_next(&InstallState::default(), &policy(false))
            .await
            .expect("resolution succeeds");

        assert_eq!(artifact.target_version_group, VersionGroup::new(1, 20));
        assert_eq!(artifact.build, 200);
        assert_eq!(artifact.source_filename, "paper-1.20-200.jar");
        assert_eq!(
            artifact.download_url,
            "https://dl.test/versions/1.20/builds/200/downloads/paper-1.20-200.jar"
        );
        assert!(resolver.source().probes().is_empty());
    }

    #[tokio::test]
    async fn stays_in_group_when_next_group_is_unpublished() {
        let source = MockSource::new(Version::new(1, 21, Some(1)), &[]);
        let resolver = VersionResolver::new(source);

        let artifact = resolver
            .resolve_next(&installed("1.20.4:400"), &policy(false))
            .await
            .expect("resolution succeeds");

        assert_eq!(artifact.target_version_group, VersionGroup::new(1, 20));
        assert_eq!(resolver.source().probes(), vec![VersionGroup::new(1, 21)]);
    }

    #[tokio::test]
    async fn minor_rollover_does_not_need_major_gate() {
        for allow in [false, true] {
            let source = MockSource::new(Version::new(1, 21, None), &[VersionGroup::new(1, 21)]);
            let resolver = VersionResolver::new(source);

            let artifact = resolver
                .resolve_next(&installed("1.20:400"), &policy(allow))
                .await
                .expect("resolution succeeds");

            assert_eq!(artifact.target_version_group, VersionGroup::new(1, 21));
            assert_eq!(artifact.version(), Version::new(1, 21, None).with_build(210));
        }
    }

    #[tokio::test]
    async fn probes_exactly_one_group_per_call() {
        let source = MockSource::new(
            Version::new(1, 22, None),
            &[VersionGroup::new(1, 21), VersionGroup::new(1, 22)],
        );
        let resolver = VersionResolver::new(source);

        let artifact = resolver
            .resolve_next(&installed("1.20.6"), &policy(true))
            .await
            .expect("resolution succeeds");

        assert_eq!(artifact.target_version_group, VersionGroup::new(1, 21));
        assert_eq!(resolver.source().probes(), vec![VersionGroup::new(1, 21)]);
    }

    #[tokio::test]
    async fn exhausted_minor_without_gate_stays_without_probing() {
        let source = MockSource::new(Version::new(2, 0, None), &[VersionGroup::new(2, 0)]);
        let resolver = VersionResolver::new(source);
        let current = Version::new(1, u32::MAX, None);

        let artifact = resolver
            .resolve_from(Some(&current), false)
            .await
            .expect("resolution succeeds");

        assert_eq!(artifact.target_version_group, VersionGroup::new(1, u32::MAX));
        assert!(resolver.source().probes().is_empty());

        let artifact = resolver
            .resolve_from(Some(&current), true)
            .await
            .expect("resolution succeeds");
        assert_eq!(artifact.target_version_group, VersionGroup::new(2, 0));
        assert_eq!(resolver.source().probes(), vec![VersionGroup::new(2, 0)]);
    }

    #[tokio::test]
    async fn upstream_errors_propagate_unchanged() {
        let mut source = MockSource::new(Version::new(1, 20, None), &[]);
        source.latest_release = Err(ReleaseError::malformed("latest release 1.21 missing"));
        let resolver = VersionResolver::new(source);

        let result = resolver
            .resolve_next(&InstallState::default(), &policy(false))
            .await;

        assert_eq!(
            result,
            Err(ReleaseError::malformed("latest release 1.21 missing"))
        );
        assert!(
            resolver
                .source()
                .build_fetches
                .lock()
                .expect("fetch log lock")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn empty_build_list_propagates_no_builds() {
        let mut source = MockSource::new(Version::new(1, 21, None), &[VersionGroup::new(1, 21)]);
        source.empty_groups.push(VersionGroup::new(1, 21));
        let resolver = VersionResolver::new(source);

        let result = resolver
            .resolve_next(&installed("1.20.4"), &policy(false))
            .await;

        assert_eq!(
            result,
            Err(ReleaseError::NoBuildsAvailable {
                group: VersionGroup::new(1, 21)
            })
        );
    }
}
