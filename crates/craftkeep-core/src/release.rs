use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use craftkeep_backend::{BuildInfo, ReleaseError, ReleaseSource, Version, VersionGroup};

pub const DEFAULT_VERSION_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";
pub const DEFAULT_DISTRIBUTION_BASE_URL: &str = "https://api.papermc.io/v2/projects/paper";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoints and HTTP limits for a [`ReleaseClient`].
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    pub version_manifest_url: String,
    pub distribution_base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version_manifest_url: DEFAULT_VERSION_MANIFEST_URL.to_string(),
            distribution_base_url: DEFAULT_DISTRIBUTION_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: format!("craftkeep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Deserialize)]
struct GlobalManifest {
    latest: LatestIds,
    versions: Vec<ManifestVersion>,
}

#[derive(Deserialize)]
struct LatestIds {
    release: String,
}

#[derive(Deserialize)]
struct ManifestVersion {
    id: String,
}

#[derive(Deserialize)]
struct BuildManifest {
    builds: Vec<RawBuild>,
}

#[derive(Deserialize)]
struct RawBuild {
    build: u32,
    downloads: RawDownloads,
}

#[derive(Deserialize)]
struct RawDownloads {
    application: RawApplication,
}

#[derive(Deserialize)]
struct RawApplication {
    name: String,
    #[serde(default)]
    sha256: Option<String>,
}

/// Extract the latest release from a global version manifest body.
///
/// # Errors
/// Returns [`ReleaseError::ManifestMalformed`] when required fields are
/// missing, when `latest.release` has no entry in `versions`, or when the
/// entry id is not a release version.
pub fn parse_latest_release(body: &str) -> Result<Version, ReleaseError> {
    let manifest: GlobalManifest = serde_json::from_str(body)
        .map_err(|e| ReleaseError::malformed(format!("version manifest: {e}")))?;

    let latest = manifest.latest.release;
    let entry = manifest
        .versions
        .iter()
        .find(|v| v.id == latest)
        .ok_or_else(|| {
            ReleaseError::malformed(format!(
                "latest release {latest} is not listed in versions"
            ))
        })?;

    entry
        .id
        .parse()
        .map_err(|e| ReleaseError::malformed(format!("latest release id {}: {e}", entry.id)))
}

/// Extract the newest build from a version group's build manifest body.
/// Builds are listed oldest first, so the newest is the last element.
///
/// # Errors
/// Returns [`ReleaseError::ManifestMalformed`] for an unexpected shape and
/// [`ReleaseError::NoBuildsAvailable`] for an empty build list.
pub fn parse_latest_build(body: &str, group: VersionGroup) -> Result<BuildInfo, ReleaseError> {
    let mut manifest: BuildManifest = serde_json::from_str(body)
        .map_err(|e| ReleaseError::malformed(format!("build manifest for {group}: {e}")))?;

    let latest = manifest
        .builds
        .pop()
        .ok_or(ReleaseError::NoBuildsAvailable { group })?;

    Ok(BuildInfo {
        build: latest.build,
        filename: latest.downloads.application.name,
        sha256: latest.downloads.application.sha256,
    })
}

/// Format `{base}/versions/{group}/builds/{build}/downloads/{filename}`.
#[must_use]
pub fn format_download_url(base: &str, group: VersionGroup, build: u32, filename: &str) -> String {
    format!(
        "{}/versions/{group}/builds/{build}/downloads/{filename}",
        base.trim_end_matches('/')
    )
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// HTTP client for the global version manifest and the distribution channel.
///
/// Redirects are not followed, so only a direct 2xx counts as success.
/// Dropping any returned future abandons the in-flight request.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    config: ReleaseConfig,
}

impl ReleaseClient {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    /// Returns [`ReleaseError::UpstreamUnavailable`] if the HTTP client
    /// cannot be constructed (for example when no TLS backend is usable).
    pub fn new(config: ReleaseConfig) -> Result<Self, ReleaseError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ReleaseError::upstream_from("build http client", e))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    fn group_url(&self, group: VersionGroup) -> String {
        format!(
            "{}/version_group/{group}",
            self.config.distribution_base_url.trim_end_matches('/')
        )
    }

    async fn get_text(&self, operation: &'static str, url: &str) -> Result<String, ReleaseError> {
        debug!("GET {url} ({operation})");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ReleaseError::upstream_from(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(ReleaseError::upstream(
                operation,
                format!("HTTP {status}{body_snippet}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ReleaseError::upstream_from(operation, e))
    }
}

#[async_trait]
impl ReleaseSource for ReleaseClient {
    async fn fetch_latest_upstream_release(&self) -> Result<Version, ReleaseError> {
        let body = self
            .get_text("fetch version manifest", &self.config.version_manifest_url)
            .await?;
        parse_latest_release(&body)
    }

    async fn probe_version_group_exists(&self, group: VersionGroup) -> bool {
        let url = self.group_url(group);
        match self.http.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!("probe {url} returned HTTP {status}");
                status.is_success()
            }
            Err(e) => {
                debug!("probe {url} failed, treating as absent: {e}");
                false
            }
        }
    }

    async fn fetch_latest_build(&self, group: VersionGroup) -> Result<BuildInfo, ReleaseError> {
        let url = format!("{}/builds", self.group_url(group));
        let body = self.get_text("fetch build manifest", &url).await?;
        parse_latest_build(&body, group)
    }

    fn build_download_url(&self, group: VersionGroup, build: u32, filename: &str) -> String {
        format_download_url(&self.config.distribution_base_url, group, build, filename)
    }
}
