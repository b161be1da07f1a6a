use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use craftkeep_backend::{ResolvedArtifact, SettingsStore, Version};

use crate::error::SettingsError;
use crate::store::{load_section, save_section};

pub const INSTALL_SECTION: &str = "install";

/// What is installed for one server instance.
///
/// `installed` is only ever set by [`InstallState::record_install`]; files on
/// disk alone never make a server count as installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallState {
    pub current_version: Option<Version>,
    pub installed: bool,
    pub install_timestamp: Option<DateTime<Utc>>,
}

/// Persisted shape of the `install` section.
#[derive(Debug, Default, Serialize, Deserialize)]
struct InstallRecord {
    #[serde(default)]
    major: Option<u32>,
    #[serde(default)]
    minor: Option<u32>,
    #[serde(default)]
    patch: Option<u32>,
    #[serde(default)]
    build: Option<u32>,
    #[serde(default)]
    version_group: Option<String>,
    #[serde(default)]
    install_date: String,
    #[serde(default)]
    installed: bool,
}

impl InstallState {
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        self.installed
    }

    /// Installed check that also looks at the server directory.
    ///
    /// A missing or empty directory means not installed. A populated
    /// directory still needs the recorded install marker.
    #[must_use]
    pub fn is_installed_at(&self, server_root: &Path) -> bool {
        let has_contents = std::fs::read_dir(server_root)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        has_contents && self.installed
    }

    /// Mark `artifact` as installed at `timestamp`, replacing every field at
    /// once.
    pub fn record_install(&mut self, artifact: &ResolvedArtifact, timestamp: DateTime<Utc>) {
        *self = Self {
            current_version: Some(artifact.version()),
            installed: true,
            install_timestamp: Some(timestamp),
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Human-readable installed version, e.g. `1.20.4:496`.
    #[must_use]
    pub fn version_label(&self) -> String {
        match (&self.current_version, self.installed) {
            (Some(version), true) => version.to_string(),
            _ => "not installed".to_string(),
        }
    }

    /// Load the `install` section.
    ///
    /// # Errors
    /// Returns [`SettingsError::StateCorrupt`] when the persisted section is
    /// inconsistent, or a store error.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        let record: InstallRecord = load_section(store, INSTALL_SECTION)?;
        Self::from_record(record)
    }

    /// Replace the `install` section with this state.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &S) -> Result<(), SettingsError> {
        save_section(store, INSTALL_SECTION, &self.to_record())
    }

    /// Record an install and persist it in a single section write.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write; nothing is persisted
    /// in that case.
    pub fn commit_install<S: SettingsStore + ?Sized>(
        store: &S,
        artifact: &ResolvedArtifact,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, SettingsError> {
        let mut state = Self::default();
        state.record_install(artifact, timestamp);
        state.save(store)?;
        info!("recorded install of {}", state.version_label());
        Ok(state)
    }

    /// Persist the empty, never-installed state.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub fn commit_reset<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        let state = Self::default();
        state.save(store)?;
        info!("install state reset");
        Ok(state)
    }

    fn from_record(record: InstallRecord) -> Result<Self, SettingsError> {
        let corrupt = |details: String| SettingsError::corrupt(INSTALL_SECTION, details);

        let current_version = match (record.major, record.minor) {
            (Some(major), Some(minor)) => Some(Version {
                major,
                minor,
                patch: record.patch,
                build: record.build,
            }),
            (None, None) if record.patch.is_none() && record.build.is_none() => None,
            _ => return Err(corrupt("version needs both major and minor".to_string())),
        };

        if let (Some(group), Some(version)) = (&record.version_group, &current_version)
            && *group != version.group().to_string()
        {
            return Err(corrupt(format!(
                "version_group {group} does not match {}",
                version.group()
            )));
        }

        let install_timestamp = if record.install_date.trim().is_empty() {
            None
        } else {
            let parsed = DateTime::parse_from_rfc3339(record.install_date.trim())
                .map_err(|e| corrupt(format!("install_date {}: {e}", record.install_date)))?;
            Some(parsed.with_timezone(&Utc))
        };

        if record.installed && (current_version.is_none() || install_timestamp.is_none()) {
            return Err(corrupt(
                "installed is set without a version and install_date".to_string(),
            ));
        }

        Ok(Self {
            current_version,
            installed: record.installed,
            install_timestamp,
        })
    }

    fn to_record(&self) -> InstallRecord {
        let version = self.current_version.as_ref();
        InstallRecord {
            major: version.map(|v| v.major),
            minor: version.map(|v| v.minor),
            patch: version.and_then(|v| v.patch),
            build: version.and_then(|v| v.build),
            version_group: version.map(|v| v.group().to_string()),
            install_date: self
                .install_timestamp
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            installed: self.installed,
        }
    }
}
