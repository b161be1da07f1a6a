use thiserror::Error;

use crate::types::VersionGroup;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("Upstream unavailable during {operation}: {details}")]
    UpstreamUnavailable {
        operation: &'static str,
        details: String,
    },

    #[error("Malformed manifest: {details}")]
    ManifestMalformed { details: String },

    #[error("No builds available for version group {group}")]
    NoBuildsAvailable { group: VersionGroup },
}

impl ReleaseError {
    pub fn upstream(operation: &'static str, details: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            operation,
            details: details.into(),
        }
    }

    pub fn upstream_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::upstream(operation, error.to_string())
    }

    pub fn malformed(details: impl Into<String>) -> Self {
        Self::ManifestMalformed {
            details: details.into(),
        }
    }
}
