use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A `(major, minor)` release line, independent of patch and build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionGroup {
    pub major: u32,
    pub minor: u32,
}

impl VersionGroup {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The single group probed when looking for an upgrade.
    ///
    /// This is always `(major, minor + 1)`. Rolling over into the next major
    /// line only happens when the minor component is exhausted (`u32::MAX`),
    /// and only when `allow_major` is set. Real Minecraft version numbers never
    /// reach that bound, so in practice `allow_major` does not change the
    /// candidate.
    #[must_use]
    pub fn next_candidate(self, allow_major: bool) -> Option<Self> {
        match self.minor.checked_add(1) {
            Some(minor) => Some(Self::new(self.major, minor)),
            None if allow_major => self.major.checked_add(1).map(|major| Self::new(major, 0)),
            None => None,
        }
    }
}

impl fmt::Display for VersionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for VersionGroup {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version: Version = s.parse()?;
        if version.patch.is_some() || version.build.is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: s.trim().to_string(),
            });
        }
        Ok(version.group())
    }
}

/// An installed or upstream server version.
///
/// `patch` may be absent, in which case it matches any patch of the group.
/// `build` is a distribution build number and is only meaningful within one
/// version group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub build: Option<u32>,
}

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
            build: None,
        }
    }

    #[must_use]
    pub const fn with_build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    #[must_use]
    pub const fn group(&self) -> VersionGroup {
        VersionGroup::new(self.major, self.minor)
    }

    /// Release ordering: major, then minor, then patch, where an absent patch
    /// on either side compares equal to any patch. Builds are never compared.
    #[must_use]
    pub fn compare_release(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| match (self.patch, other.patch) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        if let Some(build) = self.build {
            write!(f, ":{build}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
    Build,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Build => write!(f, "build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected MAJOR.MINOR[.PATCH][:BUILD] format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} component: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
}

fn parse_component(value: &str, component: VersionComponent) -> Result<u32, VersionParseError> {
    value
        .parse()
        .map_err(|_| VersionParseError::InvalidComponent {
            component,
            value: value.to_string(),
        })
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VersionParseError::InvalidFormat {
            input: s.to_string(),
        };

        let (release, build) = match s.split_once(':') {
            Some((release, build)) => (release, Some(build)),
            None => (s, None),
        };

        let mut parts = release.split('.');
        let major = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let minor = parts.next().ok_or_else(invalid)?;
        let patch = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major: parse_component(major, VersionComponent::Major)?,
            minor: parse_component(minor, VersionComponent::Minor)?,
            patch: patch
                .map(|p| parse_component(p, VersionComponent::Patch))
                .transpose()?,
            build: build
                .map(|b| parse_component(b, VersionComponent::Build))
                .transpose()?,
        })
    }
}

/// One entry of a version group's build list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub build: u32,
    pub filename: String,
    pub sha256: Option<String>,
}

/// The outcome of a resolution: a concrete build and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub target_version_group: VersionGroup,
    pub build: u32,
    pub download_url: String,
    pub source_filename: String,
    pub sha256: Option<String>,
}

impl ResolvedArtifact {
    /// The version recorded once this artifact is installed: its group plus
    /// build, with the patch left open.
    #[must_use]
    pub fn version(&self) -> Version {
        Version::new(
            self.target_version_group.major,
            self.target_version_group.minor,
            None,
        )
        .with_build(self.build)
    }
}
