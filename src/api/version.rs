//! API versions and the namespace-to-version mapping.
//!
//! Controllers for a version live in a module named after it: `v0_9` holds
//! version 0.9, exposed as `v0.9` under `/api/v0.9`. The mapping is built
//! once from the controller modules' `module_path!()` and never changes.

use std::collections::BTreeMap;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum VersionError {
    #[error("Namespace '{namespace}' does not end in a version segment like v0_9")]
    #[diagnostic(code(mclaren::api::malformed_namespace))]
    MalformedNamespace { namespace: String },

    #[error("'{version}' is not a version like v0.9")]
    #[diagnostic(code(mclaren::api::malformed_version))]
    MalformedVersion { version: String },

    #[error("Namespaces '{first}' and '{second}' both claim version {version}")]
    #[diagnostic(code(mclaren::api::duplicate_version))]
    Duplicate {
        version: ApiVersion,
        first: String,
        second: String,
    },
}

/// Externally visible API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Version encoded in the last segment of a module path, e.g.
    /// `mclaren_api::api::v0_9`.
    pub fn from_namespace(namespace: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::MalformedNamespace {
            namespace: namespace.to_string(),
        };
        let segment = namespace.rsplit("::").next().ok_or_else(malformed)?;
        let digits = segment.strip_prefix('v').ok_or_else(malformed)?;
        let (major, minor) = digits.split_once('_').ok_or_else(malformed)?;
        Self::from_parts(major, minor).ok_or_else(malformed)
    }

    /// Parse a version token as it appears in URLs: `v0.9` or `0.9`.
    pub fn parse(token: &str) -> Result<Self, VersionError> {
        let digits = token
            .strip_prefix('v')
            .or_else(|| token.strip_prefix('V'))
            .unwrap_or(token);
        digits
            .split_once('.')
            .and_then(|(major, minor)| Self::from_parts(major, minor))
            .ok_or_else(|| VersionError::MalformedVersion {
                version: token.to_string(),
            })
    }

    fn from_parts(major: &str, minor: &str) -> Option<Self> {
        let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !numeric(major) || !numeric(minor) {
            return None;
        }
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Group name used in URLs and documentation, e.g. `v0.9`.
    pub fn group_name(&self) -> String {
        format!("v{self}")
    }

    /// Route prefix for this version's controllers.
    pub fn path_prefix(&self) -> String {
        format!("/api/{}", self.group_name())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Immutable mapping from API version to the controller namespace serving it.
#[derive(Debug, Clone, Default)]
pub struct VersionMap {
    versions: BTreeMap<ApiVersion, &'static str>,
}

impl VersionMap {
    pub fn from_namespaces(namespaces: &[&'static str]) -> Result<Self, VersionError> {
        let mut versions = BTreeMap::new();
        for namespace in namespaces {
            let version = ApiVersion::from_namespace(namespace)?;
            if let Some(first) = versions.insert(version, *namespace) {
                return Err(VersionError::Duplicate {
                    version,
                    first: first.to_string(),
                    second: namespace.to_string(),
                });
            }
        }
        Ok(Self { versions })
    }

    /// The mapped version for a URL token, if any.
    pub fn resolve(&self, token: &str) -> Option<ApiVersion> {
        let version = ApiVersion::parse(token).ok()?;
        self.versions.contains_key(&version).then_some(version)
    }

    pub fn namespace(&self, version: ApiVersion) -> Option<&'static str> {
        self.versions.get(&version).copied()
    }

    /// Latest mapped version, surfaced as the documented default.
    pub fn latest(&self) -> Option<ApiVersion> {
        self.versions.keys().next_back().copied()
    }

    pub fn versions(&self) -> impl Iterator<Item = ApiVersion> + '_ {
        self.versions.keys().copied()
    }

    /// Value of the `api-supported-versions` header, e.g. `0.9`.
    pub fn supported(&self) -> String {
        self.versions
            .keys()
            .map(ApiVersion::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
