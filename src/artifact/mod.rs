// src/artifact/mod.rs
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::ArtifactError;

pub mod download;
pub mod local;

pub use local::LocalArtifactStore;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("name pattern should compile"));
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v(\d+)$").expect("version pattern should compile"));

/// One immutable version of a named artifact, e.g. `clean_sample.csv:v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alias {
    Latest,
    Version(u32),
}

/// A parsed `fetch` argument.
///
/// Named references look like `[entity/project/]name[:alias]` where the
/// alias is `latest` (the default) or `v<N>`. Any leading path segments are
/// ignored. `http://` and `https://` references are downloaded as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    Named { name: String, alias: Alias },
    Url(Url),
}

impl ArtifactRef {
    pub fn parse(reference: &str) -> Result<Self, ArtifactError> {
        let invalid = || ArtifactError::InvalidReference(reference.to_string());
        let trimmed = reference.trim();

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Url::parse(trimmed).map(ArtifactRef::Url).map_err(|_| invalid());
        }

        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        let (name, alias) = match last.split_once(':') {
            Some((name, alias)) => (name, alias),
            None => (last, "latest"),
        };
        validate_name(name).map_err(|_| invalid())?;

        let alias = if alias == "latest" {
            Alias::Latest
        } else {
            let n = VERSION_RE
                .captures(alias)
                .and_then(|c| c[1].parse().ok())
                .ok_or_else(invalid)?;
            Alias::Version(n)
        };
        Ok(ArtifactRef::Named {
            name: name.to_string(),
            alias,
        })
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), ArtifactError> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ArtifactError::InvalidReference(name.to_string()))
    }
}

/// Stored next to every published file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub file: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    pub fn id(&self) -> ArtifactId {
        ArtifactId {
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// A fetched input: where it landed locally and what it resolved to
/// (`name:vN` or the source URL), for lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    pub resolved: String,
}

/// The artifact storage/versioning service a run talks to.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Resolve `reference` to a local file. `NotFound` if it does not exist.
    async fn fetch(&self, reference: &str) -> Result<FetchedArtifact, ArtifactError>;

    /// Upload `path` as the next version of `name`. `Io` if the file is missing.
    async fn publish(
        &self,
        path: &Path,
        name: &str,
        kind: &str,
        description: &str,
    ) -> Result<ArtifactId, ArtifactError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, alias: Alias) -> ArtifactRef {
        ArtifactRef::Named {
            name: name.to_string(),
            alias,
        }
    }

    #[test]
    fn test_parse_named_references() {
        assert_eq!(
            ArtifactRef::parse("sample.csv:latest").unwrap(),
            named("sample.csv", Alias::Latest)
        );
        assert_eq!(
            ArtifactRef::parse("sample.csv").unwrap(),
            named("sample.csv", Alias::Latest)
        );
        assert_eq!(
            ArtifactRef::parse("team/nyc_airbnb/sample.csv:v3").unwrap(),
            named("sample.csv", Alias::Version(3))
        );
    }

    #[test]
    fn test_parse_url_reference() {
        match ArtifactRef::parse("https://example.com/data/sample1.csv").unwrap() {
            ArtifactRef::Url(u) => assert_eq!(u.path(), "/data/sample1.csv"),
            other => panic!("expected url, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "sample.csv:prod", "sample.csv:v", "..:v1", "a b:v1"] {
            assert!(
                matches!(
                    ArtifactRef::parse(bad),
                    Err(ArtifactError::InvalidReference(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_id_display() {
        let id = ArtifactId {
            name: "clean_sample.csv".into(),
            version: 2,
        };
        assert_eq!(id.to_string(), "clean_sample.csv:v2");
    }
}
