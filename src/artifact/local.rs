use chrono::Utc;
use glob::{glob, Pattern};
use reqwest::Client;
use std::{
    fs as std_fs,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, info};

use crate::artifact::{
    download::download_file, validate_name, Alias, ArtifactId, ArtifactRef, ArtifactStore,
    FetchedArtifact, Manifest,
};
use crate::error::ArtifactError;

const MANIFEST_FILE: &str = "manifest.json";
const DOWNLOAD_DIR: &str = ".downloads";
const LEDGER_DIR: &str = ".runs";

/// Versioned artifacts on the local filesystem:
///
/// ```text
/// <root>/<name>/v<N>/<file>
/// <root>/<name>/v<N>/manifest.json
/// <root>/.downloads/            fetched URLs
/// <root>/.runs/                 run ledger
/// ```
///
/// Artifact names cannot start with a dot, so the dot directories never
/// collide with an artifact.
///
/// A version only exists once its manifest has been renamed into place.
pub struct LocalArtifactStore {
    root: PathBuf,
    client: Client,
}

impl LocalArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        std_fs::create_dir_all(&root).map_err(|e| ArtifactError::io(&root, e))?;
        Ok(Self {
            root,
            client: Client::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the run ledger lives inside this store.
    pub fn ledger_dir(&self) -> PathBuf {
        self.root.join(LEDGER_DIR)
    }

    fn version_dir(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(&id.name).join(format!("v{}", id.version))
    }

    /// All complete versions of `name`, ascending.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>, ArtifactError> {
        validate_name(name)?;
        let pattern = format!(
            "{}/{}/v*/{}",
            Pattern::escape(&self.root.display().to_string()),
            name,
            MANIFEST_FILE
        );
        let paths = glob(&pattern).map_err(|e| {
            ArtifactError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            )
        })?;

        let mut versions: Vec<u32> = paths
            .filter_map(Result::ok)
            .filter_map(|p| {
                let dir = p.parent()?.file_name()?.to_str()?;
                dir.strip_prefix('v')?.parse().ok()
            })
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// One past the highest version directory, complete or not.
    fn next_version(&self, name: &str) -> Result<u32, ArtifactError> {
        let dir = self.root.join(name);
        let entries = match std_fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ArtifactError::io(&dir, e)),
        };
        let highest = entries
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().to_str()?.strip_prefix('v')?.parse::<u32>().ok())
            .max();
        Ok(highest.map_or(0, |v| v + 1))
    }

    pub async fn manifest(&self, id: &ArtifactId) -> Result<Manifest, ArtifactError> {
        let path = self.version_dir(id).join(MANIFEST_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(id.to_string()))
            }
            Err(e) => return Err(ArtifactError::io(&path, e)),
        };
        serde_json::from_slice(&raw).map_err(|source| ArtifactError::Manifest { path, source })
    }

    fn resolve(&self, name: &str, alias: Alias) -> Result<ArtifactId, ArtifactError> {
        let versions = self.versions(name)?;
        let version = match alias {
            Alias::Latest => versions.last().copied(),
            Alias::Version(v) => versions.contains(&v).then_some(v),
        };
        version
            .map(|version| ArtifactId {
                name: name.to_string(),
                version,
            })
            .ok_or_else(|| match alias {
                Alias::Latest => ArtifactError::NotFound(format!("{}:latest", name)),
                Alias::Version(v) => ArtifactError::NotFound(format!("{}:v{}", name, v)),
            })
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn fetch(&self, reference: &str) -> Result<FetchedArtifact, ArtifactError> {
        match ArtifactRef::parse(reference)? {
            ArtifactRef::Url(url) => {
                let path = download_file(&self.client, &url, self.root.join(DOWNLOAD_DIR)).await?;
                Ok(FetchedArtifact {
                    path,
                    resolved: url.to_string(),
                })
            }
            ArtifactRef::Named { name, alias } => {
                let id = self.resolve(&name, alias)?;
                let manifest = self.manifest(&id).await?;
                let path = self.version_dir(&id).join(&manifest.file);
                if !fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(ArtifactError::NotFound(id.to_string()));
                }
                debug!(artifact = %id, path = %path.display(), "resolved");
                Ok(FetchedArtifact {
                    path,
                    resolved: id.to_string(),
                })
            }
        }
    }

    async fn publish(
        &self,
        path: &Path,
        name: &str,
        kind: &str,
        description: &str,
    ) -> Result<ArtifactId, ArtifactError> {
        validate_name(name)?;
        let meta = fs::metadata(path)
            .await
            .map_err(|e| ArtifactError::io(path, e))?;
        if !meta.is_file() {
            return Err(ArtifactError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(name)
            .to_string();

        let version = self.next_version(name)?;
        let id = ArtifactId {
            name: name.to_string(),
            version,
        };
        let dir = self.version_dir(&id);
        fs::create_dir_all(self.root.join(name))
            .await
            .map_err(|e| ArtifactError::io(self.root.join(name), e))?;
        // fails if another publish already claimed this version
        fs::create_dir(&dir)
            .await
            .map_err(|e| ArtifactError::io(&dir, e))?;

        let dest = dir.join(&file);
        let size_bytes = fs::copy(path, &dest)
            .await
            .map_err(|e| ArtifactError::io(&dest, e))?;

        let manifest = Manifest {
            name: name.to_string(),
            version,
            kind: kind.to_string(),
            description: description.to_string(),
            file,
            size_bytes,
            created_at: Utc::now(),
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        let body = serde_json::to_vec_pretty(&manifest).map_err(|source| {
            ArtifactError::Manifest {
                path: manifest_path.clone(),
                source,
            }
        })?;
        let tmp = dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp, &body)
            .await
            .map_err(|e| ArtifactError::io(&tmp, e))?;
        fs::rename(&tmp, &manifest_path)
            .await
            .map_err(|e| ArtifactError::io(&manifest_path, e))?;

        info!(artifact = %id, kind, bytes = size_bytes, "published");
        Ok(id)
    }
}
