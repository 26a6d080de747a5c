use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use url::Url;

use crate::error::ArtifactError;

/// Download `url` and save it under `dest_dir` using the original filename.
/// Returns the full path of the saved file.
pub async fn download_file(
    client: &Client,
    url: &Url,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf, ArtifactError> {
    let dest_dir = dest_dir.as_ref();
    let filename = file_name_for(url);
    let dest_path = dest_dir.join(filename);

    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| ArtifactError::io(dest_dir, e))?;

    let download_err = |source: reqwest::Error| ArtifactError::Download {
        url: url.to_string(),
        source,
    };
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
                ArtifactError::NotFound(url.to_string())
            } else {
                download_err(e)
            }
        })?;
    let bytes = resp.bytes().await.map_err(download_err)?;
    fs::write(&dest_path, &bytes)
        .await
        .map_err(|e| ArtifactError::io(&dest_path, e))?;

    info!(url = %url, bytes = bytes.len(), path = %dest_path.display(), "downloaded");
    Ok(dest_path)
}

fn file_name_for(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download.csv")
}
