//! Episode download with manual redirect handling and a one-shot mirror
//! fallback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::{header, redirect, Client, Response, StatusCode, Url};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::episode::Episode;
use crate::error::BatchError;

/// What happened to one episode's download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The destination was already on disk; nothing was fetched.
    AlreadyPresent,
    /// The body was written to the destination.
    Downloaded { final_url: String, bytes: u64 },
    /// Gave up on this episode; the batch carries on.
    Failed { url: String, error: String },
}

impl DownloadOutcome {
    pub fn error(&self) -> Option<&str> {
        match self {
            DownloadOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub struct Downloader {
    client: Client,
    mirror_base: String,
    max_redirects: usize,
}

impl Downloader {
    pub fn new(source: &SourceConfig) -> Result<Self, BatchError> {
        // Redirects are followed by hand so every hop gets logged and the
        // Location header can be cleaned up first.
        let mut builder = Client::builder().redirect(redirect::Policy::none());
        if let Some(secs) = source.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(BatchError::Client)?;

        Ok(Self {
            client,
            mirror_base: source.mirror_base.clone(),
            max_redirects: source.max_redirects,
        })
    }

    /// Mirror location for a filename: `<mirror-base>/<name>`.
    pub fn mirror_url(&self, name: &str) -> String {
        format!("{}/{}", self.mirror_base.trim_end_matches('/'), name)
    }

    /// Fetch `episode` to its destination.
    ///
    /// Connection failures, 403s, broken redirects and write errors come back
    /// as [`DownloadOutcome::Failed`]. Any status other than 200, 301, 302,
    /// 303 or 403 aborts the batch.
    pub async fn download(&self, episode: &Episode) -> Result<DownloadOutcome, BatchError> {
        if episode.destination.exists() {
            info!("{} already downloaded. Skipping.", episode.derived_name);
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let mut url = episode.source_url.clone();
        let mut failures = 0;
        let mut redirects = 0;

        loop {
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    failures += 1;
                    let error = format!("Failure while getting file: {}. Source url: {}", e, url);
                    if failures > 1 {
                        warn!("{}", error);
                        return Ok(DownloadOutcome::Failed { url, error });
                    }
                    url = self.mirror_url(&episode.derived_name);
                    warn!("{}. Trying {} instead.", error, url);
                    continue;
                }
            };

            let status = response.status();
            match status {
                StatusCode::OK => {
                    info!("{}: Downloading {}", episode.discovery_index, episode.derived_name);
                    return Ok(match write_body(response, &episode.destination).await {
                        Ok(bytes) => DownloadOutcome::Downloaded {
                            final_url: url,
                            bytes,
                        },
                        Err(e) => {
                            let error = format!("Failed to save {}: {:#}", url, e);
                            warn!("{}", error);
                            DownloadOutcome::Failed { url, error }
                        }
                    });
                }
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => {
                    redirects += 1;
                    if redirects > self.max_redirects {
                        let error = format!("Too many redirects ({}) at {}", self.max_redirects, url);
                        warn!("{}", error);
                        return Ok(DownloadOutcome::Failed { url, error });
                    }
                    let location = response
                        .headers()
                        .get(header::LOCATION)
                        .and_then(|v| v.to_str().ok());
                    match location.and_then(|loc| resolve_location(&url, loc)) {
                        Some(next) => {
                            url = next;
                            info!("Redirecting to {}", url);
                        }
                        None => {
                            let error = format!("Redirect from {} has no usable Location", url);
                            warn!("{}", error);
                            return Ok(DownloadOutcome::Failed { url, error });
                        }
                    }
                }
                StatusCode::FORBIDDEN => {
                    let error = format!("Access denied to {}", url);
                    warn!("{}", error);
                    return Ok(DownloadOutcome::Failed { url, error });
                }
                _ => return Err(BatchError::UnexpectedStatus { url, status }),
            }
        }
    }
}

/// Next hop for a `Location` value. Spaces are encoded and relative
/// locations resolved against `current`.
fn resolve_location(current: &str, location: &str) -> Option<String> {
    let location = location.trim().replace(' ', "%20");
    if location.is_empty() {
        return None;
    }

    match Url::parse(&location) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Url::parse(current)
            .and_then(|base| base.join(&location))
            .map(|u| u.to_string())
            .ok(),
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Stream the body next to `destination` and move it into place once
/// complete, so a half-written file never looks like a finished download.
async fn write_body(response: Response, destination: &Path) -> Result<u64> {
    let part = part_path(destination);

    let bytes = match stream_to_file(response, &part).await {
        Ok(bytes) => bytes,
        Err(e) => {
            discard_part(&part).await;
            return Err(e);
        }
    };
    commit_part(&part, destination).await?;
    debug!("Wrote {} bytes to {}", bytes, destination.display());
    Ok(bytes)
}

/// Rename a finished `.part` file onto `destination`. The part file is
/// removed if the rename fails.
async fn commit_part(part: &Path, destination: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::rename(part, destination).await {
        discard_part(part).await;
        return Err(e).with_context(|| format!("Failed to move {} into place", part.display()));
    }
    Ok(())
}

async fn discard_part(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        debug!("Could not remove {}: {}", part.display(), e);
    }
}

async fn stream_to_file(response: Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Failed to read response body")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader(mirror_base: &str) -> Downloader {
        Downloader::new(&SourceConfig {
            mirror_base: mirror_base.to_string(),
            ..SourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mirror_url() {
        let d = downloader("https://mirror.example/podcasts/");
        assert_eq!(
            d.mirror_url("2005-3-talk.mp3"),
            "https://mirror.example/podcasts/2005-3-talk.mp3"
        );
        let d = downloader("https://mirror.example/podcasts");
        assert_eq!(d.mirror_url("a.mp3"), "https://mirror.example/podcasts/a.mp3");
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("http://a.example/x/old.mp3", "http://b.example/Oct 6.mp3").as_deref(),
            Some("http://b.example/Oct%206.mp3")
        );
        assert_eq!(
            resolve_location("http://a.example/x/old.mp3", "/y/new file.mp3").as_deref(),
            Some("http://a.example/y/new%20file.mp3")
        );
        assert_eq!(
            resolve_location("http://a.example/x/old.mp3", "sibling.mp3").as_deref(),
            Some("http://a.example/x/sibling.mp3")
        );
        assert_eq!(resolve_location("http://a.example/", "  "), None);
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/t/2009/a.mp3")),
            PathBuf::from("/t/2009/a.mp3.part")
        );
    }

    #[tokio::test]
    async fn test_commit_part_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.mp3");
        let part = part_path(&destination);
        std::fs::write(&part, b"body").unwrap();

        commit_part(&part, &destination).await.unwrap();
        assert!(!part.exists());
        assert_eq!(std::fs::read(&destination).unwrap(), b"body");
    }

    #[tokio::test]
    async fn test_failed_commit_removes_part() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the rename fail.
        let destination = dir.path().join("a.mp3");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep"), b"x").unwrap();
        let part = part_path(&destination);
        std::fs::write(&part, b"body").unwrap();

        let err = commit_part(&part, &destination).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to move"));
        assert!(!part.exists());
        assert!(destination.join("keep").exists());
    }

    #[test]
    fn test_no_connect_timeout_by_default() {
        assert_eq!(SourceConfig::default().connect_timeout_secs, None);
        let d = Downloader::new(&SourceConfig {
            connect_timeout_secs: Some(5),
            ..SourceConfig::default()
        });
        assert!(d.is_ok());
    }

    #[test]
    fn test_outcome_error() {
        let failed = DownloadOutcome::Failed {
            url: "u".into(),
            error: "Access denied to u".into(),
        };
        assert_eq!(failed.error(), Some("Access denied to u"));
        assert_eq!(DownloadOutcome::AlreadyPresent.error(), None);
    }

    #[tokio::test]
    async fn test_existing_destination_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut ep = crate::episode::sample(1, 2009, 1);
        ep.destination = dir.path().join("2009-1-talk-1.mp3");
        std::fs::write(&ep.destination, b"already here").unwrap();
        // Unroutable URL: any network attempt would fail.
        ep.source_url = "http://127.0.0.1:9/never".to_string();

        let outcome = downloader("http://127.0.0.1:9").download(&ep).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(&ep.destination).unwrap(), b"already here");
    }
}
