//! Streaming download of remote audio into a session-owned local file.
//!
//! The player is only ever pointed at local files: some upstreams serve
//! URLs the player cannot stream reliably, and a local copy is what makes
//! restart-based seeking possible at all. The body is streamed to disk
//! chunk by chunk, so memory use stays bounded no matter the track size.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::PlayerError;

/// Maps a declared Content-Type to a file extension hint for the player.
/// Unknown types fall back to `.mp3`, which the upstream serves most often.
fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("mp4") || content_type.contains("m4a") {
        ".m4a"
    } else if content_type.contains("flac") {
        ".flac"
    } else if content_type.contains("ogg") {
        ".ogg"
    } else {
        ".mp3"
    }
}

/// Fetches remote audio content into exclusively-owned local files.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    directory: PathBuf,
    user_agent: String,
    referer: String,
}

impl Downloader {
    pub fn new(
        directory: PathBuf,
        timeout: Duration,
        user_agent: String,
        referer: String,
    ) -> Result<Self, PlayerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PlayerError::download)?;
        Ok(Self {
            client,
            directory,
            user_agent,
            referer,
        })
    }

    /// Downloads `url` into a fresh file under the configured directory.
    ///
    /// Any network error, non-success response, or write failure removes
    /// the partial file before returning, so a failed fetch never leaves
    /// an orphan behind.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, PlayerError> {
        let mut request = self.client.get(url);
        if !self.user_agent.is_empty() {
            request = request.header(reqwest::header::USER_AGENT, &self.user_agent);
        }
        if !self.referer.is_empty() {
            request = request.header(reqwest::header::REFERER, &self.referer);
        }

        let response = request.send().await.map_err(PlayerError::download)?;
        if !response.status().is_success() {
            return Err(PlayerError::Download(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let suffix = extension_for(&content_type);

        let path = self
            .directory
            .join(format!("audio_{}{}", Uuid::new_v4().simple(), suffix));

        match self.stream_to_file(response, &path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, content_type = %content_type, "Download complete");
                Ok(path)
            }
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial download");
                }
                Err(err)
            }
        }
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        path: &Path,
    ) -> Result<u64, PlayerError> {
        let mut file = File::create(path).await.map_err(PlayerError::download)?;
        let mut stream = response.bytes_stream();
        let mut total: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(PlayerError::download)?;
            file.write_all(&chunk).await.map_err(PlayerError::download)?;
            total += chunk.len() as u64;
        }

        file.flush().await.map_err(PlayerError::download)?;
        Ok(total)
    }
}
