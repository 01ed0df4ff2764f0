//! Cache-aware audio source resolution

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use curatorcatalog::Track;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::store::TrackStore;

/// Where the audio of a track will be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Stream the catalog URL
    Remote { url: String },
    /// Read the offline copy
    Cached { track_id: String, path: PathBuf },
}

impl AudioSource {
    /// Display form; offline copies render as `cache://<track id>`
    pub fn uri(&self) -> String {
        match self {
            AudioSource::Remote { url } => url.clone(),
            AudioSource::Cached { track_id, .. } => format!("cache://{track_id}"),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, AudioSource::Cached { .. })
    }
}

/// Picks the offline copy of a track when the store has one
#[derive(Clone)]
pub struct SourceResolver {
    store: Arc<dyn TrackStore>,
    client: Client,
}

impl SourceResolver {
    pub fn new(store: Arc<dyn TrackStore>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self::with_client(store, client))
    }

    pub fn with_client(store: Arc<dyn TrackStore>, client: Client) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &Arc<dyn TrackStore> {
        &self.store
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Effective source of `track` for one playback
    ///
    /// The track itself is never modified.
    pub fn resolve(&self, track: &Track) -> AudioSource {
        let remote = || AudioSource::Remote {
            url: track.audio_url.clone(),
        };

        if track.id.is_empty() {
            return remote();
        }

        match self.store.get(&track.id) {
            Ok(Some(stored)) if stored.cached => match stored.local_path {
                Some(path) => {
                    debug!("Using offline copy of {} at {}", track.id, path.display());
                    AudioSource::Cached {
                        track_id: track.id.clone(),
                        path,
                    }
                }
                None => {
                    warn!("Track {} is flagged cached without a local path", track.id);
                    remote()
                }
            },
            Ok(_) => remote(),
            Err(e) => {
                warn!("Track store lookup failed for {}: {}", track.id, e);
                remote()
            }
        }
    }

    /// Check that `source` can be opened
    pub async fn verify(&self, source: &AudioSource) -> Result<()> {
        match source {
            AudioSource::Remote { url } => {
                if url.trim().is_empty() {
                    return Err(Error::unreachable(url, "empty URL"));
                }
                let response = self
                    .client
                    .head(url)
                    .send()
                    .await
                    .map_err(|e| Error::unreachable(url, e.to_string()))?;
                let status = response.status();
                debug!("HEAD {} -> {}", url, status);
                if !status.is_success() {
                    return Err(Error::unreachable(url, status.to_string()));
                }
                Ok(())
            }
            AudioSource::Cached { path, .. } => match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => Ok(()),
                Ok(_) => Err(Error::unreachable(source.uri(), "not a file")),
                Err(e) => Err(Error::unreachable(source.uri(), e.to_string())),
            },
        }
    }
}
