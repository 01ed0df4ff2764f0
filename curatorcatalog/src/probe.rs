//! Headless duration probing of audio sources

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RANGE;
use reqwest::Client;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Bytes of a source read by [`HttpDurationProbe`]; container headers are
/// expected to fit in this prefix
pub const PROBE_WINDOW_BYTES: usize = 256 * 1024;

/// Resolves the playable length of an audio source
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the source in seconds
    async fn probe(&self, url: &str) -> Result<f64>;
}

/// Probes never fail the caller: any error, or an empty URL, yields 0
pub async fn probe_or_zero(probe: &dyn DurationProbe, url: &str) -> f64 {
    if url.trim().is_empty() {
        return 0.0;
    }
    match probe.probe(url).await {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => seconds,
        Ok(seconds) => {
            warn!("Probe returned an invalid duration {} for {}", seconds, url);
            0.0
        }
        Err(e) => {
            warn!("Failed to probe duration of {}: {}", url, e);
            0.0
        }
    }
}

/// Probe that skips I/O and reports an unknown duration
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipProbe;

#[async_trait]
impl DurationProbe for SkipProbe {
    async fn probe(&self, _url: &str) -> Result<f64> {
        Ok(0.0)
    }
}

/// Reads the head of the source and its container header with symphonia
///
/// At most [`PROBE_WINDOW_BYTES`] are requested with a `Range` header and read
/// from the body, whether or not the server honours the range. Formats whose
/// length is not declared in that prefix fail to probe.
#[derive(Debug, Clone)]
pub struct HttpDurationProbe {
    client: Client,
}

impl HttpDurationProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// First [`PROBE_WINDOW_BYTES`] of `url`; the rest of the body is never read
    async fn read_head(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", PROBE_WINDOW_BYTES - 1))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(status.as_u16(), status.to_string()));
        }

        let mut head = Vec::with_capacity(PROBE_WINDOW_BYTES.min(64 * 1024));
        while let Some(chunk) = response.chunk().await? {
            let room = PROBE_WINDOW_BYTES - head.len();
            if chunk.len() >= room {
                head.extend_from_slice(&chunk[..room]);
                debug!("Stopped reading {} after {} bytes", url, head.len());
                break;
            }
            head.extend_from_slice(&chunk);
        }
        Ok(head)
    }
}

#[async_trait]
impl DurationProbe for HttpDurationProbe {
    async fn probe(&self, url: &str) -> Result<f64> {
        debug!("Probing duration of {}", url);
        let bytes = self.read_head(url).await?;
        let extension = extension_of(url);

        tokio::task::spawn_blocking(move || duration_from_bytes(bytes, extension.as_deref()))
            .await
            .map_err(|e| Error::Probe(format!("probe task failed: {e}")))?
    }
}

fn extension_of(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Read the duration of an in-memory audio file from its container header
pub fn duration_from_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<f64> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Probe(format!("failed to probe format: {e}")))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Probe("no audio track found".to_string()))?;

    let params = &track.codec_params;
    let frames = params
        .n_frames
        .ok_or_else(|| Error::Probe("unknown frame count".to_string()))?;

    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    match params.sample_rate {
        Some(rate) if rate > 0 => Ok(frames as f64 / rate as f64),
        _ => Err(Error::Probe("unknown time base".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_a_probe_error() {
        let err = duration_from_bytes(b"definitely not audio".to_vec(), None).unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("https://cdn/x/a.MP3?sig=1").as_deref(), Some("mp3"));
        assert_eq!(extension_of("https://cdn/x/stream"), None);
    }

    struct FailingProbe;

    #[async_trait]
    impl DurationProbe for FailingProbe {
        async fn probe(&self, _url: &str) -> Result<f64> {
            Err(Error::other("boom"))
        }
    }

    #[tokio::test]
    async fn test_probe_or_zero() {
        assert_eq!(probe_or_zero(&FailingProbe, "https://cdn/a.mp3").await, 0.0);
        assert_eq!(probe_or_zero(&FailingProbe, "").await, 0.0);
        assert_eq!(probe_or_zero(&SkipProbe, "https://cdn/a.mp3").await, 0.0);
    }
}
