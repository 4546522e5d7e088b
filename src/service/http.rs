use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::foundation::error::{VideogenError, VideogenResult};
use crate::service::{InitSession, LyricSource, RenderService};

/// Deadline for every HTTP exchange, resource downloads included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct InitRequest<'a> {
    id: &'a str,
    source: &'a str,
}

#[derive(Deserialize)]
struct InitResponse {
    session_id: Option<String>,
    audio_url: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct FrameBatchRequest<'a> {
    session_id: &'a str,
    frames: &'a [String],
    start_idx: u64,
}

#[derive(Deserialize, Default)]
struct FrameBatchResponse {
    error: Option<String>,
}

#[derive(Serialize)]
struct FinishRequest<'a> {
    session_id: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct FinishResponse {
    url: Option<String>,
    error: Option<String>,
}

/// JSON-over-HTTP render server client.
pub struct HttpRenderService {
    client: reqwest::blocking::Client,
    api_root: String,
}

impl HttpRenderService {
    /// Client for the server rooted at `api_root` (no trailing slash).
    pub fn new(api_root: impl Into<String>) -> VideogenResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_root: api_root.into(),
        })
    }

    fn map_transport(e: reqwest::Error, what: &str) -> VideogenError {
        if e.is_timeout() {
            VideogenError::timeout(format!("{what} timed out"))
        } else {
            VideogenError::session(format!("{what} failed: {e}"))
        }
    }
}

impl RenderService for HttpRenderService {
    fn init(&self, track_id: &str, source: &str) -> VideogenResult<InitSession> {
        let url = format!("{}/videogen/init", self.api_root);
        let resp: InitResponse = self
            .client
            .post(&url)
            .json(&InitRequest {
                id: track_id,
                source,
            })
            .send()
            .map_err(|e| Self::map_transport(e, "session init"))?
            .json()
            .map_err(|e| VideogenError::session(format!("session init returned bad json: {e}")))?;

        if let Some(err) = resp.error {
            return Err(VideogenError::session(err));
        }
        match (resp.session_id, resp.audio_url) {
            (Some(session_id), Some(audio_url)) => {
                debug!(session_id, "render session opened");
                Ok(InitSession {
                    session_id,
                    audio_url,
                })
            }
            _ => Err(VideogenError::session(
                "session init response missing session_id or audio_url",
            )),
        }
    }

    fn fetch_audio(&self, url: &str) -> VideogenResult<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| Self::map_transport(e, "audio fetch"))?;
        if !resp.status().is_success() {
            return Err(VideogenError::session(format!(
                "audio fetch returned {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| Self::map_transport(e, "audio fetch"))?;
        Ok(bytes.to_vec())
    }

    fn upload_batch(
        &self,
        session_id: &str,
        frames: &[String],
        start_idx: u64,
    ) -> VideogenResult<()> {
        let url = format!("{}/videogen/frame", self.api_root);
        let resp = self
            .client
            .post(&url)
            .json(&FrameBatchRequest {
                session_id,
                frames,
                start_idx,
            })
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    VideogenError::timeout("frame upload timed out")
                } else {
                    VideogenError::upload(format!("frame upload failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(VideogenError::upload(format!(
                "frame upload returned {}",
                resp.status()
            )));
        }
        let body: FrameBatchResponse = resp.json().unwrap_or_default();
        if let Some(err) = body.error {
            return Err(VideogenError::upload(err));
        }
        Ok(())
    }

    fn finalize(&self, session_id: &str, title: &str) -> VideogenResult<String> {
        let url = format!("{}/videogen/finish", self.api_root);
        let resp: FinishResponse = self
            .client
            .post(&url)
            .json(&FinishRequest {
                session_id,
                name: title,
            })
            .send()
            .map_err(|e| Self::map_transport(e, "finalize"))?
            .json()
            .map_err(|e| VideogenError::session(format!("finalize returned bad json: {e}")))?;

        if let Some(err) = resp.error {
            return Err(VideogenError::session(err));
        }
        resp.url
            .ok_or_else(|| VideogenError::session("finalize response missing url"))
    }
}

/// HTTP lyric provider (`GET {api_root}/lyric?id=..&source=..` returns LRC
/// text).
pub struct HttpLyricSource {
    client: reqwest::blocking::Client,
    api_root: String,
}

impl HttpLyricSource {
    /// Client for the lyric endpoint rooted at `api_root`.
    pub fn new(api_root: impl Into<String>) -> VideogenResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_root: api_root.into(),
        })
    }
}

impl LyricSource for HttpLyricSource {
    fn fetch_lyrics(&self, track_id: &str, source: &str) -> VideogenResult<String> {
        let url = format!("{}/lyric", self.api_root);
        let resp = self
            .client
            .get(&url)
            .query(&[("id", track_id), ("source", source)])
            .send()
            .map_err(|e| HttpRenderService::map_transport(e, "lyric fetch"))?;
        if !resp.status().is_success() {
            // Missing lyrics are an empty document, not a failure.
            return Ok(String::new());
        }
        resp.text()
            .map_err(|e| HttpRenderService::map_transport(e, "lyric fetch"))
    }
}
