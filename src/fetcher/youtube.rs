use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{ErrorKind, FetchError, TranscriptSnippet, TranscriptSource};
use crate::config::FetchConfig;

const WATCH_URL: &str = "https://www.youtube.com/watch";

/// YouTube transcript source using yt-dlp for caption discovery
pub struct YtDlpSource {
    yt_dlp_path: String,
    languages: Vec<String>,
    client: Client,
}

/// A caption track picked from the yt-dlp info JSON
#[derive(Debug, Clone, PartialEq)]
struct CaptionTrack {
    language: String,
    url: String,
    generated: bool,
}

#[derive(Debug, Deserialize)]
struct Json3Transcript {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

impl YtDlpSource {
    pub fn new(yt_dlp_path: impl Into<String>, languages: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            yt_dlp_path: yt_dlp_path.into(),
            languages,
            client,
        })
    }

    pub fn from_config(config: &FetchConfig) -> anyhow::Result<Self> {
        Self::new(
            config.yt_dlp_path.clone(),
            config.languages.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Get video information using yt-dlp
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_video_info(&self, video_id: &str) -> Result<Value, FetchError> {
        tracing::debug!("Fetching caption tracks");

        let url = format!("{}?v={}", WATCH_URL, video_id);
        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", &url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed out attempt drops this future; the child must not outlive it
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::new(
                        ErrorKind::Unavailable,
                        format!("{} is not installed: https://github.com/yt-dlp/yt-dlp", self.yt_dlp_path),
                    )
                } else {
                    FetchError::new(ErrorKind::Unknown, format!("failed to run {}: {}", self.yt_dlp_path, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::new(classify_stderr(&stderr), stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| FetchError::new(ErrorKind::Unknown, format!("invalid yt-dlp output: {}", e)))
    }

    /// Download a json3 caption track and split it into snippets
    async fn download_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSnippet>, FetchError> {
        tracing::debug!(
            language = %track.language,
            generated = track.generated,
            "Downloading caption track"
        );

        let response = self
            .client
            .get(&track.url)
            .send()
            .await
            .map_err(|e| FetchError::new(ErrorKind::Unknown, format!("caption download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                classify_status(status),
                format!("caption download failed: HTTP {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(ErrorKind::Unknown, format!("failed to read captions: {}", e)))?;

        parse_json3(&body)
    }
}

#[async_trait]
impl TranscriptSource for YtDlpSource {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptSnippet>, FetchError> {
        let info = self.get_video_info(video_id).await?;
        let track = select_track(&info, &self.languages)?;
        self.download_track(&track).await
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Map yt-dlp error output onto the failure taxonomy
pub fn classify_stderr(stderr: &str) -> ErrorKind {
    let lower = stderr.to_lowercase();

    if lower.contains("http error 429") || lower.contains("too many requests") || lower.contains("rate-limit") {
        ErrorKind::RateLimited
    } else if lower.contains("disabled") || lower.contains("members-only") || lower.contains("join this channel") {
        ErrorKind::Disabled
    } else if lower.contains("private video")
        || lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("has been removed")
        || lower.contains("incomplete youtube id")
        || lower.contains("is not a valid url")
    {
        ErrorKind::Unavailable
    } else {
        ErrorKind::Unknown
    }
}

fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
        StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN => ErrorKind::Unavailable,
        _ => ErrorKind::Unknown,
    }
}

/// Pick the best json3 caption track, preferring manual captions in the
/// configured languages, then generated ones, then anything available.
fn select_track(info: &Value, languages: &[String]) -> Result<CaptionTrack, FetchError> {
    let manual = info["subtitles"].as_object();
    let generated = info["automatic_captions"].as_object();

    let has_any = manual.map(|m| !m.is_empty()).unwrap_or(false) || generated.map(|g| !g.is_empty()).unwrap_or(false);
    if !has_any {
        return Err(FetchError::new(ErrorKind::Disabled, "video has no caption tracks"));
    }

    let json3_url = |formats: &Value| -> Option<String> {
        formats
            .as_array()?
            .iter()
            .find(|f| f["ext"].as_str() == Some("json3"))
            .and_then(|f| f["url"].as_str())
            .map(|s| s.to_string())
    };

    let pools = [(manual, false), (generated, true)];

    for language in languages {
        for (pool, is_generated) in pools.iter() {
            if let Some(url) = pool.and_then(|p| p.get(language.as_str())).and_then(json3_url) {
                return Ok(CaptionTrack {
                    language: language.clone(),
                    url,
                    generated: *is_generated,
                });
            }
        }
    }

    for (pool, is_generated) in pools.iter() {
        if let Some(map) = pool {
            // Sorted for a deterministic pick
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            for language in keys {
                if let Some(url) = json3_url(&map[language]) {
                    return Ok(CaptionTrack {
                        language: language.clone(),
                        url,
                        generated: *is_generated,
                    });
                }
            }
        }
    }

    Err(FetchError::new(ErrorKind::NoTranscript, "no caption track in json3 format"))
}

fn parse_json3(body: &str) -> Result<Vec<TranscriptSnippet>, FetchError> {
    let transcript: Json3Transcript = serde_json::from_str(body)
        .map_err(|e| FetchError::new(ErrorKind::Unknown, format!("invalid caption data: {}", e)))?;

    let snippets = transcript
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs?.into_iter().map(|seg| seg.utf8).collect();
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSnippet::new(
                text,
                event.start_ms as f64 / 1000.0,
                event.duration_ms as f64 / 1000.0,
            ))
        })
        .collect();

    Ok(snippets)
}
