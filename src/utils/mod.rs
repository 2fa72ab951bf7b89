use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::fetcher::TranscriptSnippet;

static BARE_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video id regex"));

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*([A-Z])").expect("valid regex"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,，.。!！?？;；:：])").expect("valid regex"));
static REPEATED_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,，.。!！?？;；:：])[ \t]*([,，.。!！?？;；:：])").expect("valid regex"));
static RUN_OF_BLANKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

/// Spelled-out counts that caption tracks tend to emit for small numbers
static NUMERAL_WORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [(r"\b一個\b", "1個"), (r"\b兩個\b", "2個"), (r"\b三個\b", "3個")]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid numeral regex"), replacement))
        .collect()
});

/// Extract a YouTube video id from a URL, or accept a bare 11-character id
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_VIDEO_ID.is_match(input) {
        return Some(input.to_string());
    }

    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(|s| s.to_string()),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(name, _)| name == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("v") | Some("shorts") | Some("live") => {
                    segments.next().map(|s| s.to_string())
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    BARE_VIDEO_ID.is_match(&candidate).then_some(candidate)
}

/// Join raw snippets into readable text.
///
/// Drops `[Music]`-style markers, parenthesised asides and HTML tags,
/// collapses whitespace and starts a new line after each sentence.
pub fn clean_transcript(snippets: &[TranscriptSnippet]) -> String {
    let texts: Vec<String> = snippets
        .iter()
        .filter_map(|snippet| {
            let text = BRACKETED.replace_all(snippet.text.trim(), "");
            let text = PARENTHESIZED.replace_all(&text, "");
            let text = HTML_TAG.replace_all(&text, "");
            let text = WHITESPACE.replace_all(&text, " ");
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();

    let joined = texts.join(" ");
    SENTENCE_BREAK
        .replace_all(&joined, "$1\n$2")
        .trim()
        .to_string()
}

/// Fix common caption artifacts: standalone spelled-out counts and spacing
/// around punctuation.
///
/// Runs of spaces and tabs collapse to one space; line breaks are kept.
pub fn correct_transcription_errors(text: &str) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in NUMERAL_WORDS.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }

    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = REPEATED_PUNCT.replace_all(&text, "$1$2");
    let text = RUN_OF_BLANKS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required for transcript retrieval", yt_dlp_path));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .kill_on_drop(true)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
