use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::fetcher::TranscriptSnippet;

/// Number of most frequent words kept in [`TextStats::top_words`]
pub const TOP_WORDS: usize = 10;

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?。！？]").expect("valid regex"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

static NAMED_SPEAKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z\x{4E00}-\x{9FFF}]+)\s*[:：]\s*(.+)").expect("valid regex"));
static BRACKETED_SPEAKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]\s*(.+)").expect("valid regex"));

/// Bracketed caption labels that describe sounds rather than people
const SOUND_CUES: &[&str] = &[
    "music", "applause", "laughter", "laughs", "silence", "noise", "cheering", "音樂", "掌聲", "笑聲",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Basic statistics of a cleaned transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub word_count: usize,
    pub character_count: usize,
    pub character_count_no_spaces: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    /// Most frequent words of two or more characters, most frequent first
    pub top_words: Vec<WordCount>,
    /// Rounded to two decimals; zero when there are no sentences
    pub avg_words_per_sentence: f64,
}

/// Lines attributed to one speaker. `speaker` is `None` for lines with no
/// recognisable speaker label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerLines {
    pub speaker: Option<String>,
    pub lines: Vec<String>,
}

pub fn analyze_text(text: &str) -> TextStats {
    let word_count = text.split_whitespace().count();
    let sentence_count = SENTENCE_END
        .split(text)
        .filter(|sentence| !sentence.trim().is_empty())
        .count();
    let paragraph_count = text.lines().filter(|line| !line.trim().is_empty()).count();

    let avg_words_per_sentence = if sentence_count > 0 {
        (word_count as f64 / sentence_count as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    TextStats {
        word_count,
        character_count: text.chars().count(),
        character_count_no_spaces: text.chars().filter(|c| *c != ' ').count(),
        sentence_count,
        paragraph_count,
        top_words: top_words(text, TOP_WORDS),
        avg_words_per_sentence,
    }
}

/// Count word frequencies; ties keep the order in which words first appeared
fn top_words(text: &str, limit: usize) -> Vec<WordCount> {
    let lowered = text.to_lowercase();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<WordCount> = Vec::new();

    for word in WORD.find_iter(&lowered).map(|m| m.as_str()) {
        if word.chars().count() < 2 {
            continue;
        }
        match positions.get(word) {
            Some(&index) => counts[index].count += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push(WordCount {
                    word: word.to_string(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort so ties stay in first-appearance order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Group raw caption lines by speaker label.
///
/// Recognises `Name: text` and `[Name] text`. Unlabelled lines come first
/// under `speaker: None`, then each named speaker in order of first
/// appearance. Empty groups are omitted.
pub fn identify_speakers(snippets: &[TranscriptSnippet]) -> Vec<SpeakerLines> {
    let mut unattributed = SpeakerLines {
        speaker: None,
        lines: Vec::new(),
    };
    let mut named: Vec<SpeakerLines> = Vec::new();

    for snippet in snippets {
        let text = snippet.text.trim();
        if text.is_empty() {
            continue;
        }

        match speaker_label(text) {
            Some((speaker, content)) => match named.iter_mut().find(|group| group.speaker.as_deref() == Some(speaker)) {
                Some(group) => group.lines.push(content.to_string()),
                None => named.push(SpeakerLines {
                    speaker: Some(speaker.to_string()),
                    lines: vec![content.to_string()],
                }),
            },
            None => unattributed.lines.push(text.to_string()),
        }
    }

    let mut groups = Vec::with_capacity(named.len() + 1);
    if !unattributed.lines.is_empty() {
        groups.push(unattributed);
    }
    groups.extend(named);
    groups
}

fn speaker_label(text: &str) -> Option<(&str, &str)> {
    if let Some(caps) = NAMED_SPEAKER.captures(text) {
        return Some((caps.get(1)?.as_str().trim(), caps.get(2)?.as_str().trim()));
    }

    let caps = BRACKETED_SPEAKER.captures(text)?;
    let speaker = caps.get(1)?.as_str().trim();
    if SOUND_CUES.contains(&speaker.to_lowercase().as_str()) {
        return None;
    }
    Some((speaker, caps.get(2)?.as_str().trim()))
}

/// Named speakers only, for display
pub fn named_speakers(groups: &[SpeakerLines]) -> impl Iterator<Item = (&str, usize)> {
    groups
        .iter()
        .filter_map(|group| group.speaker.as_deref().map(|name| (name, group.lines.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippets(texts: &[&str]) -> Vec<TranscriptSnippet> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TranscriptSnippet::new(*t, i as f64, 1.0))
            .collect()
    }

    #[test]
    fn test_analyze_text_counts() {
        let stats = analyze_text("The cat sat. The cat ran!\nA dog barked?");

        assert_eq!(stats.word_count, 9);
        assert_eq!(stats.character_count, 39);
        assert_eq!(stats.character_count_no_spaces, 32);
        assert_eq!(stats.sentence_count, 3);
        assert_eq!(stats.paragraph_count, 2);
        assert_eq!(stats.avg_words_per_sentence, 3.0);
        assert_eq!(
            stats.top_words[..2],
            [
                WordCount {
                    word: "the".into(),
                    count: 2
                },
                WordCount {
                    word: "cat".into(),
                    count: 2
                },
            ]
        );
        // Single-character words are ignored
        assert!(stats.top_words.iter().all(|w| w.word != "a"));
    }

    #[test]
    fn test_analyze_text_rounds_average() {
        let stats = analyze_text("one two three. four five six seven. eight");
        assert_eq!(stats.sentence_count, 3);
        assert_eq!(stats.avg_words_per_sentence, 2.67);
    }

    #[test]
    fn test_analyze_text_limits_top_words() {
        let text = (0..15).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let stats = analyze_text(&text);
        assert_eq!(stats.top_words.len(), TOP_WORDS);
        assert_eq!(stats.top_words[0].word, "word0");
    }

    #[test]
    fn test_analyze_text_empty() {
        let stats = analyze_text("");
        assert_eq!(stats, TextStats::default());
    }

    #[test]
    fn test_analyze_text_cjk_sentences() {
        let stats = analyze_text("今天天氣很好。我們去公園！");
        assert_eq!(stats.sentence_count, 2);
        assert_eq!(stats.paragraph_count, 1);
    }

    #[test]
    fn test_identify_speakers() {
        let groups = identify_speakers(&snippets(&[
            "Alice: hello there",
            "just some narration",
            "[Bob] hi Alice",
            "Alice：how are you",
            "[Music] la la la",
            "   ",
        ]));

        assert_eq!(
            groups,
            vec![
                SpeakerLines {
                    speaker: None,
                    lines: vec!["just some narration".into(), "[Music] la la la".into()],
                },
                SpeakerLines {
                    speaker: Some("Alice".into()),
                    lines: vec!["hello there".into(), "how are you".into()],
                },
                SpeakerLines {
                    speaker: Some("Bob".into()),
                    lines: vec!["hi Alice".into()],
                },
            ]
        );

        let named: Vec<_> = named_speakers(&groups).collect();
        assert_eq!(named, [("Alice", 2), ("Bob", 1)]);
    }

    #[test]
    fn test_identify_speakers_chinese_label() {
        let groups = identify_speakers(&snippets(&["主持人：歡迎收看"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].speaker.as_deref(), Some("主持人"));
        assert_eq!(groups[0].lines, ["歡迎收看"]);
    }

    #[test]
    fn test_identify_speakers_without_labels() {
        let groups = identify_speakers(&snippets(&["plain line"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].speaker, None);
        assert_eq!(named_speakers(&groups).count(), 0);
    }
}
