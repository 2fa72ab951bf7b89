use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::stats::{analyze_text, SpeakerLines, TextStats};

/// The fixed set of analysis types a transcript can be prepared for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Structured summary with key points and practical value
    #[default]
    Summary,
    /// In-depth critical analysis of the arguments
    Analysis,
    /// Layered study questions
    Questions,
    /// Language polishing and translation
    Translation,
    /// Mind-map structure of the content
    Mindmap,
    /// Fact check against historical data
    HistoricalVerification,
    /// Trend identification
    TrendAnalysis,
    /// Scenario-based future prediction
    FuturePrediction,
    /// Industry and market insight
    IndustryInsight,
    /// Claim-by-claim fact check report
    FactCheck,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 10] = [
        AnalysisType::Summary,
        AnalysisType::Analysis,
        AnalysisType::Questions,
        AnalysisType::Translation,
        AnalysisType::Mindmap,
        AnalysisType::HistoricalVerification,
        AnalysisType::TrendAnalysis,
        AnalysisType::FuturePrediction,
        AnalysisType::IndustryInsight,
        AnalysisType::FactCheck,
    ];

    /// Stable identifier, also used in cache fingerprints
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Summary => "summary",
            AnalysisType::Analysis => "analysis",
            AnalysisType::Questions => "questions",
            AnalysisType::Translation => "translation",
            AnalysisType::Mindmap => "mindmap",
            AnalysisType::HistoricalVerification => "historical_verification",
            AnalysisType::TrendAnalysis => "trend_analysis",
            AnalysisType::FuturePrediction => "future_prediction",
            AnalysisType::IndustryInsight => "industry_insight",
            AnalysisType::FactCheck => "fact_check",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisType::Summary => "Smart summary",
            AnalysisType::Analysis => "In-depth analysis",
            AnalysisType::Questions => "Study questions",
            AnalysisType::Translation => "Multilingual translation",
            AnalysisType::Mindmap => "Mind map",
            AnalysisType::HistoricalVerification => "Historical data verification",
            AnalysisType::TrendAnalysis => "Trend analysis",
            AnalysisType::FuturePrediction => "Future prediction",
            AnalysisType::IndustryInsight => "Industry insight",
            AnalysisType::FactCheck => "Fact check report",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalysisType::Summary => "Core points, practical value and a content quality rating",
            AnalysisType::Analysis => "Argument structure, logical soundness and alternative viewpoints",
            AnalysisType::Questions => "Questions from basic comprehension up to creative extension",
            AnalysisType::Translation => "Language polishing, terminology glossary and cultural adaptation",
            AnalysisType::Mindmap => "Hierarchical mind-map layout with memory aids",
            AnalysisType::HistoricalVerification => "Claims compared against historical data with source credibility",
            AnalysisType::TrendAnalysis => "Trend identification with opportunity and risk assessment",
            AnalysisType::FuturePrediction => "Scenario modelling and timeline forecasts",
            AnalysisType::IndustryInsight => "Market environment, business models and investment angle",
            AnalysisType::FactCheck => "Claim classification, evidence assessment and credibility grading",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        AnalysisType::ALL
            .iter()
            .copied()
            .find(|analysis| analysis.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown analysis type: {}", s))
    }
}

/// Supplies the instruction text placed in front of a transcript.
///
/// The full prompt library lives outside this crate; the analyzer only needs
/// something that maps an [`AnalysisType`] to text.
pub trait TemplateSource: Send + Sync {
    fn instruction(&self, analysis: AnalysisType) -> Cow<'_, str>;
}

/// Short built-in instructions, one per analysis type
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn instruction(&self, analysis: AnalysisType) -> Cow<'_, str> {
        Cow::Owned(format!(
            "Please produce a {} of the transcript below. Focus on: {}.",
            analysis.display_name().to_lowercase(),
            analysis.description().to_lowercase()
        ))
    }
}

const SECTION_RULE: &str = "============================================================";
const SUBSECTION_RULE: &str = "----------------------------------------";

/// Assemble the final AI-ready content for one video
pub fn render_content(video_id: &str, analysis: AnalysisType, instruction: &str, transcript: &str) -> String {
    format!(
        "Video ID: {video_id}\n\
         Video URL: https://www.youtube.com/watch?v={video_id}\n\
         {SECTION_RULE}\n\
         \n\
         Analysis prompt ({analysis}):\n\
         {SUBSECTION_RULE}\n\
         {instruction}\n\
         \n\
         {SECTION_RULE}\n\
         \n\
         Full transcript:\n\
         {SUBSECTION_RULE}\n\
         {transcript}"
    )
}

/// Rendered content for one job plus what was measured on its transcript.
///
/// This is what the result cache stores, so a cache hit reports the same
/// statistics as the fetch that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContent {
    pub text: String,
    /// Statistics of the cleaned transcript
    pub stats: TextStats,
    /// Caption lines grouped by speaker label
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speakers: Vec<SpeakerLines>,
}

impl AnalysisContent {
    pub fn new(text: String, stats: TextStats, speakers: Vec<SpeakerLines>) -> Self {
        Self { text, stats, speakers }
    }
}

impl From<String> for AnalysisContent {
    /// Content measured over `text` itself, with no speaker information
    fn from(text: String) -> Self {
        let stats = analyze_text(&text);
        Self {
            text,
            stats,
            speakers: Vec::new(),
        }
    }
}

impl From<&str> for AnalysisContent {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_unique() {
        let mut ids: Vec<_> = AnalysisType::ALL.iter().map(|a| a.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_from_str_accepts_identifier_and_kebab_case() {
        assert_eq!("summary".parse::<AnalysisType>().unwrap(), AnalysisType::Summary);
        assert_eq!("fact-check".parse::<AnalysisType>().unwrap(), AnalysisType::FactCheck);
        assert_eq!(" Trend_Analysis ".parse::<AnalysisType>().unwrap(), AnalysisType::TrendAnalysis);
        assert!("haiku".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn test_render_content_layout() {
        let content = render_content("dQw4w9WgXcQ", AnalysisType::Mindmap, "Map it.", "hello world");
        assert!(content.starts_with("Video ID: dQw4w9WgXcQ\n"));
        assert!(content.contains("Analysis prompt (mindmap):"));
        assert!(content.contains("Map it."));
        assert!(content.ends_with("hello world"));
    }
}
