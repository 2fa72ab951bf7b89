use anyhow::{Context, Result};
use console::style;
use std::fmt::Write as _;
use std::path::Path;

use crate::cache::CacheStats;
use crate::cli::OutputFormat;
use crate::job::JobResult;
use crate::report::BatchReport;
use crate::stats::{named_speakers, TextStats};
use crate::utils::format_duration;

/// Render a report in the requested format
pub fn render(report: &BatchReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_report_text(report)),
        OutputFormat::Json => format_report_json(report),
        OutputFormat::Content => Ok(format_combined_content(report)),
    }
}

/// Save a rendered report to file
pub async fn save_to_file(report: &BatchReport, path: &Path, format: OutputFormat) -> Result<()> {
    let content = render(report, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    fs_err::write(path, content)?;
    Ok(())
}

/// Print a rendered report to console
pub fn print_to_console(report: &BatchReport, format: OutputFormat) -> Result<()> {
    let content = render(report, format)?;
    println!("{}", content);
    Ok(())
}

/// One line per video, with transcript statistics under each success,
/// followed by the batch totals
pub fn format_report_text(report: &BatchReport) -> String {
    let mut out = String::new();

    for (index, outcome) in report.results.iter().enumerate() {
        let line = match &outcome.result {
            JobResult::Success {
                content,
                elapsed,
                cache_hit,
                ..
            } => {
                let source = if *cache_hit {
                    style("cached").cyan().to_string()
                } else {
                    format_duration(*elapsed)
                };
                let mut line = format!(
                    "{} {:>3}. {} - {} chars ({})\n       {}",
                    style("✓").green(),
                    index + 1,
                    outcome.key,
                    content.text.chars().count(),
                    source,
                    style(format_text_stats(&content.stats)).dim()
                );

                let speakers: Vec<String> = named_speakers(&content.speakers)
                    .map(|(name, lines)| format!("{} ({})", name, lines))
                    .collect();
                if !speakers.is_empty() {
                    let _ = write!(line, "\n       {}", style(format!("speakers: {}", speakers.join(", "))).dim());
                }
                line
            }
            JobResult::Failure {
                error_kind,
                message,
                attempts,
                ..
            } => format!(
                "{} {:>3}. {} - {} after {} attempt(s): {}",
                style("✗").red(),
                index + 1,
                outcome.key,
                style(error_kind).yellow(),
                attempts,
                message
            ),
        };
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Processed {} video(s): {} succeeded, {} failed, {} from cache",
        report.total(),
        report.succeeded,
        report.failed,
        report.cache_hits
    );
    let _ = write!(out, "Total time: {}", format_duration(report.total_elapsed));
    if let Some(average) = report.average_elapsed {
        let _ = write!(out, ", average per success: {}", format_duration(average));
    }

    out
}

/// Transcript statistics on one line
pub fn format_text_stats(stats: &TextStats) -> String {
    let mut line = format!(
        "{} words, {} sentences, {} paragraphs, {:.2} words/sentence",
        stats.word_count, stats.sentence_count, stats.paragraph_count, stats.avg_words_per_sentence
    );

    if !stats.top_words.is_empty() {
        let top: Vec<String> = stats
            .top_words
            .iter()
            .map(|entry| format!("{} ({})", entry.word, entry.count))
            .collect();
        let _ = write!(line, "; top words: {}", top.join(", "));
    }

    line
}

/// Full report as pretty JSON
pub fn format_report_json(report: &BatchReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize batch report")
}

/// Concatenate the content of every successful video under a batch header
pub fn format_combined_content(report: &BatchReport) -> String {
    let sections: Vec<String> = report
        .successes()
        .enumerate()
        .filter_map(|(i, outcome)| {
            outcome
                .result
                .text()
                .map(|text| format!("=== Video {}: {} ===\n{}", i + 1, outcome.key.video_id, text))
        })
        .collect();

    let body = sections.join("\n\n");

    format!(
        "Batch analysis content\n\
         Videos: {}\n\
         Total length: {} characters\n\
         Generated at: {}\n\
         {}\n\n\
         {}",
        sections.len(),
        body.chars().count(),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        "=".repeat(60),
        body
    )
}

/// Human-readable cache counters
pub fn format_cache_stats(stats: &CacheStats) -> String {
    format!(
        "Cache: {}/{} entries, {} hits, {} misses",
        stats.size, stats.capacity, stats.hits, stats.misses
    )
}
