use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_text_analyzer::cli::{Cli, Commands};
use yt_text_analyzer::fetcher::youtube::YtDlpSource;
use yt_text_analyzer::utils::{self, extract_video_id};
use yt_text_analyzer::{output, AnalysisType, Config, FetchAdapter, JobKey, ResultCache, RetryPolicy, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "yt_text_analyzer=debug,ytanalyze=debug"
    } else {
        "yt_text_analyzer=info,ytanalyze=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            inputs,
            analysis,
            workers,
            from_file,
            format,
            output,
            cache_stats,
        } => {
            let inputs = collect_inputs(inputs, from_file.as_deref())?;
            if inputs.is_empty() {
                anyhow::bail!("No inputs given. Pass YouTube URLs or video ids, or use --from-file");
            }

            let config = Config::load().await?;

            let missing_deps = utils::check_dependencies(&config.fetch.yt_dlp_path).await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - affected videos will be reported as unavailable)");
            }

            let analysis = analysis.unwrap_or(config.app.default_analysis);
            let jobs = build_jobs(&inputs, analysis);
            if jobs.is_empty() {
                anyhow::bail!("None of the {} input(s) is a valid YouTube URL or video id", inputs.len());
            }

            let cache = Arc::new(ResultCache::new(config.cache.capacity));
            let source = YtDlpSource::from_config(&config.fetch)?;
            let adapter = FetchAdapter::new(Arc::new(source))
                .with_timeout(Duration::from_secs(config.fetch.timeout_secs));
            let scheduler = Scheduler::new(adapter, Arc::clone(&cache))
                .with_retry_policy(RetryPolicy::from(&config.batch));

            let concurrency = workers.unwrap_or(config.batch.max_workers);

            tracing::info!("Analyzing {} video(s) as {}", jobs.len(), analysis);

            let progress = (!cli.quiet).then(|| {
                let progress = ProgressBar::new_spinner();
                let template = "{spinner:.green} [{elapsed_precise}] {msg}";
                if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                    progress.set_style(style);
                }
                progress.set_message(format!("Fetching {} transcript(s)...", jobs.len()));
                progress.enable_steady_tick(Duration::from_millis(120));
                progress
            });

            let report = scheduler.run_batch(jobs, concurrency).await;

            if let Some(progress) = progress {
                progress.finish_and_clear();
            }

            let report = report?;

            match output {
                Some(path) => {
                    output::save_to_file(&report, &path, format).await?;
                    println!("Results saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&report, format)?;
                }
            }

            if cache_stats {
                eprintln!("{}", output::format_cache_stats(&cache.stats()));
            }
        }
        Commands::Types => {
            println!("Available analysis types:");
            for analysis in AnalysisType::ALL {
                println!("  • {:<24} {} - {}", analysis.as_str(), analysis.display_name(), analysis.description());
            }
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

/// Command-line inputs followed by the non-empty, non-comment lines of `from_file`
fn collect_inputs(mut inputs: Vec<String>, from_file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = from_file {
        let content = fs_err::read_to_string(path)
            .with_context(|| format!("Failed to read inputs from {}", path.display()))?;

        inputs.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    Ok(inputs)
}

/// One job per recognised input, in input order; unrecognised inputs are reported and skipped
fn build_jobs(inputs: &[String], analysis: AnalysisType) -> Vec<JobKey> {
    inputs
        .iter()
        .filter_map(|input| match extract_video_id(input) {
            Some(video_id) => Some(JobKey::new(video_id, analysis)),
            None => {
                eprintln!("⚠️  Skipping invalid YouTube URL or video id: {}", input);
                None
            }
        })
        .collect()
}
