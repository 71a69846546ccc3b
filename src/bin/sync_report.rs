use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use readalong_sync::extraction::extract_with_stats;
use readalong_sync::{
    compute_sync_report, extract_word_groups, AlignmentCandidate, Document, ExclusionPolicy,
    ReportContext, SegmentType, SilencePeriod, SyncConfig, SyncEngineBuilder, SyncInput,
};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

#[path = "sync_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Granularity {
    Word,
    Sentence,
    Paragraph,
}

impl From<Granularity> for SegmentType {
    fn from(value: Granularity) -> Self {
        match value {
            Granularity::Word => SegmentType::Word,
            Granularity::Sentence => SegmentType::Sentence,
            Granularity::Paragraph => SegmentType::Paragraph,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sync_report")]
#[command(about = "Synchronize narrated audio timestamps to document segments")]
struct Args {
    /// Structured document JSON.
    #[arg(long, env = "SYNC_REPORT_DOCUMENT")]
    document: PathBuf,
    /// Forced aligner candidates, a JSON array of {text, begin_time, end_time}.
    #[arg(long, env = "SYNC_REPORT_CANDIDATES")]
    candidates: PathBuf,
    /// Detected silences, a JSON array of {start, end}.
    #[arg(long, env = "SYNC_REPORT_SILENCES")]
    silences: Option<PathBuf>,
    #[arg(long, env = "SYNC_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(
        long,
        env = "SYNC_REPORT_GRANULARITY",
        value_enum,
        default_value_t = Granularity::Sentence
    )]
    granularity: Granularity,
    /// Total audio length in seconds. Derived from the candidates when omitted.
    #[arg(long, env = "SYNC_REPORT_AUDIO_DURATION")]
    audio_duration: Option<f64>,
    /// Synchronized output path. Written to stdout when omitted.
    #[arg(long, env = "SYNC_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "SYNC_REPORT_REPORT_OUT")]
    report_out: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let config = match args.config.as_ref() {
        Some(path) => SyncConfig::load(path).map_err(|err| err.to_string())?,
        None => SyncConfig::default(),
    };
    let policy = ExclusionPolicy::from_config(&config.exclusion).map_err(|err| err.to_string())?;

    let document: Document = read_json(&args.document, "document")?;
    let granularity = SegmentType::from(args.granularity);
    let (segments, stats) = extract_with_stats(&document, granularity, &policy);
    if segments.is_empty() {
        return Err(format!(
            "No {} segments qualify for synchronization in '{}' ({} excluded).",
            granularity.as_str(),
            args.document.display(),
            stats.excluded()
        ));
    }
    let word_groups = if granularity == SegmentType::Sentence {
        extract_word_groups(&document, &policy)
    } else {
        Vec::new()
    };

    let candidates: Vec<AlignmentCandidate> = read_json(&args.candidates, "candidates")?;
    let silences: Vec<SilencePeriod> = match args.silences.as_ref() {
        Some(path) => read_json(path, "silences")?,
        None => Vec::new(),
    };

    let engine = SyncEngineBuilder::new(config)
        .build()
        .map_err(|err| err.to_string())?;
    let input = SyncInput {
        segments,
        word_groups,
        candidates,
        silences,
        audio_duration: args.audio_duration,
    };
    let output = engine.synchronize(&input).map_err(|err| err.to_string())?;

    match args.out.as_ref() {
        Some(path) => {
            json_report_formatter::write_json(path, &output, "sync output")?;
            tracing::info!(path = %path.display(), "sync_report: output written");
        }
        None => json_report_formatter::write_json_stdout(&output, "sync output")?,
    }

    if let Some(path) = args.report_out.as_ref() {
        let context = ReportContext {
            generated_at: Utc::now().to_rfc3339(),
            candidate_count: input.candidates.len(),
            silence_count: input.silences.len(),
            audio_duration: output.audio_duration,
        };
        let report = compute_sync_report(&output.segments, &output.words, &context)
            .map_err(|err| err.to_string())?;
        json_report_formatter::write_json(path, &report, "report")?;
        tracing::info!(
            path = %path.display(),
            degraded_ratio = format!("{:.3}", report.quality.degraded_ratio),
            "sync_report: report written"
        );
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {what} file '{}': {err}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|err| format!("Failed to parse {what} JSON '{}': {err}", path.display()))
}
