use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing::error;
use tracing_subscriber::EnvFilter;

use clipsmith_core::{
    ChatCompletionsClient, ClipsmithError, Config, FfmpegProbe, HighlightSelector, Provider,
    SubtitleSource, Transcript, TranscriptResolver, WhisperEngine, cut_filename, cut_video,
    format_sections_readable, format_transcript_readable, is_supported_video,
    video_info,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "clipsmith")]
#[command(about = "Resolve video transcripts, pick highlight sections with AI, and cut short clips")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding uploaded videos
    #[arg(long, global = true)]
    uploads_dir: Option<PathBuf>,

    /// Directory for extracted and generated subtitle files
    #[arg(long, global = true)]
    subtitles_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a video carries an embedded subtitle stream
    Check { file: String },

    /// Print the transcript of a video
    Transcript {
        file: String,
        /// Print JSON instead of readable text
        #[arg(long)]
        json: bool,
    },

    /// Print the path of the SRT file backing a video's transcript
    Subtitles { file: String },

    /// Pick highlight sections from a video's transcript
    Highlights {
        file: String,
        /// AI provider for section selection
        #[arg(short, long, default_value = "gemini")]
        provider: CliProvider,
        /// Print JSON instead of readable text
        #[arg(long)]
        json: bool,
    },

    /// Print duration, frame rate and size of a video
    Info { file: String },

    /// Cut a time range out of a video into the cuts directory
    Cut {
        file: String,
        /// Start time in seconds
        #[arg(long)]
        start: f64,
        /// End time in seconds
        #[arg(long)]
        end: f64,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

extern "C" fn whisper_log_callback(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
    // silent
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    }

    if let Err(e) = run(cli).await {
        let (label, message) = failure_message(&e);
        if label == "Failed:" {
            error!(error = ?e, "command failed");
        }
        eprintln!("{} {}", style(label).red().bold(), message);
        std::process::exit(1);
    }
}

const FAULT_MESSAGE: &str = "unexpected error, see the log above (use --verbose for more)";

/// Client errors are shown as they are; faults only get a generic line since
/// their text may carry provider responses.
fn failure_message(e: &anyhow::Error) -> (&'static str, String) {
    match e.downcast_ref::<ClipsmithError>() {
        Some(err) if err.is_client_error() => ("Error:", err.to_string()),
        _ => ("Failed:", FAULT_MESSAGE.to_string()),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.uploads_dir {
        config.uploads_dir = dir;
    }
    if let Some(dir) = cli.subtitles_dir {
        config.subtitles_dir = dir;
    }

    match cli.command {
        Command::Check { file } => {
            let video = locate(&config, &file)?;
            let probe = FfmpegProbe::new(&config.ffmpeg, &config.ffprobe);
            let has_subtitles = probe.has_subtitles(&video).await?;
            println!(
                "{} {}",
                style(&file).cyan(),
                if has_subtitles {
                    style("has embedded subtitles").green()
                } else {
                    style("has no embedded subtitles").yellow()
                }
            );
        }
        Command::Transcript { file, json } => {
            let video = locate(&config, &file)?;
            let resolver = build_resolver(&config);
            let transcript = resolve_with_spinner(&resolver, &video).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transcript)?);
            } else {
                println!("{}", format_transcript_readable(&transcript));
            }
        }
        Command::Subtitles { file } => {
            let video = locate(&config, &file)?;
            let resolver = build_resolver(&config);
            let spinner = create_spinner("Resolving subtitles...");
            let path = resolver.subtitle_file(&video).await;
            spinner.finish_and_clear();
            println!("{}", path?.display());
        }
        Command::Highlights {
            file,
            provider,
            json,
        } => {
            let video = locate(&config, &file)?;
            config.provider = provider.into();

            // Validate API key early
            let client =
                ChatCompletionsClient::for_provider(config.provider, config.llm_base_url.clone())?;
            let selector = HighlightSelector::new(Arc::new(client));
            let resolver = build_resolver(&config);

            let transcript = resolve_with_spinner(&resolver, &video).await?;

            let step_start = Instant::now();
            let spinner = create_spinner(&format!(
                "Selecting highlights with {}...",
                config.provider.name()
            ));
            let sections = selector.select(&transcript.segments).await;
            spinner.finish_and_clear();
            let sections = sections?;
            eprintln!(
                "{} Selected {} sections {}",
                style("✓").green().bold(),
                sections.len(),
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&sections)?);
            } else {
                println!("{}", style("─".repeat(60)).dim());
                println!("{}", format_sections_readable(&sections));
            }
        }
        Command::Info { file } => {
            let video = locate(&config, &file)?;
            let info = video_info(&config.ffprobe, &video).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Cut { file, start, end } => {
            let video = locate(&config, &file)?;
            fs::create_dir_all(&config.cuts_dir).await?;
            let output_name = cut_filename(&file);
            let output = config.cuts_dir.join(&output_name);

            let step_start = Instant::now();
            let spinner = create_spinner(&format!("Cutting {:.1}s-{:.1}s...", start, end));
            let result =
                cut_video(&config.ffmpeg, &config.ffprobe, &video, &output, start, end).await;
            spinner.finish_and_clear();
            result?;
            eprintln!(
                "{} Cut saved: {} {}",
                style("✓").green().bold(),
                style(&output_name).cyan(),
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            );
            println!("{}", output.display());
        }
    }

    Ok(())
}

fn locate(config: &Config, file: &str) -> Result<PathBuf> {
    let video = config.video_path(file)?;
    if !is_supported_video(&video) {
        return Err(ClipsmithError::InvalidInput {
            reason: format!("unsupported video type: {}", file),
        }
        .into());
    }
    Ok(video)
}

fn build_resolver(config: &Config) -> TranscriptResolver {
    // The whisper model is only fetched and loaded if a video needs transcribing.
    let engine = WhisperEngine::new(
        &config.model_dir,
        &config.whisper_model,
        &config.ffmpeg,
        &config.subtitles_dir,
    );

    TranscriptResolver::new(
        Arc::new(FfmpegProbe::new(&config.ffmpeg, &config.ffprobe)),
        Arc::new(engine),
        &config.subtitles_dir,
    )
}

async fn resolve_with_spinner(resolver: &TranscriptResolver, video: &Path) -> Result<Transcript> {
    let step_start = Instant::now();
    let spinner = create_spinner("Resolving transcript...");
    let transcript = resolver.resolve(video).await;
    spinner.finish_and_clear();
    let transcript = transcript?;

    let duration_mins = transcript.duration().unwrap_or(0.0) / 60.0;
    eprintln!(
        "{} Transcript: {:.1} min, {}, {} {}",
        style("✓").green().bold(),
        duration_mins,
        style(&transcript.language).yellow(),
        transcript.source,
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    );
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_shown_verbatim() {
        let e = anyhow::Error::from(ClipsmithError::InvalidTimeRange {
            start: 10.0,
            end: 5.0,
            duration: 60.0,
        });
        let (label, message) = failure_message(&e);
        assert_eq!(label, "Error:");
        assert!(message.contains("Invalid time range"));
    }

    #[test]
    fn faults_hide_provider_text() {
        let e = anyhow::Error::from(ClipsmithError::ModelRequestFailed {
            reason: "HTTP 500: secret upstream body".into(),
        });
        let (label, message) = failure_message(&e);
        assert_eq!(label, "Failed:");
        assert_eq!(message, FAULT_MESSAGE);
        assert!(!message.contains("secret"));
    }
}
