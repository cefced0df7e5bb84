use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use media_digest_core::analysis::domain::digest_report::render_markdown;
use media_digest_core::analysis::infrastructure::analysis_store::AnalysisStore;
use media_digest_core::analysis::infrastructure::anthropic_vision_analyzer::AnthropicVisionAnalyzer;
use media_digest_core::chunking::domain::chunk_plan::ChunkPlanner;
use media_digest_core::chunking::domain::segment_splitter::SegmentSplitter;
use media_digest_core::chunking::domain::segment_transcoder::SegmentEncoding;
use media_digest_core::chunking::infrastructure::ffmpeg_cli_transcoder::FfmpegCliTranscoder;
use media_digest_core::frames::infrastructure::ffmpeg_frame_extractor::FfmpegFrameExtractor;
use media_digest_core::pipeline::frame_analysis_orchestrator::{
    AnalysisOptions, FrameAnalysisError, FrameAnalysisOrchestrator, MinuteRange,
};
use media_digest_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use media_digest_core::pipeline::sample_frames_use_case::SampleFramesUseCase;
use media_digest_core::pipeline::transcribe_media_use_case::{
    TranscribeMediaConfig, TranscribeMediaUseCase,
};
use media_digest_core::probe::infrastructure::ffprobe_prober::FfprobeProber;
use media_digest_core::shared::artifact_layout::{write_atomic, ArtifactLayout};
use media_digest_core::shared::cancellation::CancellationToken;
use media_digest_core::shared::settings::Settings;
use media_digest_core::transcription::infrastructure::openai_speech_recognizer::OpenAiSpeechRecognizer;

const DIGEST_FILE: &str = "digest.md";

/// Chunked transcription and transcript-aware frame analysis for long recordings.
#[derive(Parser)]
#[command(name = "media-digest", version)]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio or video file in upload-sized segments.
    Transcribe {
        /// Input audio or video file.
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        openai: OpenAiArgs,
        #[command(flatten)]
        workers: WorkerArgs,
    },
    /// Save one still frame per sampling interval.
    Frames {
        /// Input video file.
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Analyse sampled frames against the transcript, one minute at a time.
    Analyze {
        /// Output directory holding frame and transcript artifacts.
        output_dir: PathBuf,
        #[command(flatten)]
        anthropic: AnthropicArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Transcribe, sample frames and analyse them in one run.
    Digest {
        /// Input video file.
        video: PathBuf,
        /// Separate audio track to transcribe instead of the video's own.
        #[arg(long)]
        audio: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        openai: OpenAiArgs,
        #[command(flatten)]
        anthropic: AnthropicArgs,
        #[command(flatten)]
        workers: WorkerArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Render persisted analysis results as a Markdown digest.
    Report {
        /// Output directory holding `frame_analysis/`.
        output_dir: PathBuf,
        /// Where to write the digest (defaults to `<output_dir>/digest.md`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Output directory (defaults to `output_<input stem>` in the working directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct OpenAiArgs {
    /// Credential for the transcription service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,
}

#[derive(Args)]
struct AnthropicArgs {
    /// Credential for the frame analysis service.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: String,
}

#[derive(Args)]
struct WorkerArgs {
    /// Concurrent segment splits.
    #[arg(long)]
    split_workers: Option<usize>,

    /// Concurrent transcription uploads.
    #[arg(long)]
    transcribe_workers: Option<usize>,
}

#[derive(Args)]
struct SamplingArgs {
    /// Seconds between sampled frames.
    #[arg(long)]
    frame_interval: Option<u32>,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Free-text description of the recording, sent with every frame.
    #[arg(long, default_value = "")]
    context: String,

    /// First minute to analyse.
    #[arg(long, default_value = "0")]
    start_minute: u32,

    /// Minute to stop before (defaults to just past the last frame).
    #[arg(long)]
    end_minute: Option<u32>,

    /// Pause between analysis requests, in milliseconds.
    #[arg(long)]
    request_delay_ms: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    let cancel = CancellationToken::new();
    let mut logger = StdoutPipelineLogger::default();

    match cli.command {
        Command::Transcribe {
            input,
            output,
            openai,
            workers,
        } => {
            require_file(&input)?;
            workers.apply(&mut settings);
            settings.validate()?;
            let layout = resolve_layout(&output, &input)?;
            run_transcribe(
                &input,
                &layout,
                &settings,
                openai.openai_api_key,
                &cancel,
                &mut logger,
            )?;
        }
        Command::Frames {
            input,
            output,
            sampling,
        } => {
            require_file(&input)?;
            sampling.apply(&mut settings);
            settings.validate()?;
            let layout = resolve_layout(&output, &input)?;
            run_frames(&input, &layout, &settings, &cancel, &mut logger)?;
        }
        Command::Analyze {
            output_dir,
            anthropic,
            analysis,
            sampling,
        } => {
            sampling.apply(&mut settings);
            analysis.apply(&mut settings);
            settings.validate()?;
            let range = analysis.range()?;
            let layout = ArtifactLayout::new(output_dir);
            run_analyze(
                &layout,
                &settings,
                &analysis,
                range,
                anthropic.anthropic_api_key,
                &cancel,
                &mut logger,
            )?;
        }
        Command::Digest {
            video,
            audio,
            output,
            openai,
            anthropic,
            workers,
            analysis,
            sampling,
        } => {
            require_file(&video)?;
            let audio = audio.unwrap_or_else(|| video.clone());
            require_file(&audio)?;
            workers.apply(&mut settings);
            sampling.apply(&mut settings);
            analysis.apply(&mut settings);
            settings.validate()?;
            let range = analysis.range()?;
            let layout = resolve_layout(&output, &video)?;

            run_transcribe(
                &audio,
                &layout,
                &settings,
                openai.openai_api_key,
                &cancel,
                &mut logger,
            )?;
            run_frames(&video, &layout, &settings, &cancel, &mut logger)?;
            run_analyze(
                &layout,
                &settings,
                &analysis,
                range,
                anthropic.anthropic_api_key,
                &cancel,
                &mut logger,
            )?;
            write_report(&layout, None)?;
        }
        Command::Report { output_dir, out } => {
            write_report(&ArtifactLayout::new(output_dir), out)?;
        }
    }

    logger.summary();
    Ok(())
}

fn run_transcribe(
    input: &Path,
    layout: &ArtifactLayout,
    settings: &Settings,
    api_key: String,
    cancel: &CancellationToken,
    logger: &mut dyn PipelineLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = OpenAiSpeechRecognizer::new(
        settings.transcription.clone(),
        api_key,
        settings.request_timeout(),
    )?;
    let use_case = TranscribeMediaUseCase::new(
        Box::new(FfprobeProber::new()),
        ChunkPlanner::new(settings.max_payload_bytes, settings.safety_margin)?,
        SegmentSplitter::new(
            Box::new(FfmpegCliTranscoder::new()),
            SegmentEncoding::default(),
        ),
        Box::new(recognizer),
        TranscribeMediaConfig {
            split_workers: settings.split_workers,
            transcribe_workers: settings.transcribe_workers,
        },
    );

    let report = use_case.run(input, layout, cancel, logger)?;
    if !report.is_complete() {
        log::warn!(
            "{} of {} segments degraded (split failures: {:?}, transcription failures: {:?})",
            report.degraded_segments(),
            report.planned_segments,
            report.split_failures,
            report.transcription_failures
        );
    }
    log::info!("Transcript written to {}", report.final_transcript.display());
    Ok(())
}

fn run_frames(
    input: &Path,
    layout: &ArtifactLayout,
    settings: &Settings,
    cancel: &CancellationToken,
    logger: &mut dyn PipelineLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = SampleFramesUseCase::new(
        Box::new(FfmpegFrameExtractor::new()),
        settings.frame_interval_seconds,
    );
    use_case.run(input, layout, cancel, logger)?;
    Ok(())
}

fn run_analyze(
    layout: &ArtifactLayout,
    settings: &Settings,
    analysis: &AnalysisArgs,
    range: MinuteRange,
    api_key: String,
    cancel: &CancellationToken,
    logger: &mut dyn PipelineLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    if !layout.root().is_dir() {
        return Err(format!("Output directory not found: {}", layout.root().display()).into());
    }
    let analyzer = AnthropicVisionAnalyzer::new(
        settings.analysis.clone(),
        api_key,
        settings.request_timeout(),
    )?;
    let orchestrator = FrameAnalysisOrchestrator::new(
        Box::new(analyzer),
        AnalysisOptions {
            context_description: analysis.context.clone(),
            context_window_seconds: settings.context_window_seconds,
            request_delay: settings.request_delay(),
            frame_interval_seconds: settings.frame_interval_seconds,
        },
    );

    let summary = orchestrator.run(layout, range, cancel, logger)?;
    log::info!(
        "Analysed {} frames across {} minutes ({} skipped, {} degraded frames)",
        summary.frames_analysed,
        summary.minutes_persisted.len(),
        summary.minutes_skipped.len(),
        summary.degraded_frames()
    );
    Ok(())
}

fn write_report(
    layout: &ArtifactLayout,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let minutes = AnalysisStore::new(layout.clone()).load_all()?;
    let title = layout
        .root()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Media digest".to_string());
    let markdown = render_markdown(&title, &minutes);

    let path = out.unwrap_or_else(|| layout.root().join(DIGEST_FILE));
    write_atomic(&path, markdown.as_bytes())?;
    log::info!(
        "Digest of {} minutes written to {}",
        minutes.len(),
        path.display()
    );
    Ok(())
}

fn resolve_layout(
    output: &OutputArgs,
    input: &Path,
) -> Result<ArtifactLayout, Box<dyn std::error::Error>> {
    match &output.output_dir {
        Some(dir) => Ok(ArtifactLayout::new(dir)),
        None => Ok(ArtifactLayout::for_source(&std::env::current_dir()?, input)),
    }
}

fn require_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("Input file not found: {}", path.display()).into());
    }
    Ok(())
}

impl WorkerArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(n) = self.split_workers {
            settings.split_workers = n;
        }
        if let Some(n) = self.transcribe_workers {
            settings.transcribe_workers = n;
        }
    }
}

impl SamplingArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = self.frame_interval {
            settings.frame_interval_seconds = interval;
        }
    }
}

impl AnalysisArgs {
    fn range(&self) -> Result<MinuteRange, FrameAnalysisError> {
        MinuteRange::new(self.start_minute, self.end_minute)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(ms) = self.request_delay_ms {
            settings.request_delay_ms = ms;
        }
    }
}
