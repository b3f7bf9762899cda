//! chordsinger: sing the chords of a song over its instrumental

mod config;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;
use chordsinger_core::JobId;
use chordsinger_services::{
    Collaborators, CommandSeparator, InMemoryStatusStore, JobRunner, JsonChordRecognizer,
    JsonMelodyExtractor, PassthroughSeparator, Pipeline, PipelineConfig, SourceSeparator,
    StatusStore, SynthesisChain, VocalMode,
};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Follow the melody with full effects
    Sung,
    /// Baseline pitch with filler words
    Stable,
}

impl From<ModeArg> for VocalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sung => VocalMode::Sung,
            ModeArg::Stable => VocalMode::Stable,
        }
    }
}

/// Sing the chords of a song over its instrumental
#[derive(Debug, Parser)]
#[command(name = "chordsinger", version, about)]
struct Args {
    /// Config file (default: user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Chord timeline JSON (default: <song>.chords.json)
    #[arg(long)]
    chords: Option<PathBuf>,

    /// Melody contour JSON (default: <song>.melody.json)
    #[arg(long)]
    melody: Option<PathBuf>,

    /// Where mixes are written (default: beside each song)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Split stems with the configured separator
    #[arg(long)]
    separate: bool,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Songs to convert (mp3, wav, flac, m4a, ogg, aac)
    #[arg(required_unless_present = "init_config")]
    inputs: Vec<PathBuf>,
}

fn parse_args<I, T>(raw: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::try_parse_from(raw)?;
    if args.inputs.len() > 1 && (args.chords.is_some() || args.melody.is_some()) {
        return Err(Args::command().error(
            ErrorKind::ArgumentConflict,
            "--chords and --melody only apply to a single song",
        ));
    }
    Ok(args)
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("chord_cover_{stem}.wav"))
}

fn build_pipeline(config: PipelineConfig, args: &Args, song: &Path, status: Arc<dyn StatusStore>) -> Pipeline {
    let separator: Box<dyn SourceSeparator> = if args.separate || config.separator.enabled {
        Box::new(CommandSeparator::from_config(&config.separator))
    } else {
        Box::new(PassthroughSeparator)
    };
    let recognizer = match &args.chords {
        Some(path) => JsonChordRecognizer::new(path),
        None => JsonChordRecognizer::beside(song),
    };
    let extractor = match &args.melody {
        Some(path) => JsonMelodyExtractor::new(path),
        None => JsonMelodyExtractor::beside(song),
    };
    let speech = SynthesisChain::from_config(
        &config.synthesis,
        config.pitch.baseline_hz,
        config.audio.target_sample_rate,
    );
    let collaborators = Collaborators {
        separator,
        recognizer: Box::new(recognizer),
        extractor: Box::new(extractor),
        speech,
    };
    Pipeline::new(config, collaborators, status)
}

fn run(args: Args) -> anyhow::Result<usize> {
    if args.init_config {
        let path = args.config.clone().unwrap_or_else(config::config_path);
        config::write_default_config(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Wrote default config to {}", path.display());
        return Ok(0);
    }

    let mut config = config::load_config(args.config.as_deref());
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }

    let store = Arc::new(InMemoryStatusStore::new());
    let mut failed = 0;
    // Sidecars are per song, so each song gets its own pipeline.
    let mut runners = Vec::new();
    for (i, input) in args.inputs.iter().enumerate() {
        let pipeline = build_pipeline(config.clone(), &args, input, store.clone());
        let mut runner = JobRunner::new(Arc::new(pipeline));
        let job = JobId::new(format!("job-{i}"));
        runner.submit(job, input.clone(), output_path(input, args.out_dir.as_deref()));
        runners.push(runner);
    }

    for outcome in runners.into_iter().flat_map(JobRunner::join) {
        match outcome.result {
            Ok(result) => {
                eprintln!(
                    "{}: wrote {} ({:.2}s, {} chords, {} skipped)",
                    outcome.job,
                    result.output_path.display(),
                    result.duration,
                    result.segment_count,
                    result.skipped_segments.len()
                );
            }
            Err(e) => {
                failed += 1;
                let message = store.get(&outcome.job).map(|s| s.message).unwrap_or_else(|| e.to_string());
                eprintln!("{}: {message}", outcome.job);
            }
        }
    }
    Ok(failed)
}

fn main() {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,chordsinger=debug,chordsinger_services=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args = parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    match run(args) {
        Ok(0) => {}
        Ok(failed) => {
            tracing::error!(failed, "Some songs failed");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
