//! End-to-end runs over synthetic songs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chordsinger_core::{JobId, PcmBuffer, Stage};
use chordsinger_services::{
    read_wav, Collaborators, InMemoryStatusStore, JobRunner, JsonChordRecognizer,
    JsonMelodyExtractor, PassthroughSeparator, Pipeline, PipelineConfig, SpeechBackend,
    StatusStore, SynthesisChain, SynthesisError, ToneBackend, VocalMode,
};

const RATE: u32 = 8000;
const PROGRESSION: [&str; 6] = ["C", "G", "Am", "F", "Dm7", "Bbmaj7"];

fn write_song(path: &Path, seconds: f64, amplitude: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * RATE as f64).round() as usize;
    for i in 0..frames {
        let t = i as f32 / RATE as f32;
        let v = (amplitude * (2.0 * std::f32::consts::PI * 110.0 * t).sin() * i16::MAX as f32) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();
}

/// Two-second chords back to back, as a sidecar next to the song
fn write_chords(song: &Path, seconds: f64) {
    let count = (seconds / 2.0) as usize;
    let segments: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "label": PROGRESSION[i % PROGRESSION.len()],
                "start": i as f64 * 2.0,
                "end": (i + 1) as f64 * 2.0,
            })
        })
        .collect();
    std::fs::write(song.with_extension("chords.json"), serde_json::to_string(&segments).unwrap()).unwrap();
}

fn config(scratch: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.audio.target_sample_rate = RATE;
    config.audio.scratch_dir = Some(scratch.to_path_buf());
    config
}

fn pipeline(
    config: PipelineConfig,
    song: &Path,
    speech: SynthesisChain,
    store: Arc<InMemoryStatusStore>,
) -> Pipeline {
    let collaborators = Collaborators {
        separator: Box::new(PassthroughSeparator),
        recognizer: Box::new(JsonChordRecognizer::beside(song)),
        extractor: Box::new(JsonMelodyExtractor::beside(song)),
        speech,
    };
    Pipeline::new(config, collaborators, store)
}

fn tone() -> SynthesisChain {
    SynthesisChain::new().with(Box::new(ToneBackend::new(250.0, RATE)))
}

/// Hums like the tone voice but refuses one word
struct Refuses {
    word: &'static str,
    voice: ToneBackend,
}

impl SpeechBackend for Refuses {
    fn name(&self) -> &str { "refuses" }

    fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError> {
        if text.split_whitespace().any(|w| w == self.word) {
            return Err(SynthesisError::Backend { backend: "refuses".into(), reason: text.into() });
        }
        self.voice.synthesize(text)
    }
}

fn scratch_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().is_some_and(|n| n.to_string_lossy().starts_with("chordsinger-")))
        .collect()
}

#[test]
fn test_output_matches_song_duration() {
    let dir = tempfile::tempdir().unwrap();
    for seconds in [4.0, 8.0, 12.0] {
        let song = dir.path().join(format!("song{seconds}.wav"));
        let output = dir.path().join(format!("out{seconds}.wav"));
        write_song(&song, seconds, 0.2);
        write_chords(&song, seconds);

        let store = Arc::new(InMemoryStatusStore::new());
        let job = JobId::new(format!("len-{seconds}"));
        let result = pipeline(config(dir.path()), &song, tone(), store.clone())
            .run(&job, &song, &output)
            .unwrap();

        let expected = seconds * RATE as f64;
        assert!((result.output_buffer.len() as f64 - expected).abs() <= 1.0);
        assert!((result.duration - seconds).abs() <= 1.0 / RATE as f64);
        assert_eq!(result.segment_count, (seconds / 2.0) as usize);
        assert!(result.skipped_segments.is_empty());

        let written = read_wav(&output).unwrap();
        assert_eq!(written.channels, 1);
        assert_eq!(written.sample_rate, RATE);
        assert_eq!(written.len(), result.output_buffer.len());

        let status = store.get(&job).unwrap();
        assert_eq!(status.stage, Stage::Completed);
        assert_eq!(status.progress, 100);
    }
}

#[test]
fn test_failed_segment_only_silences_its_span() {
    let dir = tempfile::tempdir().unwrap();
    let song = dir.path().join("silent.wav");
    write_song(&song, 8.0, 0.0);
    write_chords(&song, 8.0);

    let store = Arc::new(InMemoryStatusStore::new());
    let good = pipeline(config(dir.path()), &song, tone(), store.clone())
        .run(&JobId::new("good"), &song, &dir.path().join("good.wav"))
        .unwrap();

    let refusing = SynthesisChain::new().with(Box::new(Refuses {
        word: "GEE",
        voice: ToneBackend::new(250.0, RATE),
    }));
    let job = JobId::new("partial");
    let partial = pipeline(config(dir.path()), &song, refusing, store.clone())
        .run(&job, &song, &dir.path().join("partial.wav"))
        .unwrap();

    assert_eq!(store.get(&job).unwrap().stage, Stage::Completed);
    assert_eq!(partial.skipped_segments, vec![1]);

    let span = (2 * RATE as usize)..(4 * RATE as usize);
    let good = &good.output_buffer.samples;
    let partial = &partial.output_buffer.samples;
    assert_eq!(good.len(), partial.len());
    assert!(good[span.clone()].iter().any(|&s| s != 0.0));
    assert!(partial[span.clone()].iter().all(|&s| s == 0.0));
    for (i, (a, b)) in good.iter().zip(partial).enumerate() {
        if !span.contains(&i) {
            assert_eq!(a, b, "sample {i} changed outside the failed span");
        }
    }
}

#[test]
fn test_missing_chords_use_fallback_progression() {
    let dir = tempfile::tempdir().unwrap();
    let song = dir.path().join("nochords.wav");
    write_song(&song, 4.0, 0.1);

    let store = Arc::new(InMemoryStatusStore::new());
    let result = pipeline(config(dir.path()), &song, tone(), store)
        .run(&JobId::new("fallback"), &song, &dir.path().join("out.wav"))
        .unwrap();
    let labels: Vec<_> = result.chord_timeline.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["C major", "G major", "A minor", "F major"]);
    // segments past the end of the song are cut off, not appended
    assert_eq!(result.output_buffer.len(), 4 * RATE as usize);
}

fn zero_crossings(samples: &[f32]) -> usize {
    samples.windows(2).filter(|w| (w[0] < 0.0) != (w[1] < 0.0)).count()
}

/// Sung-mode render of a silent 4 s song, with or without a melody sidecar
fn render_sung(dir: &Path, name: &str, melody: Option<&str>) -> chordsinger_core::PipelineResult {
    let song = dir.join(format!("{name}.wav"));
    write_song(&song, 4.0, 0.0);
    write_chords(&song, 4.0);
    if let Some(melody) = melody {
        std::fs::write(song.with_extension("melody.json"), melody).unwrap();
    }

    let mut sung = config(dir);
    sung.mode = VocalMode::Sung;
    // keep the pitch measurable
    sung.effects.sung.vibrato.depth = 0.0;
    sung.effects.sung.breath.enabled = false;
    let store = Arc::new(InMemoryStatusStore::new());
    pipeline(sung, &song, tone(), store)
        .run(&JobId::new(name), &song, &dir.join(format!("{name}-out.wav")))
        .unwrap()
}

#[test]
fn test_sung_mode_follows_melody() {
    let dir = tempfile::tempdir().unwrap();
    let melodic = render_sung(
        dir.path(),
        "melodic",
        Some(r#"[{"time": 0.5, "frequency": 330.0}, {"time": 2.5, "frequency": 0.0}]"#),
    );
    let flat = render_sung(dir.path(), "flat", None);

    assert_eq!(melodic.melody_contour.len(), 1);
    assert!(flat.melody_contour.is_empty());
    assert!(melodic.skipped_segments.is_empty() && flat.skipped_segments.is_empty());
    assert_eq!(melodic.output_buffer.len(), 4 * RATE as usize);
    assert_eq!(flat.output_buffer.len(), 4 * RATE as usize);

    let rate = RATE as usize;
    let melodic = &melodic.output_buffer.samples;
    let flat = &flat.output_buffer.samples;

    // segment 0 carries a 330 Hz point against the 250 Hz voice
    assert_ne!(&melodic[..2 * rate], &flat[..2 * rate]);
    // both syllables are still voiced over this window
    let window = (rate / 25)..(rate * 14 / 100);
    let raised = zero_crossings(&melodic[window.clone()]) as f32;
    let baseline = zero_crossings(&flat[window]) as f32;
    assert!(baseline > 0.0);
    let ratio = raised / baseline;
    assert!((1.2..1.45).contains(&ratio), "pitch rose by {ratio}, expected about {}", 330.0 / 250.0);

    // segment 1 has no voiced points, so it is sung at the baseline either way
    assert_eq!(&melodic[2 * rate..], &flat[2 * rate..]);
}

#[test]
fn test_input_errors_end_in_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStatusStore::new());

    let midi = dir.path().join("song.mid");
    let corrupt = dir.path().join("song.mp3");
    std::fs::write(&midi, b"MThd").unwrap();
    std::fs::write(&corrupt, b"ID3").unwrap();

    for (name, input) in [("midi", &midi), ("corrupt", &corrupt)] {
        let job = JobId::new(name);
        let err = pipeline(config(dir.path()), input, tone(), store.clone())
            .run(&job, input, &dir.path().join("out.wav"))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Preprocessing);
        let status = store.get(&job).unwrap();
        assert_eq!(status.stage, Stage::Error);
        assert!(status.message.starts_with("Error: "));
    }
    assert!(scratch_files(dir.path()).is_empty());
}

#[test]
fn test_export_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let song = dir.path().join("song.wav");
    write_song(&song, 4.0, 0.1);

    let store = Arc::new(InMemoryStatusStore::new());
    let job = JobId::new("export");
    let unwritable = dir.path().join("missing-dir").join("out.wav");
    let err = pipeline(config(dir.path()), &song, tone(), store.clone())
        .run(&job, &song, &unwritable)
        .unwrap_err();
    assert_eq!(err.stage, Stage::Synthesizing);
    assert_eq!(store.get(&job).unwrap().stage, Stage::Error);
    assert!(scratch_files(dir.path()).is_empty());
}

#[test]
fn test_concurrent_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let song = dir.path().join("shared.wav");
    write_song(&song, 4.0, 0.1);
    write_chords(&song, 4.0);

    let store = Arc::new(InMemoryStatusStore::new());
    let pipeline = Arc::new(pipeline(config(dir.path()), &song, tone(), store.clone()));
    let mut runner = JobRunner::new(pipeline);
    for i in 0..3 {
        runner.submit(JobId::new(format!("job-{i}")), song.clone(), dir.path().join(format!("out-{i}.wav")));
    }
    let outcomes = runner.join();

    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        assert!(outcome.result.is_ok(), "{}: {:?}", outcome.job, outcome.result.as_ref().err());
        assert_eq!(store.get(&outcome.job).unwrap().stage, Stage::Completed);
    }
    assert_eq!(store.len(), 3);
}
