//! Song in, chord-singing mix out

use std::path::Path;
use std::sync::Arc;

use chordsinger_core::{
    mean_frequency_in, utterance_text, ChordSegment, ChordTimeline, JobId,
    JobStatus, MelodyPoint, PcmBuffer, PipelineResult, PitchNormalizer, Stage, Utterance,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::audio_effects::build_singing_chain;
use crate::audio_io::{preprocess, read_wav_mono, to_rate, write_wav, AudioIoError};
use crate::collaborators::{
    extract_or_empty, recognize_or_fallback, separate_or_passthrough, ChordRecognizer,
    MelodyExtractor, SourceSeparator, SynthesisChain, SynthesisError,
};
use crate::compositor::{mix, TimelineCanvas};
use crate::config::PipelineConfig;
use crate::duration::{fit_to_length, fit_to_segment};
use crate::pitch_shift::shift_pitch;
use crate::resample::ResampleError;
use crate::status::StatusStore;

/// Failure that ends a job
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Audio(#[from] AudioIoError),
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E: Into<StageError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError { stage, source: e.into() })
    }
}

/// Failure confined to one chord segment
#[derive(Debug, Error)]
enum SegmentError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Audio(#[from] AudioIoError),
    #[error(transparent)]
    Shift(#[from] ResampleError),
}

/// External services a job calls out to
pub struct Collaborators {
    pub separator: Box<dyn SourceSeparator>,
    pub recognizer: Box<dyn ChordRecognizer>,
    pub extractor: Box<dyn MelodyExtractor>,
    pub speech: SynthesisChain,
}

/// Runs one song through every stage, reporting progress to a status store
pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
    status: Arc<dyn StatusStore>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators, status: Arc<dyn StatusStore>) -> Self {
        Self { config, collaborators, status }
    }

    /// Convert `input` and write the mix to `output`.
    ///
    /// The job's status always ends at `completed` or `error`. Temporary files
    /// are removed whichever way the run ends.
    pub fn run(&self, job: &JobId, input: &Path, output: &Path) -> Result<PipelineResult, PipelineError> {
        info!(job = %job, input = %input.display(), mode = ?self.config.mode, "Starting job");
        match self.run_stages(job, input, output) {
            Ok(result) => {
                self.report(
                    job,
                    Stage::Completed,
                    format!(
                        "Completed: {} chords, {} skipped",
                        result.segment_count,
                        result.skipped_segments.len()
                    ),
                );
                Ok(result)
            }
            Err(e) => {
                error!(job = %job, stage = %e.stage, "Job failed: {e}");
                self.status.set(job, JobStatus::failed(&e));
                Err(e)
            }
        }
    }

    fn report(&self, job: &JobId, stage: Stage, message: impl Into<String>) {
        self.status.set(job, JobStatus::new(stage, message));
    }

    fn run_stages(&self, job: &JobId, input: &Path, output: &Path) -> Result<PipelineResult, PipelineError> {
        let rate = self.config.audio.target_sample_rate;
        let scratch_dir = self.config.audio.scratch_dir();

        self.report(job, Stage::Preprocessing, "Preparing audio");
        let prepared = preprocess(input, rate, &self.config.audio.supported_extensions, &scratch_dir)
            .at(Stage::Preprocessing)?;

        self.report(job, Stage::Separating, "Separating instrumental and vocals");
        let stems = separate_or_passthrough(
            self.collaborators.separator.as_ref(),
            prepared.path(),
            &scratch_dir,
        );

        self.report(job, Stage::ChordDetecting, "Detecting chords");
        let timeline = recognize_or_fallback(self.collaborators.recognizer.as_ref(), &stems.instrumental);

        self.report(job, Stage::MelodyExtracting, "Extracting melody");
        let melody_source = stems.vocals.as_deref().unwrap_or(prepared.path());
        let contour = extract_or_empty(self.collaborators.extractor.as_ref(), melody_source);

        self.report(job, Stage::Synthesizing, format!("Singing {} chords", timeline.len()));
        let mut canvas = TimelineCanvas::new(prepared.duration, rate);
        let skipped = self.render_vocals(&timeline, &contour, &mut canvas);

        let instrumental = match read_wav_mono(&stems.instrumental, rate) {
            Ok(buffer) => fit_to_length(buffer, canvas.len()),
            Err(e) => {
                warn!(path = %stems.instrumental.display(), "Instrumental unreadable, mixing over silence: {e}");
                PcmBuffer::silence(canvas.len(), rate)
            }
        };
        let output_buffer = mix(&instrumental.samples, canvas, self.config.mix_levels());
        write_wav(output, &output_buffer).at(Stage::Synthesizing)?;
        info!(job = %job, path = %output.display(), samples = output_buffer.len(), "Wrote mix");

        Ok(PipelineResult {
            segment_count: timeline.len(),
            chord_timeline: timeline,
            melody_contour: contour,
            duration: prepared.duration,
            output_buffer,
            output_path: output.to_path_buf(),
            skipped_segments: skipped,
        })
    }

    /// Overlay every sung segment; returns indices of segments that failed.
    fn render_vocals(
        &self,
        timeline: &ChordTimeline,
        contour: &[MelodyPoint],
        canvas: &mut TimelineCanvas,
    ) -> Vec<usize> {
        let mut skipped = Vec::new();
        for (index, segment) in timeline.iter().enumerate() {
            if segment.is_no_chord() {
                debug!(index, start = segment.start, "No chord, leaving silent");
                continue;
            }
            match self.render_segment(timeline.segments(), index, contour, canvas.sample_rate()) {
                Ok(utterance) => {
                    canvas.overlay_at(segment.start, &utterance.audio.samples);
                    debug!(index, label = %segment.label, text = %utterance.text, "Segment placed");
                }
                Err(e) => {
                    warn!(index, label = %segment.label, "Segment skipped: {e}");
                    skipped.push(index);
                }
            }
        }
        skipped
    }

    fn render_segment(
        &self,
        segments: &[ChordSegment],
        index: usize,
        contour: &[MelodyPoint],
        rate: u32,
    ) -> Result<Utterance, SegmentError> {
        let segment = &segments[index];
        let mode = self.config.mode;
        let text = utterance_text(segments, index, mode.uses_filler_words());

        let speech = to_rate(self.collaborators.speech.synthesize(&text)?, rate)?;

        let ratio = if mode.follows_melody() {
            PitchNormalizer::new(self.config.pitch).ratio(mean_frequency_in(contour, segment))
        } else {
            1.0
        };
        let mut audio = shift_pitch(&speech, ratio)?;

        let seed = self.config.effects.seed ^ index as u64;
        let mut chain = build_singing_chain(&self.config.effect_settings(), rate as f32, seed);
        let failed = chain.process(&mut audio.samples);
        if !failed.is_empty() {
            debug!(index, ?failed, "Effects fell back to dry audio");
        }

        let audio = fit_to_segment(audio, segment);
        debug!(index, ratio, samples = audio.len(), "Segment rendered");
        Ok(Utterance { segment: segment.clone(), text, audio })
    }
}
