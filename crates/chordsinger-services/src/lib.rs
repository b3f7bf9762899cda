//! chordsinger-services: Audio engine, collaborators and job orchestration

pub mod audio_effects;
pub mod audio_io;
pub mod collaborators;
pub mod compositor;
pub mod config;
pub mod duration;
pub mod pipeline;
pub mod pitch_shift;
pub mod resample;
pub mod runner;
pub mod status;

pub use audio_effects::{AudioEffect, EffectChain, EffectError};
pub use audio_effects::{
    build_singing_chain, BreathNoiseEffect, ConvolutionReverbEffect, EffectSettings,
    HighPassEffect, SoftKneeCompressor, VibratoEffect,
};
pub use audio_io::{
    decode_with_symphonia, preprocess, read_audio, read_wav, read_wav_mono, write_wav, AudioIoError,
    PreparedAudio,
};
pub use collaborators::{
    ChordRecognizer, CollaboratorError, CommandBackend, CommandSeparator, HttpBackend,
    JsonChordRecognizer, JsonMelodyExtractor, MelodyExtractor, PassthroughSeparator,
    SeparatedStems, SourceSeparator, SpeechBackend, SynthesisChain, SynthesisError, ToneBackend,
};
pub use compositor::{mix, MixLevels, TimelineCanvas};
pub use config::{BackendConfig, PipelineConfig, VocalMode};
pub use duration::{fit_to_length, fit_to_segment};
pub use pipeline::{Collaborators, Pipeline, PipelineError, StageError};
pub use pitch_shift::shift_pitch;
pub use runner::{JobOutcome, JobRunner};
pub use status::{InMemoryStatusStore, StatusStore};
