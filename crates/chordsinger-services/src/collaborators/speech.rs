//! Ranked speech synthesis backends

use std::f32::consts::PI;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;

use chordsinger_core::PcmBuffer;
use thiserror::Error;
use tracing::{debug, warn};

use crate::audio_io::{decode_wav_bytes, AudioIoError};
use crate::config::{BackendConfig, SynthesisConfig};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("{backend}: {reason}")]
    Backend { backend: String, reason: String },
    #[error("{backend} returned unreadable audio: {source}")]
    Audio {
        backend: String,
        #[source]
        source: AudioIoError,
    },
    #[error("All {0} speech backends failed")]
    AllBackendsFailed(usize),
}

impl SynthesisError {
    fn backend(backend: &str, reason: impl Into<String>) -> Self {
        Self::Backend { backend: backend.to_string(), reason: reason.into() }
    }
}

/// `(text) -> mono PCM`
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &str;
    fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError>;
}

/// Backends tried in rank order until one succeeds
#[derive(Default)]
pub struct SynthesisChain {
    backends: Vec<Box<dyn SpeechBackend>>,
}

impl SynthesisChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, backend: Box<dyn SpeechBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Build the configured backends; `Tone` voices use `baseline_hz`.
    pub fn from_config(config: &SynthesisConfig, baseline_hz: f32, sample_rate: u32) -> Self {
        let backends = config
            .backends
            .iter()
            .map(|backend| -> Box<dyn SpeechBackend> {
                match backend {
                    BackendConfig::Command { program, args } => {
                        Box::new(CommandBackend::new(program.clone(), args.clone()))
                    }
                    BackendConfig::Http { url, timeout_secs } => {
                        Box::new(HttpBackend::new(url.clone(), Duration::from_secs(*timeout_secs)))
                    }
                    BackendConfig::Tone => Box::new(ToneBackend::new(baseline_hz, sample_rate)),
                }
            })
            .collect();
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError> {
        for backend in &self.backends {
            match backend.synthesize(text) {
                Ok(audio) if !audio.is_empty() => {
                    debug!(backend = backend.name(), text, samples = audio.len(), "Synthesized");
                    return Ok(audio.into_mono());
                }
                Ok(_) => warn!(backend = backend.name(), text, "Backend returned no audio"),
                Err(e) => warn!(backend = backend.name(), text, "Backend failed: {e}"),
            }
        }
        Err(SynthesisError::AllBackendsFailed(self.backends.len()))
    }
}

impl std::fmt::Debug for SynthesisChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("SynthesisChain").field("backends", &names).finish()
    }
}

// ============================================================================
// External program
// ============================================================================

/// Runs a program that prints WAV to stdout, text as the final argument
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

impl SpeechBackend for CommandBackend {
    fn name(&self) -> &str { &self.program }

    fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SynthesisError::backend(&self.program, format!("failed to start: {e}")))?;
        if !output.status.success() {
            return Err(SynthesisError::backend(
                &self.program,
                format!("exited with {}", output.status),
            ));
        }
        let mut bytes = output.stdout;
        repair_streamed_header(&mut bytes);
        decode_wav_bytes(&bytes)
            .map_err(|source| SynthesisError::Audio { backend: self.program.clone(), source })
    }
}

/// Rewrite RIFF and data chunk sizes to match the bytes actually present.
///
/// Tools writing WAV to a pipe cannot seek back, so they leave placeholder
/// sizes in the header.
fn repair_streamed_header(bytes: &mut [u8]) {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return;
    }
    let total = bytes.len();
    bytes[4..8].copy_from_slice(&((total - 8) as u32).to_le_bytes());

    let mut pos = 12;
    while pos + 8 <= total {
        let id = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        if &id == b"data" {
            let data_len = (total - pos - 8) as u32;
            bytes[pos + 4..pos + 8].copy_from_slice(&data_len.to_le_bytes());
            return;
        }
        let size = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]]);
        pos += 8 + size as usize + (size as usize & 1);
    }
}

// ============================================================================
// HTTP service
// ============================================================================

/// POSTs `{"text": ...}` and expects a WAV body
#[derive(Debug, Clone)]
pub struct HttpBackend {
    url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { url: url.into(), agent }
    }
}

impl SpeechBackend for HttpBackend {
    fn name(&self) -> &str { &self.url }

    fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError> {
        let response = self
            .agent
            .post(&self.url)
            .send_json(serde_json::json!({ "text": text }))
            .map_err(|e| SynthesisError::backend(&self.url, e.to_string()))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| SynthesisError::backend(&self.url, format!("reading body: {e}")))?;
        decode_wav_bytes(&bytes)
            .map_err(|source| SynthesisError::Audio { backend: self.url.clone(), source })
    }
}

// ============================================================================
// Built-in voice
// ============================================================================

const SYLLABLE_SECS: f32 = 0.22;
const GAP_SECS: f32 = 0.04;

/// Hums one enveloped syllable per word at a fixed pitch.
///
/// Always available and fully deterministic.
#[derive(Debug, Clone, Copy)]
pub struct ToneBackend {
    frequency: f32,
    sample_rate: u32,
}

impl ToneBackend {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self { frequency, sample_rate }
    }

    fn syllable(&self, len: usize) -> impl Iterator<Item = f32> + '_ {
        let sr = self.sample_rate as f32;
        (0..len).map(move |i| {
            let t = i as f32 / sr;
            let envelope = (PI * i as f32 / len as f32).sin();
            let phase = 2.0 * PI * self.frequency * t;
            // fundamental plus a soft second and third harmonic
            let voice = phase.sin() + 0.4 * (2.0 * phase).sin() + 0.2 * (3.0 * phase).sin();
            0.3 * envelope * voice / 1.6
        })
    }
}

impl SpeechBackend for ToneBackend {
    fn name(&self) -> &str { "tone" }

    fn synthesize(&self, text: &str) -> Result<PcmBuffer, SynthesisError> {
        if self.sample_rate == 0 || !(self.frequency > 0.0) {
            return Err(SynthesisError::backend("tone", "invalid voice settings"));
        }
        let words = text.split_whitespace().count();
        if words == 0 {
            return Err(SynthesisError::backend("tone", "nothing to say"));
        }
        let sr = self.sample_rate as f32;
        let syllable_len = (SYLLABLE_SECS * sr).round() as usize;
        let gap_len = (GAP_SECS * sr).round() as usize;

        let mut samples = Vec::with_capacity(words * (syllable_len + gap_len));
        for _ in 0..words {
            samples.extend(self.syllable(syllable_len));
            samples.extend(std::iter::repeat_n(0.0, gap_len));
        }
        Ok(PcmBuffer::mono(samples, self.sample_rate))
    }
}
