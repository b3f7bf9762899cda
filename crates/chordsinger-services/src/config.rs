//! Pipeline configuration

use std::path::PathBuf;

use chordsinger_core::PitchSettings;
use serde::{Deserialize, Serialize};

use crate::audio_effects::EffectSettings;
use crate::compositor::MixLevels;

/// How the vocal line follows the song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocalMode {
    /// Pitch follows the melody, full effects
    Sung,
    /// Baseline pitch, filler words, light effects
    #[default]
    Stable,
}

impl VocalMode {
    pub fn follows_melody(&self) -> bool {
        matches!(self, Self::Sung)
    }

    pub fn uses_filler_words(&self) -> bool {
        matches!(self, Self::Stable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub target_sample_rate: u32,
    /// Lower-case file extensions accepted as input
    pub supported_extensions: Vec<String>,
    /// Where temporary files go; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            target_sample_rate: 44100,
            supported_extensions: ["mp3", "wav", "flac", "m4a", "ogg", "aac"]
                .into_iter()
                .map(String::from)
                .collect(),
            scratch_dir: None,
        }
    }
}

impl AudioSettings {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    pub sung: MixLevels,
    pub stable: MixLevels,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            sung: MixLevels { instrumental_db: -8.0, vocals_db: 3.0 },
            stable: MixLevels { instrumental_db: -10.0, vocals_db: 5.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub sung: EffectSettings,
    pub stable: EffectSettings,
    /// Base seed for breath noise; each segment derives its own
    pub seed: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self { sung: EffectSettings::sung(), stable: EffectSettings::stable(), seed: 0x5eed }
    }
}

/// One speech backend, in rank order within [`SynthesisConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// External program that prints a WAV stream; the text is the last argument
    Command { program: String, args: Vec<String> },
    /// Service that answers a JSON `{"text": ...}` POST with a WAV body
    Http {
        url: String,
        #[serde(default = "default_http_timeout")]
        timeout_secs: u64,
    },
    /// Built-in hummed voice
    Tone,
}

fn default_http_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub backends: Vec<BackendConfig>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backends: vec![
                BackendConfig::Command {
                    program: "espeak-ng".to_string(),
                    args: vec!["--stdout".to_string()],
                },
                BackendConfig::Tone,
            ],
        }
    }
}

/// External stem separator. `{input}` and `{output}` in `args` are replaced
/// with the song path and a scratch directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "spleeter".to_string(),
            args: ["separate", "-p", "spleeter:2stems", "-o", "{output}", "{input}"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub audio: AudioSettings,
    pub pitch: PitchSettings,
    pub mode: VocalMode,
    pub mix: MixSettings,
    pub effects: EffectsConfig,
    pub synthesis: SynthesisConfig,
    pub separator: SeparatorConfig,
}

impl PipelineConfig {
    pub fn mix_levels(&self) -> MixLevels {
        match self.mode {
            VocalMode::Sung => self.mix.sung,
            VocalMode::Stable => self.mix.stable,
        }
    }

    pub fn effect_settings(&self) -> EffectSettings {
        match self.mode {
            VocalMode::Sung => self.effects.sung,
            VocalMode::Stable => self.effects.stable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.mode, VocalMode::Stable);
        assert_eq!(config.audio.target_sample_rate, 44100);
        assert_eq!(config.mix_levels(), MixLevels { instrumental_db: -10.0, vocals_db: 5.0 });
        assert!(!config.effect_settings().breath.enabled);
        assert_eq!(config.synthesis.backends.last(), Some(&BackendConfig::Tone));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"mode": "sung", "audio": {"target_sample_rate": 22050},
                "synthesis": {"backends": [{"kind": "http", "url": "http://localhost:5002/tts"}]}}"#,
        )
        .unwrap();
        assert_eq!(config.mode, VocalMode::Sung);
        assert_eq!(config.audio.target_sample_rate, 22050);
        assert!(config.audio.supported_extensions.iter().any(|e| e == "flac"));
        assert_eq!(config.mix_levels(), MixLevels { instrumental_db: -8.0, vocals_db: 3.0 });
        assert!(config.effect_settings().breath.enabled);
        assert_eq!(
            config.synthesis.backends,
            vec![BackendConfig::Http { url: "http://localhost:5002/tts".into(), timeout_secs: 30 }]
        );
    }
}
