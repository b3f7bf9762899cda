//! Audio decoding, WAV encoding and input preprocessing

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chordsinger_core::PcmBuffer;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

use crate::resample::{resample_rate, ResampleError};

#[derive(Debug, Error)]
pub enum AudioIoError {
    #[error("Audio file not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported file format '{extension}' (supported: {supported})")]
    UnsupportedFormat { extension: String, supported: String },
    #[error("Failed to decode WAV: {0}")]
    Decode(#[from] hound::Error),
    #[error("Failed to decode audio: {0}")]
    Compressed(#[from] SymphoniaError),
    #[error("No decodable audio track")]
    NoAudioTrack,
    #[error("WAV file is empty")]
    Empty,
    #[error("Failed to encode WAV: {0}")]
    Encode(String),
    #[error("Resampling failed: {0}")]
    Resample(#[from] ResampleError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode any hound-readable WAV stream to float samples.
pub fn decode_wav<R: Read>(reader: hound::WavReader<R>) -> Result<PcmBuffer, AudioIoError> {
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    if samples.is_empty() {
        return Err(AudioIoError::Empty);
    }

    Ok(PcmBuffer {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
    })
}

/// Read a WAV file from disk
pub fn read_wav(path: &Path) -> Result<PcmBuffer, AudioIoError> {
    if !path.exists() {
        return Err(AudioIoError::NotFound(path.to_path_buf()));
    }
    decode_wav(hound::WavReader::open(path)?)
}

/// Decode a compressed or container format (mp3, flac, m4a, ogg, aac) to
/// interleaved float samples.
pub fn decode_with_symphonia(path: &Path) -> Result<PcmBuffer, AudioIoError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }
    let probed = get_probe().format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioIoError::NoAudioTrack)?;
    let track_id = track.id;
    let bits_per_sample = track.codec_params.bits_per_sample.unwrap_or(16) as u16;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut signal = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // end of stream
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
                signal.get_or_insert(spec);
            }
            Err(SymphoniaError::DecodeError(e)) => debug!(path = %path.display(), "Skipping bad packet: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    let Some(spec) = signal.filter(|_| !samples.is_empty()) else {
        return Err(AudioIoError::Empty);
    };
    Ok(PcmBuffer {
        samples,
        sample_rate: spec.rate,
        channels: spec.channels.count() as u16,
        bits_per_sample,
    })
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Read a song file: WAV through hound, anything else through symphonia
pub fn read_audio(path: &Path) -> Result<PcmBuffer, AudioIoError> {
    if !path.exists() {
        return Err(AudioIoError::NotFound(path.to_path_buf()));
    }
    if lowercase_extension(path) == "wav" {
        read_wav(path)
    } else {
        decode_with_symphonia(path)
    }
}

/// Decode WAV bytes held in memory, e.g. from a speech backend
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<PcmBuffer, AudioIoError> {
    decode_wav(hound::WavReader::new(std::io::Cursor::new(bytes))?)
}

/// Read WAV, mix to mono and convert to `target_rate`.
pub fn read_wav_mono(path: &Path, target_rate: u32) -> Result<PcmBuffer, AudioIoError> {
    let buffer = read_wav(path)?.into_mono();
    to_rate(buffer, target_rate)
}

/// Convert a mono buffer to `target_rate`, keeping its duration
pub fn to_rate(buffer: PcmBuffer, target_rate: u32) -> Result<PcmBuffer, AudioIoError> {
    if buffer.sample_rate == target_rate {
        return Ok(buffer);
    }
    debug!(from = buffer.sample_rate, to = target_rate, "Resampling");
    let samples = resample_rate(&buffer.samples, buffer.sample_rate, target_rate)?;
    Ok(PcmBuffer { samples, sample_rate: target_rate, ..buffer })
}

/// Write a mono buffer as 16-bit PCM, saturating out-of-range samples.
pub fn write_wav(path: &Path, buffer: &PcmBuffer) -> Result<(), AudioIoError> {
    let spec = hound::WavSpec {
        channels: buffer.channels.max(1),
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| AudioIoError::Encode(e.to_string()))?;
    for &sample in &buffer.samples {
        writer
            .write_sample(to_i16(sample))
            .map_err(|e| AudioIoError::Encode(e.to_string()))?;
    }
    writer.finalize().map_err(|e| AudioIoError::Encode(e.to_string()))
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Encode a buffer to in-memory WAV bytes
pub fn encode_wav_bytes(buffer: &PcmBuffer) -> Result<Vec<u8>, AudioIoError> {
    let spec = hound::WavSpec {
        channels: buffer.channels.max(1),
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioIoError::Encode(e.to_string()))?;
        for &sample in &buffer.samples {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| AudioIoError::Encode(e.to_string()))?;
        }
        writer.finalize().map_err(|e| AudioIoError::Encode(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Reject missing files and extensions outside `supported`.
pub fn validate_input(path: &Path, supported: &[String]) -> Result<(), AudioIoError> {
    if !path.exists() {
        return Err(AudioIoError::NotFound(path.to_path_buf()));
    }
    let extension = lowercase_extension(path);
    if supported.iter().any(|s| s.eq_ignore_ascii_case(&extension)) {
        return Ok(());
    }
    Err(AudioIoError::UnsupportedFormat { extension, supported: supported.join(", ") })
}

/// Song audio normalised for the rest of the pipeline
#[derive(Debug)]
pub struct PreparedAudio {
    pub audio: PcmBuffer,
    pub duration: f64,
    /// Mono, target-rate WAV copy on disk for path-based collaborators
    pub file: TempPath,
}

impl PreparedAudio {
    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// Validate, decode, downmix and resample the input song, and stage a
/// normalised copy on disk.
pub fn preprocess(
    input: &Path,
    target_rate: u32,
    supported: &[String],
    scratch_dir: &Path,
) -> Result<PreparedAudio, AudioIoError> {
    validate_input(input, supported)?;
    let audio = to_rate(read_audio(input)?.into_mono(), target_rate)?;
    let duration = audio.duration_secs();

    let file = tempfile::Builder::new()
        .prefix("chordsinger-preprocessed-")
        .suffix(".wav")
        .tempfile_in(scratch_dir)?
        .into_temp_path();
    write_wav(&file, &audio)?;

    info!(path = %input.display(), duration, sample_rate = target_rate, "Preprocessed input");
    Ok(PreparedAudio { audio, duration, file })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(path: &Path, channels: u16, rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for ch in 0..channels {
                let v = if ch == 0 { 8000 } else { -8000 };
                writer.write_sample(if i % 2 == 0 { v } else { v / 2 }).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_roundtrip_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = PcmBuffer::mono(vec![0.0, 0.5, -0.5, 1.5, -2.0], 8000);
        write_wav(&path, &buffer).unwrap();

        let read = read_wav(&path).unwrap();
        assert_eq!(read.sample_rate, 8000);
        assert_eq!(read.len(), 5);
        assert!((read.samples[1] - 0.5).abs() < 1e-3);
        // saturated
        assert!(read.samples[3] <= 1.0 && read.samples[3] > 0.99);
        assert!(read.samples[4] >= -1.0 && read.samples[4] < -0.99);
    }

    #[test]
    fn test_stereo_downmix_and_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_fixture(&path, 2, 8000, 800);

        let mono = read_wav_mono(&path, 8000).unwrap();
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.len(), 800);
        assert!(mono.samples.iter().all(|s| s.abs() < 1e-6));

        let resampled = read_wav_mono(&path, 16000).unwrap();
        assert_eq!(resampled.len(), 1600);
    }

    #[test]
    fn test_validate_input() {
        let dir = tempfile::tempdir().unwrap();
        let supported = vec!["wav".to_string()];
        let missing = dir.path().join("missing.wav");
        assert!(matches!(validate_input(&missing, &supported), Err(AudioIoError::NotFound(_))));

        let mp3 = dir.path().join("song.mp3");
        std::fs::write(&mp3, b"not audio").unwrap();
        assert!(matches!(
            validate_input(&mp3, &supported),
            Err(AudioIoError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_symphonia_decode_matches_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_fixture(&path, 2, 8000, 800);

        let via_hound = read_wav(&path).unwrap();
        let via_symphonia = decode_with_symphonia(&path).unwrap();
        assert_eq!(via_symphonia.sample_rate, 8000);
        assert_eq!(via_symphonia.channels, 2);
        assert_eq!(via_symphonia.len(), via_hound.len());
        for (a, b) in via_symphonia.samples.iter().zip(&via_hound.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_corrupt_compressed_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        let err = read_audio(&path).unwrap_err();
        assert!(!matches!(err, AudioIoError::NotFound(_) | AudioIoError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_preprocess_stages_temp_wav() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.wav");
        write_fixture(&song, 2, 16000, 1600);
        let supported = vec!["wav".to_string()];

        let prepared = preprocess(&song, 8000, &supported, dir.path()).unwrap();
        let staged = prepared.path().to_path_buf();
        assert!(staged.file_name().unwrap().to_string_lossy().starts_with("chordsinger-"));
        assert!((prepared.duration - 0.1).abs() < 1e-3);
        let on_disk = read_wav(&staged).unwrap();
        assert_eq!((on_disk.channels, on_disk.sample_rate), (1, 8000));

        drop(prepared);
        assert!(!staged.exists());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let buffer = PcmBuffer::mono(vec![0.25; 100], 22050);
        let bytes = encode_wav_bytes(&buffer).unwrap();
        let decoded = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.len(), 100);
    }
}
