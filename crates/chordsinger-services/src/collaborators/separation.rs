//! Source separation adapters

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{CollaboratorError, SeparatedStems, SourceSeparator};
use crate::config::SeparatorConfig;

/// Uses the song itself as the instrumental
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSeparator;

impl SourceSeparator for PassthroughSeparator {
    fn name(&self) -> &str { "passthrough" }

    fn separate(&self, audio: &Path, _scratch_dir: &Path) -> Result<SeparatedStems, CollaboratorError> {
        Ok(SeparatedStems::unseparated(audio))
    }
}

/// Runs an external two-stem separator into a scratch directory.
///
/// The tool is expected to write `accompaniment.wav` and `vocals.wav`
/// somewhere under the output directory.
#[derive(Debug, Clone)]
pub struct CommandSeparator {
    program: String,
    args: Vec<String>,
}

impl CommandSeparator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    pub fn from_config(config: &SeparatorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

fn find_stem(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let direct = dir.join(file_name);
    if direct.is_file() {
        return Some(direct);
    }
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .find_map(|sub| find_stem(&sub, file_name))
}

impl SourceSeparator for CommandSeparator {
    fn name(&self) -> &str { &self.program }

    fn separate(&self, audio: &Path, scratch_dir: &Path) -> Result<SeparatedStems, CollaboratorError> {
        let scratch = tempfile::Builder::new().prefix("chordsinger-stems-").tempdir_in(scratch_dir)?;
        let args = self.expand_args(audio, scratch.path());
        debug!(program = %self.program, ?args, "Running separator");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CollaboratorError::Failed {
                service: "separator",
                reason: format!("failed to start {}: {e}", self.program),
            })?;
        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                service: "separator",
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let instrumental = find_stem(scratch.path(), "accompaniment.wav").ok_or_else(|| {
            CollaboratorError::Failed {
                service: "separator",
                reason: "no accompaniment.wav produced".to_string(),
            }
        })?;
        let vocals = find_stem(scratch.path(), "vocals.wav");
        info!(instrumental = %instrumental.display(), has_vocals = vocals.is_some(), "Stems separated");
        Ok(SeparatedStems { instrumental, vocals, scratch: Some(scratch) })
    }
}
