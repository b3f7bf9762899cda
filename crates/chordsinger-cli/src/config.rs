use std::path::{Path, PathBuf};

use chordsinger_services::PipelineConfig;
use tracing::{debug, warn};

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chordsinger")
        .join("config.toml")
}

/// Load `path`, or the user config file, falling back to defaults.
pub(crate) fn load_config(path: Option<&Path>) -> PipelineConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let Ok(text) = std::fs::read_to_string(&path) else {
        debug!(path = %path.display(), "No config file, using defaults");
        return PipelineConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded config");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), "Ignoring unparsable config: {e}");
            PipelineConfig::default()
        }
    }
}

/// Write the defaults out so they can be edited.
pub(crate) fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&PipelineConfig::default())?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chordsinger_services::VocalMode;

    #[test]
    fn test_default_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path).unwrap();
        assert_eq!(load_config(Some(&path)), PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = \"sung\"\n\n[audio]\ntarget_sample_rate = 22050\n").unwrap();
        let config = load_config(Some(&path));
        assert_eq!(config.mode, VocalMode::Sung);
        assert_eq!(config.audio.target_sample_rate, 22050);
        assert_eq!(config.pitch, PipelineConfig::default().pitch);
    }

    #[test]
    fn test_garbage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = [[[").unwrap();
        assert_eq!(load_config(Some(&path)), PipelineConfig::default());
    }
}
