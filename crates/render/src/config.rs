use std::path::Path;

use procgfx_content::{GeneratorConfig, ProceduralParameters};
use procgfx_device::DeviceConfig;
use procgfx_frame::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Errors loading or saving a renderer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Complete renderer configuration, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub device: DeviceConfig,
    pub generator: GeneratorConfig,
    pub scheduler: SchedulerConfig,
    /// Initial procedural parameters.
    pub params: ProceduralParameters,
    /// Stop the render loop after this many presented frames.
    pub max_frames: Option<u64>,
    /// Evolve content by this step instead of wall-clock delta time, making
    /// runs reproducible.
    pub fixed_dt: Option<f32>,
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            generator: GeneratorConfig { incremental: true },
            scheduler: SchedulerConfig::default(),
            params: ProceduralParameters::default(),
            max_frames: None,
            fixed_dt: None,
            clear_color: [0.02, 0.03, 0.05, 1.0],
        }
    }
}

impl RendererConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading renderer config");
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgfx_common::Extent2d;

    #[test]
    fn empty_yaml_gives_defaults() {
        let cfg = RendererConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, RendererConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let yaml = r#"
max_frames: 10
fixed_dt: 0.016
params:
  seed: 7
  resolution: 32
device:
  surface:
    extent: { width: 320, height: 240 }
scheduler:
  max_retries_per_frame: 5
"#;
        let cfg = RendererConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.max_frames, Some(10));
        assert_eq!(cfg.params.seed(), 7);
        assert_eq!(cfg.params.resolution(), 32);
        assert_eq!(cfg.params.octaves(), 4);
        assert_eq!(cfg.device.surface.extent, Extent2d::new(320, 240));
        assert_eq!(cfg.scheduler.max_retries_per_frame, 5);
        assert!(cfg.generator.incremental);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RendererConfig::from_yaml_str("max_frame: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(RendererConfig::from_yaml_str("params: { sed: 1 }\n").is_err());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.yaml");
        let mut cfg = RendererConfig::default();
        cfg.max_frames = Some(3);
        cfg.params.set_seed(99);
        cfg.save(&path).unwrap();

        let loaded = RendererConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.max_frames, Some(3));
        assert_eq!(loaded.params.seed(), 99);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RendererConfig::from_yaml_file("/nonexistent/renderer.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
