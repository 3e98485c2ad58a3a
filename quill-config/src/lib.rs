//! Shared configuration loader for the quill toolchain.
//!
//! `defaults/quill.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`QuillConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use quill_babel::common::reader::ReaderOptions;
use quill_babel::registry::{Registry, RegistryError};
use quill_babel::schema::registry_without;
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/quill.default.toml");

/// Name of the per-project configuration file picked up from the working directory.
pub const PROJECT_FILE: &str = "quill.toml";

/// Top-level configuration consumed by quill applications.
#[derive(Debug, Clone, Deserialize)]
pub struct QuillConfig {
    pub convert: ConvertConfig,
    pub pandoc: PandocConfig,
    pub logging: LoggingConfig,
}

/// Conversion knobs shared by every engine.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    pub engine: EngineKind,
    pub max_depth: usize,
    pub disabled_types: Vec<String>,
}

impl ConvertConfig {
    /// The built-in registry minus the configured disabled types.
    pub fn registry(&self) -> Result<Registry, RegistryError> {
        registry_without(self.disabled_types.iter().cloned())
    }
}

impl From<&ConvertConfig> for ReaderOptions {
    fn from(config: &ConvertConfig) -> Self {
        ReaderOptions {
            max_depth: config.max_depth,
        }
    }
}

/// Which markdown engine backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EngineKind {
    #[serde(rename = "pandoc")]
    Pandoc,
    #[serde(rename = "comrak")]
    Comrak,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Pandoc => "pandoc",
            EngineKind::Comrak => "comrak",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PandocConfig {
    pub binary: String,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<QuillConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<QuillConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.convert.engine, EngineKind::Pandoc);
        assert_eq!(config.convert.max_depth, 256);
        assert!(config.convert.disabled_types.is_empty());
        assert_eq!(config.pandoc.binary, "pandoc");
        assert!(config.pandoc.extra_args.is_empty());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("convert.engine", "comrak")
            .expect("override to apply")
            .set_override("logging.level", "debug")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.convert.engine, EngineKind::Comrak);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_unknown_engines() {
        let result = Loader::new()
            .set_override("convert.engine", "markdown-it")
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn layers_files_over_defaults() {
        let dir = std::env::temp_dir().join(format!("quill-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layered.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[convert]\nmax_depth = 12\ndisabled_types = [\"math\"]").unwrap();

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.convert.max_depth, 12);
        assert_eq!(config.convert.disabled_types, vec!["math".to_string()]);
        assert_eq!(config.convert.engine, EngineKind::Pandoc);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = Loader::new().with_file("/definitely/not/here.toml").build();
        assert!(result.is_err());

        let config = Loader::new()
            .with_optional_file("/definitely/not/here.toml")
            .build()
            .expect("optional files may be absent");
        assert_eq!(config.convert.max_depth, 256);
    }

    #[test]
    fn convert_config_feeds_the_reader_and_registry() {
        let mut config = load_defaults().expect("defaults to deserialize").convert;
        config.max_depth = 8;
        config.disabled_types = vec!["math".to_string()];

        let options = ReaderOptions::from(&config);
        assert_eq!(options.max_depth, 8);

        let registry = config.registry().expect("registry to build");
        assert!(!registry.has_node_type("math"));
        assert!(registry.has_node_type("paragraph"));
    }
}
