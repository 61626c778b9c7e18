//! Configuration loader
//!
//! `defaults/corpus2sql.default.toml` is embedded into the binary so the
//! documented defaults and runtime behavior stay in sync. [`load`] layers, in
//! order of increasing precedence:
//!
//! 1. the embedded defaults,
//! 2. `corpus2sql.toml` in the working directory, when present,
//! 3. a file given with `--config`,
//! 4. values given as command-line flags.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../../defaults/corpus2sql.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    pub ingest: IngestConfig,
    pub clusters: ClustersConfig,
    pub json: JsonConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub checkpoint_interval: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClustersConfig {
    pub header_lines: usize,
}

/// Type guessing for the generic JSON-lines loader.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonConfig {
    pub sample_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
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

    /// Layer a configuration file only if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<CorpusConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<CorpusConfig, ConfigError> {
    Loader::new().build()
}

/// Name of the optional project file picked up from the working directory.
pub const LOCAL_FILE: &str = "corpus2sql.toml";

/// Build the run configuration. `dir` is searched for [`LOCAL_FILE`];
/// `overrides` are dotted keys such as `clusters.header_lines`.
pub fn load(
    dir: &Path,
    explicit: Option<&Path>,
    overrides: &[(&str, i64)],
) -> Result<CorpusConfig, ConfigError> {
    let mut loader = Loader::new().with_optional_file(dir.join(LOCAL_FILE));
    if let Some(path) = explicit {
        loader = loader.with_file(path);
    }
    for (key, value) in overrides {
        loader = loader.set_override(key, *value)?;
    }
    loader.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.ingest.checkpoint_interval, 100_000);
        assert_eq!(config.clusters.header_lines, 6);
        assert_eq!(config.json.sample_size, 100);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_supports_overrides() {
        let config = Loader::new()
            .set_override("clusters.header_lines", 0_i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.clusters.header_lines, 0);
    }

    #[test]
    fn test_user_file_layers_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[json]\nsample_size = 5").unwrap();
        let config = Loader::new().with_file(file.path()).build().unwrap();
        assert_eq!(config.json.sample_size, 5);
        assert_eq!(config.ingest.checkpoint_interval, 100_000);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new().with_file(dir.path().join("nope.toml")).build().is_err());
    }

    #[test]
    fn test_layer_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCAL_FILE),
            "[clusters]\nheader_lines = 2\n[json]\nsample_size = 7\n",
        )
        .unwrap();
        let explicit = dir.path().join("run.toml");
        std::fs::write(&explicit, "[json]\nsample_size = 9\n").unwrap();

        let local = load(dir.path(), None, &[]).unwrap();
        assert_eq!(local.clusters.header_lines, 2);
        assert_eq!(local.json.sample_size, 7);

        let layered = load(
            dir.path(),
            Some(&explicit),
            &[("ingest.checkpoint_interval", 10)],
        )
        .unwrap();
        assert_eq!(layered.clusters.header_lines, 2);
        assert_eq!(layered.json.sample_size, 9);
        assert_eq!(layered.ingest.checkpoint_interval, 10);
    }

    #[test]
    fn test_flags_beat_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_FILE), "[clusters]\nheader_lines = 2\n").unwrap();
        let config = load(dir.path(), None, &[("clusters.header_lines", 0)]).unwrap();
        assert_eq!(config.clusters.header_lines, 0);
    }

    #[test]
    fn test_missing_optional_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = Loader::new()
            .with_optional_file(dir.path().join("nope.toml"))
            .build()
            .unwrap();
        assert_eq!(config.clusters.header_lines, 6);
    }
}
