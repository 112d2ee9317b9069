//! Configuration loader with multi-source merging

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{ConfigError, ProbeConfig};

/// Values given on the command line. `None` leaves lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub path: Option<PathBuf>,
    pub listen: Option<String>,
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    env_prefix: String,
    env_source: Option<HashMap<String, String>>,
    overrides: Overrides,
}

impl ConfigLoader {
    /// Create a new config loader reading `DIOPROBE_*` from the process environment
    pub fn new() -> Self {
        Self {
            config_file: None,
            env_prefix: "DIOPROBE".to_string(),
            env_source: None,
            overrides: Overrides::default(),
        }
    }

    /// Read a TOML file between the defaults and the environment
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix (default: "DIOPROBE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Use `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Apply command-line values on top of every other source
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<ProbeConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = ProbeConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Config file (--config)
        if let Some(path) = &self.config_file {
            let content = read_toml(path)?;
            builder = builder.add_source(config::File::from_str(
                &content,
                config::FileFormat::Toml,
            ));
        }

        // 3. Environment variables (DIOPROBE_PATH, DIOPROBE_LISTEN, ...);
        //    set-but-empty counts as unset
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .ignore_empty(true)
                .try_parsing(true)
                .source(self.env_source.clone()),
        );

        // 4. Command-line flags
        let path = self
            .overrides
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        builder = builder
            .set_override_option("path", path)?
            .set_override_option("listen", self.overrides.listen.clone())?;

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let probe_config: ProbeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        probe_config.validate()?;

        Ok(probe_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads and syntax-checks a TOML file so errors name the file.
fn read_toml(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<toml::Table>(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::new()
            .with_env_source(HashMap::new())
            .load()
            .expect("Failed to load config");

        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("dioprobe.toml");
        fs::write(
            &file,
            r#"
path = "/mnt/data"
listen = "127.0.0.1:9000"
block_size = 8192
"#,
        )
        .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_config_file(&file)
            .with_env_source(HashMap::new())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.path, PathBuf::from("/mnt/data"));
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.block_size, 8192);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("dioprobe.toml");
        fs::write(&file, "path = \"/from/file\"\nlisten = \":1000\"\n")
            .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_config_file(&file)
            .with_env_source(env(&[("DIOPROBE_PATH", "/from/env")]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config.path, PathBuf::from("/from/env"));
        assert_eq!(config.listen, ":1000");
    }

    #[test]
    fn test_empty_env_values_fall_back_to_defaults() {
        let config = ConfigLoader::new()
            .with_env_source(env(&[
                ("DIOPROBE_PATH", ""),
                ("DIOPROBE_LISTEN", ""),
                ("DIOPROBE_BLOCK_SIZE", ""),
            ]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_empty_env_value_keeps_file_value() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("dioprobe.toml");
        fs::write(&file, "listen = \"127.0.0.1:9100\"\n").expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_config_file(&file)
            .with_env_source(env(&[("DIOPROBE_LISTEN", "")]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config.listen, "127.0.0.1:9100");
    }

    #[test]
    fn test_env_block_size() {
        let config = ConfigLoader::new()
            .with_env_source(env(&[("DIOPROBE_BLOCK_SIZE", "16384")]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config.block_size, 16384);
    }

    #[test]
    fn test_overrides_win() {
        let config = ConfigLoader::new()
            .with_env_source(env(&[
                ("DIOPROBE_PATH", "/from/env"),
                ("DIOPROBE_LISTEN", ":2000"),
            ]))
            .with_overrides(Overrides {
                path: Some(PathBuf::from("/from/flag")),
                listen: None,
            })
            .load()
            .expect("Failed to load config");

        assert_eq!(config.path, PathBuf::from("/from/flag"));
        assert_eq!(config.listen, ":2000");
    }

    #[test]
    fn test_custom_prefix() {
        let config = ConfigLoader::new()
            .with_env_prefix("PROBE")
            .with_env_source(env(&[("PROBE_LISTEN", ":3000"), ("DIOPROBE_LISTEN", ":4000")]))
            .load()
            .expect("Failed to load config");

        assert_eq!(config.listen, ":3000");
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let err = ConfigLoader::new()
            .with_config_file(temp_dir.path().join("absent.toml"))
            .with_env_source(HashMap::new())
            .load()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_malformed_config_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let file = temp_dir.path().join("broken.toml");
        fs::write(&file, "path = [unterminated").expect("Failed to write config");

        let err = ConfigLoader::new()
            .with_config_file(&file)
            .with_env_source(HashMap::new())
            .load()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ConfigLoader::new()
            .with_env_source(env(&[("DIOPROBE_LISTEN", "nonsense:port")]))
            .load()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ListenAddress { .. })
        ));
    }
}
