use std::{collections::HashMap, fs, path::Path};

use failure::Fail;
use log::LevelFilter;

/// Engine configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    /// Per-type publication settings, keyed by registered type name.
    #[serde(default)]
    pub types: HashMap<String, TypeConfig>,
}

impl Config {
    /// Read configuration from a TOML file.
    pub fn load<P>(path: P) -> Result<Config, LoadConfigError>
    where
        P: AsRef<Path>,
    {
        let data = fs::read(path).map_err(LoadConfigError::Read)?;
        toml::from_slice(&data).map_err(LoadConfigError::Parse)
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Custom per-module filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

impl Default for Logging {
    fn default() -> Logging {
        Logging {
            level: default_level_filter(),
            filters: HashMap::new(),
        }
    }
}

/// Publication settings for a single record type.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TypeConfig {
    /// Extra fields never copied to the public mirror.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Initialize the process-wide logger from configuration.
///
/// Environment variables still take precedence, so `RUST_LOG` keeps working.
pub fn init_logging(config: &Logging) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);
    for (module, level) in &config.filters {
        builder.filter_module(module, *level);
    }
    let _ = builder.try_init();
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

#[derive(Debug, Fail)]
pub enum LoadConfigError {
    #[fail(display = "Cannot read configuration file: {}", _0)]
    Read(#[cause] std::io::Error),
    #[fail(display = "Invalid configuration: {}", _0)]
    Parse(#[cause] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_overrides() {
        let config: Config = toml::from_str(r#"
            [logging]
            level = "debug"

            [types.page]
            exclude = ["log", "internal_notes"]
        "#).unwrap();

        assert_eq!(config.logging.level, LevelFilter::Debug);
        assert_eq!(config.types["page"].exclude, ["log", "internal_notes"]);
    }

    #[test]
    fn everything_is_optional() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, LevelFilter::Info);
        assert!(config.types.is_empty());
    }
}
