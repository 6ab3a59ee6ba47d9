use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/admin.toml";

/// File/environment settings with CLI flags layered on top by `main`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./urdimbre.db?mode=rwc".to_string(),
            level: "info".to_string(),
        }
    }
}

pub fn load(path: Option<&str>) -> Result<Settings, config::ConfigError> {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("URDIMBRE"));
    builder.build()?.try_deserialize()
}
