use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_ADMIN_KEY: &str = "YourStrongAdminKey123";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerConfig,
    admin: AdminConfig,
    storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AdminConfig {
    key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageConfig {
    data_dir: Option<String>,
    db_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub admin_key: String,
    pub data_dir: PathBuf,
    pub db_file: String,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_file = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            info!("No config file at {}, using environment", path.display());
            ConfigFile::default()
        };

        Self::resolve(config_file, |key| std::env::var(key).ok())
    }

    pub fn load() -> Result<Self> {
        let path = std::env::var("SURVEY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::from_file(Path::new(&path))
    }

    fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match env("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", raw))?,
            None => file.server.port.unwrap_or(4000),
        };

        let admin_key = env("ADMIN_KEY")
            .or(file.admin.key)
            .unwrap_or_else(|| DEFAULT_ADMIN_KEY.to_string());

        if admin_key == DEFAULT_ADMIN_KEY {
            warn!("ADMIN_KEY is not set, falling back to the built-in default; override it in production");
        }

        Ok(Self {
            host: env("HOST")
                .or(file.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            admin_key,
            data_dir: env("DATA_DIR")
                .or(file.storage.data_dir)
                .unwrap_or_else(|| ".".to_string())
                .into(),
            db_file: env("DB_FILE")
                .or(file.storage.db_file)
                .unwrap_or_else(|| "aam_survey.db".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = Config::resolve(ConfigFile::default(), env_of(&[])).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.admin_key, DEFAULT_ADMIN_KEY);
        assert_eq!(config.db_file, "aam_survey.db");
        assert_eq!(config.bind_address(), "0.0.0.0:4000");
    }

    #[test]
    fn env_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 8080

            [admin]
            key = "from-file"

            [storage]
            data_dir = "/var/lib/survey"
            "#,
        )
        .unwrap();

        let config = Config::resolve(file, env_of(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.admin_key, "from-file");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/survey"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = Config::resolve(ConfigFile::default(), env_of(&[("PORT", "abc")]));
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert!(!config.admin_key.is_empty());
    }
}
