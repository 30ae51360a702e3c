use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SOLAR_FORECAST";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    pub artifact_path: String,
    pub inference_timeout_ms: u64,
    /// Rows further than this past the training history are rejected.
    pub max_horizon_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub service_url: String,
    pub request_timeout_secs: u64,
}

impl ModelConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Built-in defaults, then `path` if it exists, then `SOLAR_FORECAST__*`
    /// environment variables (e.g. `SOLAR_FORECAST__SERVER__PORT=9000`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("model.artifact_path", "models/prophet_best_model.json")?
            .set_default("model.inference_timeout_ms", 5000)?
            .set_default("model.max_horizon_days", 3650)?
            .set_default("client.service_url", "http://localhost:8000")?
            .set_default("client.request_timeout_secs", 30)?
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load("/nonexistent/solar-forecast.toml").unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.inference_timeout(), Duration::from_secs(5));
        assert_eq!(config.client.service_url, "http://localhost:8000");
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9100

[model]
artifact_path = "/srv/models/irradiance.json"
inference_timeout_ms = 750
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert_eq!(config.model.artifact_path, "/srv/models/irradiance.json");
        assert_eq!(config.model.inference_timeout(), Duration::from_millis(750));
        // untouched sections keep their defaults
        assert_eq!(config.client.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[model]\nmax_horizon_days = 100").unwrap();

        std::env::set_var("SOLAR_FORECAST__MODEL__MAX_HORIZON_DAYS", "42");
        let loaded = Config::load(file.path().to_str().unwrap());
        std::env::remove_var("SOLAR_FORECAST__MODEL__MAX_HORIZON_DAYS");

        let config = loaded.unwrap();
        assert_eq!(config.model.max_horizon_days, 42);
        assert_eq!(config.model.inference_timeout_ms, 5000);
    }
}
