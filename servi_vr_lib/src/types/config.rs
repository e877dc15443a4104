use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Runtime configuration for the relay server.
///
/// Values come from (lowest to highest precedence) built-in defaults,
/// an optional TOML file named by `RELAY_CONFIG`, and individual
/// environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_address: String,
    pub port: u16,
    /// CORS origins; `*` allows any origin
    pub allowed_origins: Vec<String>,
    /// Simulation tick period in milliseconds
    pub tick_interval_ms: u64,
    pub robot_id: String,
    /// Delay before mock terminal output is sent back, in milliseconds
    pub command_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: vec!["*".to_string()],
            tick_interval_ms: 100,
            robot_id: "SERVI-001".to_string(),
            command_delay_ms: 100,
        }
    }
}

impl RelayConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults plus environment variable overrides, no config file.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Full resolution chain: defaults, then the `RELAY_CONFIG` file if
    /// set, then environment overrides.
    pub fn load() -> Result<Self> {
        let config = match env::var("RELAY_CONFIG") {
            Ok(path) => Self::load_from_file(&path)?,
            Err(_) => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(address) = env::var("BIND_ADDRESS") {
            self.bind_address = address;
        }
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
        }
        if let Some(ms) = env::var("SIM_TICK_MS").ok().and_then(|v| v.parse().ok()) {
            self.tick_interval_ms = ms;
        }
        if let Ok(robot_id) = env::var("ROBOT_ID") {
            self.robot_id = robot_id;
        }
        if let Some(ms) = env::var("COMMAND_DELAY_MS").ok().and_then(|v| v.parse().ok()) {
            self.command_delay_ms = ms;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(eyre::eyre!("tick_interval_ms must be greater than zero"));
        }
        if self.robot_id.is_empty() {
            return Err(eyre::eyre!("robot_id must not be empty"));
        }
        if self.allowed_origins.is_empty() {
            return Err(eyre::eyre!("allowed_origins must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();

        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.robot_id, "SERVI-001");
        assert_eq!(config.command_delay_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_address = "0.0.0.0"
port = 4100
allowed_origins = ["http://localhost:3000", "https://vr.example.com"]
tick_interval_ms = 50
"#
        )
        .unwrap();

        let config = RelayConfig::load_from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 4100);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.tick_interval_ms, 50);
        // Unspecified fields keep their defaults
        assert_eq!(config.robot_id, "SERVI-001");
        assert_eq!(config.command_delay_ms, 100);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        assert!(RelayConfig::load_from_file("/nonexistent/relay.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let config = RelayConfig {
            tick_interval_ms: 0,
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_robot_id() {
        let config = RelayConfig {
            robot_id: String::new(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_origin_list_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"allowed_origins = ["*"]"#).unwrap();

        let config = RelayConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    }

    // Environment variables are process-global, so every override is
    // exercised inside this one test
    #[test]
    fn test_env_overrides() {
        env::set_var("BIND_ADDRESS", "0.0.0.0");
        env::set_var("PORT", "4200");
        env::set_var(
            "ALLOWED_ORIGINS",
            "http://localhost:3000, https://vr.example.com ,",
        );
        env::set_var("SIM_TICK_MS", "50");
        env::set_var("ROBOT_ID", "SERVI-042");
        env::set_var("COMMAND_DELAY_MS", "250");

        let config = RelayConfig::from_env();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 4200);
        // Origin entries are trimmed and empty ones dropped
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://vr.example.com".to_string()
            ]
        );
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.robot_id, "SERVI-042");
        assert_eq!(config.command_delay_ms, 250);

        // A value that does not parse leaves the current value in place
        env::set_var("PORT", "not-a-port");
        assert_eq!(RelayConfig::from_env().port, 3000);
        env::remove_var("PORT");

        // A RELAY_CONFIG file sits between defaults and overrides
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 4100
robot_id = "SERVI-007"
"#
        )
        .unwrap();
        env::set_var("RELAY_CONFIG", file.path());

        let config = RelayConfig::load().unwrap();
        assert_eq!(config.port, 4100);
        assert_eq!(config.robot_id, "SERVI-042");

        for key in [
            "BIND_ADDRESS",
            "ALLOWED_ORIGINS",
            "SIM_TICK_MS",
            "ROBOT_ID",
            "COMMAND_DELAY_MS",
            "RELAY_CONFIG",
        ] {
            env::remove_var(key);
        }
    }
}
