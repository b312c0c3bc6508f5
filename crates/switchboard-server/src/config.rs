use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use switchboard_core::DEFAULT_TASK_CAPACITY;
use switchboard_core::backends::RedisConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub redis: RedisConfig,
    pub task_capacity: usize,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    redis: RedisConfig,
    #[serde(default)]
    pubsub: PubSubSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PubSubSection {
    #[serde(default = "default_task_capacity")]
    task_capacity: usize,
}

impl Default for PubSubSection {
    fn default() -> Self {
        Self {
            task_capacity: default_task_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_task_capacity() -> usize {
    DEFAULT_TASK_CAPACITY
}

impl ServerConfig {
    /// Load from `SWITCHBOARD_CONFIG` or `./switchboard.toml`, falling back
    /// to environment variables.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = config_path() {
            return Self::from_file(Path::new(&path));
        }

        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let file_config: FileConfig = toml::from_str(&content)?;
        Ok(Self {
            host: file_config.server.host,
            port: file_config.server.port,
            redis: file_config.redis,
            task_capacity: file_config.pubsub.task_capacity,
        })
    }

    /// Build from a variable lookup; unset or unparsable values use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let redis_defaults = RedisConfig::default();

        Self {
            host: lookup("APP_HOST").unwrap_or_else(default_host),
            port: parse_var(&lookup, "APP_PORT").unwrap_or_else(default_port),
            redis: RedisConfig {
                host: lookup("REDIS_HOST").unwrap_or(redis_defaults.host),
                port: parse_var(&lookup, "REDIS_PORT").unwrap_or(redis_defaults.port),
                database: parse_var(&lookup, "REDIS_DATABASE").unwrap_or(redis_defaults.database),
                password: lookup("REDIS_PASSWORD").filter(|value| !value.is_empty()),
            },
            task_capacity: parse_var(&lookup, "PUBSUB_TASK_CAPACITY")
                .unwrap_or_else(default_task_capacity),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.parse().ok())
}

fn config_path() -> Option<String> {
    if let Ok(path) = env::var("SWITCHBOARD_CONFIG") {
        return Some(path);
    }
    if Path::new("switchboard.toml").exists() {
        return Some("switchboard.toml".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_env() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.redis, RedisConfig::default());
        assert_eq!(config.task_capacity, DEFAULT_TASK_CAPACITY);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("APP_PORT", "9000"),
            ("REDIS_HOST", "cache"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DATABASE", "3"),
            ("REDIS_PASSWORD", "secret"),
            ("PUBSUB_TASK_CAPACITY", "8"),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.redis.url(), "redis://:secret@cache:6380/3");
        assert_eq!(config.task_capacity, 8);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ServerConfig::from_lookup(|key| match key {
            "APP_PORT" => Some("not-a-port".to_string()),
            "REDIS_PASSWORD" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.redis.password, None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 3001

[redis]
host = "redis.internal"
database = 1

[pubsub]
task_capacity = 16
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.redis.host, "redis.internal");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.database, 1);
        assert_eq!(config.task_capacity, 16);
    }
}
