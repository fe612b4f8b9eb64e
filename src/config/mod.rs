//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which side of a round this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Authoritative simulation plus one remote player
    Host,
    /// Sends intents to a host and mirrors its snapshots
    Remote,
    /// Single process, no network
    Local,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "remote" => Ok(Role::Remote),
            "local" => Ok(Role::Local),
            other => Err(ConfigError::InvalidRole(other.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub role: Role,
    /// Address the host listens on
    pub bind_addr: String,
    /// Address the remote connects to
    pub host_addr: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,

    /// Fixed round seed; random when unset
    pub round_seed: Option<u64>,
    pub connect_timeout: Duration,
    /// Stage layout to load instead of the built-in one
    pub level_file: Option<String>,

    pub total_enemies: u32,
    pub max_enemies_on_screen: u32,
    pub player_lives: u8,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; absent keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role = match lookup("ROLE") {
            Some(value) => value.parse()?,
            None => Role::Local,
        };

        Ok(Self {
            role,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:7777".to_string()),
            host_addr: lookup("HOST_ADDR").unwrap_or_else(|| "127.0.0.1:7777".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),

            round_seed: parse_opt(&lookup, "ROUND_SEED")?,
            connect_timeout: Duration::from_millis(
                parse_opt(&lookup, "CONNECT_TIMEOUT_MS")?.unwrap_or(5000),
            ),
            level_file: lookup("LEVEL_FILE").filter(|path| !path.is_empty()),

            total_enemies: parse_opt(&lookup, "TOTAL_ENEMIES")?.unwrap_or(20),
            max_enemies_on_screen: parse_opt(&lookup, "MAX_ENEMIES_ON_SCREEN")?.unwrap_or(4),
            player_lives: parse_opt(&lookup, "PLAYER_LIVES")?.unwrap_or(3),
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| raw.trim().parse().map_err(|_| ConfigError::Invalid(key, raw)))
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Unknown role {0:?} (expected host, remote or local)")]
    InvalidRole(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.role, Role::Local);
        assert_eq!(config.bind_addr, "0.0.0.0:7777");
        assert_eq!(config.host_addr, "127.0.0.1:7777");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.round_seed, None);
        assert_eq!(config.total_enemies, 20);
        assert_eq!(config.max_enemies_on_screen, 4);
        assert_eq!(config.player_lives, 3);
        assert!(!config.log_json);
    }

    #[test]
    fn values_override_defaults() {
        let config = from_pairs(&[
            ("ROLE", "Host"),
            ("ROUND_SEED", "99"),
            ("CONNECT_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "json"),
            ("PLAYER_LIVES", "5"),
        ])
        .unwrap();
        assert_eq!(config.role, Role::Host);
        assert_eq!(config.round_seed, Some(99));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert!(config.log_json);
        assert_eq!(config.player_lives, 5);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            from_pairs(&[("ROLE", "spectator")]),
            Err(ConfigError::InvalidRole(_))
        ));
        assert!(matches!(
            from_pairs(&[("TOTAL_ENEMIES", "many")]),
            Err(ConfigError::Invalid("TOTAL_ENEMIES", _))
        ));
    }
}
