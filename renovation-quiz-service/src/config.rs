use std::time::Duration;

use crate::error::ConfigError;
use crate::gateway::GatewayConfig;
use crate::locations::default_locations;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub auto_upgrade_delay: Duration,
    pub locations: Vec<String>,
    /// Sessions not touched for this long are dropped.
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            gateway: GatewayConfig::default(),
            auto_upgrade_delay: Duration::from_millis(500),
            locations: default_locations(),
            session_idle_ttl: Duration::from_secs(60 * 60),
            session_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys keep their defaults,
    /// set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = non_empty("BIND_ADDR", addr)?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(url) = lookup("ESTIMATOR_BASE_URL") {
            config.gateway.base_url = non_empty("ESTIMATOR_BASE_URL", url)?
                .trim_end_matches('/')
                .to_string();
        }
        if let Some(enabled) = lookup("ESTIMATOR_VALUE_ENABLED") {
            let enabled: bool = parse("ESTIMATOR_VALUE_ENABLED", &enabled)?;
            if !enabled {
                config.gateway.value_path = None;
            }
        }
        if let Some(ms) = lookup("ESTIMATOR_TIMEOUT_MS") {
            config.gateway.timeout = Duration::from_millis(parse("ESTIMATOR_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("AUTO_UPGRADE_DELAY_MS") {
            config.auto_upgrade_delay =
                Duration::from_millis(parse("AUTO_UPGRADE_DELAY_MS", &ms)?);
        }
        if let Some(secs) = lookup("SESSION_IDLE_TTL_SECS") {
            config.session_idle_ttl = positive_secs("SESSION_IDLE_TTL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("SESSION_SWEEP_INTERVAL_SECS") {
            config.session_sweep_interval = positive_secs("SESSION_SWEEP_INTERVAL_SECS", &secs)?;
        }
        if let Some(list) = lookup("QUIZ_LOCATIONS") {
            let mut locations: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if locations.is_empty() {
                return Err(ConfigError::Empty("QUIZ_LOCATIONS"));
            }
            locations.sort();
            locations.dedup();
            config.locations = locations;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn positive_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse::<u64>(key, value)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Empty(key))
    } else {
        Ok(value.trim().to_string())
    }
}
