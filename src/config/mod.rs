use dashmap::DashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const START_TIMEOUT_KEY: &str = "LIFEWIRE_START_TIMEOUT_SECS";
pub const STOP_TIMEOUT_KEY: &str = "LIFEWIRE_STOP_TIMEOUT_SECS";

/// Default budget for each of the start and stop phases.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Configuration seeded from the process environment
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// A whole number of seconds; malformed values are ignored with a warning.
    pub fn get_secs(&self, key: &str) -> Option<Duration> {
        let raw = self.get(key)?;
        match raw.trim().parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(e) => {
                tracing::warn!("Ignoring {}={:?}: {}", key, raw, e);
                None
            }
        }
    }
}

/// Timeouts for the start and stop phases of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_TIMEOUT,
            stop_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LifecycleConfig {
    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::from_env())
    }

    pub fn from_config(config: &ConfigService) -> Self {
        let defaults = Self::default();
        Self {
            start_timeout: config
                .get_secs(START_TIMEOUT_KEY)
                .unwrap_or(defaults.start_timeout),
            stop_timeout: config
                .get_secs(STOP_TIMEOUT_KEY)
                .unwrap_or(defaults.stop_timeout),
        }
    }
}
