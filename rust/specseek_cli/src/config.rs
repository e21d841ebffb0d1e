use serde::{
    Deserialize,
    Serialize,
};
use specseek::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub engine: EngineSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            identity: None,
            engine: EngineSection::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSection {
    pub max_candidates: usize,
    pub lock_retries: u32,
    pub retry_backoff_ms: u64,
    pub fuzzy_fingerprint: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            max_candidates: defaults.max_candidates,
            lock_retries: defaults.lock_retries,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            fuzzy_fingerprint: defaults.fuzzy_fingerprint,
        }
    }
}

impl EngineSection {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_candidates: self.max_candidates,
            lock_retries: self.lock_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            fuzzy_fingerprint: self.fuzzy_fingerprint,
        }
    }
}
