use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeelConfig {
    pub runtime: RuntimeConfig,
    pub index: IndexConfig,
    pub provider: ProviderConfig,
    pub ingestion: IngestionConfig,
    pub counters: CountersConfig,
    pub conversations: ConversationsConfig,
    pub persistence: PersistenceConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub endpoint: String,
    /// Overridden by `KEEL_INDEX_API_KEY`; the file value is a placeholder.
    pub api_key: String,
    pub index_name: String,
    pub dimension: usize,
    pub query_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider kind. Currently only `"openai"` (OpenAI-compatible API).
    pub kind: String,
    pub endpoint: String,
    /// Overridden by `KEEL_PROVIDER_API_KEY`; the file value is a placeholder.
    pub api_key: String,
    pub embed_model: String,
    pub embed_timeout_secs: u64,
    pub completion_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestionConfig {
    pub endpoint: String,
    /// Chunking tolerates large files; default is two minutes.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CountersConfig {
    pub db_path: String,
    /// Budget for the synchronous usage-counter write. On timeout the write
    /// is abandoned and logged; the response is never delayed past this.
    pub write_budget_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConversationsConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
    /// Budget for the tier-1 document-existence probe before falling back
    /// to vector index stats.
    pub availability_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PersistenceConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            index: IndexConfig::default(),
            provider: ProviderConfig::default(),
            ingestion: IngestionConfig::default(),
            counters: CountersConfig::default(),
            conversations: ConversationsConfig::default(),
            persistence: PersistenceConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6333".into(),
            api_key: String::new(),
            index_name: "keel-agents".into(),
            dimension: 1536,
            query_timeout_ms: 2000,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "openai".into(),
            endpoint: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            embed_model: "text-embedding-3-small".into(),
            embed_timeout_secs: 10,
            completion_timeout_secs: 60,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for CountersConfig {
    fn default() -> Self {
        let db_path = default_keel_dir()
            .join("counters.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            write_budget_ms: 100,
        }
    }
}

impl Default for ConversationsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8091".into(),
            request_timeout_ms: 5000,
            availability_timeout_ms: 1500,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 256,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

/// Returns `~/.keel/`
pub fn default_keel_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".keel")
}

/// Returns the default config file path: `~/.keel/config.toml`
pub fn default_config_path() -> PathBuf {
    default_keel_dir().join("config.toml")
}

impl KeelConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        let path = match std::env::var("KEEL_CONFIG") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_config_path(),
        };
        Self::load_from(path)
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KeelConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides. API keys are expected to come
    /// from the environment rather than the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KEEL_LOG_LEVEL") {
            self.runtime.log_level = val;
        }
        if let Ok(val) = std::env::var("KEEL_COUNTERS_DB") {
            self.counters.db_path = val;
        }
        if let Ok(val) = std::env::var("KEEL_INDEX_API_KEY") {
            self.index.api_key = val;
        }
        if let Ok(val) = std::env::var("KEEL_PROVIDER_API_KEY") {
            self.provider.api_key = val;
        }
    }

    /// Reject values that would misbehave quietly at runtime.
    fn validate(&self) -> Result<()> {
        if self.index.dimension == 0 {
            anyhow::bail!("index.dimension must be greater than zero");
        }
        if self.persistence.workers == 0 {
            anyhow::bail!("persistence.workers must be at least 1");
        }
        if self.persistence.queue_capacity == 0 {
            anyhow::bail!("persistence.queue_capacity must be at least 1");
        }
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be at least 1");
        }
        Ok(())
    }

    /// Resolve the counters database path, expanding `~` if needed.
    pub fn resolved_counters_path(&self) -> PathBuf {
        expand_tilde(&self.counters.db_path)
    }

    pub fn counter_write_budget(&self) -> Duration {
        Duration::from_millis(self.counters.write_budget_ms)
    }

    pub fn availability_budget(&self) -> Duration {
        Duration::from_millis(self.conversations.availability_timeout_ms)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
