//! Process configuration.
//!
//! Resolution order: compiled defaults, then `blank.toml` (from `--config` or
//! the data directory), then environment variables. Loaded once at start and
//! never mutated afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use blank_core::{CycleClock, Persona, PolicyTable, TierPolicy};

pub const CONFIG_FILE: &str = "blank.toml";
const DB_FILE: &str = "blank.db";
const PIDFILE: &str = "blank-serve.pid";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub generator: GeneratorConfig,
    pub oracle: OracleConfig,
    pub http: HttpConfig,
    /// Writable tiers I-III. Empty means the built-in table.
    pub tiers: Vec<TierPolicy>,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// UTC date (or timestamp) at which cycle 1 begins.
    pub epoch: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "BLANK".to_string(),
            epoch: "2026-03-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-sonnet-4-6".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub rpc_url: String,
    pub token_mint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            token_mint: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".blank")
}

impl Config {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with an injectable environment.
    pub fn load_with(explicit: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = env("BLANK_DATA_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE));

        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<Config>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else if explicit.is_some() {
            bail!("config file {} does not exist", path.display());
        } else {
            Config::default()
        };

        config.data_dir = data_dir;
        config.apply_env(&env);
        config.clock()?;
        config.policy_table()?;
        tracing::debug!(path = %path.display(), data_dir = %config.data_dir.display(), "configuration loaded");
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        let set = |key: &str| env(key).filter(|v| !v.is_empty());
        if let Some(key) = set("ANTHROPIC_API_KEY") {
            self.generator.api_key = Some(key);
        }
        if let Some(model) = set("BLANK_MODEL") {
            self.generator.model = model;
        }
        if let Some(rpc) = set("SOLANA_RPC") {
            self.oracle.rpc_url = rpc;
        }
        if let Some(mint) = set("BLANK_TOKEN_MINT") {
            self.oracle.token_mint = Some(mint);
        }
        if let Some(addr) = set("BLANK_HTTP_ADDR") {
            self.http.addr = addr;
        }
    }

    pub fn clock(&self) -> Result<CycleClock> {
        CycleClock::from_iso8601(&self.agent.epoch)
            .with_context(|| format!("invalid cycle epoch '{}'", self.agent.epoch))
    }

    pub fn policy_table(&self) -> Result<PolicyTable> {
        if self.tiers.is_empty() {
            return Ok(PolicyTable::default());
        }
        PolicyTable::from_policies(self.tiers.clone()).context("invalid tier policy table")
    }

    pub fn persona(&self) -> Persona {
        Persona::new(self.agent.name.clone())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn pidfile_path(&self) -> PathBuf {
        self.data_dir.join(PIDFILE)
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_secs.max(1))
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let config =
            Config::load_with(None, env_of(&[("BLANK_DATA_DIR", dir.to_str().unwrap())])).unwrap();
        assert_eq!(config.agent.name, "BLANK");
        assert_eq!(config.data_dir, dir);
        assert_eq!(config.db_path(), dir.join("blank.db"));
        assert_eq!(config.policy_table().unwrap(), PolicyTable::default());
        assert_eq!(config.clock().unwrap(), CycleClock::default());
    }

    #[test]
    fn test_file_then_env() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[agent]
name = "NULL"

[generator]
model = "from-file"
timeout_secs = 5

[http]
addr = "0.0.0.0:9000"
"#,
        )
        .unwrap();

        let config = Config::load_with(
            None,
            env_of(&[
                ("BLANK_DATA_DIR", dir.to_str().unwrap()),
                ("BLANK_MODEL", "from-env"),
                ("ANTHROPIC_API_KEY", "sk-test"),
            ]),
        )
        .unwrap();
        assert_eq!(config.agent.name, "NULL");
        assert_eq!(config.generator.model, "from-env");
        assert_eq!(config.generator.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.generator_timeout(), Duration::from_secs(5));
        assert_eq!(config.http.addr, "0.0.0.0:9000");
        assert_eq!(config.agent.epoch, "2026-03-01");
    }

    #[test]
    fn test_custom_tiers_validated() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[[tiers]]
tier = 1
min_balance = 100.0
max_chars = 140
max_entries_per_cycle = 2

[[tiers]]
tier = 2
min_balance = 50.0
max_chars = 500

[[tiers]]
tier = 3
min_balance = 1000.0
max_chars = 500
core_memory_eligible = true
"#,
        )
        .unwrap();
        let err = Config::load_with(None, env_of(&[("BLANK_DATA_DIR", dir.to_str().unwrap())]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("min_balance"));
    }

    #[test]
    fn test_bad_epoch_rejected() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(dir.join(CONFIG_FILE), "[agent]\nepoch = \"soon\"\n").unwrap();
        assert!(
            Config::load_with(None, env_of(&[("BLANK_DATA_DIR", dir.to_str().unwrap())])).is_err()
        );
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let missing = dir.join("nope.toml");
        assert!(Config::load_with(Some(&missing), env_of(&[])).is_err());
    }

    #[test]
    fn test_core_memories_below_tier_three_rejected() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[[tiers]]
tier = 1
min_balance = 10000.0
max_chars = 280
max_entries_per_cycle = 1

[[tiers]]
tier = 2
min_balance = 50000.0
max_chars = 1000
core_memory_eligible = true

[[tiers]]
tier = 3
min_balance = 200000.0
max_chars = 1000
core_memory_eligible = true
"#,
        )
        .unwrap();
        let err = Config::load_with(None, env_of(&[("BLANK_DATA_DIR", dir.to_str().unwrap())]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("only tier III may be core memory eligible"));
    }
}
