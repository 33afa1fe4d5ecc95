//! Mixer Configuration
//!
//! Shared configuration crate for all mixer components.
//!
//! Handles loading configuration from:
//! 1. MIXER_CONFIG env var (explicit path)
//! 2. ./mixer.toml (current directory)
//! 3. ~/.mixer/mixer.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

pub use mixer_privacy::MAX_TREE_DEPTH;

const CONFIG_FILE_NAME: &str = "mixer.toml";
const CONFIG_DIR_NAME: &str = ".mixer";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_TREE_DEPTH: usize = 20;
const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
const DEFAULT_DENOMINATION: u64 = 1_000_000_000;
const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixerConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub prover: ProverConfig,
}

/// Accumulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
    /// Number of recent roots a withdrawal may reference (1 = current only)
    #[serde(default = "default_root_history_size")]
    pub root_history_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}
fn default_root_history_size() -> usize {
    DEFAULT_ROOT_HISTORY_SIZE
}

/// Pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Fixed amount accepted per deposit and released per withdrawal
    #[serde(default = "default_denomination")]
    pub denomination: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            denomination: DEFAULT_DENOMINATION,
        }
    }
}

fn default_denomination() -> u64 {
    DEFAULT_DENOMINATION
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// RocksDB directory; in-memory ledger when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Prover mode for TOML config
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProverMode {
    #[default]
    Mock,
    Groth16,
}

/// Proof system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub mode: ProverMode,
    #[serde(default = "default_proof_timeout")]
    pub proof_timeout_secs: u64,
    /// Deterministic Groth16 setup (development only)
    #[serde(default)]
    pub setup_seed: Option<u64>,
    #[serde(default)]
    pub proving_key_path: Option<String>,
    #[serde(default)]
    pub verifying_key_path: Option<String>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            mode: ProverMode::Mock,
            proof_timeout_secs: DEFAULT_PROOF_TIMEOUT_SECS,
            setup_seed: None,
            proving_key_path: None,
            verifying_key_path: None,
        }
    }
}

fn default_proof_timeout() -> u64 {
    DEFAULT_PROOF_TIMEOUT_SECS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Variable lookup, `std::env` outside tests
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Set Option<String> from env var if present
fn env_option_string(vars: Lookup, key: &str, field: &mut Option<String>) {
    if let Some(v) = vars(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(vars: Lookup, key: &str, field: &mut T) {
    if let Some(v) = vars(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: std::str::FromStr>(vars: Lookup, key: &str, field: &mut Option<T>) {
    if let Some(v) = vars(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl MixerConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check MIXER_CONFIG env var
        if let Ok(path) = env::var("MIXER_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("MIXER_CONFIG points to missing file: {}", path.display());
        }

        // 2. Check ./mixer.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.mixer/mixer.toml
        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key: &str| env::var(key).ok());
    }

    fn apply_overrides(&mut self, vars: Lookup) {
        // Tree
        env_parse(vars, "MIXER_TREE_DEPTH", &mut self.tree.depth);
        env_parse(vars, "MIXER_ROOT_HISTORY", &mut self.tree.root_history_size);

        // Pool
        env_parse(vars, "MIXER_DENOMINATION", &mut self.pool.denomination);

        // Database
        env_option_string(vars, "MIXER_DB_PATH", &mut self.database.path);

        // Prover
        if let Some(v) = vars("MIXER_PROVER_MODE") {
            self.prover.mode = match v.to_ascii_lowercase().as_str() {
                "groth16" => ProverMode::Groth16,
                "mock" => ProverMode::Mock,
                other => {
                    log::warn!("Unknown MIXER_PROVER_MODE '{}', using mock", other);
                    ProverMode::Mock
                }
            };
        }
        env_parse(
            vars,
            "MIXER_PROOF_TIMEOUT_SECS",
            &mut self.prover.proof_timeout_secs,
        );
        env_parse_option(vars, "MIXER_SETUP_SEED", &mut self.prover.setup_seed);
        env_option_string(vars, "MIXER_PROVING_KEY", &mut self.prover.proving_key_path);
        env_option_string(vars, "MIXER_VERIFYING_KEY", &mut self.prover.verifying_key_path);
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tree.depth == 0 || self.tree.depth > MAX_TREE_DEPTH {
            bail!(
                "tree.depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH,
                self.tree.depth
            );
        }
        if self.tree.root_history_size == 0 {
            bail!("tree.root_history_size must be at least 1");
        }
        if self.pool.denomination == 0 {
            bail!("pool.denomination must be non-zero");
        }
        if self.prover.proof_timeout_secs == 0 {
            bail!("prover.proof_timeout_secs must be non-zero");
        }
        if self.prover.proving_key_path.is_some() != self.prover.verifying_key_path.is_some() {
            bail!("prover.proving_key_path and prover.verifying_key_path must be set together");
        }
        Ok(())
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.database.path = Some("./mixer-db".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
