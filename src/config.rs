//! Configuration management with validation and defaults
//!
//! Every tunable of the engine lives here as a process-wide constant. The
//! only per-player state that changes odds or access (self exclusion, golden
//! hour) is stored on the profile, never in configuration.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::types::Multiplier;
use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

/// One hundred percent expressed in basis points
pub const FULL_SCALE_BPS: u32 = 10_000;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub limits: LimitsConfig,
    pub odds: OddsConfig,
    pub jackpot: JackpotConfig,
    pub cooldown: CooldownConfig,
    pub responsible: ResponsibleGamingConfig,
    pub bonuses: BonusConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

/// Stake bounds and daily limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub min_stake: u64,
    pub max_stake: u64,
    pub daily_loss_limit: u64,
    pub daily_games_limit: u32,
    /// When false, only the balance check of the access gate applies
    pub enforce: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_stake: 10,
            max_stake: 500,
            daily_loss_limit: 1_000,
            daily_games_limit: 50,
            enforce: true,
        }
    }
}

/// Outcome weights in basis points.
///
/// Phase one has no explicit loss weight: it is always the remainder up to
/// [`FULL_SCALE_BPS`] after bonuses are applied.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OddsConfig {
    pub phase1_x1_5_bps: u32,
    pub phase1_x2_bps: u32,
    pub phase1_x3_bps: u32,
    pub phase1_x5_bps: u32,
    pub phase2_lose_bps: u32,
    pub phase2_x2_bps: u32,
    pub phase2_x3_bps: u32,
    pub phase2_x5_bps: u32,
    /// Chance of a jackpot on a phase-one loss
    pub jackpot_chance_bps: u32,
    /// Share of losses tagged as near misses
    pub near_miss_chance_bps: u32,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            phase1_x1_5_bps: 2_200,
            phase1_x2_bps: 900,
            phase1_x3_bps: 300,
            phase1_x5_bps: 80,
            phase2_lose_bps: 6_000,
            phase2_x2_bps: 3_000,
            phase2_x3_bps: 800,
            phase2_x5_bps: 200,
            jackpot_chance_bps: 20,
            near_miss_chance_bps: 3_500,
        }
    }
}

/// Progressive jackpot settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JackpotConfig {
    /// Share of every stake paid into the pool
    pub contribution_bps: u32,
    /// Contribution never drops below this amount
    pub min_contribution: u64,
    /// Starting pool and the value it resets to after a win
    pub floor: u64,
    /// Pool must be at least this large to be won
    pub min_pool: u64,
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            contribution_bps: 500,
            min_contribution: 1,
            floor: 500,
            min_pool: 100,
        }
    }
}

/// Loss-streak cooldown escalation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub small_threshold: u32,
    pub small_min_secs: u64,
    pub small_max_secs: u64,
    pub big_threshold: u32,
    pub big_min_secs: u64,
    pub big_max_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            small_threshold: 3,
            small_min_secs: 30,
            small_max_secs: 60,
            big_threshold: 5,
            big_min_secs: 600,
            big_max_secs: 1_800,
        }
    }
}

/// Forced breaks and self exclusion
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsibleGamingConfig {
    pub forced_break_after_losses: u32,
    pub forced_break_secs: u64,
    pub self_exclusion_days: u32,
}

impl Default for ResponsibleGamingConfig {
    fn default() -> Self {
        Self {
            forced_break_after_losses: 10,
            forced_break_secs: 3_600,
            self_exclusion_days: 7,
        }
    }
}

/// Time-boxed odds bonuses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    /// UTC hour the night window opens (inclusive)
    pub night_start_hour: u32,
    /// UTC hour the night window closes (exclusive)
    pub night_end_hour: u32,
    pub night_x3_bonus_bps: u32,
    pub golden_hour_minutes: i64,
    pub golden_hour_x2_bonus_bps: u32,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 22,
            night_end_hour: 6,
            night_x3_bonus_bps: 100,
            golden_hour_minutes: 60,
            golden_hour_x2_bonus_bps: 300,
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/casino_data".to_string(),
            write_buffer_size_mb: 64,
            clear_on_start: false, // Production default: preserve data
        }
    }
}

/// HTTP surface configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl CasinoConfig {
    /// Configuration for production deployment with persistence
    pub fn production() -> Self {
        Self {
            storage: StorageConfig {
                write_buffer_size_mb: 128,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Limits disabled, fresh database on every start
    pub fn testing() -> Self {
        Self {
            limits: LimitsConfig {
                enforce: false,
                ..Default::default()
            },
            storage: StorageConfig {
                data_directory: "./DB/casino_test".to_string(),
                clear_on_start: true, // Testing mode: clear DB
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let limits = &self.limits;
        // A take must pay strictly more than the stake for every allowed stake
        if Multiplier::X1_5.apply(limits.min_stake) <= limits.min_stake {
            return Err(ConfigValidationError::InvalidValue(
                "min_stake must be >= 2".to_string(),
            ));
        }
        if limits.max_stake < limits.min_stake {
            return Err(ConfigValidationError::LogicalInconsistency(
                "max_stake must be >= min_stake".to_string(),
            ));
        }

        // Bonuses come out of the loss weight, so the worst case must still fit
        let odds = &self.odds;
        let bonuses = &self.bonuses;
        let max_wins = odds.phase1_x1_5_bps as u64
            + odds.phase1_x2_bps as u64
            + odds.phase1_x3_bps as u64
            + odds.phase1_x5_bps as u64
            + bonuses.night_x3_bonus_bps as u64
            + bonuses.golden_hour_x2_bonus_bps as u64;
        if max_wins > FULL_SCALE_BPS as u64 {
            return Err(ConfigValidationError::LogicalInconsistency(format!(
                "phase one win weights plus bonuses exceed 100% ({} bps)",
                max_wins
            )));
        }

        let phase2_total = odds.phase2_lose_bps as u64
            + odds.phase2_x2_bps as u64
            + odds.phase2_x3_bps as u64
            + odds.phase2_x5_bps as u64;
        if phase2_total != FULL_SCALE_BPS as u64 {
            return Err(ConfigValidationError::LogicalInconsistency(format!(
                "phase two weights must sum to {} bps, got {}",
                FULL_SCALE_BPS, phase2_total
            )));
        }

        if odds.jackpot_chance_bps > FULL_SCALE_BPS || odds.near_miss_chance_bps > FULL_SCALE_BPS {
            return Err(ConfigValidationError::InvalidValue(
                "chances must be within 0..=10000 bps".to_string(),
            ));
        }

        let cooldown = &self.cooldown;
        if cooldown.small_threshold == 0 || cooldown.big_threshold <= cooldown.small_threshold {
            return Err(ConfigValidationError::LogicalInconsistency(
                "cooldown thresholds must satisfy 0 < small < big".to_string(),
            ));
        }
        if cooldown.small_min_secs > cooldown.small_max_secs
            || cooldown.big_min_secs > cooldown.big_max_secs
        {
            return Err(ConfigValidationError::LogicalInconsistency(
                "cooldown bands must have min <= max".to_string(),
            ));
        }

        if bonuses.night_start_hour > 23 || bonuses.night_end_hour > 23 {
            return Err(ConfigValidationError::InvalidValue(
                "night window hours must be within 0..=23".to_string(),
            ));
        }

        if self.responsible.forced_break_after_losses == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "forced_break_after_losses must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Configuration logical inconsistency: {0}")]
    LogicalInconsistency(String),
}

impl From<ConfigValidationError> for ConfigurationError {
    fn from(e: ConfigValidationError) -> Self {
        ConfigurationError::ValidationFailed(e.to_string())
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        Self::apply_env_overrides(&mut config)?;

        config.validate().map_err(ConfigurationError::from)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        Self::parse(&content)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn parse(content: &str) -> CasinoResult<CasinoConfig> {
        toml::from_str(content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(config: &mut CasinoConfig) -> CasinoResult<()> {
        if let Ok(dir) = env::var("CASINO_DATA_DIR") {
            config.storage.data_directory = dir;
        }
        if let Ok(host) = env::var("CASINO_API_HOST") {
            config.api.host = host;
        }
        if let Ok(port) = env::var("CASINO_API_PORT") {
            config.api.port = parse_env("CASINO_API_PORT", port)?;
        }
        if let Ok(enforce) = env::var("CASINO_ENFORCE_LIMITS") {
            config.limits.enforce = parse_env("CASINO_ENFORCE_LIMITS", enforce)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> CasinoResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            reason: "could not parse environment override".to_string(),
            value,
        }
        .into()
    })
}
