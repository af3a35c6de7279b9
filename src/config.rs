use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{LedgerSettings, ReferralLevelConfig};

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid referral rate {0:?}")]
    InvalidRate(String),
    #[error("Invalid referral levels: {0}")]
    InvalidLevels(String),
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,

    /// Directory for rolling log files in production.
    #[clap(long, env)]
    pub log_dir: Option<PathBuf>,

    /// JSON file backing the ledger. In-memory when absent.
    #[clap(long, env)]
    pub store_path: Option<PathBuf>,

    #[clap(long, env, default_value = "100")]
    pub actor_buffer_size: usize,

    #[clap(long, env, default_value = "true", action = clap::ArgAction::Set)]
    pub registration_open: bool,

    /// Commission percentages for levels 1 and up, comma separated.
    #[clap(long, env, default_value = "10,5,3,2,1")]
    pub referral_levels: String,

    #[clap(long, env, default_value = "Administrator")]
    pub admin_name: String,

    #[clap(long, env, default_value = "admin@example.com")]
    pub admin_email: String,
}

impl AppConfig {
    /// Reads `.env` if present, then command line and environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        AppConfig::parse()
    }

    /// Manual config for tests; never touches the environment.
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            rust_log: "debug".to_string(),
            log_dir: None,
            store_path: None,
            actor_buffer_size: 16,
            registration_open: true,
            referral_levels: "10,5,3,2,1".to_string(),
            admin_name: "Test Admin".to_string(),
            admin_email: "admin@test.local".to_string(),
        }
    }

    /// Settings used until an administrator saves their own.
    pub fn ledger_settings(&self) -> Result<LedgerSettings, ConfigError> {
        let rates = self
            .referral_levels
            .split(',')
            .map(str::trim)
            .filter(|rate| !rate.is_empty())
            .map(|rate| Decimal::from_str(rate).map_err(|_| ConfigError::InvalidRate(rate.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let referral_levels = ReferralLevelConfig::from_rates(&rates).map_err(ConfigError::InvalidLevels)?;
        Ok(LedgerSettings {
            registration_open: self.registration_open,
            referral_levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rates_parse() {
        let settings = AppConfig::new_for_test().ledger_settings().unwrap();
        assert_eq!(settings, LedgerSettings::default());
    }

    #[test]
    fn bad_rates_are_reported() {
        let mut config = AppConfig::new_for_test();
        config.referral_levels = "10, five".to_string();
        assert_eq!(config.ledger_settings(), Err(ConfigError::InvalidRate("five".to_string())));

        config.referral_levels = "1,1,1,1,1,1".to_string();
        assert!(matches!(config.ledger_settings(), Err(ConfigError::InvalidLevels(_))));
    }

    #[test]
    fn parses_from_args() {
        let config = AppConfig::try_parse_from([
            "referral_ledger",
            "--cargo-env",
            "production",
            "--registration-open",
            "false",
            "--referral-levels",
            "12.5,4",
        ])
        .unwrap();
        assert_eq!(config.cargo_env, CargoEnv::Production);
        let settings = config.ledger_settings().unwrap();
        assert!(!settings.registration_open);
        assert_eq!(settings.referral_levels.percentage_for(1), Decimal::new(125, 1));
    }
}
