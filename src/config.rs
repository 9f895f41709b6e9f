// Environment-level configuration.
//
// Every knob has a default so the dashboard runs with an empty environment.
// Values are parsed once at start-up; a malformed value aborts with
// `DashboardError::Config` instead of silently falling back.
use crate::error::{DashboardError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATA_PATH: &str = "data/PO_Data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "exports";
pub const DEFAULT_MIN_SUPPLIERS: usize = 3;
pub const DEFAULT_MIN_SPEND: f64 = 100_000.0;
pub const DEFAULT_SAVINGS_PERCENT: u8 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_TOP_N_SUPPLIERS: usize = 20;
pub const DEFAULT_CONCENTRATION_TOP_N: usize = 10;

/// Savings rates outside this band are rejected.
pub const SAVINGS_PERCENT_RANGE: std::ops::RangeInclusive<u8> = 5..=30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub min_suppliers: usize,
    pub min_spend: f64,
    pub savings_percent: u8,
    pub cache_ttl: Duration,
    /// Listening port of the HTTP front-end.
    pub port: u16,
    pub top_n_suppliers: usize,
    pub concentration_top_n: usize,
    pub allow_empty_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            min_suppliers: DEFAULT_MIN_SUPPLIERS,
            min_spend: DEFAULT_MIN_SPEND,
            savings_percent: DEFAULT_SAVINGS_PERCENT,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            port: DEFAULT_PORT,
            top_n_suppliers: DEFAULT_TOP_N_SUPPLIERS,
            concentration_top_n: DEFAULT_CONCENTRATION_TOP_N,
            allow_empty_export: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing or blank keys
    /// keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let savings_percent = parse_or(&get, "DEFAULT_DISCOUNT_PERCENT", defaults.savings_percent)?;
        if !SAVINGS_PERCENT_RANGE.contains(&savings_percent) {
            return Err(DashboardError::Config {
                key: "DEFAULT_DISCOUNT_PERCENT".to_string(),
                value: savings_percent.to_string(),
            });
        }
        let min_spend: f64 = parse_or(&get, "MIN_SPEND_FOR_CONSOLIDATION", defaults.min_spend)?;
        if !min_spend.is_finite() || min_spend < 0.0 {
            return Err(DashboardError::Config {
                key: "MIN_SPEND_FOR_CONSOLIDATION".to_string(),
                value: min_spend.to_string(),
            });
        }

        Ok(Config {
            data_path: get("DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            min_suppliers: parse_or(&get, "MIN_SUPPLIERS_FOR_CONSOLIDATION", defaults.min_suppliers)?,
            min_spend,
            savings_percent,
            cache_ttl: Duration::from_secs(parse_or(&get, "CACHE_TTL", DEFAULT_CACHE_TTL_SECS)?),
            port: parse_or(&get, "SERVER_PORT", defaults.port)?,
            top_n_suppliers: parse_or(&get, "TOP_N_SUPPLIERS", defaults.top_n_suppliers)?,
            concentration_top_n: parse_or(&get, "CONCENTRATION_TOP_N", defaults.concentration_top_n)?,
            allow_empty_export: match get("ALLOW_EMPTY_EXPORT") {
                None => defaults.allow_empty_export,
                Some(v) => parse_bool(&v).ok_or_else(|| DashboardError::Config {
                    key: "ALLOW_EMPTY_EXPORT".to_string(),
                    value: v.clone(),
                })?,
            },
        })
    }

    /// Savings rate as a fraction (10% -> 0.10).
    pub fn savings_rate(&self) -> f64 {
        f64::from(self.savings_percent) / 100.0
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|_| DashboardError::Config {
            key: key.to_string(),
            value: v,
        }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
