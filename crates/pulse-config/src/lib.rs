use chrono::Weekday;
use pulse_core::{ChartSettings, Granularity, TemperatureUnit, DEFAULT_STEP_GOAL_DIVISOR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    /// Directory holding `data.json`, `weather/` and the CSV logs
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChartsConfig {
    pub step_goal_divisor: Option<f64>,
    pub daily_step_records: Option<usize>,
    pub week_start: Option<String>,
    pub temperature_unit: Option<String>,
    pub weather_days_daily: Option<u32>,
    pub weather_days_weekly: Option<u32>,
    pub weather_days_monthly: Option<u32>,
    /// Trailing hours of the daily weather view (unset shows every fetched record)
    pub weather_daily_hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: Option<ServerConfig>,
    pub data: Option<DataConfig>,
    pub charts: Option<ChartsConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from PULSE_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PULSE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    fn charts(&self) -> ChartsConfig {
        self.charts.clone().unwrap_or_default()
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    /// Get the data directory (default `public`)
    pub fn data_dir(&self) -> PathBuf {
        self.data
            .as_ref()
            .and_then(|d| d.dir.clone())
            .unwrap_or_else(|| PathBuf::from("public"))
    }

    pub fn step_goal_divisor(&self) -> f64 {
        self.charts()
            .step_goal_divisor
            .unwrap_or(DEFAULT_STEP_GOAL_DIVISOR)
    }

    /// Records shown by the daily steps view (default 7)
    pub fn daily_step_records(&self) -> usize {
        self.charts().daily_step_records.unwrap_or(7)
    }

    /// First day of a weekly window (default Sunday)
    pub fn week_start(&self) -> Result<Weekday, ConfigError> {
        match self.charts().week_start {
            Some(raw) => raw.parse::<Weekday>().map_err(|_| ConfigError::Invalid {
                key: "charts.week_start",
                reason: format!("not a weekday: {raw:?}"),
            }),
            None => Ok(Weekday::Sun),
        }
    }

    /// Display unit for temperatures (default Fahrenheit)
    pub fn temperature_unit(&self) -> Result<TemperatureUnit, ConfigError> {
        match self.charts().temperature_unit {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                key: "charts.temperature_unit",
                reason: format!("{e}"),
            }),
            None => Ok(TemperatureUnit::Fahrenheit),
        }
    }

    /// Weather day-logs fetched for a view (default 3 / 364 / 365)
    pub fn weather_days(&self, granularity: Granularity) -> u32 {
        let charts = self.charts();
        match granularity {
            Granularity::Daily => charts.weather_days_daily.unwrap_or(3),
            Granularity::Weekly => charts.weather_days_weekly.unwrap_or(364),
            Granularity::Monthly => charts.weather_days_monthly.unwrap_or(365),
        }
    }

    /// Validated settings for the chart recipes
    pub fn chart_settings(&self) -> Result<ChartSettings, ConfigError> {
        let step_goal_divisor = self.step_goal_divisor();
        if !(step_goal_divisor.is_finite() && step_goal_divisor > 0.0) {
            return Err(ConfigError::Invalid {
                key: "charts.step_goal_divisor",
                reason: format!("must be positive, got {step_goal_divisor}"),
            });
        }

        Ok(ChartSettings {
            temperature_unit: self.temperature_unit()?,
            step_goal_divisor,
            daily_step_records: self.daily_step_records(),
            week_start: self.week_start()?,
            weather_daily_hours: self.charts().weather_daily_hours,
        })
    }
}
