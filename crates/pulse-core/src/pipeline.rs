use anyhow::Result;
use chrono::NaiveDate;
use std::fmt;

/// A static log resource the dashboard reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Snapshot,
    WeatherDay(NaiveDate),
    Steps,
    Bedtime,
    SpotifyYear,
    SpotifyGenres,
}

impl Resource {
    /// Path relative to the data root
    pub fn path(&self) -> String {
        match self {
            Resource::Snapshot => "data.json".to_string(),
            Resource::WeatherDay(day) => format!("weather/weather {}.json", day.format("%Y-%m-%d")),
            Resource::Steps => "log_steps.csv".to_string(),
            Resource::Bedtime => "log_bedtime.csv".to_string(),
            Resource::SpotifyYear => "SPOTIPY_AVERAGE_YEAR_LOG.log".to_string(),
            Resource::SpotifyGenres => "LOG_SPOTIPY_PLAYLIST_DATA".to_string(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self, resource: &Resource) -> Result<String>;
}
