//! Chart recipes: bucket, aggregate, convert and assemble one chart view
//!
//! Each recipe is a pure function of its inputs and the reference time, so
//! a view is recomputed from scratch whenever its granularity changes.

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bucketing::{bucket, rollup, BucketPolicy};
use crate::rollups::{genre_percentages, mean, sleep_duration, time_of_day_mean, AggregateError};
use crate::series::{ChartSeries, SeriesBuilder, SeriesError};
use crate::time::ClockTime;
use crate::types::{
    GenreCount, Granularity, NightRecord, SleepNight, SpotifyPoint, StepRecord,
    WeatherObservation,
};
use crate::units::{
    convert_temperature, decimal_hours_to_clock, percent_of_goal, round_to, TemperatureUnit,
    UnitError, DEFAULT_STEP_GOAL_DIVISOR,
};

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Weather,
    Steps,
    Bedtime,
    Sleep,
    Spotify,
    Genres,
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weather" => Ok(ChartKind::Weather),
            "steps" => Ok(ChartKind::Steps),
            "bedtime" => Ok(ChartKind::Bedtime),
            "sleep" => Ok(ChartKind::Sleep),
            "spotify" => Ok(ChartKind::Spotify),
            "genres" => Ok(ChartKind::Genres),
            other => Err(format!("unknown chart: {other}")),
        }
    }
}

/// Tunables shared by the chart recipes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSettings {
    pub temperature_unit: TemperatureUnit,
    pub step_goal_divisor: f64,
    pub daily_step_records: usize,
    pub week_start: Weekday,
    /// Trailing hours shown by the daily weather view; all fetched records when unset
    pub weather_daily_hours: Option<u32>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Fahrenheit,
            step_goal_divisor: DEFAULT_STEP_GOAL_DIVISOR,
            daily_step_records: 7,
            week_start: Weekday::Sun,
            weather_daily_hours: None,
        }
    }
}

fn hover_clock(values: &[Option<f64>], prefix: &str) -> Vec<String> {
    values
        .iter()
        .map(|v| match v {
            Some(h) => format!("{prefix}: {}", decimal_hours_to_clock(*h)),
            None => format!("{prefix}: -"),
        })
        .collect()
}

fn hours(t: Option<ClockTime>) -> Option<f64> {
    t.map(ClockTime::as_decimal_hours)
}

pub fn weather_chart(
    observations: &[WeatherObservation],
    granularity: Granularity,
    settings: &ChartSettings,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let daily_window = settings
        .weather_daily_hours
        .map(|h| Duration::hours(i64::from(h)));
    let policy = BucketPolicy::weather(settings.week_start, daily_window);
    let buckets = bucket(observations, granularity, &policy, reference_now);
    debug!(granularity = ?granularity, buckets = buckets.len(), "weather chart");

    let points = rollup(&buckets, |members| {
        (
            mean(members.iter().filter_map(|o| o.temperature)),
            mean(members.iter().filter_map(|o| o.outdoor_temperature_kelvin())),
            mean(members.iter().filter_map(|o| o.humidity)),
            mean(members.iter().filter_map(|o| o.outdoor_humidity())),
        )
    });

    let unit = settings.temperature_unit;
    let mut x = Vec::with_capacity(points.len());
    let mut indoor = Vec::with_capacity(points.len());
    let mut outdoor = Vec::with_capacity(points.len());
    let mut humidity_in = Vec::with_capacity(points.len());
    let mut humidity_out = Vec::with_capacity(points.len());

    for (label, _, (t_in, t_out, h_in, h_out)) in points {
        x.push(label);
        indoor.push(t_in.map(|c| convert_temperature(c, TemperatureUnit::Celsius, unit)));
        outdoor.push(t_out.map(|k| convert_temperature(k, TemperatureUnit::Kelvin, unit)));
        humidity_in.push(h_in.map(|h| round_to(h, 1)));
        humidity_out.push(h_out.map(|h| round_to(h, 1)));
    }

    let symbol = unit.symbol();
    Ok(SeriesBuilder::new(x)
        .trace(&format!("Indoor Temperature ({symbol})"), indoor)?
        .trace(&format!("Outdoor Temperature ({symbol})"), outdoor)?
        .trace("Indoor Humidity (%)", humidity_in)?
        .trace("Outdoor Humidity (%)", humidity_out)?
        .build())
}

pub fn steps_chart(
    records: &[StepRecord],
    granularity: Granularity,
    settings: &ChartSettings,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let policy = BucketPolicy::steps(settings.daily_step_records, settings.week_start);
    let buckets = bucket(records, granularity, &policy, reference_now);
    debug!(granularity = ?granularity, buckets = buckets.len(), "steps chart");

    let points = rollup(&buckets, |members| {
        mean(members.iter().map(|r| f64::from(r.steps))).map(f64::round)
    });

    let mut x = Vec::with_capacity(points.len());
    let mut dates = Vec::with_capacity(points.len());
    let mut steps = Vec::with_capacity(points.len());
    let mut goal = Vec::with_capacity(points.len());
    let mut hover = Vec::with_capacity(points.len());

    for (label, start, value) in points {
        let percent = match value {
            Some(v) => Some(round_to(percent_of_goal(v, settings.step_goal_divisor)?, 1)),
            None => None,
        };
        hover.push(match value {
            Some(v) => format!("Date: {label}<br>Steps: {v}"),
            None => format!("Date: {label}<br>Steps: -"),
        });
        x.push(label);
        dates.push(start);
        steps.push(value);
        goal.push(percent);
    }

    Ok(SeriesBuilder::new(x)
        .trace_with_hover("Steps", steps, hover)?
        .trace("Goal (%)", goal)?
        .weekend_overlay(&dates)?
        .build())
}

pub fn bedtime_chart(
    nights: &[NightRecord],
    granularity: Granularity,
    settings: &ChartSettings,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let policy = BucketPolicy::bedtime(settings.week_start);
    let buckets = bucket(nights, granularity, &policy, reference_now);
    debug!(granularity = ?granularity, buckets = buckets.len(), "bedtime chart");

    let points = rollup(&buckets, |members| {
        (
            time_of_day_mean(members.iter().filter_map(|n| n.bedtime)),
            time_of_day_mean(members.iter().filter_map(|n| n.wakeup)),
        )
    });

    let mut x = Vec::with_capacity(points.len());
    let mut bedtimes = Vec::with_capacity(points.len());
    let mut wakeups = Vec::with_capacity(points.len());
    for (label, _, (bed, wake)) in points {
        x.push(label);
        bedtimes.push(hours(bed));
        wakeups.push(hours(wake));
    }

    let bed_hover = hover_clock(&bedtimes, "Bedtime");
    let wake_hover = hover_clock(&wakeups, "Wakeup");
    Ok(SeriesBuilder::new(x)
        .trace_with_hover("Bedtime", bedtimes, bed_hover)?
        .trace_with_hover("Wakeup", wakeups, wake_hover)?
        .build())
}

/// Pair each night's wakeup with the previous calendar night's bedtime.
///
/// `nights` must be sorted by date. The first night, and any night whose
/// previous date is absent, has no duration.
pub fn sleep_nights(nights: &[NightRecord]) -> Vec<SleepNight> {
    let mut prev: Option<&NightRecord> = None;
    nights
        .iter()
        .map(|night| {
            let prev_bedtime = prev
                .filter(|p| p.date + Duration::days(1) == night.date)
                .and_then(|p| p.bedtime);
            prev = Some(night);
            SleepNight {
                date: night.date,
                bedtime: night.bedtime,
                wakeup: night.wakeup,
                hours_slept: sleep_duration(prev_bedtime, night.wakeup).ok(),
            }
        })
        .collect()
}

pub fn sleep_chart(
    nights: &[NightRecord],
    granularity: Granularity,
    settings: &ChartSettings,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let derived = sleep_nights(nights);
    let policy = BucketPolicy::bedtime(settings.week_start);
    let buckets = bucket(&derived, granularity, &policy, reference_now);
    debug!(granularity = ?granularity, buckets = buckets.len(), "sleep chart");

    let points = rollup(&buckets, |members| {
        (
            time_of_day_mean(members.iter().filter_map(|n| n.bedtime)),
            time_of_day_mean(members.iter().filter_map(|n| n.wakeup)),
            mean(members.iter().filter_map(|n| n.hours_slept)),
        )
    });

    let mut x = Vec::with_capacity(points.len());
    let mut dates: Vec<NaiveDate> = Vec::with_capacity(points.len());
    let mut bedtimes = Vec::with_capacity(points.len());
    let mut wakeups = Vec::with_capacity(points.len());
    let mut slept = Vec::with_capacity(points.len());
    for (label, start, (bed, wake, hours_slept)) in points {
        x.push(label);
        dates.push(start);
        bedtimes.push(hours(bed));
        wakeups.push(hours(wake));
        slept.push(hours_slept.map(|h| round_to(h, 1)));
    }

    let bed_hover = hover_clock(&bedtimes, "Bedtime");
    let wake_hover = hover_clock(&wakeups, "Wakeup");
    let slept_hover = slept
        .iter()
        .map(|h| match h {
            Some(h) => format!("Hours Slept: {h} hours"),
            None => "Hours Slept: -".to_string(),
        })
        .collect();

    Ok(SeriesBuilder::new(x)
        .trace_with_hover("Bedtime", bedtimes, bed_hover)?
        .trace_with_hover("Wakeup", wakeups, wake_hover)?
        .trace_with_hover("Hours Slept", slept, slept_hover)?
        .weekend_overlay(&dates)?
        .build())
}

pub fn spotify_chart(
    points: &[SpotifyPoint],
    granularity: Granularity,
    settings: &ChartSettings,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let policy = BucketPolicy::spotify(settings.week_start);
    let buckets = bucket(points, granularity, &policy, reference_now);
    debug!(granularity = ?granularity, buckets = buckets.len(), "spotify chart");

    let (x, years): (Vec<_>, Vec<_>) = rollup(&buckets, |members| {
        mean(members.iter().map(|p| p.average_release_year))
    })
    .into_iter()
    .map(|(label, _, year)| (label, year))
    .unzip();

    Ok(SeriesBuilder::new(x).trace("Average Year", years)?.build())
}

/// Genre distribution; the time granularity does not apply
pub fn genre_chart(counts: &[GenreCount]) -> ChartResult<ChartSeries> {
    let shares = genre_percentages(counts)?;

    let x = shares.iter().map(|s| s.genre.clone()).collect();
    let percentages = shares.iter().map(|s| Some(round_to(s.percentage, 2))).collect();
    let tracks = shares.iter().map(|s| Some(s.track_count as f64)).collect();

    Ok(SeriesBuilder::new(x)
        .trace("Share (%)", percentages)?
        .trace("Tracks", tracks)?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutdoorConditions;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        d.and_hms_opt(h, min, 0).unwrap()
    }

    fn night(d: NaiveDate, bed: Option<&str>, wake: Option<&str>) -> NightRecord {
        NightRecord {
            date: d,
            bedtime: bed.map(|s| s.parse().unwrap()),
            wakeup: wake.map(|s| s.parse().unwrap()),
        }
    }

    fn weather(ts: NaiveDateTime, indoor_c: f64, outdoor_k: Option<f64>) -> WeatherObservation {
        WeatherObservation {
            timestamp: ts,
            temperature: Some(indoor_c),
            humidity: Some(40.0),
            weather_data: outdoor_k.map(|k| OutdoorConditions {
                current_temperature: Some(k),
                ..OutdoorConditions::default()
            }),
        }
    }

    #[test]
    fn test_weather_daily_converts_units() {
        let d = date(2024, 5, 8);
        let obs = vec![
            weather(at(d, 8, 0), 0.0, Some(273.15)),
            weather(at(d, 9, 0), 20.0, None),
        ];
        let series =
            weather_chart(&obs, Granularity::Daily, &ChartSettings::default(), at(d, 12, 0))
                .unwrap();

        assert_eq!(series.x, vec!["2024-05-08 08:00:00", "2024-05-08 09:00:00"]);
        assert_eq!(
            series.trace("Indoor Temperature (F)").unwrap().y,
            vec![Some(32.0), Some(68.0)]
        );
        assert_eq!(
            series.trace("Outdoor Temperature (F)").unwrap().y,
            vec![Some(32.0), None]
        );
    }

    #[test]
    fn test_weather_daily_trailing_hours() {
        let obs = vec![
            weather(at(date(2024, 5, 6), 12, 0), 10.0, None),
            weather(at(date(2024, 5, 7), 6, 0), 15.0, None),
            weather(at(date(2024, 5, 8), 9, 0), 20.0, None),
        ];
        let settings = ChartSettings {
            weather_daily_hours: Some(36),
            ..ChartSettings::default()
        };
        let series =
            weather_chart(&obs, Granularity::Daily, &settings, at(date(2024, 5, 8), 12, 0))
                .unwrap();

        assert_eq!(series.x, vec!["2024-05-07 06:00:00", "2024-05-08 09:00:00"]);
    }

    #[test]
    fn test_weather_monthly_means() {
        let obs = vec![
            weather(at(date(2024, 4, 30), 23, 0), 10.0, None),
            weather(at(date(2024, 5, 1), 1, 0), 20.0, None),
            weather(at(date(2024, 5, 2), 1, 0), 30.0, None),
        ];
        let settings = ChartSettings {
            temperature_unit: TemperatureUnit::Celsius,
            ..ChartSettings::default()
        };
        let series = weather_chart(
            &obs,
            Granularity::Monthly,
            &settings,
            at(date(2024, 5, 3), 0, 0),
        )
        .unwrap();

        assert_eq!(series.x, vec!["2024-04-01", "2024-05-01"]);
        assert_eq!(
            series.trace("Indoor Temperature (C)").unwrap().y,
            vec![Some(10.0), Some(25.0)]
        );
    }

    #[test]
    fn test_steps_weekly_groups_and_rounds() {
        let records = vec![
            StepRecord { date: date(2024, 1, 8), steps: 4000 },
            StepRecord { date: date(2024, 1, 9), steps: 4001 },
            StepRecord { date: date(2024, 1, 14), steps: 9000 },
        ];
        let series = steps_chart(
            &records,
            Granularity::Weekly,
            &ChartSettings::default(),
            at(date(2024, 1, 15), 0, 0),
        )
        .unwrap();

        assert_eq!(series.x, vec!["2024-01-07", "2024-01-14"]);
        let steps = series.trace("Steps").unwrap();
        assert_eq!(steps.y, vec![Some(4001.0), Some(9000.0)]);
        assert_eq!(
            steps.hover.as_ref().unwrap()[1],
            "Date: 2024-01-14<br>Steps: 9000"
        );
        assert_eq!(
            series.trace("Goal (%)").unwrap().y,
            vec![Some(80.0), Some(180.0)]
        );
        // Window starts are Sundays
        assert!(series.overlays.iter().all(|o| o.is_weekend));
    }

    #[test]
    fn test_steps_daily_takes_latest_records() {
        let records: Vec<StepRecord> = (1..=10)
            .map(|d| StepRecord {
                date: date(2024, 2, d),
                steps: 1000 * d,
            })
            .collect();
        let settings = ChartSettings {
            daily_step_records: 3,
            ..ChartSettings::default()
        };
        let series =
            steps_chart(&records, Granularity::Daily, &settings, at(date(2024, 2, 10), 0, 0))
                .unwrap();

        assert_eq!(series.x, vec!["2024-02-08", "2024-02-09", "2024-02-10"]);
        let flags: Vec<bool> = series.overlays.iter().map(|o| o.is_weekend).collect();
        // Thu, Fri, Sat
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_bedtime_monthly_uses_linear_time_mean() {
        let nights = vec![
            night(date(2024, 3, 1), Some("23:00"), Some("07:00")),
            night(date(2024, 3, 2), Some("01:00"), Some("08:00")),
            night(date(2024, 3, 3), None, Some("09:00")),
        ];
        let series = bedtime_chart(
            &nights,
            Granularity::Monthly,
            &ChartSettings::default(),
            at(date(2024, 3, 31), 0, 0),
        )
        .unwrap();

        assert_eq!(series.x, vec!["2024-03-01"]);
        let bed = series.trace("Bedtime").unwrap();
        assert_eq!(bed.y, vec![Some(12.0)]);
        assert_eq!(bed.hover.as_ref().unwrap()[0], "Bedtime: 12:00");
        assert_eq!(series.trace("Wakeup").unwrap().y, vec![Some(8.0)]);
    }

    #[test]
    fn test_bedtime_daily_is_trailing_week() {
        let nights: Vec<NightRecord> = (1..=20)
            .map(|d| night(date(2024, 3, d), Some("22:30"), Some("06:30")))
            .collect();
        let series = bedtime_chart(
            &nights,
            Granularity::Daily,
            &ChartSettings::default(),
            at(date(2024, 3, 20), 0, 0),
        )
        .unwrap();

        assert_eq!(series.x.first().map(String::as_str), Some("2024-03-13"));
        assert_eq!(series.x.len(), 8);
    }

    #[test]
    fn test_sleep_nights_pair_previous_bedtime() {
        let nights = vec![
            night(date(2024, 3, 1), Some("23:30"), Some("06:45")),
            night(date(2024, 3, 2), Some("22:00"), Some("07:00")),
            night(date(2024, 3, 3), None, Some("06:00")),
            night(date(2024, 3, 5), Some("23:00"), Some("07:30")),
        ];
        let derived = sleep_nights(&nights);

        assert_eq!(derived[0].hours_slept, None);
        assert_eq!(derived[1].hours_slept, Some(7.5));
        assert_eq!(derived[2].hours_slept, Some(8.0));
        // 2024-03-04 is missing
        assert_eq!(derived[3].hours_slept, None);
    }

    #[test]
    fn test_sleep_chart_monthly_averages_durations() {
        let nights = vec![
            night(date(2024, 3, 1), Some("23:00"), Some("06:00")),
            night(date(2024, 3, 2), Some("23:00"), Some("07:00")),
            night(date(2024, 3, 3), Some("23:00"), Some("08:00")),
        ];
        let series = sleep_chart(
            &nights,
            Granularity::Monthly,
            &ChartSettings::default(),
            at(date(2024, 3, 31), 0, 0),
        )
        .unwrap();

        let slept = series.trace("Hours Slept").unwrap();
        assert_eq!(slept.y, vec![Some(8.5)]);
        assert_eq!(slept.hover.as_ref().unwrap()[0], "Hours Slept: 8.5 hours");
        assert_eq!(series.overlays.len(), 1);
    }

    #[test]
    fn test_spotify_monthly_and_nan_gap() {
        let points = vec![
            SpotifyPoint { date: date(2024, 1, 3), average_release_year: 2000.0 },
            SpotifyPoint { date: date(2024, 1, 20), average_release_year: 2010.0 },
            SpotifyPoint { date: date(2024, 2, 1), average_release_year: f64::NAN },
        ];
        let series = spotify_chart(
            &points,
            Granularity::Monthly,
            &ChartSettings::default(),
            at(date(2024, 2, 2), 0, 0),
        )
        .unwrap();

        assert_eq!(series.x, vec!["2024-01-01", "2024-02-01"]);
        assert_eq!(series.traces[0].y, vec![Some(2005.0), None]);
    }

    #[test]
    fn test_genre_chart() {
        let counts = vec![
            GenreCount { genre: "indie".into(), track_count: 3 },
            GenreCount { genre: "jazz".into(), track_count: 1 },
        ];
        let series = genre_chart(&counts).unwrap();
        assert_eq!(series.x, vec!["indie", "jazz"]);
        assert_eq!(series.trace("Share (%)").unwrap().y, vec![Some(75.0), Some(25.0)]);

        assert!(matches!(
            genre_chart(&[]),
            Err(ChartError::Aggregate(AggregateError::Undefined))
        ));
    }

    #[test]
    fn test_chart_kind_from_str() {
        assert_eq!("Sleep".parse::<ChartKind>(), Ok(ChartKind::Sleep));
        assert!("radar".parse::<ChartKind>().is_err());
    }
}
