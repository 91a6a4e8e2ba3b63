//! Aggregation functions applied within a bucket

use serde::{Deserialize, Serialize};

use crate::time::ClockTime;
use crate::types::GenreCount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// Bedtime or wakeup is missing, so no duration can be computed
    #[error("incomplete night: bedtime and wakeup are both required")]
    Incomplete,

    /// Percentage over a zero total
    #[error("undefined: total is zero")]
    Undefined,
}

/// Running arithmetic mean
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// `None` until a value has been added
    pub fn result(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::default();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}

/// Arithmetic mean; `None` for an empty input. NaN members propagate.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().collect::<Accumulator>().result()
}

/// Linear mean of clock times in minutes since midnight.
///
/// Not wrap-aware: 23:00 and 01:00 average to 12:00, not 00:00. The mean is
/// floored to whole minutes.
pub fn time_of_day_mean<I>(times: I) -> Option<ClockTime>
where
    I: IntoIterator<Item = ClockTime>,
{
    let avg = mean(times.into_iter().map(|t| f64::from(t.minutes())))?;
    Some(ClockTime::from_minutes(avg.floor() as u32))
}

/// Hours between bedtime and wakeup, wrapping past midnight
pub fn sleep_duration(
    bedtime: Option<ClockTime>,
    wakeup: Option<ClockTime>,
) -> Result<f64, AggregateError> {
    let (Some(bedtime), Some(wakeup)) = (bedtime, wakeup) else {
        return Err(AggregateError::Incomplete);
    };

    let mut hours = wakeup.as_decimal_hours() - bedtime.as_decimal_hours();
    if hours < 0.0 {
        hours += 24.0;
    }
    Ok(hours)
}

/// Share of all tracks held by one genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreShare {
    pub genre: String,
    pub track_count: usize,
    pub percentage: f64,
}

pub fn genre_percentages(counts: &[GenreCount]) -> Result<Vec<GenreShare>, AggregateError> {
    let total: usize = counts.iter().map(|g| g.track_count).sum();
    if total == 0 {
        return Err(AggregateError::Undefined);
    }

    Ok(counts
        .iter()
        .map(|g| GenreShare {
            genre: g.genre.clone(),
            track_count: g.track_count,
            percentage: g.track_count as f64 / total as f64 * 100.0,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_accumulator_running_mean() {
        let mut acc = Accumulator::default();
        assert_eq!(acc.result(), None);

        acc.add(10.0);
        acc.add(30.0);
        assert_eq!(acc.result(), Some(20.0));
    }

    #[test]
    fn test_mean_is_order_independent() {
        assert_eq!(mean([4000.0, 6000.0, 8000.0]), Some(6000.0));
        assert_eq!(mean([8000.0, 4000.0, 6000.0]), Some(6000.0));
        assert_eq!(mean(std::iter::empty()), None);
        assert!(mean([1999.0, f64::NAN]).unwrap().is_nan());
    }

    #[test]
    fn test_time_of_day_mean_is_linear() {
        let avg = time_of_day_mean([clock("23:00"), clock("01:00")]).unwrap();
        assert_eq!(avg.to_string(), "12:00");

        let avg = time_of_day_mean([clock("22:30"), clock("23:00"), clock("23:15")]).unwrap();
        assert_eq!(avg.to_string(), "22:55");

        assert_eq!(time_of_day_mean(std::iter::empty()), None);
    }

    #[test]
    fn test_sleep_duration_wraps_midnight() {
        assert_eq!(
            sleep_duration(Some(clock("23:30")), Some(clock("07:00"))),
            Ok(7.5)
        );
        assert_eq!(
            sleep_duration(Some(clock("00:45")), Some(clock("08:15"))),
            Ok(7.5)
        );
    }

    #[test]
    fn test_sleep_duration_incomplete() {
        assert_eq!(
            sleep_duration(None, Some(clock("07:00"))),
            Err(AggregateError::Incomplete)
        );
        assert_eq!(
            sleep_duration(Some(clock("23:00")), None),
            Err(AggregateError::Incomplete)
        );
    }

    #[test]
    fn test_genre_percentages() {
        let counts = vec![
            GenreCount {
                genre: "A".into(),
                track_count: 3,
            },
            GenreCount {
                genre: "B".into(),
                track_count: 1,
            },
        ];
        let shares = genre_percentages(&counts).unwrap();
        assert_eq!(shares[0].percentage, 75.0);
        assert_eq!(shares[1].percentage, 25.0);
    }

    #[test]
    fn test_genre_percentages_undefined() {
        assert_eq!(genre_percentages(&[]), Err(AggregateError::Undefined));

        let zero = vec![GenreCount {
            genre: "A".into(),
            track_count: 0,
        }];
        assert_eq!(genre_percentages(&zero), Err(AggregateError::Undefined));
    }
}
