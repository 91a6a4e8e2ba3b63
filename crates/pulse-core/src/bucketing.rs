//! Calendar-aligned bucketing of observations
//!
//! One engine serves every chart. A per-domain [`BucketPolicy`] decides
//! what each granularity means for that domain: a trailing filter over raw
//! points (filter mode) or one bucket per calendar window (group mode).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{Granularity, Observation, DATE_LABEL_FORMAT};

/// Calendar window used by group mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
}

/// How a granularity selects and groups observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketMode {
    /// Every observation in its own bucket
    All,
    /// The last `n` observations, one bucket each
    Latest(usize),
    /// Observations at or after `reference_now - window`, one bucket each
    Trailing(Duration),
    /// One bucket per calendar window
    Group(Period),
}

/// Observations that fall into one window
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'a, T> {
    pub label: String,
    pub start: NaiveDate,
    pub members: Vec<&'a T>,
}

impl<'a, T: Observation> Bucket<'a, T> {
    fn single(obs: &'a T) -> Self {
        Self {
            label: obs.label(),
            start: obs.timestamp().date(),
            members: vec![obs],
        }
    }
}

/// Per-domain meaning of daily/weekly/monthly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPolicy {
    pub daily: BucketMode,
    pub weekly: BucketMode,
    pub monthly: BucketMode,
    pub week_start: Weekday,
}

impl BucketPolicy {
    /// Raw points daily, trailing year weekly, monthly means.
    ///
    /// `daily_window` limits the daily view to the trailing span; without it
    /// every fetched record is shown.
    pub fn weather(week_start: Weekday, daily_window: Option<Duration>) -> Self {
        Self {
            daily: daily_window.map_or(BucketMode::All, BucketMode::Trailing),
            weekly: BucketMode::Trailing(Duration::weeks(52)),
            monthly: BucketMode::Group(Period::Month),
            week_start,
        }
    }

    /// Latest days daily, true calendar grouping otherwise
    pub fn steps(daily_records: usize, week_start: Weekday) -> Self {
        Self {
            daily: BucketMode::Latest(daily_records),
            weekly: BucketMode::Group(Period::Week),
            monthly: BucketMode::Group(Period::Month),
            week_start,
        }
    }

    pub fn bedtime(week_start: Weekday) -> Self {
        Self {
            daily: BucketMode::Trailing(Duration::days(7)),
            weekly: BucketMode::Trailing(Duration::weeks(52)),
            monthly: BucketMode::Group(Period::Month),
            week_start,
        }
    }

    pub fn spotify(week_start: Weekday) -> Self {
        Self {
            daily: BucketMode::Trailing(Duration::days(30)),
            weekly: BucketMode::Trailing(Duration::weeks(52)),
            monthly: BucketMode::Group(Period::Month),
            week_start,
        }
    }

    pub fn mode(&self, granularity: Granularity) -> BucketMode {
        match granularity {
            Granularity::Daily => self.daily,
            Granularity::Weekly => self.weekly,
            Granularity::Monthly => self.monthly,
        }
    }
}

/// First day of the window containing `date`
pub fn window_start(date: NaiveDate, period: Period, week_start: Weekday) -> NaiveDate {
    match period {
        Period::Week => {
            let offset = (7 + date.weekday().num_days_from_monday()
                - week_start.num_days_from_monday())
                % 7;
            date - Duration::days(i64::from(offset))
        }
        Period::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
    }
}

/// Bucket observations for one granularity of a domain's policy
pub fn bucket<'a, T: Observation>(
    observations: &'a [T],
    granularity: Granularity,
    policy: &BucketPolicy,
    reference_now: NaiveDateTime,
) -> Vec<Bucket<'a, T>> {
    bucket_with(
        observations,
        policy.mode(granularity),
        policy.week_start,
        reference_now,
    )
}

/// Bucket observations with an explicit mode.
///
/// Group mode is a streaming fold over the input order: a bucket is emitted
/// whenever the next observation's window differs from the current one.
/// Callers must pass observations sorted by timestamp.
pub fn bucket_with<'a, T: Observation>(
    observations: &'a [T],
    mode: BucketMode,
    week_start: Weekday,
    reference_now: NaiveDateTime,
) -> Vec<Bucket<'a, T>> {
    match mode {
        BucketMode::All => observations.iter().map(Bucket::single).collect(),
        BucketMode::Latest(n) => {
            let skip = observations.len().saturating_sub(n);
            observations[skip..].iter().map(Bucket::single).collect()
        }
        BucketMode::Trailing(window) => {
            let cutoff = reference_now - window;
            observations
                .iter()
                .filter(|obs| obs.timestamp() >= cutoff)
                .map(Bucket::single)
                .collect()
        }
        BucketMode::Group(period) => group(observations, period, week_start),
    }
}

fn group<T: Observation>(observations: &[T], period: Period, week_start: Weekday) -> Vec<Bucket<'_, T>> {
    let mut buckets = Vec::new();
    let mut current: Option<Bucket<'_, T>> = None;

    for obs in observations {
        let start = window_start(obs.timestamp().date(), period, week_start);
        let same_window = current.as_ref().map_or(false, |b| b.start == start);

        if same_window {
            if let Some(b) = current.as_mut() {
                b.members.push(obs);
            }
            continue;
        }

        if let Some(done) = current.take() {
            buckets.push(done);
        }
        current = Some(Bucket {
            label: start.format(DATE_LABEL_FORMAT).to_string(),
            start,
            members: vec![obs],
        });
    }

    if let Some(done) = current {
        buckets.push(done);
    }
    buckets
}

/// Reduce each bucket with a domain aggregator
pub fn rollup<T, O, F>(buckets: &[Bucket<'_, T>], aggregator: F) -> Vec<(String, NaiveDate, O)>
where
    F: Fn(&[&T]) -> O,
{
    buckets
        .iter()
        .map(|b| (b.label.clone(), b.start, aggregator(b.members.as_slice())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollups::mean;
    use crate::types::{AggregatePoint, StepRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn steps(entries: &[(NaiveDate, u32)]) -> Vec<StepRecord> {
        entries
            .iter()
            .map(|&(date, steps)| StepRecord { date, steps })
            .collect()
    }

    fn noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_start_week_and_month() {
        // 2024-01-10 is a Wednesday
        let wed = date(2024, 1, 10);
        assert_eq!(window_start(wed, Period::Week, Weekday::Sun), date(2024, 1, 7));
        assert_eq!(window_start(wed, Period::Week, Weekday::Mon), date(2024, 1, 8));
        assert_eq!(window_start(date(2024, 1, 7), Period::Week, Weekday::Sun), date(2024, 1, 7));
        assert_eq!(window_start(wed, Period::Month, Weekday::Sun), date(2024, 1, 1));
    }

    #[test]
    fn test_all_mode_is_pass_through() {
        let data = steps(&[(date(2024, 1, 1), 10), (date(2024, 1, 1), 20), (date(2024, 1, 2), 30)]);
        let buckets = bucket_with(&data, BucketMode::All, Weekday::Sun, noon(date(2024, 1, 2)));

        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.members.len() == 1));
        assert_eq!(buckets[1].members[0].steps, 20);
    }

    #[test]
    fn test_latest_mode_keeps_tail() {
        let data: Vec<StepRecord> = (1..=10)
            .map(|d| StepRecord {
                date: date(2024, 3, d),
                steps: d * 100,
            })
            .collect();
        let buckets = bucket_with(&data, BucketMode::Latest(7), Weekday::Sun, noon(date(2024, 3, 10)));

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].label, "2024-03-04");
        assert_eq!(buckets[6].label, "2024-03-10");

        let short = bucket_with(&data[..3], BucketMode::Latest(7), Weekday::Sun, noon(date(2024, 3, 10)));
        assert_eq!(short.len(), 3);
    }

    #[test]
    fn test_weather_policy_daily_window() {
        assert_eq!(BucketPolicy::weather(Weekday::Sun, None).daily, BucketMode::All);
        assert_eq!(
            BucketPolicy::weather(Weekday::Sun, Some(Duration::hours(36))).daily,
            BucketMode::Trailing(Duration::hours(36))
        );
    }

    #[test]
    fn test_trailing_mode_filters_relative_to_reference() {
        let data = steps(&[
            (date(2023, 1, 1), 1),
            (date(2023, 6, 1), 2),
            (date(2024, 1, 1), 3),
        ]);
        let policy = BucketPolicy::spotify(Weekday::Sun);
        let now = noon(date(2024, 1, 15));

        let weekly = bucket(&data, Granularity::Weekly, &policy, now);
        let labels: Vec<_> = weekly.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-06-01", "2024-01-01"]);

        let daily = bucket(&data, Granularity::Daily, &policy, now);
        assert_eq!(daily.len(), 1);
    }

    #[test]
    fn test_group_mode_weekly_fold() {
        // Sun 7th .. Sat 13th is one week; the 14th starts the next
        let data = steps(&[
            (date(2024, 1, 8), 4000),
            (date(2024, 1, 10), 6000),
            (date(2024, 1, 13), 8000),
            (date(2024, 1, 14), 1000),
            (date(2024, 1, 29), 3000),
        ]);
        let buckets = bucket_with(&data, BucketMode::Group(Period::Week), Weekday::Sun, noon(date(2024, 2, 1)));

        let labels: Vec<_> = buckets.iter().map(|b| b.label.clone()).collect();
        insta::assert_snapshot!(labels.join(","), @"2024-01-07,2024-01-14,2024-01-28");
        assert_eq!(buckets[0].members.len(), 3);

        let means = rollup(&buckets, |members| mean(members.iter().map(|r| f64::from(r.steps))));
        assert_eq!(means[0].2, Some(6000.0));
        assert_eq!(means[1].2, Some(1000.0));
    }

    #[test]
    fn test_group_mode_monthly_fold() {
        let data = steps(&[
            (date(2024, 1, 30), 100),
            (date(2024, 1, 31), 300),
            (date(2024, 2, 1), 500),
            (date(2024, 3, 15), 700),
        ]);
        let policy = BucketPolicy::steps(7, Weekday::Sun);
        let buckets = bucket(&data, Granularity::Monthly, &policy, noon(date(2024, 3, 31)));

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].start, date(2024, 1, 1));
        assert_eq!(buckets[0].members.len(), 2);
        assert_eq!(buckets[2].label, "2024-03-01");
    }

    #[test]
    fn test_group_mode_unsorted_input_splits_windows() {
        // Sorted input is a precondition; out-of-order windows are not merged
        let data = steps(&[
            (date(2024, 1, 5), 1),
            (date(2024, 2, 5), 2),
            (date(2024, 1, 6), 3),
        ]);
        let buckets = bucket_with(&data, BucketMode::Group(Period::Month), Weekday::Sun, noon(date(2024, 3, 1)));
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn test_rebucketing_full_month_aggregate_is_idempotent() {
        let data: Vec<StepRecord> = (1..=31)
            .map(|d| StepRecord {
                date: date(2024, 1, d),
                steps: 5000 + d,
            })
            .collect();
        let now = noon(date(2024, 2, 1));
        let mode = BucketMode::Group(Period::Month);

        let first: Vec<AggregatePoint> = rollup(
            &bucket_with(&data, mode, Weekday::Sun, now),
            |members| mean(members.iter().map(|r| f64::from(r.steps))),
        )
        .into_iter()
        .filter_map(|(_, date, value)| value.map(|value| AggregatePoint { date, value }))
        .collect();
        assert_eq!(first.len(), 1);

        let again: Vec<AggregatePoint> = rollup(
            &bucket_with(&first, mode, Weekday::Sun, now),
            |members| mean(members.iter().map(|p| p.value)),
        )
        .into_iter()
        .filter_map(|(_, date, value)| value.map(|value| AggregatePoint { date, value }))
        .collect();

        assert_eq!(again, first);
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        let data: Vec<StepRecord> = Vec::new();
        let policy = BucketPolicy::steps(7, Weekday::Sun);
        for g in [Granularity::Daily, Granularity::Weekly, Granularity::Monthly] {
            assert!(bucket(&data, g, &policy, noon(date(2024, 1, 1))).is_empty());
        }
    }
}
