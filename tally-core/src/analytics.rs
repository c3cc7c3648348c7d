//! Aggregation over completed time entries: totals, per-project,
//! per-activity and per-day breakdowns for a trailing window.
//!
//! Pure reducers; running entries never count, and earnings are
//! resolved per entry through the rate card so a rate edit is
//! reflected on the next report rather than baked into stored rows.

use std::collections::HashMap;
use std::str::FromStr;

use itertools::Itertools;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::domain::{ActivityId, ProjectId, TimeEntry};
use crate::format::calculate_earnings;
use crate::rates::RateCard;

/// Which number a breakdown is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    Time,
    Earnings,
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Metric::Time),
            "earnings" => Ok(Metric::Earnings),
            other => Err(format!("unknown metric '{other}'")),
        }
    }
}

/// Trailing window measured back from the report's reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    Last7Days,
    Last30Days,
    Last90Days,
}

impl TimeRange {
    pub fn days(self) -> i64 {
        match self {
            TimeRange::Last7Days => 7,
            TimeRange::Last30Days => 30,
            TimeRange::Last90Days => 90,
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "90d" => Ok(TimeRange::Last90Days),
            other => Err(format!("unknown time range '{other}'")),
        }
    }
}

/// One entry joined with the names and rates needed for reporting.
#[derive(Debug, Clone)]
pub struct EntryFacts {
    pub entry: TimeEntry,
    pub activity_id: ActivityId,
    pub activity_name: String,
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_color: String,
    pub rates: RateCard,
}

impl EntryFacts {
    fn earnings(&self) -> f64 {
        calculate_earnings(self.entry.duration_seconds, self.rates.effective())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_seconds: i64,
    pub total_earnings: f64,
    pub entries: usize,
    pub average_session_seconds: i64,
    pub average_hourly_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStat {
    pub project_id: ProjectId,
    pub name: String,
    pub color: String,
    pub seconds: i64,
    pub earnings: f64,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStat {
    pub activity_id: ActivityId,
    pub name: String,
    pub project_name: String,
    pub seconds: i64,
    pub earnings: f64,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStat {
    pub date: Date,
    pub seconds: i64,
    pub earnings: f64,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub totals: Totals,
    pub by_project: Vec<ProjectStat>,
    pub by_activity: Vec<ActivityStat>,
    pub by_day: Vec<DayStat>,
}

const TOP_ACTIVITIES: usize = 10;

pub fn build_report(
    facts: &[EntryFacts],
    range: TimeRange,
    metric: Metric,
    reference_time: OffsetDateTime,
) -> AnalyticsReport {
    let cutoff = reference_time - time::Duration::days(range.days());
    let window: Vec<&EntryFacts> = facts
        .iter()
        .filter(|f| f.entry.is_completed() && f.entry.start_time >= cutoff)
        .collect();

    AnalyticsReport {
        totals: totals(&window),
        by_project: by_project(&window, metric),
        by_activity: by_activity(&window, metric),
        by_day: by_day(&window),
    }
}

fn totals(window: &[&EntryFacts]) -> Totals {
    let total_seconds: i64 = window.iter().map(|f| f.entry.duration_seconds).sum();
    let total_earnings: f64 = window.iter().map(|f| f.earnings()).sum();
    let entries = window.len();
    Totals {
        total_seconds,
        total_earnings,
        entries,
        average_session_seconds: if entries == 0 {
            0
        } else {
            total_seconds / entries as i64
        },
        average_hourly_rate: if total_seconds > 0 {
            total_earnings / (total_seconds as f64 / 3600.0)
        } else {
            0.0
        },
    }
}

fn by_project(window: &[&EntryFacts], metric: Metric) -> Vec<ProjectStat> {
    let mut index: HashMap<ProjectId, usize> = HashMap::new();
    let mut stats: Vec<ProjectStat> = Vec::new();

    for facts in window {
        let slot = *index.entry(facts.project_id).or_insert_with(|| {
            stats.push(ProjectStat {
                project_id: facts.project_id,
                name: facts.project_name.clone(),
                color: facts.project_color.clone(),
                seconds: 0,
                earnings: 0.0,
                entries: 0,
            });
            stats.len() - 1
        });
        let stat = &mut stats[slot];
        stat.seconds += facts.entry.duration_seconds;
        stat.earnings += facts.earnings();
        stat.entries += 1;
    }

    sort_desc(&mut stats, |s| rank(metric, s.seconds, s.earnings));
    stats
}

fn by_activity(window: &[&EntryFacts], metric: Metric) -> Vec<ActivityStat> {
    let mut index: HashMap<ActivityId, usize> = HashMap::new();
    let mut stats: Vec<ActivityStat> = Vec::new();

    for facts in window {
        let slot = *index.entry(facts.activity_id).or_insert_with(|| {
            stats.push(ActivityStat {
                activity_id: facts.activity_id,
                name: facts.activity_name.clone(),
                project_name: facts.project_name.clone(),
                seconds: 0,
                earnings: 0.0,
                entries: 0,
            });
            stats.len() - 1
        });
        let stat = &mut stats[slot];
        stat.seconds += facts.entry.duration_seconds;
        stat.earnings += facts.earnings();
        stat.entries += 1;
    }

    sort_desc(&mut stats, |s| rank(metric, s.seconds, s.earnings));
    stats.truncate(TOP_ACTIVITIES);
    stats
}

fn by_day(window: &[&EntryFacts]) -> Vec<DayStat> {
    let mut stats: HashMap<Date, DayStat> = HashMap::new();

    for facts in window {
        let date = facts
            .entry
            .start_time
            .to_offset(time::UtcOffset::UTC)
            .date();
        let stat = stats.entry(date).or_insert(DayStat {
            date,
            seconds: 0,
            earnings: 0.0,
            entries: 0,
        });
        stat.seconds += facts.entry.duration_seconds;
        stat.earnings += facts.earnings();
        stat.entries += 1;
    }

    stats.into_values().sorted_by_key(|s| s.date).collect()
}

fn rank(metric: Metric, seconds: i64, earnings: f64) -> f64 {
    match metric {
        Metric::Time => seconds as f64,
        Metric::Earnings => earnings,
    }
}

fn sort_desc<T>(stats: &mut [T], key: impl Fn(&T) -> f64) {
    stats.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TimeEntryId, UserId};
    use time::macros::datetime;

    fn facts(
        activity: (&str, ActivityId),
        project: (&str, ProjectId),
        start: OffsetDateTime,
        seconds: i64,
        rate: f64,
    ) -> EntryFacts {
        EntryFacts {
            entry: TimeEntry {
                id: TimeEntryId::random(),
                activity_id: activity.1,
                user_id: UserId::random(),
                start_time: start,
                end_time: Some(start + time::Duration::seconds(seconds)),
                duration_seconds: seconds,
                description: None,
                is_running: false,
                created_at: start,
                updated_at: start,
            },
            activity_id: activity.1,
            activity_name: activity.0.into(),
            project_id: project.1,
            project_name: project.0.into(),
            project_color: "#22c55e".into(),
            rates: RateCard {
                activity: Some(rate),
                ..RateCard::default()
            },
        }
    }

    const NOW: OffsetDateTime = datetime!(2025-06-15 12:00 UTC);

    #[test]
    fn window_filters_old_and_running_entries() {
        let activity = ("Design", ActivityId::random());
        let project = ("Website", ProjectId::random());
        let mut running = facts(activity, project, NOW - time::Duration::hours(1), 0, 50.0);
        running.entry.end_time = None;
        running.entry.is_running = true;

        let input = vec![
            facts(activity, project, NOW - time::Duration::days(2), 3600, 50.0),
            facts(activity, project, NOW - time::Duration::days(10), 3600, 50.0),
            running,
        ];

        let report = build_report(&input, TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(report.totals.entries, 1);
        assert_eq!(report.totals.total_seconds, 3600);

        let wide = build_report(&input, TimeRange::Last30Days, Metric::Time, NOW);
        assert_eq!(wide.totals.entries, 2);
    }

    #[test]
    fn totals_compute_averages() {
        let activity = ("Design", ActivityId::random());
        let project = ("Website", ProjectId::random());
        let input = vec![
            facts(activity, project, NOW - time::Duration::days(1), 3600, 50.0),
            facts(activity, project, NOW - time::Duration::days(2), 1800, 50.0),
        ];

        let report = build_report(&input, TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(report.totals.total_seconds, 5400);
        assert_eq!(report.totals.total_earnings, 75.0);
        assert_eq!(report.totals.average_session_seconds, 2700);
        assert_eq!(report.totals.average_hourly_rate, 50.0);
    }

    #[test]
    fn empty_window_has_zeroed_totals() {
        let report = build_report(&[], TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(
            report.totals,
            Totals {
                total_seconds: 0,
                total_earnings: 0.0,
                entries: 0,
                average_session_seconds: 0,
                average_hourly_rate: 0.0,
            }
        );
        assert!(report.by_project.is_empty());
        assert!(report.by_day.is_empty());
    }

    #[test]
    fn project_ranking_follows_the_metric() {
        let long_cheap = ("Long", ActivityId::random());
        let short_pricey = ("Short", ActivityId::random());
        let alpha = ("Alpha", ProjectId::random());
        let beta = ("Beta", ProjectId::random());
        let input = vec![
            facts(long_cheap, alpha, NOW - time::Duration::days(1), 7200, 10.0),
            facts(short_pricey, beta, NOW - time::Duration::days(1), 3600, 100.0),
        ];

        let by_time = build_report(&input, TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(by_time.by_project[0].name, "Alpha");

        let by_earnings = build_report(&input, TimeRange::Last7Days, Metric::Earnings, NOW);
        assert_eq!(by_earnings.by_project[0].name, "Beta");
        assert_eq!(by_earnings.by_project[0].earnings, 100.0);
    }

    #[test]
    fn activities_are_capped_at_ten() {
        let project = ("Website", ProjectId::random());
        let input: Vec<EntryFacts> = (0..12)
            .map(|i| {
                facts(
                    ("Activity", ActivityId::random()),
                    project,
                    NOW - time::Duration::days(1),
                    3600 * (i + 1),
                    50.0,
                )
            })
            .collect();

        let report = build_report(&input, TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(report.by_activity.len(), 10);
        // Largest first; the two smallest fell off.
        assert_eq!(report.by_activity[0].seconds, 3600 * 12);
        assert_eq!(report.by_activity[9].seconds, 3600 * 3);
    }

    #[test]
    fn daily_breakdown_is_ascending_by_date() {
        let activity = ("Design", ActivityId::random());
        let project = ("Website", ProjectId::random());
        let input = vec![
            facts(activity, project, datetime!(2025-06-14 09:00 UTC), 600, 50.0),
            facts(activity, project, datetime!(2025-06-12 09:00 UTC), 1200, 50.0),
            facts(activity, project, datetime!(2025-06-14 16:00 UTC), 300, 50.0),
        ];

        let report = build_report(&input, TimeRange::Last7Days, Metric::Time, NOW);
        assert_eq!(report.by_day.len(), 2);
        assert_eq!(report.by_day[0].date, time::macros::date!(2025-06-12));
        assert_eq!(report.by_day[1].date, time::macros::date!(2025-06-14));
        assert_eq!(report.by_day[1].seconds, 900);
        assert_eq!(report.by_day[1].entries, 2);
    }
}
