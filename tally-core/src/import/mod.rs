//! CSV import pipeline.
//!
//! The pure half lives here: parse the uploaded text, apply the
//! user's column mapping, and produce an [`ImportPlan`] — the set of
//! activities to create plus the entry payloads to insert. Executing
//! the plan is the store's job and is all-or-nothing.

mod csv;
mod duration;

pub use csv::CsvTable;
pub use duration::parse_duration;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::domain::{Activity, ActivityId, ImportError, ProjectId, UserId};
use crate::store::{EntryStore, ImportOutcome};

/// Which CSV columns feed which entry fields. Column values are
/// header names from the uploaded file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub activity: Option<String>,
}

/// Target activity of a planned entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityRef {
    Existing(ActivityId),
    /// Created by the import, keyed by name in
    /// [`ImportPlan::new_activities`].
    New(String),
}

/// One entry payload ready for insertion. Entries are always imported
/// closed: `is_running = false` and `end_time` set, either parsed or
/// derived as `start_time + duration`.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    pub activity: ActivityRef,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub duration_seconds: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// Distinct activity names to create, in first-seen order.
    pub new_activities: Vec<String>,
    pub entries: Vec<PlannedEntry>,
}

/// Map parsed CSV rows into an import plan.
///
/// `target_activity` pins every row to one activity (activity-scoped
/// import); otherwise rows resolve against `existing_activities` by
/// name and unknown names become new activities, created once per
/// distinct name. `reference_time` anchors duration-only rows, which
/// have no timestamps of their own.
pub fn build_plan(
    table: &CsvTable,
    mapping: &ColumnMapping,
    existing_activities: &[Activity],
    target_activity: Option<ActivityId>,
    reference_time: OffsetDateTime,
) -> Result<ImportPlan, ImportError> {
    let start_col = mapping.start_time.as_deref().and_then(|h| table.column(h));
    let end_col = mapping.end_time.as_deref().and_then(|h| table.column(h));
    let duration_col = mapping.duration.as_deref().and_then(|h| table.column(h));
    let description_col = mapping.description.as_deref().and_then(|h| table.column(h));
    let activity_col = mapping.activity.as_deref().and_then(|h| table.column(h));

    let has_time_range = start_col.is_some() && end_col.is_some();
    if !has_time_range && duration_col.is_none() {
        return Err(ImportError::MissingTimeColumns);
    }

    let mut plan = ImportPlan::default();

    for (idx, row) in table.rows.iter().enumerate() {
        let row_number = idx + 1;

        let (start_time, end_time, duration_seconds) = if has_time_range {
            let start = parse_timestamp(table.value(row, start_col)).ok_or_else(|| {
                ImportError::InvalidRow {
                    row: row_number,
                    message: "unparsable start time".into(),
                }
            })?;
            let end = parse_timestamp(table.value(row, end_col)).ok_or_else(|| {
                ImportError::InvalidRow {
                    row: row_number,
                    message: "unparsable end time".into(),
                }
            })?;
            let duration = (end - start).whole_seconds();
            if duration < 0 {
                return Err(ImportError::InvalidRow {
                    row: row_number,
                    message: "end time before start time".into(),
                });
            }
            (start, end, duration)
        } else {
            let duration = parse_duration(table.value(row, duration_col));
            let start = reference_time;
            (start, start + time::Duration::seconds(duration), duration)
        };

        let description = match table.value(row, description_col) {
            "" => None,
            text => Some(text.to_string()),
        };

        let activity = match target_activity {
            Some(id) => ActivityRef::Existing(id),
            None => {
                let name = match table.value(row, activity_col) {
                    "" => format!("Activity {}", row_number),
                    name => name.to_string(),
                };
                match existing_activities.iter().find(|a| a.name == name) {
                    Some(existing) => ActivityRef::Existing(existing.id),
                    None => {
                        if !plan.new_activities.contains(&name) {
                            plan.new_activities.push(name.clone());
                        }
                        ActivityRef::New(name)
                    }
                }
            }
        };

        plan.entries.push(PlannedEntry {
            activity,
            start_time,
            end_time,
            duration_seconds,
            description,
        });
    }

    Ok(plan)
}

/// Execute a plan against the store. All-or-nothing: a failed insert
/// aborts the whole batch with nothing committed.
pub async fn run_import<S: EntryStore>(
    store: &S,
    user_id: UserId,
    project_id: ProjectId,
    plan: &ImportPlan,
) -> Result<ImportOutcome, ImportError> {
    store
        .import_entries(user_id, project_id, plan)
        .await
        .map_err(|source| ImportError::Batch {
            attempted: plan.entries.len(),
            source,
        })
}

/// Accepts RFC 3339 or a handful of common spreadsheet timestamp
/// shapes; offset-less values are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(parsed);
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];
    for format in naive_formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(text, format) {
            return Some(parsed.assume_utc());
        }
    }

    if let Ok(date) = time::Date::parse(text, &format_description!("[year]-[month]-[day]")) {
        return Some(date.midnight().assume_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn activity(name: &str) -> Activity {
        let now = OffsetDateTime::now_utc();
        Activity {
            id: ActivityId::random(),
            name: name.to_string(),
            description: None,
            hourly_rate: None,
            project_id: ProjectId::random(),
            user_id: UserId::random(),
            created_at: now,
            updated_at: now,
        }
    }

    fn mapping_with_times() -> ColumnMapping {
        ColumnMapping {
            start_time: Some("Start".into()),
            end_time: Some("End".into()),
            activity: Some("Task".into()),
            ..Default::default()
        }
    }

    #[test]
    fn requires_time_columns_or_duration() {
        let table = CsvTable::parse("Task\nwrite\n").unwrap();
        let err = build_plan(
            &table,
            &ColumnMapping::default(),
            &[],
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::MissingTimeColumns));
    }

    #[test]
    fn computes_duration_from_time_range() {
        let table = CsvTable::parse(
            "Start,End,Task\n2024-05-01 09:00,2024-05-01 11:30,write docs\n",
        )
        .unwrap();
        let plan = build_plan(
            &table,
            &mapping_with_times(),
            &[],
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        let entry = &plan.entries[0];
        assert_eq!(entry.duration_seconds, 9000);
        assert_eq!(entry.start_time, datetime!(2024-05-01 09:00 UTC));
        assert_eq!(entry.end_time, datetime!(2024-05-01 11:30 UTC));
    }

    #[test]
    fn duration_only_rows_derive_end_time() {
        let table = CsvTable::parse("Hours,Task\n2h 30m,write docs\n").unwrap();
        let mapping = ColumnMapping {
            duration: Some("Hours".into()),
            activity: Some("Task".into()),
            ..Default::default()
        };
        let anchor = datetime!(2024-05-01 08:00 UTC);
        let plan = build_plan(&table, &mapping, &[], None, anchor).unwrap();

        let entry = &plan.entries[0];
        assert_eq!(entry.duration_seconds, 9000);
        assert_eq!(entry.start_time, anchor);
        assert_eq!(entry.end_time, anchor + time::Duration::seconds(9000));
    }

    #[test]
    fn distinct_new_activities_created_once() {
        let table = CsvTable::parse(
            "Start,End,Task\n\
             2024-05-01 09:00,2024-05-01 10:00,research\n\
             2024-05-01 10:00,2024-05-01 11:00,research\n\
             2024-05-01 11:00,2024-05-01 12:00,writing\n",
        )
        .unwrap();
        let plan = build_plan(
            &table,
            &mapping_with_times(),
            &[],
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        assert_eq!(plan.new_activities, vec!["research", "writing"]);
        assert_eq!(plan.entries.len(), 3);
    }

    #[test]
    fn existing_activities_resolved_by_name() {
        let existing = activity("research");
        let table = CsvTable::parse(
            "Start,End,Task\n2024-05-01 09:00,2024-05-01 10:00,research\n",
        )
        .unwrap();
        let plan = build_plan(
            &table,
            &mapping_with_times(),
            std::slice::from_ref(&existing),
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        assert!(plan.new_activities.is_empty());
        assert_eq!(
            plan.entries[0].activity,
            ActivityRef::Existing(existing.id)
        );
    }

    #[test]
    fn target_activity_pins_all_rows() {
        let target = ActivityId::random();
        let table =
            CsvTable::parse("Start,End\n2024-05-01 09:00,2024-05-01 10:00\n").unwrap();
        let mapping = ColumnMapping {
            start_time: Some("Start".into()),
            end_time: Some("End".into()),
            ..Default::default()
        };
        let plan = build_plan(
            &table,
            &mapping,
            &[],
            Some(target),
            OffsetDateTime::now_utc(),
        )
        .unwrap();

        assert!(plan.new_activities.is_empty());
        assert_eq!(plan.entries[0].activity, ActivityRef::Existing(target));
    }

    #[test]
    fn rows_without_activity_column_get_positional_names() {
        let table = CsvTable::parse(
            "Start,End\n2024-05-01 09:00,2024-05-01 10:00\n2024-05-01 10:00,2024-05-01 11:00\n",
        )
        .unwrap();
        let mapping = ColumnMapping {
            start_time: Some("Start".into()),
            end_time: Some("End".into()),
            ..Default::default()
        };
        let plan = build_plan(&table, &mapping, &[], None, OffsetDateTime::now_utc()).unwrap();

        assert_eq!(plan.new_activities, vec!["Activity 1", "Activity 2"]);
    }

    #[test]
    fn rejects_inverted_time_range() {
        let table = CsvTable::parse(
            "Start,End,Task\n2024-05-01 11:00,2024-05-01 09:00,write docs\n",
        )
        .unwrap();
        let err = build_plan(
            &table,
            &mapping_with_times(),
            &[],
            None,
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T09:00:00Z").is_some());
        assert!(parse_timestamp("2024-05-01T09:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-05-01 09:00:00").is_some());
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
