//! CSV export of a client's or project's completed time entries.
//!
//! Cells are always quoted, embedded quotes doubled. Timestamps are
//! rendered in UTC so the same tree always exports to the same bytes.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::domain::{Activity, Client, Project, TimeEntry};
use crate::format::{calculate_earnings, format_duration};
use crate::rates::effective_rate;

/// An activity together with its (already fetched) time entries.
#[derive(Debug, Clone)]
pub struct ActivityEntries {
    pub activity: Activity,
    pub entries: Vec<TimeEntry>,
}

#[derive(Debug, Clone)]
pub struct ProjectTree {
    pub project: Project,
    pub activities: Vec<ActivityEntries>,
}

#[derive(Debug, Clone)]
pub struct ClientTree {
    pub client: Client,
    pub projects: Vec<ProjectTree>,
}

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const DATETIME: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// All completed entries under a client, one row each, with a
/// `Project` column distinguishing them.
pub fn client_csv(tree: &ClientTree) -> String {
    let mut rows: Vec<Vec<String>> = vec![vec![
        "Date".into(),
        "Project".into(),
        "Activity".into(),
        "Start Time".into(),
        "End Time".into(),
        "Duration (Hours)".into(),
        "Duration (Formatted)".into(),
        "Hourly Rate".into(),
        "Earnings".into(),
        "Description".into(),
    ]];

    for project_tree in &tree.projects {
        for group in &project_tree.activities {
            for entry in group.entries.iter().filter(|e| e.is_completed()) {
                let mut row = entry_row(
                    entry,
                    &group.activity,
                    &project_tree.project,
                    &tree.client,
                );
                row.insert(1, project_tree.project.name.clone());
                rows.push(row);
            }
        }
    }

    render(rows)
}

/// All completed entries under one project.
pub fn project_csv(client: &Client, tree: &ProjectTree) -> String {
    let mut rows: Vec<Vec<String>> = vec![vec![
        "Date".into(),
        "Activity".into(),
        "Start Time".into(),
        "End Time".into(),
        "Duration (Hours)".into(),
        "Duration (Formatted)".into(),
        "Hourly Rate".into(),
        "Earnings".into(),
        "Description".into(),
    ]];

    for group in &tree.activities {
        for entry in group.entries.iter().filter(|e| e.is_completed()) {
            rows.push(entry_row(entry, &group.activity, &tree.project, client));
        }
    }

    render(rows)
}

fn entry_row(
    entry: &TimeEntry,
    activity: &Activity,
    project: &Project,
    client: &Client,
) -> Vec<String> {
    let rate = effective_rate(activity, project, client);
    let hours = entry.duration_seconds as f64 / 3600.0;
    let earnings = calculate_earnings(entry.duration_seconds, rate);

    vec![
        format_utc(entry.start_time, DATE),
        activity.name.clone(),
        format_utc(entry.start_time, DATETIME),
        entry
            .end_time
            .map(|t| format_utc(t, DATETIME))
            .unwrap_or_default(),
        format!("{hours:.2}"),
        format_duration(entry.duration_seconds),
        format!("{rate}"),
        format!("{earnings:.2}"),
        entry.description.clone().unwrap_or_default(),
    ]
}

fn format_utc(timestamp: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    timestamp
        .to_offset(time::UtcOffset::UTC)
        .format(format)
        .unwrap_or_default()
}

fn render(rows: Vec<Vec<String>>) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityId, ClientId, ProjectId, TimeEntryId, UserId};
    use time::macros::datetime;

    fn client(rate: f64) -> Client {
        Client {
            id: ClientId::random(),
            name: "Acme".into(),
            description: None,
            hourly_rate: rate,
            color: "#ff0000".into(),
            user_id: UserId::random(),
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn project(client: &Client, rate: Option<f64>) -> Project {
        Project {
            id: ProjectId::random(),
            name: "Website".into(),
            description: None,
            hourly_rate: rate,
            color: "#00ff00".into(),
            client_id: client.id,
            user_id: client.user_id,
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn activity(project: &Project, name: &str, rate: Option<f64>) -> Activity {
        Activity {
            id: ActivityId::random(),
            name: name.into(),
            description: None,
            hourly_rate: rate,
            project_id: project.id,
            user_id: project.user_id,
            created_at: datetime!(2025-01-01 00:00 UTC),
            updated_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn entry(
        activity: &Activity,
        start: OffsetDateTime,
        seconds: i64,
        description: Option<&str>,
    ) -> TimeEntry {
        TimeEntry {
            id: TimeEntryId::random(),
            activity_id: activity.id,
            user_id: activity.user_id,
            start_time: start,
            end_time: Some(start + time::Duration::seconds(seconds)),
            duration_seconds: seconds,
            description: description.map(Into::into),
            is_running: false,
            created_at: start,
            updated_at: start,
        }
    }

    fn running_entry(activity: &Activity, start: OffsetDateTime) -> TimeEntry {
        TimeEntry {
            end_time: None,
            is_running: true,
            ..entry(activity, start, 0, None)
        }
    }

    #[test]
    fn project_export_rows_and_quoting() {
        let client = client(50.0);
        let project = project(&client, None);
        let activity = activity(&project, "Design", None);
        let tree = ProjectTree {
            project,
            activities: vec![ActivityEntries {
                entries: vec![entry(
                    &activity,
                    datetime!(2025-03-10 09:30 UTC),
                    5400,
                    Some(r#"Homepage "hero" pass"#),
                )],
                activity,
            }],
        };

        let csv = project_csv(&client, &tree);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#""Date","Activity","Start Time","End Time","Duration (Hours)","Duration (Formatted)","Hourly Rate","Earnings","Description""#
        );
        assert_eq!(
            lines[1],
            r#""2025-03-10","Design","2025-03-10 09:30:00","2025-03-10 11:00:00","1.50","1h 30m 0s","50","75.00","Homepage ""hero"" pass""#
        );
    }

    #[test]
    fn client_export_includes_project_column_and_rate_precedence() {
        let client = client(50.0);
        let project = project(&client, Some(80.0));
        let activity = activity(&project, "Review", Some(100.0));
        let tree = ClientTree {
            client: client.clone(),
            projects: vec![ProjectTree {
                project,
                activities: vec![ActivityEntries {
                    entries: vec![entry(
                        &activity,
                        datetime!(2025-03-11 14:00 UTC),
                        3600,
                        None,
                    )],
                    activity,
                }],
            }],
        };

        let csv = client_csv(&tree);
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with(r#""Date","Project","Activity""#));
        assert_eq!(
            lines[1],
            r#""2025-03-11","Website","Review","2025-03-11 14:00:00","2025-03-11 15:00:00","1.00","1h 0m 0s","100","100.00","""#
        );
    }

    #[test]
    fn running_entries_are_excluded() {
        let client = client(50.0);
        let project = project(&client, None);
        let activity = activity(&project, "Design", None);
        let tree = ProjectTree {
            project,
            activities: vec![ActivityEntries {
                entries: vec![
                    running_entry(&activity, datetime!(2025-03-10 09:00 UTC)),
                    entry(&activity, datetime!(2025-03-10 10:00 UTC), 600, None),
                ],
                activity,
            }],
        };

        let csv = project_csv(&client, &tree);
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn empty_tree_exports_header_only() {
        let client = client(50.0);
        let tree = ClientTree {
            client: client.clone(),
            projects: vec![],
        };
        assert_eq!(client_csv(&tree).lines().count(), 1);
    }
}
