//! Effective hourly rate resolution.
//!
//! Override precedence is strict: activity > project > client > 0.
//! Overrides are `Option<f64>` so an explicitly configured rate of
//! zero wins over a parent rate; only an absent override falls
//! through.

use crate::domain::{Activity, Client, Project};

/// The three rate levels relevant to one time entry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateCard {
    pub activity: Option<f64>,
    pub project: Option<f64>,
    pub client: Option<f64>,
}

impl RateCard {
    pub fn effective(&self) -> f64 {
        self.activity
            .or(self.project)
            .or(self.client)
            .unwrap_or(0.0)
    }
}

/// Resolve the rate billed for work on `activity`.
pub fn effective_rate(activity: &Activity, project: &Project, client: &Client) -> f64 {
    RateCard {
        activity: activity.hourly_rate,
        project: project.hourly_rate,
        client: Some(client.hourly_rate),
    }
    .effective()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(activity: Option<f64>, project: Option<f64>, client: Option<f64>) -> f64 {
        RateCard {
            activity,
            project,
            client,
        }
        .effective()
    }

    #[test]
    fn activity_rate_wins_when_set() {
        assert_eq!(card(Some(80.0), Some(60.0), Some(40.0)), 80.0);
    }

    #[test]
    fn explicit_zero_is_a_real_override() {
        // A pro-bono activity under a paid project bills at zero.
        assert_eq!(card(Some(0.0), Some(60.0), Some(40.0)), 0.0);
        assert_eq!(card(None, Some(0.0), Some(40.0)), 0.0);
    }

    #[test]
    fn falls_through_project_then_client() {
        assert_eq!(card(None, Some(60.0), Some(40.0)), 60.0);
        assert_eq!(card(None, None, Some(40.0)), 40.0);
    }

    #[test]
    fn defaults_to_zero_when_nothing_is_set() {
        assert_eq!(card(None, None, None), 0.0);
    }
}
