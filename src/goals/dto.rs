use serde::Serialize;
use time::Date;

use crate::store::{date_fmt, Entry, GoalSet};

use super::engine::{progress, remaining, GoalEditOutcome};

/// One value per tracked metric, in the fixed calories/protein/carbs/fats
/// shape the client renders.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSet<T> {
    pub calories: T,
    pub protein: T,
    pub carbs: T,
    pub fats: T,
}

pub fn day_totals(entries: &[Entry]) -> MetricSet<i64> {
    let mut totals = MetricSet {
        calories: 0i64,
        protein: 0i64,
        carbs: 0i64,
        fats: 0i64,
    };
    for e in entries {
        totals.calories += e.calories as i64;
        totals.protein += e.protein as i64;
        totals.carbs += e.carbs as i64;
        totals.fats += e.fats as i64;
    }
    totals
}

#[derive(Debug, Serialize)]
pub struct DayView {
    #[serde(with = "date_fmt")]
    pub date: Date,
    pub goals: GoalSet,
    pub entries: Vec<Entry>,
    pub totals: MetricSet<i64>,
    pub progress: MetricSet<f64>,
    pub remaining: MetricSet<i64>,
}

impl DayView {
    pub fn build(date: Date, goals: GoalSet, entries: Vec<Entry>) -> Self {
        let totals = day_totals(&entries);
        let progress = MetricSet {
            calories: progress(totals.calories, goals.calories),
            protein: progress(totals.protein, goals.protein),
            carbs: progress(totals.carbs, goals.carbs),
            fats: progress(totals.fats, goals.fats),
        };
        let remaining = MetricSet {
            calories: remaining(goals.calories, totals.calories),
            protein: remaining(goals.protein, totals.protein),
            carbs: remaining(goals.carbs, totals.carbs),
            fats: remaining(goals.fats, totals.fats),
        };
        Self {
            date,
            goals,
            entries,
            totals,
            progress,
            remaining,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GoalEditResponse {
    pub status: &'static str,
    /// Present only when existing entries had their snapshots rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_updated: Option<u64>,
}

impl From<GoalEditOutcome> for GoalEditResponse {
    fn from(outcome: GoalEditOutcome) -> Self {
        match outcome {
            GoalEditOutcome::OverrideStored => GoalEditResponse {
                status: "goals held until first meal",
                entries_updated: None,
            },
            GoalEditOutcome::EntriesUpdated(n) => GoalEditResponse {
                status: "goals updated",
                entries_updated: Some(n),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    fn entry(calories: i32, protein: i32) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            entry_date: date!(2024 - 06 - 01),
            description: "meal".into(),
            calories,
            protein,
            carbs: 0,
            fats: 0,
            goal_calories: 2000,
            goal_protein: 150,
            goal_carbs: 250,
            goal_fats: 60,
        }
    }

    #[test]
    fn day_view_sums_and_scores_each_metric() {
        let goals = GoalSet {
            calories: 2000,
            protein: 100,
            carbs: 0,
            fats: 60,
        };
        let view = DayView::build(
            date!(2024 - 06 - 01),
            goals,
            vec![entry(600, 40), entry(400, 110)],
        );
        assert_eq!(view.totals.calories, 1000);
        assert_eq!(view.progress.calories, 0.5);
        assert_eq!(view.progress.protein, 1.0, "overshoot clamps at 1.0");
        assert_eq!(view.progress.carbs, 0.0, "no target means no progress");
        assert_eq!(view.remaining.protein, -50);
    }
}
