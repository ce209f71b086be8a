use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use time::Date;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::rate_limit::guard;
use crate::state::AppState;
use crate::store::{Entry, GoalSet};

/// Goal sets edited for days that have no entries yet. The value is consumed
/// (copied into the first entry's goal snapshot) and removed as soon as an
/// entry lands on that date. Never written to the store.
#[derive(Default)]
pub struct OverrideMap {
    inner: Mutex<HashMap<(Uuid, Date), GoalSet>>,
}

impl OverrideMap {
    fn lock(&self) -> MutexGuard<'_, HashMap<(Uuid, Date), GoalSet>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, user_id: Uuid, date: Date) -> Option<GoalSet> {
        self.lock().get(&(user_id, date)).copied()
    }

    pub fn set(&self, user_id: Uuid, date: Date, goals: GoalSet) {
        self.lock().insert((user_id, date), goals);
    }

    pub fn take(&self, user_id: Uuid, date: Date) -> Option<GoalSet> {
        self.lock().remove(&(user_id, date))
    }
}

/// Cache read-through for one day's entries.
pub async fn fetch_day_entries(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<Vec<Entry>, AppError> {
    if let Some(rows) = state.cache.day_entries(user_id, date) {
        return Ok(rows);
    }
    let rows = state.store.entries_by_date(user_id, date).await?;
    state.cache.put_day_entries(user_id, date, rows.clone());
    Ok(rows)
}

/// Cache read-through for a user's full history, newest date first.
pub async fn fetch_all_entries(state: &AppState, user_id: Uuid) -> Result<Vec<Entry>, AppError> {
    if let Some(rows) = state.cache.all_entries(user_id) {
        return Ok(rows);
    }
    let rows = state.store.entries_all(user_id).await?;
    state.cache.put_all_entries(user_id, rows.clone());
    Ok(rows)
}

/// Cache read-through for the user's standing default goals; the store
/// creates the row lazily on first read.
pub async fn fetch_default_goals(state: &AppState, user_id: Uuid) -> Result<GoalSet, AppError> {
    if let Some(goals) = state.cache.preferences(user_id) {
        return Ok(goals);
    }
    let goals = state.store.default_goals(user_id).await?;
    state.cache.put_preferences(user_id, goals);
    Ok(goals)
}

/// Determines which targets apply to (user, date). First match wins:
/// the day's entries carry a shared snapshot; otherwise an unsaved override;
/// otherwise the saved defaults.
pub async fn resolve_goals_for_date(
    state: &AppState,
    user_id: Uuid,
    date: Date,
) -> Result<GoalSet, AppError> {
    let entries = fetch_day_entries(state, user_id, date).await?;
    if let Some(first) = entries.first() {
        return Ok(first.goal_snapshot());
    }
    if let Some(goals) = state.overrides.get(user_id, date) {
        return Ok(goals);
    }
    fetch_default_goals(state, user_id).await
}

pub fn validate_goals(goals: &GoalSet) -> Result<(), AppError> {
    let mut problems = Vec::new();
    for (metric, value) in [
        ("calories", goals.calories),
        ("protein", goals.protein),
        ("carbs", goals.carbs),
        ("fats", goals.fats),
    ] {
        if value < 0 {
            problems.push(format!("goal {metric} must not be negative (got {value})"));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalEditOutcome {
    /// No entries yet; the goals are held in memory until the first meal.
    OverrideStored,
    /// Entries existed; their snapshots were bulk-updated (count of rows).
    EntriesUpdated(u64),
}

/// Applies a goal edit for (user, date). With entries present this is a
/// quota-guarded bulk rewrite of their snapshots; without entries it only
/// touches the in-memory override map. Either way the day's cached reads
/// are dropped.
pub async fn apply_goal_edit(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    new_goals: GoalSet,
) -> Result<GoalEditOutcome, AppError> {
    validate_goals(&new_goals)?;

    let entries = fetch_day_entries(state, user_id, date).await?;
    let outcome = if entries.is_empty() {
        state.overrides.set(user_id, date, new_goals);
        debug!(%user_id, %date, "goal override stored in memory");
        GoalEditOutcome::OverrideStored
    } else {
        let updated = guard(state, user_id, || async move {
            state
                .store
                .update_goals_for_date(user_id, date, new_goals)
                .await
                .map_err(AppError::from)
        })
        .await?;
        // A stale override for a date that has entries can only confuse
        // later resolution; drop it.
        state.overrides.take(user_id, date);
        debug!(%user_id, %date, updated, "goal snapshots rewritten");
        GoalEditOutcome::EntriesUpdated(updated)
    };

    state.cache.invalidate_day(user_id, date);
    Ok(outcome)
}

/// Replaces the user's standing defaults and drops the cached copy.
pub async fn save_default_goals(
    state: &AppState,
    user_id: Uuid,
    goals: GoalSet,
) -> Result<(), AppError> {
    validate_goals(&goals)?;
    state.store.save_default_goals(user_id, goals).await?;
    state.cache.invalidate_preferences(user_id);
    Ok(())
}

/// Fraction of the goal reached, clamped to 1.0. A goal of 0 means "no
/// target": progress is reported as 0 rather than dividing by zero.
pub fn progress(actual: i64, goal: i32) -> f64 {
    if goal > 0 {
        (actual as f64 / goal as f64).min(1.0)
    } else {
        0.0
    }
}

/// May go negative; displayed as over-budget.
pub fn remaining(goal: i32, actual: i64) -> i64 {
    goal as i64 - actual
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewEntry;
    use time::macros::date;

    const D: Date = date!(2024 - 06 - 01);

    fn goals(calories: i32, protein: i32, carbs: i32, fats: i32) -> GoalSet {
        GoalSet {
            calories,
            protein,
            carbs,
            fats,
        }
    }

    async fn seed_entry(state: &AppState, user_id: Uuid, date: Date, snapshot: GoalSet) {
        state
            .store
            .insert_entry(NewEntry {
                user_id,
                entry_date: date,
                description: "chicken and rice".into(),
                calories: 650,
                protein: 45,
                carbs: 70,
                fats: 15,
                goals: snapshot,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn falls_back_to_saved_defaults() {
        let state = AppState::fake();
        let user = Uuid::new_v4();

        let resolved = resolve_goals_for_date(&state, user, D).await.unwrap();
        assert_eq!(resolved, GoalSet::STARTING_DEFAULTS);

        save_default_goals(&state, user, goals(1800, 120, 200, 50))
            .await
            .unwrap();
        let resolved = resolve_goals_for_date(&state, user, D).await.unwrap();
        assert_eq!(resolved, goals(1800, 120, 200, 50));
    }

    #[tokio::test]
    async fn override_wins_over_defaults_and_ignores_later_default_changes() {
        let state = AppState::fake();
        let user = Uuid::new_v4();

        apply_goal_edit(&state, user, D, goals(1500, 100, 150, 40))
            .await
            .unwrap();
        assert_eq!(
            resolve_goals_for_date(&state, user, D).await.unwrap(),
            goals(1500, 100, 150, 40)
        );

        save_default_goals(&state, user, goals(2500, 200, 300, 80))
            .await
            .unwrap();
        assert_eq!(
            resolve_goals_for_date(&state, user, D).await.unwrap(),
            goals(1500, 100, 150, 40),
            "override must be unaffected by default-goal changes"
        );
    }

    #[tokio::test]
    async fn entry_snapshot_wins_over_everything() {
        let state = AppState::fake();
        let user = Uuid::new_v4();

        state.overrides.set(user, D, goals(1500, 100, 150, 40));
        seed_entry(&state, user, D, goals(2200, 160, 260, 70)).await;

        assert_eq!(
            resolve_goals_for_date(&state, user, D).await.unwrap(),
            goals(2200, 160, 260, 70)
        );
    }

    #[tokio::test]
    async fn goal_edit_rewrites_every_snapshot_and_drops_the_override() {
        let state = AppState::fake();
        // The guarded bulk update needs a profile row for this user.
        let profile = state.store.create_profile("a@b.com", "hash").await.unwrap();
        let user = profile.id;

        seed_entry(&state, user, D, goals(2000, 150, 250, 60)).await;
        seed_entry(&state, user, D, goals(2000, 150, 250, 60)).await;
        seed_entry(&state, user, D, goals(2000, 150, 250, 60)).await;
        state.overrides.set(user, D, goals(1111, 11, 11, 11));

        let outcome = apply_goal_edit(&state, user, D, goals(1900, 140, 220, 55))
            .await
            .unwrap();
        assert_eq!(outcome, GoalEditOutcome::EntriesUpdated(3));

        let entries = fetch_day_entries(&state, user, D).await.unwrap();
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert_eq!(entry.goal_snapshot(), goals(1900, 140, 220, 55));
        }
        assert!(state.overrides.get(user, D).is_none());
    }

    #[tokio::test]
    async fn rejects_negative_goals_reporting_every_metric() {
        let state = AppState::fake();
        let user = Uuid::new_v4();
        let err = apply_goal_edit(&state, user, D, goals(-1, 100, -5, 40))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(problems) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].contains("calories"));
                assert!(problems[1].contains("carbs"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn progress_handles_zero_goals_and_clamps_overshoot() {
        assert_eq!(progress(0, 0), 0.0);
        assert_eq!(progress(150, 100), 1.0);
        assert_eq!(progress(50, 100), 0.5);
        assert_eq!(progress(500, 0), 0.0);
    }

    #[test]
    fn remaining_can_go_negative() {
        assert_eq!(remaining(2000, 1400), 600);
        assert_eq!(remaining(100, 150), -50);
    }
}
