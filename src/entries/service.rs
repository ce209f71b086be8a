use std::collections::HashSet;

use time::Date;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::goals::engine::{fetch_all_entries, fetch_day_entries, resolve_goals_for_date};
use crate::rate_limit::guard;
use crate::state::AppState;
use crate::store::{Entry, EntryPatch, NewEntry};

use super::dto::{validate_fields, validate_rows, DaySaveResponse, MealFields, SaveRow};

/// Applies one day-editor submission: rows without an id are inserted with
/// the day's resolved goal snapshot, rows with an id are updated in place,
/// and existing entries absent from the submission are deleted. Each store
/// write passes through the quota guard individually; a quota rejection
/// partway leaves earlier writes applied (no compensating transaction).
pub async fn save_day(
    state: &AppState,
    user_id: Uuid,
    date: Date,
    rows: Vec<SaveRow>,
) -> Result<DaySaveResponse, AppError> {
    validate_rows(&rows)?;

    let existing = fetch_day_entries(state, user_id, date).await?;
    let existing_ids: HashSet<Uuid> = existing.iter().map(|e| e.id).collect();

    let mut problems = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(id) = row.id {
            if !existing_ids.contains(&id) {
                problems.push(format!("row {}: no entry {id} on this day", i + 1));
            }
        }
    }
    if !problems.is_empty() {
        return Err(AppError::Validation(problems));
    }

    // Goals to stamp onto new rows: snapshot, override or defaults, resolved
    // before anything is written.
    let day_goals = resolve_goals_for_date(state, user_id, date).await?;

    let kept: HashSet<Uuid> = rows.iter().filter_map(|r| r.id).collect();
    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut deleted = 0usize;

    let outcome: Result<(), AppError> = async {
        for entry in existing.iter().filter(|e| !kept.contains(&e.id)) {
            guard(state, user_id, || async {
                state
                    .store
                    .delete_entry(user_id, entry.id)
                    .await
                    .map_err(AppError::from)
            })
            .await?;
            deleted += 1;
        }

        for row in &rows {
            match row.id {
                Some(id) => {
                    guard(state, user_id, || async {
                        state
                            .store
                            .update_entry(user_id, id, patch_from(&row.fields))
                            .await
                            .map_err(AppError::from)
                    })
                    .await?;
                    updated += 1;
                }
                None => {
                    guard(state, user_id, || async {
                        state
                            .store
                            .insert_entry(NewEntry {
                                user_id,
                                entry_date: date,
                                description: row.fields.description.trim().to_string(),
                                calories: row.fields.calories,
                                protein: row.fields.protein,
                                carbs: row.fields.carbs,
                                fats: row.fields.fats,
                                goals: day_goals,
                            })
                            .await
                            .map_err(AppError::from)
                    })
                    .await?;
                    inserted += 1;
                }
            }
        }
        Ok(())
    }
    .await;

    if inserted > 0 {
        // The first entry write consumes the day's override; the goals now
        // live in the entries' snapshots.
        state.overrides.take(user_id, date);
    }
    if inserted + updated + deleted > 0 {
        state.cache.invalidate_day(user_id, date);
    }

    debug!(%user_id, %date, inserted, updated, deleted, "day save applied");
    outcome.map(|_| DaySaveResponse {
        inserted,
        updated,
        deleted,
    })
}

fn patch_from(fields: &MealFields) -> EntryPatch {
    EntryPatch {
        description: fields.description.trim().to_string(),
        calories: fields.calories,
        protein: fields.protein,
        carbs: fields.carbs,
        fats: fields.fats,
    }
}

/// Edits one meal's nutrition fields; the goal snapshot is untouched.
pub async fn update_meal(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    fields: MealFields,
) -> Result<Entry, AppError> {
    validate_fields(&fields)?;
    let entry = guard(state, user_id, || async {
        state
            .store
            .update_entry(user_id, id, patch_from(&fields))
            .await
            .map_err(AppError::from)
    })
    .await?;
    state.cache.invalidate_day(user_id, entry.entry_date);
    Ok(entry)
}

pub async fn delete_meal(state: &AppState, user_id: Uuid, id: Uuid) -> Result<Entry, AppError> {
    let entry = guard(state, user_id, || async {
        state
            .store
            .delete_entry(user_id, id)
            .await
            .map_err(AppError::from)
    })
    .await?;
    state.cache.invalidate_day(user_id, entry.entry_date);
    Ok(entry)
}

/// Full history, newest date first. Feeds the analytics view.
pub async fn list_history(state: &AppState, user_id: Uuid) -> Result<Vec<Entry>, AppError> {
    fetch_all_entries(state, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GoalSet;
    use time::macros::date;

    const D: Date = date!(2024 - 07 - 04);

    fn row(id: Option<Uuid>, description: &str, calories: i32) -> SaveRow {
        SaveRow {
            id,
            fields: MealFields {
                description: description.into(),
                calories,
                protein: 10,
                carbs: 20,
                fats: 5,
            },
        }
    }

    async fn user(state: &AppState, email: &str) -> Uuid {
        state.store.create_profile(email, "hash").await.unwrap().id
    }

    #[tokio::test]
    async fn first_save_consumes_the_override_into_snapshots() {
        let state = AppState::fake();
        let user = user(&state, "a@example.com").await;
        let override_goals = GoalSet {
            calories: 1600,
            protein: 130,
            carbs: 180,
            fats: 45,
        };
        state.overrides.set(user, D, override_goals);

        let response = save_day(&state, user, D, vec![row(None, "eggs", 250)])
            .await
            .unwrap();
        assert_eq!(response.inserted, 1);

        let entries = state.store.entries_by_date(user, D).await.unwrap();
        assert_eq!(entries[0].goal_snapshot(), override_goals);
        assert!(
            state.overrides.get(user, D).is_none(),
            "override must be consumed by the first entry write"
        );
    }

    #[tokio::test]
    async fn save_mixes_inserts_updates_and_deletes() {
        let state = AppState::fake();
        let user = user(&state, "b@example.com").await;

        save_day(
            &state,
            user,
            D,
            vec![row(None, "toast", 200), row(None, "yogurt", 150)],
        )
        .await
        .unwrap();
        let entries = state.store.entries_by_date(user, D).await.unwrap();
        let toast = entries.iter().find(|e| e.description == "toast").unwrap();
        let yogurt = entries.iter().find(|e| e.description == "yogurt").unwrap();

        // Keep toast (edited), drop yogurt, add soup.
        let response = save_day(
            &state,
            user,
            D,
            vec![row(Some(toast.id), "toast with butter", 260), row(None, "soup", 300)],
        )
        .await
        .unwrap();
        assert_eq!(
            (response.inserted, response.updated, response.deleted),
            (1, 1, 1)
        );

        let entries = state.store.entries_by_date(user, D).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.description == "toast with butter"));
        assert!(entries.iter().all(|e| e.id != yogurt.id));
    }

    #[tokio::test]
    async fn rejects_rows_referencing_entries_from_other_days() {
        let state = AppState::fake();
        let user = user(&state, "c@example.com").await;
        let err = save_day(&state, user, D, vec![row(Some(Uuid::new_v4()), "ghost", 100)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_is_scoped_to_one_entry_one_user() {
        let state = AppState::fake();
        let alice = user(&state, "alice@example.com").await;
        let bob = user(&state, "bob@example.com").await;
        let other_day = date!(2024 - 07 - 05);

        save_day(&state, alice, D, vec![row(None, "salad", 180)])
            .await
            .unwrap();
        save_day(&state, alice, other_day, vec![row(None, "pasta", 550)])
            .await
            .unwrap();
        save_day(&state, bob, D, vec![row(None, "burger", 700)])
            .await
            .unwrap();

        let salad = state.store.entries_by_date(alice, D).await.unwrap()[0].clone();
        delete_meal(&state, alice, salad.id).await.unwrap();

        assert!(state.store.entries_by_date(alice, D).await.unwrap().is_empty());
        assert_eq!(state.store.entries_by_date(alice, other_day).await.unwrap().len(), 1);
        assert_eq!(state.store.entries_by_date(bob, D).await.unwrap().len(), 1);

        // Deleting someone else's entry is a not-found, not a cross-user delete.
        let burger = state.store.entries_by_date(bob, D).await.unwrap()[0].clone();
        assert!(matches!(
            delete_meal(&state, alice, burger.id).await.unwrap_err(),
            AppError::NotFound
        ));
    }

    #[tokio::test]
    async fn update_leaves_the_goal_snapshot_alone() {
        let state = AppState::fake();
        let user = user(&state, "d@example.com").await;
        save_day(&state, user, D, vec![row(None, "rice", 400)])
            .await
            .unwrap();
        let entry = state.store.entries_by_date(user, D).await.unwrap()[0].clone();
        let snapshot = entry.goal_snapshot();

        let updated = update_meal(
            &state,
            user,
            entry.id,
            MealFields {
                description: "fried rice".into(),
                calories: 520,
                protein: 15,
                carbs: 60,
                fats: 18,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.description, "fried rice");
        assert_eq!(updated.calories, 520);
        assert_eq!(updated.goal_snapshot(), snapshot);
    }

    #[tokio::test]
    async fn history_lists_newest_date_first() {
        let state = AppState::fake();
        let user = user(&state, "e@example.com").await;
        save_day(&state, user, D, vec![row(None, "older", 100)])
            .await
            .unwrap();
        save_day(
            &state,
            user,
            date!(2024 - 07 - 10),
            vec![row(None, "newer", 100)],
        )
        .await
        .unwrap();

        let history = list_history(&state, user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "newer");
        assert_eq!(history[1].description, "older");
    }
}
