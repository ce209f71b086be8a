use time::Date;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::goals::engine::resolve_goals_for_date;
use crate::rate_limit::guard;
use crate::state::AppState;
use crate::store::{Entry, NewEntry, Recipe, RecipeFields};

pub async fn my_recipes(state: &AppState, user_id: Uuid) -> Result<Vec<Recipe>, AppError> {
    Ok(state.store.recipes_by_user(user_id).await?)
}

pub async fn public_recipes(state: &AppState) -> Result<Vec<Recipe>, AppError> {
    Ok(state.store.public_recipes().await?)
}

pub async fn create_recipe(
    state: &AppState,
    user_id: Uuid,
    fields: RecipeFields,
) -> Result<Recipe, AppError> {
    guard(state, user_id, || async {
        state
            .store
            .insert_recipe(user_id, fields.clone())
            .await
            .map_err(AppError::from)
    })
    .await
}

pub async fn update_recipe(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    fields: RecipeFields,
) -> Result<Recipe, AppError> {
    guard(state, user_id, || async {
        state
            .store
            .update_recipe(user_id, id, fields.clone())
            .await
            .map_err(AppError::from)
    })
    .await
}

pub async fn delete_recipe(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    guard(state, user_id, || async {
        state
            .store
            .delete_recipe(user_id, id)
            .await
            .map_err(AppError::from)
    })
    .await
}

/// "2.0" rather than "2" so the serving count is unambiguous in a meal
/// description; fractional counts keep their natural form.
fn format_servings(servings: f64) -> String {
    if servings.fract() == 0.0 {
        format!("{servings:.1}")
    } else {
        servings.to_string()
    }
}

fn scale(per_serving: i32, servings: f64) -> i32 {
    (per_serving as f64 * servings).round() as i32
}

/// Writes one entry computed from a recipe's per-serving values. The recipe
/// must belong to the acting user or be public; anything else reads as
/// not-found rather than leaking other users' private recipes.
pub async fn log_recipe(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    date: Date,
    servings_eaten: f64,
) -> Result<Entry, AppError> {
    if !servings_eaten.is_finite() || servings_eaten < 0.0 {
        return Err(AppError::Validation(vec![format!(
            "servings_eaten must be a non-negative number (got {servings_eaten})"
        )]));
    }

    let recipe = state
        .store
        .recipe_by_id(recipe_id)
        .await?
        .filter(|r| r.user_id == user_id || r.is_public)
        .ok_or(AppError::NotFound)?;

    let goals = resolve_goals_for_date(state, user_id, date).await?;
    let description = format!(
        "{} (x{} servings)",
        recipe.name,
        format_servings(servings_eaten)
    );

    let entry = guard(state, user_id, || async {
        state
            .store
            .insert_entry(NewEntry {
                user_id,
                entry_date: date,
                description: description.clone(),
                calories: scale(recipe.calories_per_serving, servings_eaten),
                protein: scale(recipe.protein_per_serving, servings_eaten),
                carbs: scale(recipe.carbs_per_serving, servings_eaten),
                fats: scale(recipe.fats_per_serving, servings_eaten),
                goals,
            })
            .await
            .map_err(AppError::from)
    })
    .await?;

    state.overrides.take(user_id, date);
    state.cache.invalidate_day(user_id, date);
    debug!(%user_id, %recipe_id, servings_eaten, "recipe logged as entry");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const D: Date = date!(2024 - 08 - 01);

    async fn user(state: &AppState, email: &str) -> Uuid {
        state.store.create_profile(email, "hash").await.unwrap().id
    }

    fn chili(is_public: bool) -> RecipeFields {
        RecipeFields {
            name: "Lentil Chili".into(),
            description: "weeknight batch".into(),
            instructions: "simmer 30 minutes".into(),
            servings: 4,
            calories_per_serving: 300,
            protein_per_serving: 18,
            carbs_per_serving: 45,
            fats_per_serving: 6,
            is_public,
        }
    }

    #[tokio::test]
    async fn logging_scales_macros_and_annotates_the_description() {
        let state = AppState::fake();
        let user = user(&state, "a@example.com").await;
        let recipe = create_recipe(&state, user, chili(false)).await.unwrap();

        let entry = log_recipe(&state, user, recipe.id, D, 2.0).await.unwrap();
        assert_eq!(entry.calories, 600);
        assert_eq!(entry.protein, 36);
        assert!(entry.description.contains("Lentil Chili"));
        assert!(entry.description.contains("2.0"));
    }

    #[tokio::test]
    async fn fractional_servings_round_to_nearest_integer_macros() {
        let state = AppState::fake();
        let user = user(&state, "b@example.com").await;
        let recipe = create_recipe(&state, user, chili(false)).await.unwrap();

        let entry = log_recipe(&state, user, recipe.id, D, 1.5).await.unwrap();
        assert_eq!(entry.calories, 450);
        assert_eq!(entry.protein, 27);
        assert!(entry.description.contains("1.5"));
    }

    #[tokio::test]
    async fn private_recipes_of_others_read_as_not_found() {
        let state = AppState::fake();
        let owner = user(&state, "owner@example.com").await;
        let viewer = user(&state, "viewer@example.com").await;

        let private = create_recipe(&state, owner, chili(false)).await.unwrap();
        assert!(matches!(
            log_recipe(&state, viewer, private.id, D, 1.0).await.unwrap_err(),
            AppError::NotFound
        ));

        let public = create_recipe(&state, owner, chili(true)).await.unwrap();
        assert!(log_recipe(&state, viewer, public.id, D, 1.0).await.is_ok());
        assert_eq!(public_recipes(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_nonsense_serving_counts() {
        let state = AppState::fake();
        let user = user(&state, "c@example.com").await;
        let recipe = create_recipe(&state, user, chili(false)).await.unwrap();

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                log_recipe(&state, user, recipe.id, D, bad).await.unwrap_err(),
                AppError::Validation(_)
            ));
        }
    }

    #[tokio::test]
    async fn logged_entry_carries_the_resolved_goal_snapshot() {
        let state = AppState::fake();
        let user = user(&state, "d@example.com").await;
        let recipe = create_recipe(&state, user, chili(false)).await.unwrap();
        let override_goals = crate::store::GoalSet {
            calories: 1700,
            protein: 140,
            carbs: 160,
            fats: 50,
        };
        state.overrides.set(user, D, override_goals);

        let entry = log_recipe(&state, user, recipe.id, D, 1.0).await.unwrap();
        assert_eq!(entry.goal_snapshot(), override_goals);
        assert!(state.overrides.get(user, D).is_none());
    }
}
