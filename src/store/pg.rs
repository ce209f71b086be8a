use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::Date;
use uuid::Uuid;

use super::{
    Entry, EntryPatch, GoalSet, NewEntry, NutritionStore, Profile, Recipe, RecipeFields,
    StoreError, StoreResult,
};

const ENTRY_COLUMNS: &str = "id, user_id, entry_date, description, calories, protein, carbs, \
                             fats, goal_calories, goal_protein, goal_carbs, goal_fats";
const PROFILE_COLUMNS: &str =
    "id, email, password_hash, is_approved, last_api_call_date, api_call_count";
const RECIPE_COLUMNS: &str = "id, user_id, name, description, instructions, servings, \
                              calories_per_serving, protein_per_serving, carbs_per_serving, \
                              fats_per_serving, is_public";

/// Postgres-backed store. All calls are one-shot; nothing is retried here.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn read_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Connection(other.to_string()),
    }
}

fn write_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Write(other.to_string()),
    }
}

#[derive(FromRow)]
struct PreferencesRow {
    default_calories: i32,
    default_protein: i32,
    default_carbs: i32,
    default_fats: i32,
}

#[async_trait]
impl NutritionStore for PgStore {
    async fn entries_by_date(&self, user_id: Uuid, date: Date) -> StoreResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries \
             WHERE user_id = $1 AND entry_date = $2 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn entries_all(&self, user_id: Uuid) -> StoreResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries \
             WHERE user_id = $1 ORDER BY entry_date DESC, created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry> {
        sqlx::query_as::<_, Entry>(&format!(
            "INSERT INTO entries (user_id, entry_date, description, calories, protein, carbs, \
             fats, goal_calories, goal_protein, goal_carbs, goal_fats) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(entry.user_id)
        .bind(entry.entry_date)
        .bind(&entry.description)
        .bind(entry.calories)
        .bind(entry.protein)
        .bind(entry.carbs)
        .bind(entry.fats)
        .bind(entry.goals.calories)
        .bind(entry.goals.protein)
        .bind(entry.goals.carbs)
        .bind(entry.goals.fats)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn update_entry(&self, user_id: Uuid, id: Uuid, patch: EntryPatch) -> StoreResult<Entry> {
        sqlx::query_as::<_, Entry>(&format!(
            "UPDATE entries SET description = $3, calories = $4, protein = $5, carbs = $6, \
             fats = $7 WHERE user_id = $1 AND id = $2 RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(id)
        .bind(&patch.description)
        .bind(patch.calories)
        .bind(patch.protein)
        .bind(patch.carbs)
        .bind(patch.fats)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn delete_entry(&self, user_id: Uuid, id: Uuid) -> StoreResult<Entry> {
        sqlx::query_as::<_, Entry>(&format!(
            "DELETE FROM entries WHERE user_id = $1 AND id = $2 RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn update_goals_for_date(
        &self,
        user_id: Uuid,
        date: Date,
        goals: GoalSet,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE entries SET goal_calories = $3, goal_protein = $4, goal_carbs = $5, \
             goal_fats = $6 WHERE user_id = $1 AND entry_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .bind(goals.calories)
        .bind(goals.protein)
        .bind(goals.carbs)
        .bind(goals.fats)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(result.rows_affected())
    }

    async fn profile_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn create_profile(&self, email: &str, password_hash: &str) -> StoreResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (email, password_hash) VALUES ($1, $2) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn pending_profiles(&self) -> StoreResult<Vec<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles \
             WHERE is_approved = FALSE ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn approve_profile(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE profiles SET is_approved = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_rate_counter(&self, id: Uuid, date: Date, count: i32) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE profiles SET last_api_call_date = $2, api_call_count = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(date)
        .bind(count)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn default_goals(&self, user_id: Uuid) -> StoreResult<GoalSet> {
        sqlx::query("INSERT INTO user_preferences (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        let row = sqlx::query_as::<_, PreferencesRow>(
            "SELECT default_calories, default_protein, default_carbs, default_fats \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(GoalSet {
            calories: row.default_calories,
            protein: row.default_protein,
            carbs: row.default_carbs,
            fats: row.default_fats,
        })
    }

    async fn save_default_goals(&self, user_id: Uuid, goals: GoalSet) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_preferences \
             (user_id, default_calories, default_protein, default_carbs, default_fats) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET default_calories = $2, default_protein = $3, \
             default_carbs = $4, default_fats = $5",
        )
        .bind(user_id)
        .bind(goals.calories)
        .bind(goals.protein)
        .bind(goals.carbs)
        .bind(goals.fats)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY name ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn public_recipes(&self) -> StoreResult<Vec<Recipe>> {
        sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE is_public = TRUE ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn recipe_by_id(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)
    }

    async fn insert_recipe(&self, user_id: Uuid, fields: RecipeFields) -> StoreResult<Recipe> {
        sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recipes (user_id, name, description, instructions, servings, \
             calories_per_serving, protein_per_serving, carbs_per_serving, fats_per_serving, \
             is_public) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.instructions)
        .bind(fields.servings)
        .bind(fields.calories_per_serving)
        .bind(fields.protein_per_serving)
        .bind(fields.carbs_per_serving)
        .bind(fields.fats_per_serving)
        .bind(fields.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: RecipeFields,
    ) -> StoreResult<Recipe> {
        sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET name = $3, description = $4, instructions = $5, servings = $6, \
             calories_per_serving = $7, protein_per_serving = $8, carbs_per_serving = $9, \
             fats_per_serving = $10, is_public = $11 \
             WHERE user_id = $1 AND id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.instructions)
        .bind(fields.servings)
        .bind(fields.calories_per_serving)
        .bind(fields.protein_per_serving)
        .bind(fields.carbs_per_serving)
        .bind(fields.fats_per_serving)
        .bind(fields.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM recipes WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

