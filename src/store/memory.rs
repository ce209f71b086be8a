use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use super::{
    Entry, EntryPatch, GoalSet, NewEntry, NutritionStore, Profile, Recipe, RecipeFields,
    StoreError, StoreResult,
};

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    profiles: Vec<Profile>,
    preferences: HashMap<Uuid, GoalSet>,
    recipes: Vec<Recipe>,
}

/// In-memory stand-in for the remote table store. Backs `AppState::fake()`
/// and the test suite; rows live only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NutritionStore for MemoryStore {
    async fn entries_by_date(&self, user_id: Uuid, date: Date) -> StoreResult<Vec<Entry>> {
        let inner = self.lock();
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.entry_date == date)
            .cloned()
            .collect())
    }

    async fn entries_all(&self, user_id: Uuid) -> StoreResult<Vec<Entry>> {
        let inner = self.lock();
        let mut rows: Vec<Entry> = inner
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order within a date.
        rows.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
        Ok(rows)
    }

    async fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry> {
        let row = Entry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            entry_date: entry.entry_date,
            description: entry.description,
            calories: entry.calories,
            protein: entry.protein,
            carbs: entry.carbs,
            fats: entry.fats,
            goal_calories: entry.goals.calories,
            goal_protein: entry.goals.protein,
            goal_carbs: entry.goals.carbs,
            goal_fats: entry.goals.fats,
        };
        self.lock().entries.push(row.clone());
        Ok(row)
    }

    async fn update_entry(&self, user_id: Uuid, id: Uuid, patch: EntryPatch) -> StoreResult<Entry> {
        let mut inner = self.lock();
        let row = inner
            .entries
            .iter_mut()
            .find(|e| e.user_id == user_id && e.id == id)
            .ok_or(StoreError::NotFound)?;
        row.description = patch.description;
        row.calories = patch.calories;
        row.protein = patch.protein;
        row.carbs = patch.carbs;
        row.fats = patch.fats;
        Ok(row.clone())
    }

    async fn delete_entry(&self, user_id: Uuid, id: Uuid) -> StoreResult<Entry> {
        let mut inner = self.lock();
        let pos = inner
            .entries
            .iter()
            .position(|e| e.user_id == user_id && e.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(inner.entries.remove(pos))
    }

    async fn update_goals_for_date(
        &self,
        user_id: Uuid,
        date: Date,
        goals: GoalSet,
    ) -> StoreResult<u64> {
        let mut inner = self.lock();
        let mut touched = 0;
        for row in inner
            .entries
            .iter_mut()
            .filter(|e| e.user_id == user_id && e.entry_date == date)
        {
            row.goal_calories = goals.calories;
            row.goal_protein = goals.protein;
            row.goal_carbs = goals.carbs;
            row.goal_fats = goals.fats;
            touched += 1;
        }
        Ok(touched)
    }

    async fn profile_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.lock().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn create_profile(&self, email: &str, password_hash: &str) -> StoreResult<Profile> {
        let mut inner = self.lock();
        if inner.profiles.iter().any(|p| p.email == email) {
            return Err(StoreError::Write(format!(
                "duplicate key: profiles.email = {email}"
            )));
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_approved: false,
            last_api_call_date: None,
            api_call_count: 0,
        };
        inner.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn pending_profiles(&self) -> StoreResult<Vec<Profile>> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .filter(|p| !p.is_approved)
            .cloned()
            .collect())
    }

    async fn approve_profile(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        profile.is_approved = true;
        Ok(())
    }

    async fn set_rate_counter(&self, id: Uuid, date: Date, count: i32) -> StoreResult<()> {
        let mut inner = self.lock();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        profile.last_api_call_date = Some(date);
        profile.api_call_count = count;
        Ok(())
    }

    async fn default_goals(&self, user_id: Uuid) -> StoreResult<GoalSet> {
        let mut inner = self.lock();
        Ok(*inner
            .preferences
            .entry(user_id)
            .or_insert(GoalSet::STARTING_DEFAULTS))
    }

    async fn save_default_goals(&self, user_id: Uuid, goals: GoalSet) -> StoreResult<()> {
        self.lock().preferences.insert(user_id, goals);
        Ok(())
    }

    async fn recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        Ok(self
            .lock()
            .recipes
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn public_recipes(&self) -> StoreResult<Vec<Recipe>> {
        Ok(self
            .lock()
            .recipes
            .iter()
            .filter(|r| r.is_public)
            .cloned()
            .collect())
    }

    async fn recipe_by_id(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        Ok(self.lock().recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_recipe(&self, user_id: Uuid, fields: RecipeFields) -> StoreResult<Recipe> {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id,
            name: fields.name,
            description: fields.description,
            instructions: fields.instructions,
            servings: fields.servings,
            calories_per_serving: fields.calories_per_serving,
            protein_per_serving: fields.protein_per_serving,
            carbs_per_serving: fields.carbs_per_serving,
            fats_per_serving: fields.fats_per_serving,
            is_public: fields.is_public,
        };
        self.lock().recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: RecipeFields,
    ) -> StoreResult<Recipe> {
        let mut inner = self.lock();
        let recipe = inner
            .recipes
            .iter_mut()
            .find(|r| r.user_id == user_id && r.id == id)
            .ok_or(StoreError::NotFound)?;
        recipe.name = fields.name;
        recipe.description = fields.description;
        recipe.instructions = fields.instructions;
        recipe.servings = fields.servings;
        recipe.calories_per_serving = fields.calories_per_serving;
        recipe.protein_per_serving = fields.protein_per_serving;
        recipe.carbs_per_serving = fields.carbs_per_serving;
        recipe.fats_per_serving = fields.fats_per_serving;
        recipe.is_public = fields.is_public;
        Ok(recipe.clone())
    }

    async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock();
        let pos = inner
            .recipes
            .iter()
            .position(|r| r.user_id == user_id && r.id == id)
            .ok_or(StoreError::NotFound)?;
        inner.recipes.remove(pos);
        Ok(())
    }
}
