use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Serde codec for calendar dates as `YYYY-MM-DD` strings.
pub mod date_fmt {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn parse(s: &str) -> Result<Date, time::error::Parse> {
        Date::parse(s, FORMAT)
    }

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let s = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The four-metric nutrition target. A value of 0 means "no target" for
/// that metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSet {
    pub calories: i32,
    pub protein: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl GoalSet {
    /// Template written into `user_preferences` the first time a user is seen.
    pub const STARTING_DEFAULTS: GoalSet = GoalSet {
        calories: 2000,
        protein: 150,
        carbs: 250,
        fats: 60,
    };
}

/// One logged meal. The `goal_*` columns are the goal snapshot captured at
/// write time; every entry on the same (user, date) carries the same values.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "date_fmt")]
    pub entry_date: Date,
    pub description: String,
    pub calories: i32,
    pub protein: i32,
    pub carbs: i32,
    pub fats: i32,
    pub goal_calories: i32,
    pub goal_protein: i32,
    pub goal_carbs: i32,
    pub goal_fats: i32,
}

impl Entry {
    pub fn goal_snapshot(&self) -> GoalSet {
        GoalSet {
            calories: self.goal_calories,
            protein: self.goal_protein,
            carbs: self.goal_carbs,
            fats: self.goal_fats,
        }
    }
}

/// Insert payload for a new entry; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: Uuid,
    pub entry_date: Date,
    pub description: String,
    pub calories: i32,
    pub protein: i32,
    pub carbs: i32,
    pub fats: i32,
    pub goals: GoalSet,
}

/// In-place edit of an entry's nutrition fields. Goal columns are only
/// touched through `update_goals_for_date`.
#[derive(Debug, Clone)]
pub struct EntryPatch {
    pub description: String,
    pub calories: i32,
    pub protein: i32,
    pub carbs: i32,
    pub fats: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_approved: bool,
    pub last_api_call_date: Option<Date>,
    pub api_call_count: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub servings: i32,
    pub calories_per_serving: i32,
    pub protein_per_serving: i32,
    pub carbs_per_serving: i32,
    pub fats_per_serving: i32,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct RecipeFields {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub servings: i32,
    pub calories_per_serving: i32,
    pub protein_per_serving: i32,
    pub carbs_per_serving: i32,
    pub fats_per_serving: i32,
    pub is_public: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unreachable: {0}")]
    Connection(String),
    #[error("store write failed: {0}")]
    Write(String),
    #[error("row not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thin client contract over the remote table store. The Postgres
/// implementation backs the running service; the in-memory one backs
/// `AppState::fake()` and the test suite.
#[async_trait]
pub trait NutritionStore: Send + Sync {
    async fn entries_by_date(&self, user_id: Uuid, date: Date) -> StoreResult<Vec<Entry>>;
    /// Full history for a user, newest date first.
    async fn entries_all(&self, user_id: Uuid) -> StoreResult<Vec<Entry>>;
    async fn insert_entry(&self, entry: NewEntry) -> StoreResult<Entry>;
    async fn update_entry(&self, user_id: Uuid, id: Uuid, patch: EntryPatch) -> StoreResult<Entry>;
    async fn delete_entry(&self, user_id: Uuid, id: Uuid) -> StoreResult<Entry>;
    /// Bulk-rewrites the goal snapshot of every entry on (user, date).
    /// Returns the number of rows touched. Not transactional per row.
    async fn update_goals_for_date(
        &self,
        user_id: Uuid,
        date: Date,
        goals: GoalSet,
    ) -> StoreResult<u64>;

    async fn profile_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
    async fn create_profile(&self, email: &str, password_hash: &str) -> StoreResult<Profile>;
    async fn pending_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn approve_profile(&self, id: Uuid) -> StoreResult<()>;
    async fn set_rate_counter(&self, id: Uuid, date: Date, count: i32) -> StoreResult<()>;

    /// Lazily creates the row with `GoalSet::STARTING_DEFAULTS` on first read.
    async fn default_goals(&self, user_id: Uuid) -> StoreResult<GoalSet>;
    async fn save_default_goals(&self, user_id: Uuid, goals: GoalSet) -> StoreResult<()>;

    async fn recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>>;
    async fn public_recipes(&self) -> StoreResult<Vec<Recipe>>;
    async fn recipe_by_id(&self, id: Uuid) -> StoreResult<Option<Recipe>>;
    async fn insert_recipe(&self, user_id: Uuid, fields: RecipeFields) -> StoreResult<Recipe>;
    async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: RecipeFields,
    ) -> StoreResult<Recipe>;
    async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> StoreResult<()>;
}


