use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use time::Date;
use uuid::Uuid;

use crate::store::{Entry, GoalSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    DayEntries(Uuid, Date),
    AllEntries(Uuid),
    Preferences(Uuid),
}

#[derive(Clone)]
enum Value {
    Entries(Vec<Entry>),
    Goals(GoalSet),
}

struct Slot {
    stored_at: Instant,
    value: Value,
}

/// Time-based read cache keyed by (operation, arguments). Entries and
/// preferences age out on separate TTLs; writes invalidate only the keys
/// scoped to the affected user (and date), never another user's reads.
pub struct ReadCache {
    entries_ttl: Duration,
    preferences_ttl: Duration,
    slots: Mutex<HashMap<Key, Slot>>,
}

impl ReadCache {
    pub fn new(entries_ttl: Duration, preferences_ttl: Duration) -> Self {
        Self {
            entries_ttl,
            preferences_ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ttl_for(&self, key: &Key) -> Duration {
        match key {
            Key::Preferences(_) => self.preferences_ttl,
            _ => self.entries_ttl,
        }
    }

    fn fresh(&self, key: &Key) -> Option<Value> {
        let slots = self.lock();
        let slot = slots.get(key)?;
        if slot.stored_at.elapsed() >= self.ttl_for(key) {
            return None;
        }
        Some(slot.value.clone())
    }

    fn put(&self, key: Key, value: Value) {
        self.lock().insert(
            key,
            Slot {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn day_entries(&self, user_id: Uuid, date: Date) -> Option<Vec<Entry>> {
        match self.fresh(&Key::DayEntries(user_id, date)) {
            Some(Value::Entries(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn put_day_entries(&self, user_id: Uuid, date: Date, rows: Vec<Entry>) {
        self.put(Key::DayEntries(user_id, date), Value::Entries(rows));
    }

    pub fn all_entries(&self, user_id: Uuid) -> Option<Vec<Entry>> {
        match self.fresh(&Key::AllEntries(user_id)) {
            Some(Value::Entries(rows)) => Some(rows),
            _ => None,
        }
    }

    pub fn put_all_entries(&self, user_id: Uuid, rows: Vec<Entry>) {
        self.put(Key::AllEntries(user_id), Value::Entries(rows));
    }

    pub fn preferences(&self, user_id: Uuid) -> Option<GoalSet> {
        match self.fresh(&Key::Preferences(user_id)) {
            Some(Value::Goals(goals)) => Some(goals),
            _ => None,
        }
    }

    pub fn put_preferences(&self, user_id: Uuid, goals: GoalSet) {
        self.put(Key::Preferences(user_id), Value::Goals(goals));
    }

    /// Drops the cached reads a successful entry write makes stale.
    pub fn invalidate_day(&self, user_id: Uuid, date: Date) {
        let mut slots = self.lock();
        slots.remove(&Key::DayEntries(user_id, date));
        slots.remove(&Key::AllEntries(user_id));
    }

    pub fn invalidate_preferences(&self, user_id: Uuid) {
        self.lock().remove(&Key::Preferences(user_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn entry(user_id: Uuid, d: Date) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            user_id,
            entry_date: d,
            description: "oatmeal".into(),
            calories: 300,
            protein: 10,
            carbs: 50,
            fats: 5,
            goal_calories: 2000,
            goal_protein: 150,
            goal_carbs: 250,
            goal_fats: 60,
        }
    }

    #[test]
    fn serves_fresh_reads_and_expires_stale_ones() {
        let user = Uuid::new_v4();
        let d = date!(2024 - 05 - 01);

        let cache = ReadCache::new(Duration::from_secs(60), Duration::from_secs(300));
        cache.put_day_entries(user, d, vec![entry(user, d)]);
        assert_eq!(cache.day_entries(user, d).map(|v| v.len()), Some(1));

        let expired = ReadCache::new(Duration::ZERO, Duration::ZERO);
        expired.put_day_entries(user, d, vec![entry(user, d)]);
        assert!(expired.day_entries(user, d).is_none());
    }

    #[test]
    fn invalidation_is_scoped_to_the_affected_user_and_date() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let d1 = date!(2024 - 05 - 01);
        let d2 = date!(2024 - 05 - 02);

        let cache = ReadCache::new(Duration::from_secs(60), Duration::from_secs(300));
        cache.put_day_entries(alice, d1, vec![entry(alice, d1)]);
        cache.put_day_entries(alice, d2, vec![entry(alice, d2)]);
        cache.put_all_entries(alice, vec![entry(alice, d1)]);
        cache.put_day_entries(bob, d1, vec![entry(bob, d1)]);

        cache.invalidate_day(alice, d1);

        assert!(cache.day_entries(alice, d1).is_none());
        assert!(cache.all_entries(alice).is_none());
        assert!(cache.day_entries(alice, d2).is_some());
        assert!(cache.day_entries(bob, d1).is_some());
    }

    #[test]
    fn preferences_use_their_own_ttl_and_key() {
        let user = Uuid::new_v4();
        let cache = ReadCache::new(Duration::ZERO, Duration::from_secs(300));
        cache.put_preferences(user, GoalSet::STARTING_DEFAULTS);
        // Entries TTL of zero must not affect the preferences slot.
        assert_eq!(cache.preferences(user), Some(GoalSet::STARTING_DEFAULTS));
        cache.invalidate_preferences(user);
        assert!(cache.preferences(user).is_none());
    }
}
