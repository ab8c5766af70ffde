use crate::errors::StoreError;
use crate::models::{AppData, HistoryPage, Mood, MoodCount, MoodEntry};
use crate::storage::persist_data;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Read access to a user's mood history plus the journal's write operations.
///
/// Every query is scoped to one user; entries of other users are never
/// returned or modified.
#[async_trait]
pub trait MoodHistoryStore: Send + Sync {
    /// Entries with `created_at >= since`, oldest first.
    async fn find_entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError>;

    /// Entries with `start <= created_at < end`, oldest first.
    async fn find_entries_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError>;

    /// Entry counts per mood id since `since`, ascending by mood id.
    async fn group_count_by_mood(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodCount>, StoreError>;

    async fn mood_name(&self, mood_id: i64) -> Result<Option<String>, StoreError>;

    async fn list_moods(&self) -> Result<Vec<Mood>, StoreError>;

    /// Newest-first page of a user's history. `page` starts at 1.
    async fn history_page(
        &self,
        user_id: &str,
        limit: usize,
        page: usize,
    ) -> Result<HistoryPage, StoreError>;

    async fn create_entry(
        &self,
        user_id: &str,
        mood_id: i64,
        note: Option<String>,
    ) -> Result<MoodEntry, StoreError>;

    async fn update_entry(
        &self,
        user_id: &str,
        entry_id: &str,
        mood_id: i64,
        note: Option<String>,
    ) -> Result<Option<MoodEntry>, StoreError>;

    async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<bool, StoreError>;

    async fn delete_user_entries(&self, user_id: &str) -> Result<usize, StoreError>;
}

/// In-memory journal mirrored to a JSON file after every write.
#[derive(Clone)]
pub struct JsonStore {
    path: PathBuf,
    data: Arc<Mutex<AppData>>,
}

impl JsonStore {
    pub fn new(path: PathBuf, data: AppData) -> Self {
        Self {
            path,
            data: Arc::new(Mutex::new(data)),
        }
    }

    async fn user_entries<F>(&self, user_id: &str, keep: F) -> Vec<MoodEntry>
    where
        F: Fn(&MoodEntry) -> bool,
    {
        let data = self.data.lock().await;
        let mut entries: Vec<MoodEntry> = data
            .entries
            .iter()
            .filter(|entry| entry.user_id == user_id && keep(entry))
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }
}

#[async_trait]
impl MoodHistoryStore for JsonStore {
    async fn find_entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError> {
        Ok(self
            .user_entries(user_id, |entry| entry.created_at >= since)
            .await)
    }

    async fn find_entries_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>, StoreError> {
        Ok(self
            .user_entries(user_id, |entry| {
                start <= entry.created_at && entry.created_at < end
            })
            .await)
    }

    async fn group_count_by_mood(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodCount>, StoreError> {
        let data = self.data.lock().await;
        let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
        for entry in data
            .entries
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.created_at >= since)
        {
            *counts.entry(entry.mood_id).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(mood_id, count)| MoodCount { mood_id, count })
            .collect())
    }

    async fn mood_name(&self, mood_id: i64) -> Result<Option<String>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .moods
            .iter()
            .find(|mood| mood.id == mood_id)
            .map(|mood| mood.name.clone()))
    }

    async fn list_moods(&self) -> Result<Vec<Mood>, StoreError> {
        let data = self.data.lock().await;
        let mut moods = data.moods.clone();
        moods.sort_by_key(|mood| mood.id);
        Ok(moods)
    }

    async fn history_page(
        &self,
        user_id: &str,
        limit: usize,
        page: usize,
    ) -> Result<HistoryPage, StoreError> {
        let mut entries = self.user_entries(user_id, |_| true).await;
        entries.reverse();
        let total = entries.len();
        let skip = page.saturating_sub(1).saturating_mul(limit);

        Ok(HistoryPage {
            entries: entries.into_iter().skip(skip).take(limit).collect(),
            total,
        })
    }

    async fn create_entry(
        &self,
        user_id: &str,
        mood_id: i64,
        note: Option<String>,
    ) -> Result<MoodEntry, StoreError> {
        let entry = MoodEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mood_id,
            note,
            created_at: Utc::now(),
        };

        let mut data = self.data.lock().await;
        data.entries.push(entry.clone());
        if let Err(err) = persist_data(&self.path, &data).await {
            data.entries.pop();
            return Err(err);
        }
        debug!(entry_id = %entry.id, "created mood entry");
        Ok(entry)
    }

    async fn update_entry(
        &self,
        user_id: &str,
        entry_id: &str,
        mood_id: i64,
        note: Option<String>,
    ) -> Result<Option<MoodEntry>, StoreError> {
        let mut data = self.data.lock().await;
        let Some(index) = data
            .entries
            .iter()
            .position(|entry| entry.id == entry_id && entry.user_id == user_id)
        else {
            return Ok(None);
        };

        let previous = data.entries[index].clone();
        let updated = {
            let entry = &mut data.entries[index];
            entry.mood_id = mood_id;
            entry.note = note;
            entry.clone()
        };
        if let Err(err) = persist_data(&self.path, &data).await {
            data.entries[index] = previous;
            return Err(err);
        }
        debug!(entry_id, "updated mood entry");
        Ok(Some(updated))
    }

    async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<bool, StoreError> {
        let mut data = self.data.lock().await;
        let Some(index) = data
            .entries
            .iter()
            .position(|entry| entry.id == entry_id && entry.user_id == user_id)
        else {
            return Ok(false);
        };

        let removed = data.entries.remove(index);
        if let Err(err) = persist_data(&self.path, &data).await {
            data.entries.insert(index, removed);
            return Err(err);
        }
        debug!(entry_id, "deleted mood entry");
        Ok(true)
    }

    async fn delete_user_entries(&self, user_id: &str) -> Result<usize, StoreError> {
        let mut data = self.data.lock().await;
        if !data.entries.iter().any(|entry| entry.user_id == user_id) {
            return Ok(0);
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut data.entries)
            .into_iter()
            .enumerate()
            .partition(|(_, entry)| entry.user_id == user_id);
        data.entries = kept.into_iter().map(|(_, entry)| entry).collect();
        let count = removed.len();

        if let Err(err) = persist_data(&self.path, &data).await {
            // Ascending reinsertion restores the original order.
            for (index, entry) in removed {
                data.entries.insert(index, entry);
            }
            return Err(err);
        }
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{load_data, seed_moods};
    use chrono::{Duration, TimeZone};

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("mood_journal_store_{name}_{}_{nanos}.json", std::process::id()))
    }

    pub(crate) fn entry(id: &str, user: &str, mood_id: i64, created_at: DateTime<Utc>) -> MoodEntry {
        MoodEntry {
            id: id.to_string(),
            user_id: user.to_string(),
            mood_id,
            note: None,
            created_at,
        }
    }

    pub(crate) fn store_with(name: &str, entries: Vec<MoodEntry>) -> JsonStore {
        let mut data = AppData {
            moods: Vec::new(),
            entries,
        };
        seed_moods(&mut data);
        JsonStore::new(temp_path(name), data)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn range_queries_are_user_scoped_and_half_open() {
        let store = store_with(
            "range",
            vec![
                entry("c", "alice", 1, t0() + Duration::hours(2)),
                entry("a", "alice", 1, t0()),
                entry("b", "bob", 2, t0()),
                entry("d", "alice", 3, t0() + Duration::hours(5)),
            ],
        );

        let since = store.find_entries_since("alice", t0()).await.unwrap();
        let ids: Vec<_> = since.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "d"]);

        let ranged = store
            .find_entries_in_range("alice", t0(), t0() + Duration::hours(5))
            .await
            .unwrap();
        let ids: Vec<_> = ranged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn group_count_orders_by_mood_id() {
        let store = store_with(
            "group",
            vec![
                entry("1", "alice", 3, t0()),
                entry("2", "alice", 1, t0()),
                entry("3", "alice", 3, t0() + Duration::minutes(1)),
                entry("4", "alice", 2, t0() - Duration::days(1)),
                entry("5", "bob", 1, t0()),
            ],
        );

        let counts = store.group_count_by_mood("alice", t0()).await.unwrap();
        assert_eq!(
            counts,
            vec![
                MoodCount { mood_id: 1, count: 1 },
                MoodCount { mood_id: 3, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn mood_lookup_and_listing() {
        let store = store_with("moods", Vec::new());
        assert_eq!(store.mood_name(2).await.unwrap().as_deref(), Some("Sad"));
        assert_eq!(store.mood_name(99).await.unwrap(), None);
        let moods = store.list_moods().await.unwrap();
        assert_eq!(moods.len(), 10);
        assert!(moods.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let entries = (0..5)
            .map(|i| entry(&format!("e{i}"), "alice", 1, t0() + Duration::minutes(i)))
            .collect();
        let store = store_with("pages", entries);

        let first = store.history_page("alice", 2, 1).await.unwrap();
        assert_eq!(first.total, 5);
        let ids: Vec<_> = first.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e4", "e3"]);

        let last = store.history_page("alice", 2, 3).await.unwrap();
        let ids: Vec<_> = last.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e0"]);

        let past_end = store.history_page("alice", 2, 9).await.unwrap();
        assert!(past_end.entries.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[tokio::test]
    async fn writes_are_owner_scoped_and_persisted() {
        let path = temp_path("writes");
        let mut data = AppData::default();
        seed_moods(&mut data);
        let store = JsonStore::new(path.clone(), data);

        let created = store
            .create_entry("alice", 1, Some("sunny".into()))
            .await
            .unwrap();
        assert_eq!(created.user_id, "alice");

        assert!(store
            .update_entry("bob", &created.id, 2, None)
            .await
            .unwrap()
            .is_none());
        let updated = store
            .update_entry("alice", &created.id, 2, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.mood_id, 2);
        assert_eq!(updated.note, None);
        assert_eq!(updated.created_at, created.created_at);

        let reloaded = load_data(&path).await;
        assert_eq!(reloaded.entries, vec![updated.clone()]);

        assert!(!store.delete_entry("bob", &created.id).await.unwrap());
        assert!(store.delete_entry("alice", &created.id).await.unwrap());
        assert!(!store.delete_entry("alice", &created.id).await.unwrap());
        assert!(load_data(&path).await.entries.is_empty());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn delete_user_entries_keeps_other_users() {
        let store = store_with(
            "purge",
            vec![
                entry("1", "alice", 1, t0()),
                entry("2", "bob", 1, t0()),
                entry("3", "alice", 2, t0()),
            ],
        );

        assert_eq!(store.delete_user_entries("alice").await.unwrap(), 2);
        assert_eq!(store.delete_user_entries("alice").await.unwrap(), 0);
        assert_eq!(store.history_page("bob", 10, 1).await.unwrap().total, 1);

        let _ = tokio::fs::remove_file(&store.path).await;
    }

    #[tokio::test]
    async fn failed_purge_restores_entries_in_order() {
        let mut data = AppData {
            moods: Vec::new(),
            entries: vec![
                entry("1", "alice", 1, t0()),
                entry("2", "bob", 1, t0()),
                entry("3", "alice", 2, t0() + Duration::minutes(1)),
                entry("4", "bob", 3, t0() + Duration::minutes(2)),
            ],
        };
        seed_moods(&mut data);
        let original = data.entries.clone();
        // A directory cannot be written as a file, so persisting fails.
        let store = JsonStore::new(std::env::temp_dir(), data);

        assert!(store.delete_user_entries("alice").await.is_err());
        assert_eq!(store.data.lock().await.entries, original);
        assert_eq!(store.delete_user_entries("carol").await.unwrap(), 0);
    }
}
