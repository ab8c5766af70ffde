use crate::errors::StoreError;
use crate::models::{BucketRow, MoodEntry, MoodStatistics, StatSummaryRow, UNKNOWN_MOOD};
use crate::period::{bucket_index, buckets, window, Bucket, Period};
use crate::store::MoodHistoryStore;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub async fn aggregate<S>(store: &S, user_id: &str, period: Period) -> Result<MoodStatistics, StoreError>
where
    S: MoodHistoryStore + ?Sized,
{
    aggregate_at(store, user_id, period, Utc::now()).await
}

/// Summarises a user's moods over the window of `period` ending at `now`.
///
/// The summary is folded from the same entries as the buckets, so per-mood
/// bucket counts always add up to the summary count.
pub async fn aggregate_at<S>(
    store: &S,
    user_id: &str,
    period: Period,
    now: DateTime<Utc>,
) -> Result<MoodStatistics, StoreError>
where
    S: MoodHistoryStore + ?Sized,
{
    let buckets = buckets(period, now);
    let Some(span) = window(&buckets) else {
        return Ok(MoodStatistics {
            summary: Vec::new(),
            buckets: Vec::new(),
        });
    };

    let entries = store
        .find_entries_in_range(user_id, span.start, span.end)
        .await?;
    let ids: BTreeSet<i64> = entries.iter().map(|entry| entry.mood_id).collect();
    let names = mood_names(store, ids).await?;

    debug!(user_id, %period, entries = entries.len(), "aggregated mood statistics");
    Ok(fold_entries(&buckets, &entries, &names))
}

/// Single pass over `entries`, counting each one under its mood name in the
/// bucket that contains it and under its mood id in the summary. Entries
/// outside every bucket are skipped by both.
pub fn fold_entries(
    buckets: &[Bucket],
    entries: &[MoodEntry],
    names: &BTreeMap<i64, String>,
) -> MoodStatistics {
    let mut rows: Vec<BucketRow> = buckets
        .iter()
        .map(|bucket| BucketRow {
            label: bucket.label.clone(),
            counts: BTreeMap::new(),
        })
        .collect();
    let mut totals: BTreeMap<i64, u64> = BTreeMap::new();

    for entry in entries {
        let Some(index) = bucket_index(buckets, entry.created_at) else {
            continue;
        };
        *rows[index]
            .counts
            .entry(name_for(names, entry.mood_id))
            .or_default() += 1;
        *totals.entry(entry.mood_id).or_default() += 1;
    }

    let summary = totals
        .into_iter()
        .map(|(id, count)| StatSummaryRow {
            id,
            name: name_for(names, id),
            count,
        })
        .collect();

    MoodStatistics {
        summary,
        buckets: rows,
    }
}

async fn mood_names<S>(store: &S, ids: BTreeSet<i64>) -> Result<BTreeMap<i64, String>, StoreError>
where
    S: MoodHistoryStore + ?Sized,
{
    let mut names = BTreeMap::new();
    for id in ids {
        match store.mood_name(id).await? {
            Some(name) => {
                names.insert(id, name);
            }
            None => warn!(mood_id = id, "history references a missing mood"),
        }
    }
    Ok(names)
}

fn name_for(names: &BTreeMap<i64, String>, mood_id: i64) -> String {
    names
        .get(&mood_id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_MOOD.to_string())
}
