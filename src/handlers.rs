use crate::auth::CurrentUser;
use crate::errors::{AppError, StoreError};
use crate::extract::{JsonBody, QueryParams};
use crate::models::{
    ApiResponse, DeletedCount, EntryRequest, EntryView, HistoryQuery, Mood, MoodEntry, Pagination,
    StatisticsData, StatisticsQuery, UNKNOWN_MOOD,
};
use crate::period::Period;
use crate::state::AppState;
use crate::stats::aggregate;
use crate::store::MoodHistoryStore;
use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::HashMap;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;
const MAX_NOTE_CHARS: usize = 25_000;

pub async fn index() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Welcome to the mood journal API"))
}

pub async fn list_moods(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Mood>>>, AppError> {
    let moods = state
        .store
        .list_moods()
        .await
        .map_err(|err| AppError::internal(err, "Failed to fetch moods"))?;
    Ok(Json(ApiResponse::data(moods)))
}

pub async fn list_history(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<EntryView>>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let failed = |err: StoreError| AppError::internal(err, "Failed to fetch mood history");
    let history = state
        .store
        .history_page(&user.id, limit, page)
        .await
        .map_err(failed)?;
    let moods = state.store.list_moods().await.map_err(failed)?;

    let names: HashMap<i64, String> = moods.into_iter().map(|mood| (mood.id, mood.name)).collect();
    let entries = history
        .entries
        .into_iter()
        .map(|entry| {
            let name = names.get(&entry.mood_id).cloned();
            to_view(entry, name)
        })
        .collect();

    let pagination = Pagination {
        total: history.total,
        page,
        limit,
        total_pages: history.total.div_ceil(limit),
    };
    Ok(Json(ApiResponse::data(entries).with_pagination(pagination)))
}

pub async fn create_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<EntryRequest>,
) -> Result<Json<ApiResponse<EntryView>>, AppError> {
    let store = state.store.as_ref();
    let (mood_name, note) = validate_entry(store, payload.mood_id, payload.note).await?;

    let entry = store
        .create_entry(&user.id, payload.mood_id, note)
        .await
        .map_err(|err| AppError::internal(err, "Failed to create mood entry"))?;

    Ok(Json(
        ApiResponse::data(to_view(entry, Some(mood_name)))
            .with_message("Mood entry created successfully"),
    ))
}

pub async fn update_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<EntryRequest>,
) -> Result<Json<ApiResponse<EntryView>>, AppError> {
    let store = state.store.as_ref();
    let (mood_name, note) = validate_entry(store, payload.mood_id, payload.note).await?;

    let entry = store
        .update_entry(&user.id, &id, payload.mood_id, note)
        .await
        .map_err(|err| AppError::internal(err, "Failed to update mood entry"))?
        .ok_or_else(|| AppError::not_found("Mood entry not found"))?;

    Ok(Json(
        ApiResponse::data(to_view(entry, Some(mood_name)))
            .with_message("Mood entry updated successfully"),
    ))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let deleted = state
        .store
        .delete_entry(&user.id, &id)
        .await
        .map_err(|err| AppError::internal(err, "Failed to delete mood entry"))?;

    if !deleted {
        return Err(AppError::not_found(
            "Mood entry not found or you don't have permission to delete it",
        ));
    }
    Ok(Json(ApiResponse::message("Mood entry deleted successfully")))
}

pub async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<DeletedCount>>, AppError> {
    let deleted = state
        .store
        .delete_user_entries(&user.id)
        .await
        .map_err(|err| AppError::internal(err, "Failed to delete account"))?;

    tracing::info!(user_id = %user.id, deleted, "deleted account history");
    Ok(Json(
        ApiResponse::data(DeletedCount { deleted }).with_message("Account data deleted successfully"),
    ))
}

pub async fn get_statistics(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<StatisticsQuery>,
) -> Result<Json<ApiResponse<StatisticsData>>, AppError> {
    let period = Period::from_query(query.period.as_deref());
    let stats = aggregate(state.store.as_ref(), &user.id, period)
        .await
        .map_err(|err| AppError::internal(err, "Failed to fetch mood statistics"))?;

    Ok(Json(ApiResponse::data(StatisticsData {
        summary: stats.summary,
        aggregated: stats.buckets,
        period,
    })))
}

/// Checks an entry payload, returning the mood's name and the note to store.
async fn validate_entry(
    store: &dyn MoodHistoryStore,
    mood_id: i64,
    note: Option<String>,
) -> Result<(String, Option<String>), AppError> {
    if mood_id <= 0 {
        return Err(AppError::bad_request("moodId must be a positive integer"));
    }
    if note.as_ref().is_some_and(|note| note.chars().count() > MAX_NOTE_CHARS) {
        return Err(AppError::bad_request(format!(
            "note must be at most {MAX_NOTE_CHARS} characters"
        )));
    }

    let mood_name = store
        .mood_name(mood_id)
        .await
        .map_err(|err| AppError::internal(err, "Failed to look up mood"))?
        .ok_or_else(|| AppError::bad_request(format!("Unknown mood id {mood_id}")))?;

    let note = note.filter(|note| !note.trim().is_empty());
    Ok((mood_name, note))
}

fn to_view(entry: MoodEntry, mood_name: Option<String>) -> EntryView {
    EntryView {
        mood: Mood {
            id: entry.mood_id,
            name: mood_name.unwrap_or_else(|| UNKNOWN_MOOD.to_string()),
        },
        id: entry.id,
        user_id: entry.user_id,
        mood_id: entry.mood_id,
        note: entry.note,
        created_at: entry.created_at,
    }
}
