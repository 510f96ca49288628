use crate::ai::{self, GeminiClient};
use crate::config::Config;
use crate::db::{ActivityEntry, DailyGoal, EntryId, Store, StoreError, WeeklyGoal};
use crate::journal::patch::EntryPatch;
use crate::journal::{self, DayView, SUGGESTED_CATEGORIES, dates};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub store: Store,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/entries", get(entries_list).post(entries_create))
        .route(
            "/api/v1/entries/:id",
            patch(entries_update).delete(entries_delete),
        )
        .route(
            "/api/v1/goals/daily/:date",
            get(daily_goal_get).put(daily_goal_put),
        )
        .route(
            "/api/v1/goals/weekly/:date",
            get(weekly_goal_get).put(weekly_goal_put),
        )
        .route("/api/v1/day/:date", get(day_view))
        .route("/api/v1/summary/:date", post(summary))
        .route("/api/v1/categories", get(categories))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntriesPayload {
    date: String,
    count: usize,
    entries: Vec<ActivityEntry>,
}

#[derive(Debug, Deserialize)]
struct CreateEntryPayload {
    date: Option<String>,
    start_time: String,
    end_time: String,
    description: String,
    category: Option<String>,
}

/// Editable fields of an entry. Date and creation timestamp stay fixed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateEntryPayload {
    start_time: Option<String>,
    end_time: Option<String>,
    description: Option<String>,
    category: Option<String>,
}

impl From<UpdateEntryPayload> for EntryPatch {
    fn from(value: UpdateEntryPayload) -> Self {
        Self {
            start_time: value.start_time,
            end_time: value.end_time,
            description: value.description,
            category: value.category,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoalPayload {
    goal: String,
}

#[derive(Debug, Serialize)]
struct SummaryPayload {
    date: String,
    summary: String,
}

async fn entries_list(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<EntriesPayload>> {
    let date = parse_date_arg(query.date.as_deref())?;
    let date = dates::format_date(date);
    let entries = state.store.entries_by_date(&date).await?;

    Ok(Json(EntriesPayload {
        date,
        count: entries.len(),
        entries,
    }))
}

async fn entries_create(
    State(state): State<ApiState>,
    Json(payload): Json<CreateEntryPayload>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let date = parse_date_arg(payload.date.as_deref())?;
    let entry = journal::prepare_entry(
        date,
        &payload.start_time,
        &payload.end_time,
        &payload.description,
        payload.category.as_deref(),
    )
    .map_err(|error| ApiError::BadRequest(error.to_string()))?;

    let id = state.store.add_entry(entry).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn entries_update(
    State(state): State<ApiState>,
    Path(id): Path<EntryId>,
    payload: Result<Json<UpdateEntryPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let patch = journal::prepare_patch(payload.into())
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;

    journal::apply_patch(&state.store, id, patch).await?;

    Ok(Json(json!({ "updated": true, "id": id })))
}

async fn entries_delete(
    State(state): State<ApiState>,
    Path(id): Path<EntryId>,
) -> ApiResult<StatusCode> {
    state.store.delete_entry(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn daily_goal_get(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Option<DailyGoal>>> {
    let date = dates::format_date(parse_date_arg(Some(date.as_str()))?);
    Ok(Json(state.store.daily_goal(&date).await?))
}

async fn daily_goal_put(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(payload): Json<GoalPayload>,
) -> ApiResult<Json<DailyGoal>> {
    let date = parse_date_arg(Some(date.as_str()))?;
    let goal = journal::daily_goal(date, &payload.goal);

    state.store.set_daily_goal(goal.clone()).await?;
    Ok(Json(goal))
}

async fn weekly_goal_get(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Option<WeeklyGoal>>> {
    let week_start = dates::format_date(dates::week_start(parse_date_arg(Some(date.as_str()))?));
    Ok(Json(state.store.weekly_goal(&week_start).await?))
}

async fn weekly_goal_put(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(payload): Json<GoalPayload>,
) -> ApiResult<Json<WeeklyGoal>> {
    let date = parse_date_arg(Some(date.as_str()))?;
    let goal = journal::weekly_goal(date, &payload.goal);

    state.store.set_weekly_goal(goal.clone()).await?;
    Ok(Json(goal))
}

async fn day_view(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<DayView>> {
    let date = parse_date_arg(Some(date.as_str()))?;
    Ok(Json(journal::load_day(&state.store, date).await?))
}

async fn summary(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<SummaryPayload>> {
    let date = dates::format_date(parse_date_arg(Some(date.as_str()))?);
    let entries = state.store.entries_by_date(&date).await?;

    let client = GeminiClient::from_config(&state.config);
    let summary = ai::summarize(&client, &date, &entries).await;

    Ok(Json(SummaryPayload { date, summary }))
}

async fn categories() -> Json<Value> {
    Json(json!({ "categories": SUGGESTED_CATEGORIES }))
}

fn parse_date_arg(input: Option<&str>) -> ApiResult<chrono::NaiveDate> {
    dates::parse_optional_date(input).map_err(|error| ApiError::BadRequest(error.to_string()))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(_) => Self::NotFound(value.to_string()),
            StoreError::Validation(message) => Self::BadRequest(message),
            other => Self::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => {
                error!(error = %error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": error.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    fn test_app() -> (TempDir, Store, Router) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("linearday.db"));
        let app = router(ApiState {
            config: Arc::new(Config::default()),
            store: store.clone(),
        });
        (dir, store, app)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    #[test]
    fn test_store_errors_map_to_status_codes() {
        assert_eq!(
            status_of(StoreError::NotFound(3).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(StoreError::Validation("empty".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::Poisoned.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_date_is_bad_request() {
        let error = parse_date_arg(Some("10/01/2024")).unwrap_err();
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_then_list_entries() {
        let (_dir, _store, app) = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/entries",
            Some(json!({
                "date": "2024-01-10",
                "start_time": "9:00",
                "end_time": "10:00",
                "description": "Standup"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();

        let (status, body) = send(&app, Method::GET, "/api/v1/entries?date=2024-01-10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["entries"][0]["id"], id);
        assert_eq!(body["entries"][0]["start_time"], "09:00");
        assert_eq!(body["entries"][0]["category"], "General");
    }

    #[tokio::test]
    async fn test_create_with_bad_time_range_is_bad_request() {
        let (_dir, store, app) = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/entries",
            Some(json!({
                "date": "2024-01-10",
                "start_time": "10:00",
                "end_time": "09:00",
                "description": "Backwards"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("End time"));
        assert!(store.entries_by_date("2024-01-10").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patch_missing_entry_is_not_found() {
        let (_dir, _store, app) = test_app();

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/api/v1/entries/42",
            Some(json!({ "description": "X" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_checks_merged_range_and_fixed_fields() {
        let (_dir, store, app) = test_app();
        let id = store
            .add_entry(
                journal::prepare_entry(
                    dates::parse_date("2024-01-10").unwrap(),
                    "09:00",
                    "10:00",
                    "Standup",
                    Some("Meeting"),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let uri = format!("/api/v1/entries/{id}");

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "end_time": "08:00" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "date": "2024-02-01" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "timestamp": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "end_time": "10:30" }))).await;
        assert_eq!(status, StatusCode::OK);

        let entries = store.entries_by_date("2024-01-10").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].end_time, "10:30");
        assert!(store.entries_by_date("2024-02-01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_no_content_even_when_missing() {
        let (_dir, _store, app) = test_app();

        let (status, _) = send(&app, Method::DELETE, "/api/v1/entries/7", None).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_missing_daily_goal_is_null() {
        let (_dir, _store, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/goals/daily/2024-01-10", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_weekly_goal_put_is_keyed_by_monday() {
        let (_dir, store, app) = test_app();

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/goals/weekly/2024-01-12",
            Some(json!({ "goal": "Ship v1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["week_start"], "2024-01-08");

        let stored = store.weekly_goal("2024-01-08").await.unwrap().unwrap();
        assert_eq!(stored.goal, "Ship v1");

        let (_, body) = send(&app, Method::GET, "/api/v1/goals/weekly/2024-01-14", None).await;
        assert_eq!(body["goal"], "Ship v1");
    }

    #[tokio::test]
    async fn test_day_view_and_categories() {
        let (_dir, _store, app) = test_app();

        let (status, body) = send(&app, Method::GET, "/api/v1/day/2024-01-10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["week_start"], "2024-01-08");
        assert_eq!(body["entries"], json!([]));
        assert!(body["daily_goal"].is_null());

        let (_, body) = send(&app, Method::GET, "/api/v1/categories", None).await;
        assert_eq!(body["categories"][0], "Work");

        let (status, _) = send(&app, Method::GET, "/api/v1/day/not-a-date", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
