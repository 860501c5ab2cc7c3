// HTTP 接口
// 查询接口是外部 API 的薄包装；`/api/auto-anki` 走完整的自动提交流程。

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::creator::AnkiCreator;
use crate::database::DatabaseManager;
use crate::error::{AppError, LookupError, ValidationError};
use crate::models::{ImageReference, ManualSubmission, Settings, SubmissionOutcome};

/// 各 handler 共享的状态
#[derive(Clone)]
pub struct AppState {
    pub creator: Arc<AnkiCreator>,
    pub db: DatabaseManager,
}

impl AppState {
    pub fn new(creator: AnkiCreator, db: DatabaseManager) -> Self {
        Self {
            creator: Arc::new(creator),
            db,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dictionary", get(dictionary))
        .route("/api/cambridge-dictionary", get(cambridge_dictionary))
        .route("/api/translate", get(translate))
        .route("/api/unsplash", get(unsplash))
        .route("/api/auto-anki", post(auto_anki))
        .route("/api/manual-anki", post(manual_anki))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/anki/status", get(anki_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP 错误，响应体统一为 `{error, success: false}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Upstream { message: String, details: String },

    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message, "details": details }),
            ),
            ApiError::App(err) => {
                let category = err.category();
                match err {
                    AppError::Validation(v) => (
                        StatusCode::BAD_REQUEST,
                        json!({ "error": v.to_string(), "category": category }),
                    ),
                    AppError::NotFound(msg) => (
                        StatusCode::NOT_FOUND,
                        json!({ "error": msg, "category": category }),
                    ),
                    AppError::UpstreamUnavailable(msg) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": format!("Processing error: {}", msg), "category": category }),
                    ),
                    AppError::Automation(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({
                            "error": format!("AnkiConnect error: {}", e),
                            "category": category,
                            "remediation": e.remediation(),
                        }),
                    ),
                }
            }
            ApiError::Other(err) => {
                error!("内部错误: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": err.to_string() }))
            }
        };

        let mut body = body;
        body["success"] = Value::Bool(false);
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn required(value: Option<String>, name: &'static str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingParameter(name).into()),
    }
}

// 查询客户端的错误按接口换成固定的错误文案
fn lookup_error(err: LookupError, not_found: &str, failed: &str) -> ApiError {
    match err {
        LookupError::Validation(v) => v.into(),
        LookupError::NotFound(_) => ApiError::NotFound(not_found.to_string()),
        LookupError::Upstream(details) => {
            error!("{}: {}", failed, details);
            ApiError::Upstream {
                message: failed.to_string(),
                details,
            }
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "anki-pocket",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct WordQuery {
    word: Option<String>,
}

async fn dictionary(State(state): State<AppState>, Query(q): Query<WordQuery>) -> ApiResult<Json<Value>> {
    let word = required(q.word, "Word")?;
    let definitions = state
        .creator
        .lookup()
        .lookup_word(&word)
        .await
        .map_err(|e| lookup_error(e, "Word not found", "Failed to fetch word definition"))?;

    Ok(Json(json!({
        "word": word,
        "definitions": definitions,
        "success": true,
    })))
}

async fn cambridge_dictionary(
    State(state): State<AppState>,
    Query(q): Query<WordQuery>,
) -> ApiResult<Json<Value>> {
    let word = required(q.word, "Word")?;
    let definition = state
        .creator
        .lookup()
        .lookup_cambridge(&word)
        .await
        .map_err(|e| lookup_error(e, "Definition not found", "Failed to fetch definition"))?;

    Ok(Json(json!({ "word": word, "definition": definition })))
}

#[derive(Debug, Deserialize)]
pub struct TranslateQuery {
    text: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

async fn translate(State(state): State<AppState>, Query(q): Query<TranslateQuery>) -> ApiResult<Json<Value>> {
    let text = required(q.text, "Text")?;
    let from = q.from.unwrap_or_else(|| "en".to_string());
    let to = q.to.unwrap_or_else(|| "ja".to_string());

    let translated = state
        .creator
        .lookup()
        .translate(&text, &from, &to)
        .await
        .map_err(|e| lookup_error(e, "Translation not found", "Failed to translate text"))?;

    Ok(Json(json!({
        "originalText": text,
        "translatedText": translated,
        "from": from,
        "to": to,
        "success": true,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    query: Option<String>,
}

async fn unsplash(State(state): State<AppState>, Query(q): Query<ImageQuery>) -> ApiResult<Json<ImageReference>> {
    let query = required(q.query, "Query")?;
    let image = state
        .creator
        .lookup()
        .search_image(&query)
        .await
        .map_err(|e| lookup_error(e, "Image not found", "Failed to fetch image"))?;
    Ok(Json(image))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAnkiRequest {
    text: Option<String>,
    deck_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutoAnkiResponse {
    success: bool,
    #[serde(flatten)]
    outcome: SubmissionOutcome,
}

async fn auto_anki(
    State(state): State<AppState>,
    body: Result<Json<AutoAnkiRequest>, JsonRejection>,
) -> ApiResult<Json<AutoAnkiResponse>> {
    let Json(request) = body.map_err(|_| ApiError::BadRequest("Invalid request format".to_string()))?;

    let text = match request.text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(ValidationError::EmptyInput.into()),
    };
    let deck_name = match request.deck_name {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Err(ValidationError::EmptyDeckName.into()),
    };

    // 设置快照：提交过程中不再读取
    let stored = state.db.load_settings().await?;
    let settings = Settings {
        deck_name,
        dictionary_source: stored.dictionary_source,
    };

    let outcome = state.creator.process(&text, &settings).await?;
    Ok(Json(AutoAnkiResponse {
        success: true,
        outcome,
    }))
}

async fn manual_anki(
    State(state): State<AppState>,
    body: Result<Json<ManualSubmission>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(submission) = body.map_err(|_| ApiError::BadRequest("Invalid request format".to_string()))?;

    let outcome = state.creator.submit_manual(&submission).await?;
    Ok(Json(json!({
        "success": true,
        "noteId": outcome.note_id,
        "imageAdded": outcome.image_added,
    })))
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    Ok(Json(state.db.load_settings().await?))
}

async fn put_settings(
    State(state): State<AppState>,
    body: Result<Json<Settings>, JsonRejection>,
) -> ApiResult<Json<Settings>> {
    let Json(mut settings) = body.map_err(|_| ApiError::BadRequest("Invalid request format".to_string()))?;
    if settings.deck_name.trim().is_empty() {
        return Err(ValidationError::EmptyDeckName.into());
    }
    settings.deck_name = settings.deck_name.trim().to_string();

    state.db.save_settings(&settings).await?;
    Ok(Json(settings))
}

async fn anki_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let anki = state.creator.anki();
    let version = anki.version().await.map_err(AppError::from)?;
    let decks = anki.deck_names().await.map_err(AppError::from)?;

    Ok(Json(json!({
        "connected": true,
        "endpoint": anki.endpoint(),
        "version": version,
        "decks": decks,
    })))
}
