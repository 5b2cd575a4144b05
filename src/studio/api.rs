use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::errors::StudioError;
use crate::llm::AVAILABLE_MODELS;
use crate::sandbox::instrument;

use super::db::DbHandle;
use super::models::{Artifact, PostView, UserSettings, UserSettingsView};
use super::orchestrator::{CreateRequest, GenerationOrchestrator};
use super::revise::ArtifactReviser;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub orchestrator: GenerationOrchestrator,
    pub reviser: ArtifactReviser,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub prompt: String,
    pub title: Option<String>,
    pub user_id: String,
    pub model: Option<String>,
}

/// Either a ready-made digest or the raw frame messages to build one from.
#[derive(Deserialize)]
pub struct FixRequest {
    pub errors: Option<String>,
    pub messages: Option<Vec<Value>>,
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub instruction: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
    pub html: String,
}

/// Omitted fields are left as they are; an empty string clears the field.
#[derive(Deserialize)]
pub struct UpdateSettingsRequest {
    pub openrouter_api_key: Option<String>,
    pub selected_model: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => {
                error!("Internal API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StudioError> for ApiError {
    fn from(err: StudioError) -> Self {
        let msg = err.to_string();
        match err {
            StudioError::PostNotFound { .. } | StudioError::ArtifactNotFound { .. } => {
                ApiError::NotFound(msg)
            }
            StudioError::BadRequest(_) | StudioError::InvalidState { .. } => {
                ApiError::BadRequest(msg)
            }
            StudioError::Expansion(_) | StudioError::Generation(_) => ApiError::BadGateway(msg),
            StudioError::Database(e) | StudioError::Other(e) => ApiError::Internal(format!("{:#}", e)),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/models", get(list_models))
        .route("/api/posts", post(create_post))
        .route("/api/posts/{id}", get(get_post))
        .route("/api/posts/{id}/retry", post(retry_post))
        .route("/api/posts/{id}/artifact", get(get_artifact))
        .route("/api/posts/{id}/preview", get(preview_artifact))
        .route("/api/posts/{id}/fix", post(fix_artifact))
        .route("/api/posts/{id}/edit", post(edit_artifact))
        .route("/api/posts/{id}/save", post(save_artifact))
        .route("/api/instrument", post(instrument_html))
        .route(
            "/api/users/{id}/settings",
            get(get_settings).put(update_settings),
        )
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_models() -> impl IntoResponse {
    Json(AVAILABLE_MODELS)
}

async fn create_post(
    State(state): State<SharedState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .orchestrator
        .create(CreateRequest {
            prompt: req.prompt,
            title: req.title,
            user_id: req.user_id,
            model: req.model,
        })
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"post": post, "status": "pending"})),
    ))
}

async fn get_post(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .db
        .call(move |db| db.get_post(id))
        .await
        .map_err(StudioError::Database)?
        .ok_or(StudioError::PostNotFound { id })?;
    Ok(Json(PostView::from(post)))
}

async fn retry_post(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.orchestrator.retry(id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({"post": post, "status": "pending"})),
    ))
}

async fn load_artifact(
    state: &SharedState,
    post_id: i64,
) -> Result<Artifact, ApiError> {
    let artifact = state
        .db
        .call(move |db| db.get_artifact(post_id))
        .await
        .map_err(StudioError::Database)?
        .ok_or(StudioError::ArtifactNotFound { post_id })?;
    Ok(artifact)
}

async fn get_artifact(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_artifact(&state, id).await?))
}

async fn preview_artifact(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let artifact = load_artifact(&state, id).await?;
    Ok(Html(instrument(&artifact.html_content)))
}

async fn instrument_html(body: String) -> impl IntoResponse {
    Html(instrument(&body))
}

async fn fix_artifact(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<FixRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let revision = match (req.errors, req.messages) {
        (Some(errors), _) if !errors.trim().is_empty() => state.reviser.fix(id, &errors).await?,
        (_, Some(messages)) => state.reviser.fix_from_messages(id, &messages).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "Error description is required".to_string(),
            ));
        }
    };
    Ok(Json(revision))
}

async fn edit_artifact(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<EditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reviser.edit(id, &req.instruction).await?))
}

async fn save_artifact(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<SaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reviser.save(id, &req.html).await?))
}

async fn get_settings(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = user_id.clone();
    let settings = state
        .db
        .call(move |db| db.get_user_settings(&lookup))
        .await
        .map_err(StudioError::Database)?
        .unwrap_or(UserSettings {
            user_id,
            ..Default::default()
        });
    Ok(Json(UserSettingsView::from(settings)))
}

async fn update_settings(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .db
        .call(move |db| {
            let mut settings = db.get_user_settings(&user_id)?.unwrap_or(UserSettings {
                user_id: user_id.clone(),
                ..Default::default()
            });
            if let Some(key) = req.openrouter_api_key {
                settings.openrouter_api_key = non_blank(key);
            }
            if let Some(model) = req.selected_model {
                settings.selected_model = non_blank(model);
            }
            db.set_user_settings(&settings)?;
            Ok(settings)
        })
        .await
        .map_err(StudioError::Database)?;
    Ok(Json(UserSettingsView::from(settings)))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::generator::{ArtifactGenerator, PromptExpander};
    use crate::llm::Credential;
    use crate::llm::testing::ScriptedService;
    use crate::sandbox::instrument::{CAPTURE_MARKER, MUTE_MARKER};
    use crate::studio::db::StudioDb;
    use crate::studio::models::NewPost;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    const FREE_MODEL: &str = "x-ai/grok-4.1-fast:free";
    const PAGE: &str = "<!DOCTYPE html><html><head><title>c</title></head><body><button>0</button></body></html>";

    fn test_app(svc: Arc<ScriptedService>) -> (Router, DbHandle) {
        let db = DbHandle::new(StudioDb::new_in_memory().unwrap());
        let key = Some(Credential::new("sk-server"));
        let generator = ArtifactGenerator::new(svc.clone());
        let state = Arc::new(AppState {
            db: db.clone(),
            orchestrator: GenerationOrchestrator::new(
                db.clone(),
                PromptExpander::new(svc, FREE_MODEL),
                generator.clone(),
                key.clone(),
                FREE_MODEL,
            ),
            reviser: ArtifactReviser::new(db.clone(), generator, key, FREE_MODEL, false),
        });
        (api_router().with_state(state), db)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn seed_ready_post(db: &DbHandle) -> i64 {
        db.call(|db| {
            let post = db.create_post(&NewPost {
                user_id: "u1".into(),
                title: "counter".into(),
                prompt: "a counter button".into(),
                model_id: None,
            })?;
            db.mark_ready(post.id, PAGE, None)?;
            Ok(post.id)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&[])));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response.into_body()).await, "ok");
    }

    #[tokio::test]
    async fn test_list_models() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&[])));
        let response = app.oneshot(get("/api/models")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let models: Vec<Value> = body_json(response.into_body()).await;
        assert_eq!(models.len(), AVAILABLE_MODELS.len());
        assert_eq!(models[0]["id"], AVAILABLE_MODELS[0].id);
    }

    #[tokio::test]
    async fn test_create_post_accepted_then_ready() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&["spec", PAGE])));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/posts",
                serde_json::json!({"prompt": "a counter button", "user_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let created: Value = body_json(response.into_body()).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["post"]["status"], "pending");
        let id = created["post"]["id"].as_i64().unwrap();

        let mut view = Value::Null;
        for _ in 0..200 {
            let response = app.clone().oneshot(get(&format!("/api/posts/{}", id))).await.unwrap();
            view = body_json(response.into_body()).await;
            if view["status"] != "pending" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(view["status"], "ready");
        assert!(view["failure"].is_null());

        let response = app
            .clone()
            .oneshot(get(&format!("/api/posts/{}/artifact", id)))
            .await
            .unwrap();
        let artifact: Value = body_json(response.into_body()).await;
        assert_eq!(artifact["html_content"], PAGE);
        assert_eq!(artifact["revision_count"], 0);

        let response = app
            .oneshot(get(&format!("/api/posts/{}/preview", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response.into_body()).await;
        assert_eq!(html.matches(CAPTURE_MARKER).count(), 1);
        assert_eq!(html.matches(MUTE_MARKER).count(), 1);
    }

    #[tokio::test]
    async fn test_create_post_blank_prompt_is_bad_request() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&[])));
        let response = app
            .oneshot(post_json(
                "/api/posts",
                serde_json::json!({"prompt": "  ", "user_id": "u1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("Prompt is required"));
    }

    #[tokio::test]
    async fn test_unknown_post_and_missing_artifact() {
        let (app, db) = test_app(Arc::new(ScriptedService::replying(&[])));
        let response = app.clone().oneshot(get("/api/posts/999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let pending = db
            .call(|db| {
                db.create_post(&NewPost {
                    user_id: "u1".into(),
                    title: "t".into(),
                    prompt: "p".into(),
                    model_id: None,
                })
            })
            .await
            .unwrap();
        let response = app
            .oneshot(get(&format!("/api/posts/{}/artifact", pending.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_retry_requires_failed_post() {
        let (app, db) = test_app(Arc::new(ScriptedService::replying(&[])));
        let id = seed_ready_post(&db).await;
        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/posts/{}/retry", id), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json("/api/posts/999/retry", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_instrument_endpoint() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&[])));
        let request = Request::builder()
            .method("POST")
            .uri("/api/instrument")
            .body(Body::from("<p>hello</p>"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let html = body_text(response.into_body()).await;
        assert!(html.contains("<p>hello</p>"));
        assert!(html.contains(CAPTURE_MARKER));
        assert!(html.contains(MUTE_MARKER));
    }

    #[tokio::test]
    async fn test_edit_and_save_revisions() {
        let red = "<!DOCTYPE html><html><body><button style=\"color:red\">0</button></body></html>";
        let (app, db) = test_app(Arc::new(ScriptedService::replying(&[red])));
        let id = seed_ready_post(&db).await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/posts/{}/edit", id),
                serde_json::json!({"instruction": "make the button red"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let revision: Value = body_json(response.into_body()).await;
        assert_eq!(revision["html_content"], red);
        assert_eq!(revision["revision_count"], 1);

        let response = app
            .oneshot(post_json(
                &format!("/api/posts/{}/save", id),
                serde_json::json!({"html": "<html>manual</html>"}),
            ))
            .await
            .unwrap();
        let revision: Value = body_json(response.into_body()).await;
        assert_eq!(revision["revision_count"], 2);
    }

    #[tokio::test]
    async fn test_fix_without_errors_is_bad_request() {
        let svc = Arc::new(ScriptedService::replying(&[PAGE]));
        let (app, db) = test_app(svc.clone());
        let id = seed_ready_post(&db).await;

        for body in [serde_json::json!({}), serde_json::json!({"errors": " "}), serde_json::json!({"messages": []})] {
            let response = app
                .clone()
                .oneshot(post_json(&format!("/api/posts/{}/fix", id), body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(svc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fix_generation_failure_is_bad_gateway() {
        let svc = Arc::new(ScriptedService::new(vec![Err(LlmError::EmptyResponse)]));
        let (app, db) = test_app(svc);
        let id = seed_ready_post(&db).await;

        let response = app
            .oneshot(post_json(
                &format!("/api/posts/{}/fix", id),
                serde_json::json!({"errors": "TypeError: x is undefined"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let artifact = db.call(move |db| db.get_artifact(id)).await.unwrap().unwrap();
        assert_eq!(artifact.revision_count, 0);
    }

    #[tokio::test]
    async fn test_settings_round_trip_hides_key() {
        let (app, _) = test_app(Arc::new(ScriptedService::replying(&[])));

        let response = app.clone().oneshot(get("/api/users/u1/settings")).await.unwrap();
        let view: Value = body_json(response.into_body()).await;
        assert_eq!(view["has_api_key"], false);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/users/u1/settings")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"openrouter_api_key": "sk-or-secret", "selected_model": "openai/gpt-5.1"})
                    .to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response.into_body()).await;
        assert!(!text.contains("sk-or-secret"));

        let response = app.oneshot(get("/api/users/u1/settings")).await.unwrap();
        let view: Value = body_json(response.into_body()).await;
        assert_eq!(view["has_api_key"], true);
        assert_eq!(view["selected_model"], "openai/gpt-5.1");
    }
}
