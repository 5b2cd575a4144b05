//! Drives a post from idea to artifact on a detached task.
//!
//! `create` persists a pending post and returns at once. The spawned task runs
//! expand → generate → persist and performs exactly one terminal write:
//! `ready` (artifact and status in one transaction) or `failed` with the
//! error text. Handles are tracked so shutdown can abort them and record the
//! cancellation; posts a dead process left pending are failed at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vibecode_common::truncate_chars;

use crate::errors::StudioError;
use crate::generator::{ArtifactGenerator, PromptExpander};
use crate::llm::{Credential, catalog};

use super::credentials::{creation_credential, resolve_model};
use super::db::DbHandle;
use super::models::{ModelRecord, NewPost, Post, PostStatus};

const TITLE_LIMIT: usize = 120;
const DERIVED_TITLE_LIMIT: usize = 90;
const STORED_ERROR_LIMIT: usize = 500;

pub const SHUTDOWN_MESSAGE: &str = "Generation cancelled: server shutting down";
pub const RESTART_MESSAGE: &str = "Generation cancelled: server restarted before completion";

/// A request to generate a new post.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub prompt: String,
    pub title: Option<String>,
    pub user_id: String,
    pub model: Option<String>,
}

/// A validated request, ready to persist and spawn.
struct Launch {
    user_id: String,
    title: String,
    prompt: String,
    model: String,
    credential: Credential,
}

#[derive(Clone)]
pub struct GenerationOrchestrator {
    db: DbHandle,
    expander: PromptExpander,
    generator: ArtifactGenerator,
    server_key: Option<Credential>,
    default_model: String,
    /// Detached generation tasks by post id.
    running: Arc<tokio::sync::Mutex<HashMap<i64, JoinHandle<()>>>>,
}

impl GenerationOrchestrator {
    pub fn new(
        db: DbHandle,
        expander: PromptExpander,
        generator: ArtifactGenerator,
        server_key: Option<Credential>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            db,
            expander,
            generator,
            server_key,
            default_model: default_model.into(),
            running: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Persist a pending post and start generating it in the background.
    /// Never waits for the model.
    pub async fn create(&self, req: CreateRequest) -> Result<Post, StudioError> {
        let launch = self.prepare(req).await?;
        self.launch(launch).await
    }

    /// Replace a failed post with a fresh attempt at the same idea.
    ///
    /// Deleting the failed post is the claim: when two retries race, only the
    /// one whose delete removed the row goes on to generate.
    pub async fn retry(&self, post_id: i64) -> Result<Post, StudioError> {
        let old = self
            .db
            .call(move |db| db.get_post(post_id))
            .await
            .map_err(StudioError::Database)?
            .ok_or(StudioError::PostNotFound { id: post_id })?;
        if old.status != PostStatus::Failed {
            return Err(StudioError::InvalidState {
                id: post_id,
                status: old.status.to_string(),
                expected: "failed",
            });
        }

        // Credential problems reject the retry while the failed post still exists.
        let launch = self
            .prepare(CreateRequest {
                prompt: old.prompt,
                title: Some(old.title),
                user_id: old.user_id,
                model: old.model_id,
            })
            .await?;

        let deleted = self
            .db
            .call(move |db| db.delete_post(post_id))
            .await
            .map_err(StudioError::Database)?;
        if !deleted {
            return Err(StudioError::PostNotFound { id: post_id });
        }

        let post = self.launch(launch).await?;
        info!(post_id, new_post_id = post.id, "Failed post retried");
        Ok(post)
    }

    /// Fail posts a previous process left pending. Returns how many.
    pub async fn recover_stale(&self) -> Result<usize, StudioError> {
        let count = self
            .db
            .call(|db| db.fail_all_pending(RESTART_MESSAGE))
            .await
            .map_err(StudioError::Database)?;
        if count > 0 {
            warn!(count, "Marked stale pending posts as failed");
        }
        Ok(count)
    }

    /// Abort in-flight generations and record them as cancelled.
    pub async fn shutdown(&self) {
        let handles: Vec<(i64, JoinHandle<()>)> = self.running.lock().await.drain().collect();
        for (post_id, handle) in handles {
            info!(post_id, "Cancelling generation");
            handle.abort();
            if let Err(e) = self
                .db
                .call(move |db| db.mark_failed(post_id, SHUTDOWN_MESSAGE))
                .await
            {
                error!(post_id, "Failed to record cancellation: {:#}", e);
            }
        }
    }

    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Validate the request and settle the model and credential. Writes nothing.
    async fn prepare(&self, req: CreateRequest) -> Result<Launch, StudioError> {
        let prompt = req.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(StudioError::BadRequest("Prompt is required".to_string()));
        }

        let user_id = req.user_id.clone();
        let settings = self
            .db
            .call(move |db| db.get_user_settings(&user_id))
            .await
            .map_err(StudioError::Database)?;
        let model = resolve_model(req.model.as_deref(), settings.as_ref(), &self.default_model);
        let credential = creation_credential(&model, settings.as_ref(), self.server_key.as_ref())?;

        Ok(Launch {
            title: build_title(req.title.as_deref(), &prompt),
            user_id: req.user_id,
            prompt,
            model,
            credential,
        })
    }

    async fn launch(&self, launch: Launch) -> Result<Post, StudioError> {
        let Launch {
            user_id,
            title,
            prompt,
            model,
            credential,
        } = launch;

        let model_id = self.register_model(&model).await;
        let new_post = NewPost {
            user_id,
            title,
            prompt: prompt.clone(),
            model_id,
        };
        let post = self
            .db
            .call(move |db| db.create_post(&new_post))
            .await
            .map_err(StudioError::Database)?;
        info!(post_id = post.id, model = %model, "Post created, generation started");

        self.spawn_generation(post.id, prompt, model, credential).await;
        Ok(post)
    }

    /// Upsert the model row and read it back. A failure only costs the post
    /// its model reference.
    async fn register_model(&self, model: &str) -> Option<String> {
        let record = ModelRecord {
            id: model.to_string(),
            name: catalog::display_name(model),
            provider: catalog::provider_of(model),
            description: catalog::description_of(model).map(String::from),
            is_free: catalog::is_free(model),
        };
        let result = self
            .db
            .call(move |db| {
                db.upsert_model(&record)?;
                db.get_model(&record.id)
            })
            .await;
        match result {
            Ok(Some(m)) => Some(m.id),
            Ok(None) => {
                warn!(model = %model, "Model missing after upsert, creating post without it");
                None
            }
            Err(e) => {
                warn!(model = %model, "Model registration failed: {:#}", e);
                None
            }
        }
    }

    async fn spawn_generation(&self, post_id: i64, prompt: String, model: String, credential: Credential) {
        let db = self.db.clone();
        let expander = self.expander.clone();
        let generator = self.generator.clone();
        let running = Arc::clone(&self.running);

        // Hold the lock across spawn so the task can't deregister before it is registered.
        let mut map = self.running.lock().await;
        let handle = tokio::spawn(async move {
            run_generation(&db, &expander, &generator, post_id, &prompt, &model, &credential).await;
            running.lock().await.remove(&post_id);
        });
        map.insert(post_id, handle);
    }
}

async fn run_generation(
    db: &DbHandle,
    expander: &PromptExpander,
    generator: &ArtifactGenerator,
    post_id: i64,
    prompt: &str,
    model: &str,
    credential: &Credential,
) {
    let started = Instant::now();
    let outcome: Result<bool, StudioError> = async {
        let spec = expander.expand(prompt, credential).await?;
        let html = generator.generate(&spec, credential, model, None).await?;
        db.call(move |db| db.mark_ready(post_id, &html, Some(&spec)))
            .await
            .map_err(StudioError::Database)
    }
    .await;

    match outcome {
        Ok(true) => info!(
            post_id,
            elapsed_secs = started.elapsed().as_secs(),
            "Post ready"
        ),
        Ok(false) => warn!(post_id, "Post no longer pending, discarding generated artifact"),
        Err(e) => {
            let message = failure_message(&e);
            warn!(
                post_id,
                elapsed_secs = started.elapsed().as_secs(),
                "Generation failed: {}",
                message
            );
            let stored = message.clone();
            if let Err(e) = db.call(move |db| db.mark_failed(post_id, &stored)).await {
                error!(post_id, "Failed to mark post as failed: {:#}", e);
            }
        }
    }
}

/// Text stored as the post's generation error.
pub fn failure_message(err: &StudioError) -> String {
    let raw = err.to_string();
    let lower = raw.to_lowercase();
    let message = if (lower.contains("abort") || lower.contains("cancel"))
        && !raw.starts_with("Generation cancelled")
    {
        format!("Generation cancelled: {}", raw)
    } else {
        raw
    };
    truncate_chars(&message, STORED_ERROR_LIMIT)
}

/// Explicit title if given, else the idea with whitespace collapsed.
pub fn build_title(title: Option<&str>, prompt: &str) -> String {
    if let Some(t) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return truncate_chars(t, TITLE_LIMIT);
    }
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > DERIVED_TITLE_LIMIT {
        format!("{}…", truncate_chars(&collapsed, DERIVED_TITLE_LIMIT))
    } else {
        collapsed
    }
}
