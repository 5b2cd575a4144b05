//! Request-bound revisions of a stored artifact: AI fix, AI edit, manual save.
//!
//! Each successful call replaces the content and bumps `revision_count` by one.
//! A failed model call leaves the stored artifact untouched. Concurrent
//! revisions of the same artifact are last-writer-wins.

use serde_json::Value;
use tracing::info;

use crate::errors::StudioError;
use crate::generator::ArtifactGenerator;
use crate::llm::Credential;
use crate::llm::prompts::{EDIT_SYSTEM_PROMPT, FIX_SYSTEM_PROMPT};
use crate::sandbox::DiagnosticsChannel;

use super::credentials::revision_credential;
use super::db::DbHandle;
use super::models::{Artifact, Post, Revision};

pub fn compose_fix_prompt(errors: &str, html: &str) -> String {
    format!(
        "## Errors to Fix:\n{}\n\n## Current HTML Code (with errors):\n```html\n{}\n```\n\nPlease fix all the errors listed above and return the corrected HTML code.",
        errors, html
    )
}

pub fn compose_edit_prompt(instruction: &str, html: &str) -> String {
    format!(
        "## User's Edit Request:\n{}\n\n## Current HTML Code:\n```html\n{}\n```\n\nPlease modify the HTML according to the user's request above.",
        instruction, html
    )
}

#[derive(Clone)]
pub struct ArtifactReviser {
    db: DbHandle,
    generator: ArtifactGenerator,
    server_key: Option<Credential>,
    default_model: String,
    free_mode: bool,
}

impl ArtifactReviser {
    pub fn new(
        db: DbHandle,
        generator: ArtifactGenerator,
        server_key: Option<Credential>,
        default_model: impl Into<String>,
        free_mode: bool,
    ) -> Self {
        Self {
            db,
            generator,
            server_key,
            default_model: default_model.into(),
            free_mode,
        }
    }

    /// Repair the artifact using a diagnostics digest.
    pub async fn fix(&self, post_id: i64, errors: &str) -> Result<Revision, StudioError> {
        if errors.trim().is_empty() {
            return Err(StudioError::BadRequest(
                "Error description is required".to_string(),
            ));
        }
        let errors = errors.to_string();
        self.revise(post_id, "fix", FIX_SYSTEM_PROMPT, move |html| {
            compose_fix_prompt(&errors, html)
        })
        .await
    }

    /// Repair using raw frame messages, replayed into a fresh channel to
    /// build the digest.
    pub async fn fix_from_messages(
        &self,
        post_id: i64,
        messages: &[Value],
    ) -> Result<Revision, StudioError> {
        let mut channel = DiagnosticsChannel::new();
        for message in messages {
            channel.handle_envelope(message);
        }
        self.fix(post_id, &channel.digest()).await
    }

    /// Apply a free-form instruction.
    pub async fn edit(&self, post_id: i64, instruction: &str) -> Result<Revision, StudioError> {
        if instruction.trim().is_empty() {
            return Err(StudioError::BadRequest(
                "Edit instruction is required".to_string(),
            ));
        }
        let instruction = instruction.trim().to_string();
        self.revise(post_id, "edit", EDIT_SYSTEM_PROMPT, move |html| {
            compose_edit_prompt(&instruction, html)
        })
        .await
    }

    /// Store user-supplied HTML as the next revision.
    pub async fn save(&self, post_id: i64, html: &str) -> Result<Revision, StudioError> {
        if html.trim().is_empty() {
            return Err(StudioError::BadRequest(
                "HTML content is required".to_string(),
            ));
        }
        self.load(post_id).await?;
        let revision = self.store(post_id, html.to_string()).await?;
        info!(post_id, revision = revision.revision_count, "Artifact saved");
        Ok(revision)
    }

    async fn revise(
        &self,
        post_id: i64,
        action: &'static str,
        system_prompt: &'static str,
        compose: impl FnOnce(&str) -> String,
    ) -> Result<Revision, StudioError> {
        let (post, artifact) = self.load(post_id).await?;

        let owner = post.user_id.clone();
        let settings = self
            .db
            .call(move |db| db.get_user_settings(&owner))
            .await
            .map_err(StudioError::Database)?;
        let model = post
            .model_id
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let credential = revision_credential(
            &model,
            settings.as_ref(),
            self.server_key.as_ref(),
            self.free_mode,
        )?;

        info!(post_id, model = %model, action, "Revising artifact");
        let prompt = compose(&artifact.html_content);
        let html = self
            .generator
            .generate(&prompt, &credential, &model, Some(system_prompt))
            .await?;

        let revision = self.store(post_id, html).await?;
        info!(
            post_id,
            action,
            revision = revision.revision_count,
            len = revision.html_content.len(),
            "Artifact revised"
        );
        Ok(revision)
    }

    async fn load(&self, post_id: i64) -> Result<(Post, Artifact), StudioError> {
        let (post, artifact) = self
            .db
            .call(move |db| Ok((db.get_post(post_id)?, db.get_artifact(post_id)?)))
            .await
            .map_err(StudioError::Database)?;
        let post = post.ok_or(StudioError::PostNotFound { id: post_id })?;
        let artifact = artifact.ok_or(StudioError::ArtifactNotFound { post_id })?;
        Ok((post, artifact))
    }

    async fn store(&self, post_id: i64, html: String) -> Result<Revision, StudioError> {
        self.db
            .call(move |db| db.update_artifact_content(post_id, &html))
            .await
            .map_err(StudioError::Database)?
            .map(Revision::from)
            .ok_or(StudioError::ArtifactNotFound { post_id })
    }
}
