use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;

/// Async-safe handle to the studio database.
///
/// Wraps `StudioDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<StudioDb>>,
}

impl DbHandle {
    pub fn new(db: StudioDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&StudioDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct StudioDb {
    conn: Connection,
}

impl StudioDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS models (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    provider TEXT NOT NULL,
                    description TEXT,
                    is_free INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS posts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    prompt TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    generation_error TEXT,
                    model_id TEXT REFERENCES models(id),
                    likes_count INTEGER NOT NULL DEFAULT 0,
                    is_published INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS artifacts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    post_id INTEGER NOT NULL UNIQUE REFERENCES posts(id) ON DELETE CASCADE,
                    html_content TEXT NOT NULL,
                    description TEXT,
                    revision_count INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    user_id TEXT PRIMARY KEY,
                    openrouter_api_key TEXT,
                    selected_model TEXT,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status);
                CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Posts ─────────────────────────────────────────────────────────

    pub fn create_post(&self, new: &NewPost) -> Result<Post> {
        self.conn
            .execute(
                "INSERT INTO posts (user_id, title, prompt, status, model_id) VALUES (?1, ?2, ?3, 'pending', ?4)",
                params![new.user_id, new.title, new.prompt, new.model_id],
            )
            .context("Failed to insert post")?;
        let id = self.conn.last_insert_rowid();
        self.get_post(id)?.context("Post not found after insert")
    }

    pub fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, title, prompt, status, generation_error, model_id, likes_count, is_published, created_at, updated_at
                 FROM posts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        prompt: row.get(3)?,
                        status: row.get(4)?,
                        generation_error: row.get(5)?,
                        model_id: row.get(6)?,
                        likes_count: row.get(7)?,
                        is_published: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                },
            )
            .optional()
            .context("Failed to query post")?;
        row.map(PostRow::into_post).transpose()
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])
            .context("Failed to delete post")?;
        Ok(affected > 0)
    }

    /// Insert the artifact and flip the post to `ready` in one transaction.
    ///
    /// Returns `false` (and writes nothing) if the post is no longer pending.
    pub fn mark_ready(&self, post_id: i64, html: &str, description: Option<&str>) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let updated = tx
            .execute(
                "UPDATE posts SET status = 'ready', generation_error = NULL, updated_at = datetime('now')
                 WHERE id = ?1 AND status = 'pending'",
                params![post_id],
            )
            .context("Failed to mark post ready")?;
        if updated == 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO artifacts (post_id, html_content, description) VALUES (?1, ?2, ?3)",
            params![post_id, html, description],
        )
        .context("Failed to insert artifact")?;

        tx.commit().context("Failed to commit ready transition")?;
        Ok(true)
    }

    /// Record a failure. Only a pending post is updated; returns whether it was.
    pub fn mark_failed(&self, post_id: i64, error: &str) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE posts SET status = 'failed', generation_error = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND status = 'pending'",
                params![error, post_id],
            )
            .context("Failed to mark post failed")?;
        Ok(updated > 0)
    }

    /// Fail every post still pending. Used at startup to clean up after a
    /// previous process that died mid-generation.
    pub fn fail_all_pending(&self, error: &str) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE posts SET status = 'failed', generation_error = ?1, updated_at = datetime('now')
                 WHERE status = 'pending'",
                params![error],
            )
            .context("Failed to fail pending posts")
    }

    // ── Artifacts ─────────────────────────────────────────────────────

    pub fn get_artifact(&self, post_id: i64) -> Result<Option<Artifact>> {
        self.conn
            .query_row(
                "SELECT id, post_id, html_content, description, revision_count, created_at, updated_at
                 FROM artifacts WHERE post_id = ?1",
                params![post_id],
                |row| {
                    Ok(Artifact {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        html_content: row.get(2)?,
                        description: row.get(3)?,
                        revision_count: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()
            .context("Failed to query artifact")
    }

    /// Replace the content and bump the revision counter. No version check:
    /// the last writer wins.
    pub fn update_artifact_content(&self, post_id: i64, html: &str) -> Result<Option<Artifact>> {
        let updated = self
            .conn
            .execute(
                "UPDATE artifacts SET html_content = ?1, revision_count = revision_count + 1, updated_at = datetime('now')
                 WHERE post_id = ?2",
                params![html, post_id],
            )
            .context("Failed to update artifact")?;
        if updated == 0 {
            return Ok(None);
        }
        self.get_artifact(post_id)
    }

    // ── Models ────────────────────────────────────────────────────────

    pub fn upsert_model(&self, model: &ModelRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO models (id, name, provider, description, is_free) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, provider = excluded.provider,
                     description = excluded.description, is_free = excluded.is_free",
                params![
                    model.id,
                    model.name,
                    model.provider,
                    model.description,
                    model.is_free
                ],
            )
            .context("Failed to upsert model")?;
        Ok(())
    }

    pub fn get_model(&self, id: &str) -> Result<Option<ModelRecord>> {
        self.conn
            .query_row(
                "SELECT id, name, provider, description, is_free FROM models WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ModelRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        provider: row.get(2)?,
                        description: row.get(3)?,
                        is_free: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("Failed to query model")
    }

    // ── User settings ─────────────────────────────────────────────────

    pub fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        self.conn
            .query_row(
                "SELECT user_id, openrouter_api_key, selected_model FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserSettings {
                        user_id: row.get(0)?,
                        openrouter_api_key: row.get(1)?,
                        selected_model: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query user settings")
    }

    pub fn set_user_settings(&self, settings: &UserSettings) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO user_settings (user_id, openrouter_api_key, selected_model, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(user_id) DO UPDATE SET openrouter_api_key = excluded.openrouter_api_key,
                     selected_model = excluded.selected_model, updated_at = datetime('now')",
                params![
                    settings.user_id,
                    settings.openrouter_api_key,
                    settings.selected_model
                ],
            )
            .context("Failed to upsert user settings")?;
        Ok(())
    }
}

// ── Row types ─────────────────────────────────────────────────────────

struct PostRow {
    id: i64,
    user_id: String,
    title: String,
    prompt: String,
    status: String,
    generation_error: Option<String>,
    model_id: Option<String>,
    likes_count: i64,
    is_published: bool,
    created_at: String,
    updated_at: String,
}

impl PostRow {
    fn into_post(self) -> Result<Post> {
        let status = PostStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse post status")?;
        Ok(Post {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            prompt: self.prompt,
            status,
            generation_error: self.generation_error,
            model_id: self.model_id,
            likes_count: self.likes_count,
            is_published: self.is_published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
