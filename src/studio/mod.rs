//! Studio: the persisted side of idea-to-artifact generation.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  (frame  │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! │   host)  │  polling │         │                                        │
//! └──────────┘          │         │ create / retry          fix / edit     │
//!                       │         v                         v              │
//!                       │  orchestrator.rs             revise.rs           │
//!                       │  (detached task)             (request-bound)     │
//!                       │         │                         │              │
//!                       │         └──── generator ──────────┘              │
//!                       │                   │                              │
//!                       │                   v                              │
//!                       │  db.rs  (StudioDb, DbHandle)                     │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! | Module         | Responsibility                                          |
//! |----------------|---------------------------------------------------------|
//! | `models`       | `Post`, `Artifact`, `ModelRecord`, `UserSettings`       |
//! | `db`           | SQLite access via `DbHandle` (thin `Arc<Mutex<_>>`)     |
//! | `credentials`  | Model selection and whose API key a call uses           |
//! | `orchestrator` | Pending → ready/failed state machine                    |
//! | `revise`       | AI fix, AI edit, manual save                            |
//!
//! ## Typical Request Flow
//!
//! 1. `POST /api/posts` → `GenerationOrchestrator::create` inserts a pending
//!    post, spawns the generation task and answers `202` immediately.
//! 2. The client polls `GET /api/posts/{id}` until the status is terminal.
//! 3. `GET /api/posts/{id}/preview` serves the instrumented document; the
//!    frame reports diagnostics back to the host page.
//! 4. `POST /api/posts/{id}/fix` with the digest (or raw frame messages)
//!    stores the repaired document as the next revision.

pub mod api;
pub mod credentials;
pub mod db;
pub mod models;
pub mod orchestrator;
pub mod revise;
pub mod server;

pub use db::{DbHandle, StudioDb};
pub use orchestrator::{CreateRequest, GenerationOrchestrator};
pub use revise::ArtifactReviser;
