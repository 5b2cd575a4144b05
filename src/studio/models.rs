use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vibecode_common::FailureInfo;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    Ready,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid post status: {}", s)),
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    /// The raw idea as the user typed it.
    pub prompt: String,
    pub status: PostStatus,
    pub generation_error: Option<String>,
    pub model_id: Option<String>,
    pub likes_count: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields needed to insert a pending post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: String,
    pub title: String,
    pub prompt: String,
    pub model_id: Option<String>,
}

/// The generated document owned by a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub post_id: i64,
    pub html_content: String,
    /// Expanded specification the document was generated from.
    pub description: Option<String>,
    pub revision_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub description: Option<String>,
    pub is_free: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub openrouter_api_key: Option<String>,
    pub selected_model: Option<String>,
}

/// Settings as exposed over the API: the key itself is never returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettingsView {
    pub user_id: String,
    pub has_api_key: bool,
    pub selected_model: Option<String>,
}

impl From<UserSettings> for UserSettingsView {
    fn from(s: UserSettings) -> Self {
        Self {
            user_id: s.user_id,
            has_api_key: s
                .openrouter_api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty()),
            selected_model: s.selected_model,
        }
    }
}

/// A post as the client polls it, with the classified failure attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub failure: Option<FailureInfo>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let failure = (post.status == PostStatus::Failed)
            .then(|| FailureInfo::from_error(post.generation_error.as_deref()));
        Self { post, failure }
    }
}

/// Result of a fix, edit or save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub html_content: String,
    pub revision_count: i64,
}

impl From<Artifact> for Revision {
    fn from(a: Artifact) -> Self {
        Self {
            html_content: a.html_content,
            revision_count: a.revision_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibecode_common::FailureKind;

    fn post(status: PostStatus, error: Option<&str>) -> Post {
        Post {
            id: 1,
            user_id: "u1".into(),
            title: "t".into(),
            prompt: "p".into(),
            status,
            generation_error: error.map(String::from),
            model_id: None,
            likes_count: 0,
            is_published: true,
            created_at: "2026-01-01 00:00:00".into(),
            updated_at: "2026-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn test_post_status_round_trip() {
        for s in [PostStatus::Pending, PostStatus::Ready, PostStatus::Failed] {
            assert_eq!(PostStatus::from_str(s.as_str()).unwrap(), s);
        }
        assert!(PostStatus::from_str("done").is_err());
        assert!(!PostStatus::Pending.is_terminal());
        assert!(PostStatus::Failed.is_terminal());
    }

    #[test]
    fn test_post_view_failure_only_for_failed() {
        let ready: PostView = post(PostStatus::Ready, None).into();
        assert!(ready.failure.is_none());

        let failed: PostView =
            post(PostStatus::Failed, Some("Request timeout after 300s")).into();
        assert_eq!(failed.failure.unwrap().kind, FailureKind::Timeout);
    }

    #[test]
    fn test_post_view_serializes_flat() {
        let view: PostView = post(PostStatus::Pending, None).into();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["id"], 1);
        assert!(json["failure"].is_null());
    }

    #[test]
    fn test_settings_view_hides_key() {
        let view: UserSettingsView = UserSettings {
            user_id: "u".into(),
            openrouter_api_key: Some("sk-secret".into()),
            selected_model: None,
        }
        .into();
        assert!(view.has_api_key);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
