//! Wire types of the orchestration API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Identity;

/// Workflow as listed by `GET /api/workflows`
///
/// Produced by the backend; passed through to views unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `{"workflows": [...]}`; a missing or null list means no workflows
#[derive(Debug, Deserialize)]
pub struct WorkflowListResponse {
    #[serde(default)]
    pub workflows: Option<Vec<WorkflowSummary>>,
}

impl WorkflowListResponse {
    pub fn into_workflows(self) -> Vec<WorkflowSummary> {
        self.workflows.unwrap_or_default()
    }
}

/// User record as serialized by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendUser {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl From<BackendUser> for Identity {
    fn from(user: BackendUser) -> Self {
        Identity::new(user.id, user.username, user.avatar_url)
    }
}

/// `{"user": {...}}` from `GET /api/auth/user`
#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub user: BackendUser,
}

/// Backend ids are numeric; the session keeps them as opaque strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
