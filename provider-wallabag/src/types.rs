//! Wallabag API response types
//!
//! Data structures for deserializing wallabag v2 REST API responses.

use serde::{Deserialize, Deserializer, Serialize};

/// OAuth token endpoint response (`POST /oauth/v2/token`)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub token_type: String,
}

/// Server identity response (`GET /api/info`)
#[derive(Debug, Clone, Deserialize)]
pub struct InfoResponse {
    pub appname: String,
    pub version: String,
    #[serde(default)]
    pub allowed_registration: bool,
}

/// One tag attached to an entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallabagTag {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Wallabag accepts and returns 0/1 for flags; some deployments emit
/// real booleans. Accept both.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Int(i) => i != 0,
        Flag::Bool(b) => b,
    })
}

/// One entry resource as returned by `/api/entries`
#[derive(Debug, Clone, Deserialize)]
pub struct WallabagEntry {
    pub id: u64,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// ISO 8601, e.g. `2024-01-01T00:00:00+0200`
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub domain_name: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    /// Author names; wallabag emits `null` for unknown authors
    #[serde(default)]
    pub published_by: Option<Vec<Option<String>>>,

    #[serde(default)]
    pub tags: Vec<WallabagTag>,

    #[serde(default, deserialize_with = "flag")]
    pub is_starred: bool,

    #[serde(default, deserialize_with = "flag")]
    pub is_archived: bool,
}

/// Embedded items wrapper used by the listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub items: Vec<WallabagEntry>,
}

/// Paginated listing response (`GET /api/entries`)
#[derive(Debug, Clone, Deserialize)]
pub struct EntriesResponse {
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
    pub total: usize,
    #[serde(rename = "_embedded")]
    pub embedded: Embedded,
}
