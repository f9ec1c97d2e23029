//! Wallabag API client implementation
//!
//! Implements the `EntryService` trait against the wallabag v2 REST API.

use async_trait::async_trait;
use bridge_traits::catalog::{EntriesPage, EntryService, ExportFormat, RemoteEntry, ServerInfo};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use chrono::DateTime;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, WallabagError};
use crate::types::{EntriesResponse, InfoResponse, TokenResponse, WallabagEntry};

/// Connection settings for one wallabag server account.
#[derive(Debug, Clone)]
pub struct WallabagConfig {
    /// Base server URL, e.g. `https://app.wallabag.it`
    pub server_url: String,
    /// OAuth client id created in the wallabag API client settings
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

/// Wallabag API client
///
/// Implements `EntryService` for wallabag v2.
///
/// Authentication uses the resource-owner password grant and a fresh
/// token is acquired before every API call. Syncs are infrequent enough
/// that the extra round trip is cheaper than token lifetime bookkeeping.
/// Nothing is retried here; a failed call fails the operation and the
/// next scheduled pass is the retry mechanism.
pub struct WallabagClient {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    config: WallabagConfig,
}

impl WallabagClient {
    /// Create a new wallabag client
    pub fn new(http_client: Arc<dyn HttpClient>, mut config: WallabagConfig) -> Self {
        while config.server_url.ends_with('/') {
            config.server_url.pop();
        }
        Self {
            http_client,
            config,
        }
    }

    /// Base server URL without a trailing slash.
    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.server_url, path)
    }

    /// Parse a wallabag timestamp to Unix seconds.
    ///
    /// Wallabag emits ISO 8601 with a colonless zone offset
    /// (`2024-01-01T00:00:00+0200`); newer releases use RFC 3339.
    fn parse_timestamp(raw: &str) -> Option<i64> {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
            .map(|dt| dt.timestamp())
    }

    /// Convert a wire entry to the engine's `RemoteEntry`
    fn convert_entry(entry: WallabagEntry) -> RemoteEntry {
        let authors = entry
            .published_by
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        RemoteEntry {
            id: entry.id,
            title: entry.title.unwrap_or_default(),
            url: entry.url.unwrap_or_default(),
            created_at: entry.created_at.as_deref().and_then(Self::parse_timestamp),
            updated_at: entry.updated_at.as_deref().and_then(Self::parse_timestamp),
            domain_name: entry.domain_name,
            content: entry.content,
            authors,
            tags: entry.tags.into_iter().map(|t| t.label).collect(),
            is_starred: entry.is_starred,
            is_archived: entry.is_archived,
        }
    }

    /// Obtain a fresh access token via the password grant.
    ///
    /// Bad credentials and an unreachable token endpoint both surface as
    /// `AuthenticationFailed`; callers treat either as fatal to the pass.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<String> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let request = HttpRequest::new(HttpMethod::Post, self.endpoint("/oauth/v2/token"))
            .form(&params)
            .map_err(|e| WallabagError::AuthenticationFailed(e.to_string()))?;

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| WallabagError::AuthenticationFailed(e.to_string()))?;

        if !response.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = response.status, "Token request rejected");
            return Err(WallabagError::AuthenticationFailed(format!(
                "Token endpoint returned {}: {}",
                response.status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| WallabagError::ParseError(e.to_string()))?;

        debug!(expires_in = token.expires_in, "Obtained access token");
        Ok(token.access_token)
    }

    /// Authenticate, then execute a bearer-authenticated GET.
    ///
    /// Non-success statuses become `ApiError` with the status and body
    /// preserved.
    async fn get_authed(&self, url: String) -> Result<HttpResponse> {
        let token = self.authenticate().await?;

        let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(token);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| WallabagError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            return Err(WallabagError::ApiError {
                status_code: response.status,
                message: response.text().unwrap_or_default(),
            });
        }

        Ok(response)
    }

    async fn list_page_inner(
        &self,
        since: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> Result<EntriesPage> {
        let mut url = format!(
            "{}?page={}&perPage={}&sort=updated&order=desc&detail=full",
            self.endpoint("/api/entries"),
            page,
            per_page
        );
        if let Some(since) = since {
            url.push_str(&format!("&since={}", since));
        }

        let response = self.get_authed(url).await?;

        let listing: EntriesResponse = response
            .json()
            .map_err(|e| WallabagError::ParseError(e.to_string()))?;

        debug!(
            page = listing.page,
            pages = listing.pages,
            total = listing.total,
            "Listed entries page"
        );

        Ok(EntriesPage {
            items: listing
                .embedded
                .items
                .into_iter()
                .map(Self::convert_entry)
                .collect(),
            page: listing.page,
            pages: listing.pages,
            total: listing.total,
        })
    }

    async fn fetch_entry_inner(&self, id: u64) -> Result<RemoteEntry> {
        let response = self
            .get_authed(self.endpoint(&format!("/api/entries/{}", id)))
            .await?;

        let entry: WallabagEntry = response
            .json()
            .map_err(|e| WallabagError::ParseError(e.to_string()))?;

        Ok(Self::convert_entry(entry))
    }

    async fn fetch_export_inner(&self, id: u64, format: ExportFormat) -> Result<Bytes> {
        let response = self
            .get_authed(self.endpoint(&format!("/api/entries/{}/export.{}", id, format)))
            .await?;

        info!(id, %format, bytes = response.body.len(), "Downloaded export");
        Ok(response.body)
    }

    async fn server_info_inner(&self) -> Result<ServerInfo> {
        let response = self.get_authed(self.endpoint("/api/info")).await?;

        let info: InfoResponse = response
            .json()
            .map_err(|e| WallabagError::ParseError(e.to_string()))?;

        Ok(ServerInfo {
            appname: info.appname,
            version: info.version,
            allowed_registration: info.allowed_registration,
        })
    }
}

#[async_trait]
impl EntryService for WallabagClient {
    #[instrument(skip(self))]
    async fn list_entries_page(
        &self,
        since: Option<i64>,
        page: u32,
        per_page: u32,
    ) -> bridge_traits::error::Result<EntriesPage> {
        self.list_page_inner(since, page, per_page)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn fetch_entry(&self, id: u64) -> bridge_traits::error::Result<RemoteEntry> {
        self.fetch_entry_inner(id).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn fetch_export(
        &self,
        id: u64,
        format: ExportFormat,
    ) -> bridge_traits::error::Result<Bytes> {
        self.fetch_export_inner(id, format).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn server_info(&self) -> bridge_traits::error::Result<ServerInfo> {
        self.server_info_inner().await.map_err(Into::into)
    }
}
