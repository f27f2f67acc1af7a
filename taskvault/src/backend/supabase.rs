//! Supabase backend implementation (GoTrue auth + PostgREST tables).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use taskvault_common::{Identity, Session};

use super::{AuthApi, Credentials, Filter, Select, SignUp, TableApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging;

/// Lifetime assumed when the auth service omits both `expires_at` and `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Supabase backend.
///
/// Communicates with a hosted project: `/auth/v1` for authentication and
/// `/rest/v1` for table access.
pub struct SupabaseBackend {
    http_client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self::with_client(Client::new(), base_url, anon_key)
    }

    pub fn with_client(http_client: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    /// Builds a backend with the configured project and request timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .map_err(|e| Error::backend(e.to_string()))?;

        Ok(Self::with_client(
            http_client,
            &config.supabase.url,
            &config.supabase.anon_key,
        ))
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_str()))
    }

    /// Sends the request. Transport failures become [`Error::BackendUnreachable`],
    /// non-2xx statuses [`Error::BackendRequestFailed`] with the backend's message.
    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response> {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path = %path, "Backend request failed: {}", e);
            Error::BackendUnreachable(e.to_string())
        })?;

        logging::backend_request(&method, path, &response, start);

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::BackendRequestFailed(error_message(status, &body)))
    }

    fn rest_path(table: &str) -> String {
        format!("/rest/v1/{}", table)
    }
}

// ============================================================================
// GoTrue / PostgREST wire types
// ============================================================================

/// Token grant response from `/auth/v1/token` and `/auth/v1/signup`.
#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl From<GoTrueSession> for Session {
    fn from(s: GoTrueSession) -> Self {
        let expires_at = s.expires_at.unwrap_or_else(|| {
            Utc::now().timestamp() + s.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        });
        Session {
            access_token: s.access_token,
            refresh_token: s.refresh_token,
            expires_at,
            user: s.user,
        }
    }
}

/// `/auth/v1/signup` returns a session when auto-confirm is on, the bare
/// user when confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(GoTrueSession),
    User(Identity),
}

#[derive(Debug, serde::Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Pick the human-readable message out of a GoTrue or PostgREST error body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(Value::String(message)) = obj.get(key) {
                if !message.is_empty() {
                    return message.clone();
                }
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with status {}", status)
    } else {
        body.to_string()
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
        .collect()
}

fn select_params(query: &Select) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.columns.clone())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

// ============================================================================
// AuthApi implementation
// ============================================================================

#[async_trait]
impl AuthApi for SupabaseBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUp> {
        let path = "/auth/v1/signup";
        let request = self.request(Method::POST, path, None).json(credentials);
        let response = self.send(Method::POST, path, request).await?;

        let sign_up = match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => {
                let session: Session = session.into();
                SignUp {
                    user: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUp {
                user,
                session: None,
            },
        };

        tracing::info!(
            user_id = %sign_up.user.id,
            confirmed = sign_up.session.is_some(),
            "Account created"
        );
        Ok(sign_up)
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let path = "/auth/v1/token";
        let request = self
            .request(Method::POST, path, None)
            .query(&[("grant_type", "password")])
            .json(credentials);
        let response = self.send(Method::POST, path, request).await?;

        let session: GoTrueSession = response.json().await?;
        Ok(session.into())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let path = "/auth/v1/token";
        let request = self
            .request(Method::POST, path, None)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token });
        let response = self.send(Method::POST, path, request).await?;

        let session: GoTrueSession = response.json().await?;
        Ok(session.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity> {
        let path = "/auth/v1/user";
        let request = self.request(Method::GET, path, Some(access_token));
        let response = self.send(Method::GET, path, request).await?;

        Ok(response.json().await?)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let path = "/auth/v1/logout";
        let request = self.request(Method::POST, path, Some(access_token));
        self.send(Method::POST, path, request).await?;
        Ok(())
    }
}

// ============================================================================
// TableApi implementation
// ============================================================================

#[async_trait]
impl TableApi for SupabaseBackend {
    async fn select(&self, access_token: &str, query: &Select) -> Result<Vec<Value>> {
        let path = Self::rest_path(&query.table);
        let request = self
            .request(Method::GET, &path, Some(access_token))
            .query(&select_params(query));
        let response = self.send(Method::GET, &path, request).await?;

        Ok(response.json().await?)
    }

    async fn insert(&self, access_token: &str, table: &str, row: Value) -> Result<()> {
        let path = Self::rest_path(table);
        let request = self
            .request(Method::POST, &path, Some(access_token))
            .header("Prefer", "return=minimal")
            .json(&row);
        self.send(Method::POST, &path, request).await?;
        Ok(())
    }

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        patch: Value,
        filters: &[Filter],
    ) -> Result<()> {
        let path = Self::rest_path(table);
        let request = self
            .request(Method::PATCH, &path, Some(access_token))
            .header("Prefer", "return=minimal")
            .query(&filter_params(filters))
            .json(&patch);
        self.send(Method::PATCH, &path, request).await?;
        Ok(())
    }

    async fn delete(&self, access_token: &str, table: &str, filters: &[Filter]) -> Result<()> {
        let path = Self::rest_path(table);
        let request = self
            .request(Method::DELETE, &path, Some(access_token))
            .query(&filter_params(filters));
        self.send(Method::DELETE, &path, request).await?;
        Ok(())
    }
}
