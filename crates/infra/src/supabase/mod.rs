//! HTTP adapters for the hosted backend (GoTrue auth + PostgREST tables).
//!
//! Enabled with the `supabase` feature. Both adapters share one [`SupabaseClient`] so
//! that profile reads carry the bearer token of the session the identity adapter
//! issued or validated.

mod identity;
mod profiles;

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, StatusCode};

use indica_auth::AccessToken;

use crate::config::BackendConfig;

pub use identity::SupabaseIdentityProvider;
pub use profiles::SupabaseProfileDirectory;

/// Shared transport: HTTP client, project config and the current bearer token.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
    bearer: Arc<RwLock<Option<AccessToken>>>,
}

impl SupabaseClient {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    pub fn with_http(http: reqwest::Client, config: BackendConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
            bearer: Arc::default(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub(crate) fn set_bearer(&self, token: Option<AccessToken>) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub(crate) fn bearer(&self) -> Option<AccessToken> {
        self.bearer.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Request with the project key. Authorized with `token`, or the anon key.
    pub(crate) fn request(&self, method: Method, url: &str, token: Option<&AccessToken>) -> RequestBuilder {
        let bearer = token.map(AccessToken::expose).unwrap_or(&self.config.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }
}

/// Identity adapter and profile adapter wired to the same client.
#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    pub identity: SupabaseIdentityProvider,
    pub profiles: SupabaseProfileDirectory,
}

impl SupabaseBackend {
    pub fn new(config: BackendConfig) -> Self {
        let client = SupabaseClient::new(config);
        Self {
            identity: SupabaseIdentityProvider::new(client.clone()),
            profiles: SupabaseProfileDirectory::new(client),
        }
    }
}

/// Best-effort error text from a failed response body.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    match detail {
        Some(detail) => format!("{} {detail}", status.as_u16()),
        None if body.trim().is_empty() => status.as_u16().to_string(),
        None => format!("{} {}", status.as_u16(), body.trim()),
    }
}
