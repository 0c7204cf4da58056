use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::debug;

use indica_auth::{DirectoryError, ProfileDirectory, ProfileRecord};
use indica_core::{IdentityId, PixKey};

use super::{SupabaseClient, error_message};

const PROFILE_COLUMNS: &str = "id,name,role,pix_key";

/// PostgREST-backed profile directory (`profiles` table).
#[derive(Debug, Clone)]
pub struct SupabaseProfileDirectory {
    client: SupabaseClient,
}

impl SupabaseProfileDirectory {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    fn select_url(&self, id: IdentityId) -> String {
        self.client
            .config()
            .rest_url(&format!("profiles?id=eq.{id}&select={PROFILE_COLUMNS}"))
    }

    fn update_url(&self, id: IdentityId) -> String {
        self.client.config().rest_url(&format!("profiles?id=eq.{id}"))
    }
}

fn failure(status: StatusCode, body: &str) -> DirectoryError {
    if status.is_server_error() {
        DirectoryError::Network(error_message(status, body))
    } else {
        DirectoryError::Backend(error_message(status, body))
    }
}

#[async_trait]
impl ProfileDirectory for SupabaseProfileDirectory {
    async fn get_profile(&self, id: IdentityId) -> Result<Option<ProfileRecord>, DirectoryError> {
        let bearer = self.client.bearer();
        let response = self
            .client
            .request(Method::GET, &self.select_url(id), bearer.as_ref())
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        debug!(identity_id = %id, status = status.as_u16(), "profile lookup response");
        let body = response
            .text()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(failure(status, &body));
        }

        let rows: Vec<ProfileRecord> =
            serde_json::from_str(&body).map_err(|e| DirectoryError::Decode(e.to_string()))?;
        Ok(rows.into_iter().find(|row| row.id == id))
    }

    async fn update_payout_key(&self, id: IdentityId, key: &PixKey) -> Result<(), DirectoryError> {
        let bearer = self.client.bearer();
        let response = self
            .client
            .request(Method::PATCH, &self.update_url(id), bearer.as_ref())
            .header("Prefer", "return=minimal")
            .json(&json!({ "pix_key": key.as_str() }))
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(failure(status, &body))
    }
}
