use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use indica_auth::{AccessToken, IdentityProvider, PersistedToken, ProviderError, Session, SignUpRequest};
use indica_core::IdentityId;

use super::{SupabaseClient, error_message};

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenGrant {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            identity_id: IdentityId::from_uuid(self.user.id),
            email: self.user.email.unwrap_or_default(),
            access_token: AccessToken::new(self.access_token),
            expires_at,
        }
    }
}

/// GoTrue-backed identity provider.
#[derive(Debug, Clone)]
pub struct SupabaseIdentityProvider {
    client: SupabaseClient,
}

impl SupabaseIdentityProvider {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String), ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let status = response.status();
        debug!(url = %response.url().path(), status = status.as_u16(), "auth response");
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok((status, body))
    }
}

/// Map a failed credential exchange to a provider error.
fn credential_failure(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => ProviderError::InvalidCredentials,
        s if s.is_server_error() => ProviderError::Network(error_message(s, body)),
        s => ProviderError::Rejected(error_message(s, body)),
    }
}

/// Map a failed token check to a provider error.
fn token_failure(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::InvalidToken,
        s if s.is_server_error() => ProviderError::Network(error_message(s, body)),
        s => ProviderError::Rejected(error_message(s, body)),
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let url = self.client.config().auth_url("token?grant_type=password");
        let request = self
            .client
            .request(Method::POST, &url, None)
            .json(&json!({ "email": email, "password": password }));

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(credential_failure(status, &body));
        }

        let grant: TokenGrant =
            serde_json::from_str(&body).map_err(|e| ProviderError::Rejected(format!("token response: {e}")))?;
        let session = grant.into_session();
        self.client.set_bearer(Some(session.access_token.clone()));
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<(), ProviderError> {
        let url = self.client.config().auth_url("signup");
        let http = self.client.request(Method::POST, &url, None).json(&json!({
            "email": request.email,
            "password": request.password,
            "data": { "name": request.name },
        }));

        let (status, body) = self.send(http).await?;
        if status.is_success() {
            return Ok(());
        }
        Err(match status {
            s if s.is_server_error() => ProviderError::Network(error_message(s, &body)),
            s => ProviderError::Rejected(error_message(s, &body)),
        })
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError> {
        self.client.set_bearer(None);

        let url = self.client.config().auth_url("logout");
        let (status, body) = self.send(self.client.request(Method::POST, &url, Some(token))).await?;
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(token_failure(status, &body))
    }

    async fn validate(&self, token: &PersistedToken) -> Result<Session, ProviderError> {
        let url = self.client.config().auth_url("user");
        let request = self.client.request(Method::GET, &url, Some(&token.access_token));

        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(token_failure(status, &body));
        }

        let user: AuthUser =
            serde_json::from_str(&body).map_err(|e| ProviderError::Rejected(format!("user response: {e}")))?;
        let session = Session {
            identity_id: IdentityId::from_uuid(user.id),
            email: user.email.unwrap_or_default(),
            access_token: token.access_token.clone(),
            expires_at: token.expires_at,
        };
        self.client.set_bearer(Some(session.access_token.clone()));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_statuses() {
        assert_eq!(
            credential_failure(StatusCode::BAD_REQUEST, "{}"),
            ProviderError::InvalidCredentials
        );
        assert_eq!(
            credential_failure(StatusCode::UNAUTHORIZED, ""),
            ProviderError::InvalidCredentials
        );
        assert!(matches!(
            credential_failure(StatusCode::SERVICE_UNAVAILABLE, ""),
            ProviderError::Network(_)
        ));
        assert!(matches!(
            credential_failure(StatusCode::UNPROCESSABLE_ENTITY, r#"{"msg":"weak password"}"#),
            ProviderError::Rejected(m) if m == "422 weak password"
        ));
    }

    #[test]
    fn token_statuses() {
        assert_eq!(token_failure(StatusCode::UNAUTHORIZED, ""), ProviderError::InvalidToken);
        assert_eq!(token_failure(StatusCode::FORBIDDEN, ""), ProviderError::InvalidToken);
        assert!(matches!(token_failure(StatusCode::BAD_GATEWAY, ""), ProviderError::Network(_)));
    }

    #[test]
    fn grant_prefers_absolute_expiry() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1900000000,
            "refresh_token": "r",
            "user": { "id": "0190a6d2-6b7e-7cc1-a1f0-5d2c3b4a5e6f", "email": "ana@example.com" }
        }"#;
        let session = serde_json::from_str::<TokenGrant>(json).unwrap().into_session();

        assert_eq!(session.email, "ana@example.com");
        assert_eq!(session.expires_at.timestamp(), 1_900_000_000);
        assert_eq!(session.access_token.expose(), "jwt");
    }

    #[test]
    fn grant_falls_back_to_relative_expiry() {
        let json = r#"{
            "access_token": "jwt",
            "expires_in": 60,
            "user": { "id": "0190a6d2-6b7e-7cc1-a1f0-5d2c3b4a5e6f" }
        }"#;
        let before = Utc::now();
        let session = serde_json::from_str::<TokenGrant>(json).unwrap().into_session();

        assert_eq!(session.email, "");
        assert!(session.expires_at > before + Duration::seconds(59));
        assert!(session.expires_at <= Utc::now() + Duration::seconds(60));
    }
}
