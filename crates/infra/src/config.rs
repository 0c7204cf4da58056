//! Backend configuration, read once at the composition root.

use std::path::PathBuf;

use thiserror::Error;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const TOKEN_PATH_VAR: &str = "INDICA_TOKEN_PATH";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where the managed backend lives and how to talk to it.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash.
    pub url: String,
    /// Public (anon) API key sent as `apikey`.
    pub anon_key: String,
    /// Optional location of the persisted session token.
    pub token_path: Option<PathBuf>,
}

impl core::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"***")
            .field("token_path", &self.token_path)
            .finish()
    }
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(ConfigError::Missing(URL_VAR));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                var: URL_VAR,
                reason: "must start with http:// or https://".to_string(),
            });
        }

        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(ConfigError::Missing(ANON_KEY_VAR));
        }

        Ok(Self {
            url,
            anon_key,
            token_path: None,
        })
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR).ok_or(ConfigError::Missing(URL_VAR))?;
        let anon_key = lookup(ANON_KEY_VAR).ok_or(ConfigError::Missing(ANON_KEY_VAR))?;
        let config = Self::new(url, anon_key)?;

        Ok(match lookup(TOKEN_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => config.with_token_path(path),
            None => config,
        })
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path.trim_start_matches('/'))
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_required_and_optional_vars() {
        let config = BackendConfig::from_lookup(lookup(&[
            (URL_VAR, "https://project.supabase.co/"),
            (ANON_KEY_VAR, "anon"),
            (TOKEN_PATH_VAR, "/tmp/indica/session.json"),
        ]))
        .unwrap();

        assert_eq!(config.url, "https://project.supabase.co");
        assert_eq!(config.token_path, Some(PathBuf::from("/tmp/indica/session.json")));
        assert_eq!(
            config.auth_url("token?grant_type=password"),
            "https://project.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(config.rest_url("/profiles"), "https://project.supabase.co/rest/v1/profiles");
    }

    #[test]
    fn missing_vars_are_named() {
        let err = BackendConfig::from_lookup(lookup(&[(URL_VAR, "https://x.supabase.co")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ANON_KEY_VAR));
        assert_eq!(err.to_string(), "SUPABASE_ANON_KEY must be set");
    }

    #[test]
    fn url_must_be_http() {
        let err = BackendConfig::new("ftp://x", "anon").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: URL_VAR, .. }));
    }

    #[test]
    fn debug_hides_the_key() {
        let config = BackendConfig::new("https://x.supabase.co", "very-secret").unwrap();
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
