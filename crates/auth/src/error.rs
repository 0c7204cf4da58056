use thiserror::Error;

use indica_core::DomainError;

use crate::profile::DirectoryError;
use crate::provider::ProviderError;

/// Errors surfaced to callers of the auth context.
///
/// Access denial is not an error: the gate answers it with a redirect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Deliberately does not say whether the email exists.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("validation failed: {0}")]
    Validation(String),

    /// Retryable by the user; never retried automatically.
    #[error("identity provider unreachable: {0}")]
    Network(String),

    #[error("identity provider refused the request: {0}")]
    Provider(String),

    #[error("profile directory error: {0}")]
    Directory(String),

    #[error("no active session")]
    NotSignedIn,
}

impl AuthError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// Message fit for the sign-in screen.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "E-mail ou senha inválidos.",
            AuthError::Validation(_) => "Preencha todos os campos.",
            AuthError::Network(_) | AuthError::Directory(_) => {
                "Não foi possível conectar. Tente novamente."
            }
            AuthError::Provider(_) => "Não foi possível concluir o cadastro.",
            AuthError::NotSignedIn => "Entre na sua conta para continuar.",
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::InvalidCredentials | ProviderError::InvalidToken => {
                AuthError::InvalidCredentials
            }
            ProviderError::Network(msg) => AuthError::Network(msg),
            ProviderError::Rejected(msg) => AuthError::Provider(msg),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(value: DirectoryError) -> Self {
        AuthError::Directory(value.to_string())
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AuthError::Validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let a: AuthError = ProviderError::InvalidCredentials.into();
        let b: AuthError = ProviderError::InvalidToken.into();
        assert_eq!(a, b);
        assert_eq!(a.user_message(), "E-mail ou senha inválidos.");
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(AuthError::Network("timeout".into()).is_retryable());
        assert!(!AuthError::InvalidCredentials.is_retryable());
        assert!(!AuthError::Provider("dup".into()).is_retryable());
    }
}
