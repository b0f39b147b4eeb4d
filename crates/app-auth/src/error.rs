//! Error types for the auth layer.

use thiserror::Error;

/// Errors from authentication, session handling, and the data API.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Vault(#[from] session_vault::VaultError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server rejected the request's credentials.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
