use thiserror::Error;

use shared_models::ClientError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not signed in")]
    MissingToken,

    #[error("Session token is invalid: {0}")]
    InvalidToken(String),

    #[error("Session expired, please sign in again")]
    Expired,

    #[error("Could not resolve current user: {0}")]
    Api(#[from] ClientError),
}
