pub mod auth;
pub mod error;

pub use auth::{Role, TokenClaims, User};
pub use error::ClientError;
