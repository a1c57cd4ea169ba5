pub mod error;
pub mod models;
pub mod services;

pub use error::{BookingError, BookingValidationError, DraftField};
pub use models::*;
pub use services::*;
