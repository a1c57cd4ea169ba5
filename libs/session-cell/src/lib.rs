pub mod capabilities;
pub mod error;
pub mod session;

pub use capabilities::{Capabilities, Capability};
pub use error::SessionError;
pub use session::{AppSession, SessionSnapshot};
