pub mod client;
pub mod envelope;

pub use client::CrisisApiClient;
pub use envelope::ErrorEnvelope;
