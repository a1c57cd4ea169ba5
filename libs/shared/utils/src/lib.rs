pub mod jwt;
pub mod periodic;
pub mod test_utils;

pub use periodic::PeriodicTask;
