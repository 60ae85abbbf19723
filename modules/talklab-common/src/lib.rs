pub mod config;
pub mod error;
pub mod types;

pub use config::HarvestConfig;
pub use error::HarvestError;
pub use types::*;
