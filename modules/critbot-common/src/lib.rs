pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{CritbotError, Result};
pub use types::*;
