pub mod config;
pub mod error;
pub mod types;

pub use config::CarelogConfig;
pub use error::{CarelogError, Result};
pub use types::*;
