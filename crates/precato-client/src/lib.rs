pub mod browse;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod setup;
pub mod state;

pub use config::EngineConfig;
pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
