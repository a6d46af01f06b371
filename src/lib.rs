//! Student risk assessment engine.

pub mod config;
pub mod db;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod explain;
pub mod features;
pub mod model;
pub mod models;
pub mod mood;
pub mod report;
pub mod risk;
pub mod roster;
pub mod telemetry;
pub mod tips;

pub use config::EngineConfig;
pub use engine::{AssessRequest, EmotionInput, EngineStatus, RiskEngine};
pub use error::{EngineError, InferenceError, ModelError};
