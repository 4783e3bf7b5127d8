// Public API for integration tests, the simulator, and library usage

pub mod cards;
pub mod config;
pub mod engine;
pub mod error;
pub mod rules;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::GameEngine;
pub use error::GameError;
