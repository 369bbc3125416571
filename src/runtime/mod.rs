pub mod config;

pub use config::{load_engine_config, parse_engine_config, EngineConfig};
