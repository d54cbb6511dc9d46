pub mod asset;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod island;
pub mod layer;
pub mod math;
pub mod placement;
pub mod segment;
pub mod selection;
pub mod view;

pub use config::EngineConfig;
pub use engine::{ConfiguratorEngine, EngineEvent};
pub use error::{MeshSyncError, Result};
