pub mod config;
pub mod types;

pub use config::ClusterConfig;
pub use types::*;
