mod config;
pub use config::*;

mod error;
pub use error::*;

mod realtime_engine;
pub use realtime_engine::*;
