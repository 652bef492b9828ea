pub mod tile;
pub mod preferences;
pub mod config;

pub use tile::*;
pub use preferences::*;
pub use config::*;
