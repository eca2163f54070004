pub mod config;
pub mod result;

pub use config::*;
pub use result::*;
