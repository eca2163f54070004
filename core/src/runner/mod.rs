mod traits;
pub mod types;

pub use traits::CommandRunner;
pub use types::{CommandOutput, CommandSpec};
