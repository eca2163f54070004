mod process;
mod pump;

pub use process::ProcessRunner;
