mod link;
mod load;
mod types;

pub use link::{load_link_file, LinkFile};
pub use load::{load_default, load_from, CONFIG_FILE_NAME};
pub use types::*;
