pub mod commands;
pub mod progress;
pub mod ui;
pub mod util;

pub use progress::ProgressRenderer;
pub use util::{CommandContext, is_initialized, require_initialized};
