//! Host tools exposed to the model.

pub mod base;
pub mod filesystem;
pub mod registry;
pub mod search;
pub mod shell;

pub use base::{optional_string, require_string, Tool};
pub use registry::ToolRegistry;
pub use search::{search_command, SearchType};
