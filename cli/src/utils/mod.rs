//! Utility modules for the CLI
//!
//! - `io`: logging and stdin prompts
//! - `pattern`: shell-style file name patterns

pub mod io;
pub mod pattern;

pub use io::prompt_line;
pub use pattern::{file_name, FilePattern};
