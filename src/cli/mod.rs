//! Command-line interface
//!
//! - `args` - Argument parsing structures
//! - `commands` - One module per subcommand
//! - `router` - Dispatch from parsed arguments to a command

pub mod args;
pub mod commands;
pub mod help;
pub mod router;

pub use args::{Cli, Commands};
pub use help::get_log_level;
pub use router::execute_command;
