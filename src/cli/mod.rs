pub mod args;
pub mod commands;

pub use args::{Cli, Commands, FilterArgs};
pub use commands::{build_parameters, run};
