pub mod args;
pub mod commands;

pub use args::{Cli, Commands, SyncOverrides};
pub use commands::run;
