//! CLI module for datachat.
//!
//! - Argument parsing
//! - Version and usage text
//! - Line-based output formatting
//! - Command runners driving a [`crate::session::QuerySessionController`]
//!
//! # Usage
//!
//! ```ignore
//! use datachat::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Version => println!("{}", datachat::cli::version_string()),
//!     command => { /* build a controller and run it */ }
//! }
//! ```

pub mod args;
pub mod commands;
pub mod output;
pub mod version;

pub use args::{parse_args, CliCommand};
pub use commands::{run_ask, run_delete, run_health, run_list, run_show};
pub use version::{usage, version_string, VERSION};
