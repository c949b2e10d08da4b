//! Version and usage text for the datachat CLI.

/// The current version of datachat, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line printed for `--version`.
pub fn version_string() -> String {
    format!("datachat {}", VERSION)
}

/// Usage text printed for `--help`.
pub fn usage() -> String {
    format!(
        "{}
Ask questions about your data from the terminal.

USAGE:
    datachat ask <question...> [--conversation <id>]
    datachat list
    datachat show <id>
    datachat delete <id>
    datachat health

OPTIONS:
    -c, --conversation <id>  Ask inside an existing conversation
    -h, --help               Print this help
    -V, --version            Print the version

ENVIRONMENT:
    DATACHAT_API_URL         Backend address (default http://localhost:8000)
    DATACHAT_TOKEN           Bearer token sent with every request
    DATACHAT_TIMEOUT_SECS    Request timeout in seconds (default 120)
    RUST_LOG                 Log filter, logs go to stderr (default warn)",
        version_string()
    )
}
