//! Command-line argument parsing for the datachat CLI.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Ask a question, optionally inside an existing conversation
    Ask {
        question: String,
        conversation: Option<String>,
    },
    /// List conversations
    List,
    /// Print a conversation's history
    Show(String),
    /// Delete a conversation
    Delete(String),
    /// Check that the backend is reachable
    Health,
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Arguments that could not be understood
    Invalid(String),
}

/// Parse command-line arguments and return the command to run.
///
/// The first item is the program name and is skipped.
///
/// # Examples
///
/// ```
/// use datachat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["datachat".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let args: Vec<String> = args.skip(1).collect();

    if args
        .iter()
        .any(|a| a == "--version" || a == "-V")
    {
        return CliCommand::Version;
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return CliCommand::Help;
    }

    let Some((command, rest)) = args.split_first() else {
        return CliCommand::Help;
    };

    match command.as_str() {
        "ask" => parse_ask(rest),
        "list" | "ls" => CliCommand::List,
        "show" => single_id("show", rest).map_or_else(CliCommand::Invalid, CliCommand::Show),
        "delete" | "rm" => {
            single_id("delete", rest).map_or_else(CliCommand::Invalid, CliCommand::Delete)
        }
        "health" => CliCommand::Health,
        "help" => CliCommand::Help,
        other => CliCommand::Invalid(format!("unknown command '{}'", other)),
    }
}

fn parse_ask(rest: &[String]) -> CliCommand {
    let mut conversation = None;
    let mut words = Vec::new();
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--conversation" | "-c" => match iter.next() {
                Some(id) => conversation = Some(id.clone()),
                None => {
                    return CliCommand::Invalid("--conversation needs an id".to_string());
                }
            },
            _ => words.push(arg.as_str()),
        }
    }

    let question = words.join(" ");
    if question.trim().is_empty() {
        return CliCommand::Invalid("ask needs a question".to_string());
    }
    CliCommand::Ask {
        question,
        conversation,
    }
}

fn single_id(command: &str, rest: &[String]) -> Result<String, String> {
    match rest {
        [id] => Ok(id.clone()),
        [] => Err(format!("{} needs a conversation id", command)),
        _ => Err(format!("{} takes exactly one conversation id", command)),
    }
}
