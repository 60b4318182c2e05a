//! Command-line argument parsing for the speclink CLI.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Sign in; the password is prompted for without echo
    Login { email: String },
    /// Forget stored credentials
    Logout,
    /// Authenticated GET, printing the JSON body
    Get { path: String },
    /// Stream an assistant reply for a feature conversation
    Stream { feature_id: String, message: String },
    /// Arguments did not form a command
    Invalid(String),
}

/// Usage text printed by `--help` and after invalid arguments.
pub const USAGE: &str = "\
Usage: speclink <command>

Commands:
  login <email>                 Sign in (prompts for the password)
  logout                        Forget stored credentials
  get <path>                    GET an API path and print the JSON response
  stream <feature-id> <message> Send a message and stream the reply
  --version, -V                 Show version
  --help, -h                    Show this help";

/// Parse command-line arguments and return the appropriate command.
///
/// # Arguments
///
/// * `args` - Iterator of command-line arguments (typically `std::env::args()`)
///
/// # Examples
///
/// ```
/// use speclink::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["speclink".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    // Skip the program name
    let args: Vec<String> = args.skip(1).collect();
    let Some(command) = args.first() else {
        return CliCommand::Help;
    };
    let rest = &args[1..];

    match command.as_str() {
        "--version" | "-V" => CliCommand::Version,
        "--help" | "-h" | "help" => CliCommand::Help,
        "logout" => CliCommand::Logout,
        "login" => match rest {
            [email] => CliCommand::Login {
                email: email.clone(),
            },
            _ => CliCommand::Invalid("login takes exactly one email address".to_string()),
        },
        "get" => match rest {
            [path] => CliCommand::Get { path: path.clone() },
            _ => CliCommand::Invalid("get takes exactly one path".to_string()),
        },
        "stream" => match rest {
            [feature_id, message @ ..] if !message.is_empty() => CliCommand::Stream {
                feature_id: feature_id.clone(),
                message: message.join(" "),
            },
            _ => CliCommand::Invalid("stream takes a feature id and a message".to_string()),
        },
        other => CliCommand::Invalid(format!("unknown command: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliCommand {
        let mut all = vec!["speclink".to_string()];
        all.extend(args.iter().map(|a| a.to_string()));
        parse_args(all.into_iter())
    }

    #[test]
    fn test_parse_version_flag() {
        assert_eq!(parse(&["--version"]), CliCommand::Version);
        assert_eq!(parse(&["-V"]), CliCommand::Version);
    }

    #[test]
    fn test_parse_no_args_is_help() {
        assert_eq!(parse(&[]), CliCommand::Help);
    }

    #[test]
    fn test_parse_stream_joins_message_words() {
        assert_eq!(
            parse(&["stream", "42", "Add", "a", "search", "box"]),
            CliCommand::Stream {
                feature_id: "42".to_string(),
                message: "Add a search box".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_stream_without_message() {
        assert!(matches!(parse(&["stream", "42"]), CliCommand::Invalid(_)));
    }

    #[test]
    fn test_parse_get_and_login() {
        assert_eq!(
            parse(&["get", "/features"]),
            CliCommand::Get {
                path: "/features".to_string()
            }
        );
        assert_eq!(
            parse(&["login", "ada@example.com"]),
            CliCommand::Login {
                email: "ada@example.com".to_string()
            }
        );
        assert_eq!(parse(&["logout"]), CliCommand::Logout);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse(&["--unknown"]),
            CliCommand::Invalid("unknown command: --unknown".to_string())
        );
    }
}
