//! Parses shell input lines into commands.

/// A parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a database file or script.
    Open(String),
    /// Import a script into the open database.
    Import(String),
    /// Run SQL directly.
    Sql(String),
    /// Export the last result to CSV, optionally to a given path.
    Export(Option<String>),
    Schema,
    History,
    Help,
    Quit,
    /// A natural-language prompt for the chat agent.
    Chat(String),
    /// A known command missing its argument; holds the usage line.
    Usage(&'static str),
    /// An unrecognized slash command.
    Unknown(String),
}

/// Command router for parsing user input.
pub struct CommandRouter;

impl CommandRouter {
    /// Parses one line of input. Anything not starting with `/` is chat.
    pub fn parse(input: &str) -> Command {
        let input = input.trim();

        if !input.starts_with('/') {
            return Command::Chat(input.to_string());
        }

        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "/open" if args.is_empty() => Command::Usage("/open <path>"),
            "/open" => Command::Open(unquote(args)),
            "/import" if args.is_empty() => Command::Usage("/import <path>"),
            "/import" => Command::Import(unquote(args)),
            "/sql" => Command::Sql(args.to_string()),
            "/export" if args.is_empty() => Command::Export(None),
            "/export" => Command::Export(Some(unquote(args))),
            "/schema" => Command::Schema,
            "/history" => Command::History,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Strips one pair of matching surrounding quotes, for paths with spaces.
fn unquote(arg: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    arg.to_string()
}
