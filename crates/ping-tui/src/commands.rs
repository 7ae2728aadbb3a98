//! Slash command parsing for the input line.

/// What a submitted input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Plain text for the active room.
    Message(String),
    /// `/general`
    General,
    /// `/dm <name or id>`
    Dm {
        /// Peer display name or user id.
        query: String,
    },
    /// `/quit`
    Quit,
    /// Unrecognized `/command`.
    Unknown {
        /// The command as typed.
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command name.
        command: &'static str,
        /// What was wrong.
        error: &'static str,
    },
}

/// Parse a submitted line. Lines not starting with `/` are messages.
pub fn parse(line: &str) -> InputCommand {
    let Some(cmd) = line.trim_start().strip_prefix('/') else {
        return InputCommand::Message(line.to_string());
    };

    let (name, rest) = match cmd.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (cmd, ""),
    };

    match name {
        "general" | "g" => InputCommand::General,
        "dm" | "msg" => {
            if rest.is_empty() {
                InputCommand::InvalidArgs { command: "dm", error: "usage: /dm <name or id>" }
            } else {
                InputCommand::Dm { query: rest.to_string() }
            }
        },
        "quit" | "q" | "logout" => InputCommand::Quit,
        _ => InputCommand::Unknown { input: format!("/{cmd}") },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse("hello /world"), InputCommand::Message("hello /world".into()));
    }

    #[test]
    fn dm_takes_the_rest_of_the_line() {
        assert_eq!(parse("/dm  Mary Ann "), InputCommand::Dm { query: "Mary Ann".into() });
        assert!(matches!(parse("/dm"), InputCommand::InvalidArgs { command: "dm", .. }));
    }

    #[test]
    fn general_and_quit() {
        assert_eq!(parse("/general"), InputCommand::General);
        assert_eq!(parse("/quit"), InputCommand::Quit);
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(parse("/nick bob"), InputCommand::Unknown { input: "/nick bob".into() });
    }
}
