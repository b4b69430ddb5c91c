//! Built-in slash commands and slash input parsing.
//!
//! Custom prompts share the slash namespace with these commands, so their
//! names are reserved and never surface as prompts.

use std::collections::BTreeSet;

/// A built-in slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinCommand {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Help text
    pub description: &'static str,
}

/// Commands owned by the host. Ordered as they appear in help output.
pub const BUILTIN_COMMANDS: &[BuiltinCommand] = &[
    BuiltinCommand {
        name: "model",
        description: "choose what model and reasoning effort to use",
    },
    BuiltinCommand {
        name: "approvals",
        description: "choose what the assistant can do without approval",
    },
    BuiltinCommand {
        name: "review",
        description: "review the current changes and find issues",
    },
    BuiltinCommand {
        name: "new",
        description: "start a new chat during a conversation",
    },
    BuiltinCommand {
        name: "init",
        description: "create an AGENTS.md file with instructions for the assistant",
    },
    BuiltinCommand {
        name: "compact",
        description: "summarize the conversation to free up context",
    },
    BuiltinCommand {
        name: "undo",
        description: "restore the workspace to the last turn",
    },
    BuiltinCommand {
        name: "diff",
        description: "show git diff (including untracked files)",
    },
    BuiltinCommand {
        name: "mention",
        description: "mention a file",
    },
    BuiltinCommand {
        name: "status",
        description: "show current session configuration and token usage",
    },
    BuiltinCommand {
        name: "mcp",
        description: "list configured MCP tools",
    },
    BuiltinCommand {
        name: "logout",
        description: "log out",
    },
    BuiltinCommand {
        name: "quit",
        description: "exit the session",
    },
    BuiltinCommand {
        name: "exit",
        description: "exit the session",
    },
];

/// Look up a built-in command by exact name.
pub fn builtin(name: &str) -> Option<&'static BuiltinCommand> {
    BUILTIN_COMMANDS.iter().find(|c| c.name == name)
}

/// Names a custom prompt may not use.
///
/// Matching is case-insensitive, so `Init` collides with `init`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedNames {
    names: BTreeSet<String>,
}

impl ReservedNames {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in command names.
    pub fn builtins() -> Self {
        BUILTIN_COMMANDS.iter().map(|c| c.name).collect()
    }

    /// Add a name to the set.
    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_lowercase());
    }

    /// Check whether `name` collides with a reserved name.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ReservedNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for ReservedNames {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

/// Parse a slash command from input.
///
/// Returns `Some((command_name, args))` if the input starts with `/`,
/// `None` otherwise. `args` keeps its internal spacing and quotes; only the
/// separator after the name is consumed.
pub fn parse_slash_command(input: &str) -> Option<(&str, &str)> {
    let trimmed = input.trim();
    let without_slash = trimmed.strip_prefix('/')?;
    let (command, args) = match without_slash.find(char::is_whitespace) {
        Some(idx) => (&without_slash[..idx], without_slash[idx..].trim_start()),
        None => (without_slash, ""),
    };
    if command.is_empty() {
        return None;
    }
    Some((command, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin("init").map(|c| c.name), Some("init"));
        assert!(builtin("nope").is_none());
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let reserved = ReservedNames::builtins();
        assert_eq!(reserved.len(), BUILTIN_COMMANDS.len());
    }

    #[test]
    fn test_reserved_names_case_insensitive() {
        let reserved = ReservedNames::builtins();
        assert!(reserved.contains("init"));
        assert!(reserved.contains("Init"));
        assert!(reserved.contains("COMPACT"));
        assert!(!reserved.contains("review-pr"));
    }

    #[test]
    fn test_reserved_names_extend() {
        let mut reserved = ReservedNames::new();
        assert!(reserved.is_empty());
        reserved.extend(["Deploy", "ship"]);
        assert!(reserved.contains("deploy"));
        assert!(reserved.contains("SHIP"));
        assert_eq!(reserved.len(), 2);
    }

    #[test]
    fn test_parse_slash_command() {
        assert_eq!(parse_slash_command("/help"), Some(("help", "")));
        assert_eq!(parse_slash_command("/compact all"), Some(("compact", "all")));
        assert_eq!(parse_slash_command("  /yolo on  "), Some(("yolo", "on")));
        assert_eq!(parse_slash_command("normal message"), None);
        assert_eq!(parse_slash_command("  normal  "), None);
        assert_eq!(parse_slash_command("/"), None);
    }

    #[test]
    fn test_parse_slash_command_keeps_argument_spacing() {
        assert_eq!(
            parse_slash_command("/review  a   \"b  c\""),
            Some(("review", "a   \"b  c\""))
        );
    }

    #[test]
    fn test_parse_slash_command_tab_separator() {
        assert_eq!(parse_slash_command("/fix\tnow"), Some(("fix", "now")));
    }
}
