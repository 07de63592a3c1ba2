use std::fmt;

use serde::{Deserialize, Serialize};

/// Leading character that opens every slash command.
pub const COMMAND_SIGIL: char = '/';

/// Keywords recognized by the grammar, in match order.
///
/// Adding a command means extending this table and `CommandName` together;
/// a keyword without a matching variant surfaces as an unknown command.
pub const COMMAND_KEYWORDS: [&str; 5] = ["code", "continue", "fix", "help", "report"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `CommandName` values.
pub enum CommandName {
    Code,
    Continue,
    Fix,
    Help,
    Report,
}

impl CommandName {
    pub const ALL: [CommandName; 5] = [
        Self::Code,
        Self::Continue,
        Self::Fix,
        Self::Help,
        Self::Report,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Continue => "continue",
            Self::Fix => "fix",
            Self::Help => "help",
            Self::Report => "report",
        }
    }

    /// Maps a grammar keyword onto its variant.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "code" => Some(Self::Code),
            "continue" => Some(Self::Continue),
            "fix" => Some(Self::Fix),
            "help" => Some(Self::Help),
            "report" => Some(Self::Report),
            _ => None,
        }
    }

    /// Returns true for commands that drive the code generator.
    pub fn is_code_task(self) -> bool {
        matches!(self, Self::Code | Self::Continue | Self::Fix)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parsed slash command ready for dispatch.
pub struct Command {
    pub name: CommandName,
    pub args: String,
}

impl Command {
    pub fn new(name: CommandName, args: impl Into<String>) -> Self {
        Self {
            name,
            args: args.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raw grammar match borrowed from the comment body.
pub struct CommandMatch<'a> {
    pub keyword: &'a str,
    pub args: &'a str,
}

impl CommandMatch<'_> {
    /// Converts the match into an owned `Command`; `Err` carries the keyword
    /// when the grammar table and `CommandName` disagree.
    pub fn into_command(self) -> std::result::Result<Command, String> {
        match CommandName::from_keyword(self.keyword) {
            Some(name) => Ok(Command::new(name, self.args)),
            None => Err(self.keyword.to_string()),
        }
    }
}

/// Recognizes a slash command at the very start of `body`.
///
/// Only the first line is examined. The keyword must follow the sigil
/// directly; whitespace between keyword and arguments is optional.
pub fn recognize_command(body: &str) -> Option<CommandMatch<'_>> {
    let first_line = body.split('\n').next().unwrap_or_default();
    let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);
    let rest = first_line.strip_prefix(COMMAND_SIGIL)?;
    let keyword = COMMAND_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| rest.starts_with(keyword))?;
    Some(CommandMatch {
        keyword,
        args: rest[keyword.len()..].trim(),
    })
}

/// Parses `body` into a `Command`, returning `None` for anything that is not a
/// recognized slash command.
pub fn parse_command(body: &str) -> Option<Command> {
    recognize_command(body)?.into_command().ok()
}
