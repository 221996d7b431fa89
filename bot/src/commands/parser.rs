use std::borrow::Cow;

/// A bot command with its arguments.
///
/// Grammar (after the prefix), tokenized with shell-style quoting:
///   `count`
///   `sleep [seconds]`
///   `summon`
///   `resolve`
///   `admin [words...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Count,
    Sleep { seconds: u64 },
    Summon,
    Resolve,
    /// The free-text words rejoined with single spaces; None when empty.
    Admin { message: Option<String> },
}

/// Every command name, in help order.
pub const COMMAND_NAMES: [&str; 5] = ["count", "sleep", "summon", "resolve", "admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Count,
    Sleep,
    Summon,
    Resolve,
    Admin,
}

const COMMAND_TABLE: [(&str, CommandKind); 5] = [
    ("count", CommandKind::Count),
    ("sleep", CommandKind::Sleep),
    ("summon", CommandKind::Summon),
    ("resolve", CommandKind::Resolve),
    ("admin", CommandKind::Admin),
];

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Count => "count",
            Command::Sleep { .. } => "sleep",
            Command::Summon => "summon",
            Command::Resolve => "resolve",
            Command::Admin { .. } => "admin",
        }
    }
}

/// A rejected command line. Displayed as the usage text followed by the
/// reason, ready to be sent to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub reason: String,
    pub usage: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\nerror: {}", self.usage, self.reason)
    }
}

impl std::error::Error for ParseFailure {}

pub struct CommandParser {
    prefix: String,
    allow_abbrev: bool,
    default_sleep_secs: u64,
    max_sleep_secs: u64,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            allow_abbrev: true,
            default_sleep_secs: 5,
            max_sleep_secs: 3600,
        }
    }

    /// Accept unambiguous prefixes of command names (`sum` for `summon`).
    pub fn allow_abbrev(mut self, allow: bool) -> Self {
        self.allow_abbrev = allow;
        self
    }

    pub fn sleep_bounds(mut self, default_secs: u64, max_secs: u64) -> Self {
        self.default_sleep_secs = default_secs;
        self.max_sleep_secs = max_secs;
        self
    }

    /// Parse a command line with the prefix already stripped.
    pub fn parse(&self, text: &str) -> Result<Command, ParseFailure> {
        let tokens = shell_words::split(&escape_comment_marks(text))
            .map_err(|error| self.failure(format!("could not split arguments: {error}")))?;

        let Some((first, args)) = tokens.split_first() else {
            return Err(self.failure("missing command"));
        };

        match self.resolve_name(first)? {
            CommandKind::Count => {
                self.no_arguments("count", args)?;
                Ok(Command::Count)
            }
            CommandKind::Sleep => self.parse_sleep(args),
            CommandKind::Summon => {
                self.no_arguments("summon", args)?;
                Ok(Command::Summon)
            }
            CommandKind::Resolve => {
                self.no_arguments("resolve", args)?;
                Ok(Command::Resolve)
            }
            CommandKind::Admin => {
                let message = if args.is_empty() {
                    None
                } else {
                    Some(args.join(" "))
                };
                Ok(Command::Admin { message })
            }
        }
    }

    /// Help text listing every command and its arguments.
    pub fn usage(&self) -> String {
        let p = &self.prefix;
        format!(
            "usage: {p}<command> [arguments]\n\
             commands:\n\
             \x20 {p}count               count your recent messages in this channel\n\
             \x20 {p}sleep [seconds]     wait, then reply (default {default} seconds)\n\
             \x20 {p}summon              open a private channel with the admins\n\
             \x20 {p}resolve             close a private admin channel\n\
             \x20 {p}admin [message...]  send a message to the admins",
            default = self.default_sleep_secs,
        )
    }

    fn resolve_name(&self, word: &str) -> Result<CommandKind, ParseFailure> {
        let word = word.to_lowercase();
        if let Some((_, kind)) = COMMAND_TABLE.iter().find(|(name, _)| *name == word) {
            return Ok(*kind);
        }

        if self.allow_abbrev && !word.is_empty() {
            let matches: Vec<&(&str, CommandKind)> = COMMAND_TABLE
                .iter()
                .filter(|(name, _)| name.starts_with(word.as_str()))
                .collect();
            match matches.as_slice() {
                [(_, kind)] => return Ok(*kind),
                [] => {}
                several => {
                    let names: Vec<&str> = several.iter().map(|(name, _)| *name).collect();
                    return Err(self.failure(format!(
                        "ambiguous command '{word}' could match {}",
                        names.join(", ")
                    )));
                }
            }
        }

        Err(self.failure(format!(
            "invalid command '{word}' (choose from {})",
            COMMAND_NAMES.join(", ")
        )))
    }

    fn parse_sleep(&self, args: &[String]) -> Result<Command, ParseFailure> {
        let seconds = match args {
            [] => self.default_sleep_secs,
            [raw] => {
                let seconds: u64 = raw
                    .parse()
                    .map_err(|_| self.failure(format!("sleep: invalid int value: '{raw}'")))?;
                if seconds == 0 {
                    return Err(self.failure("sleep: seconds must be positive"));
                }
                if seconds > self.max_sleep_secs {
                    return Err(self.failure(format!(
                        "sleep: at most {} seconds",
                        self.max_sleep_secs
                    )));
                }
                seconds
            }
            [_, extra @ ..] => {
                return Err(self.failure(format!(
                    "sleep: unrecognized arguments: {}",
                    extra.join(" ")
                )));
            }
        };
        Ok(Command::Sleep { seconds })
    }

    fn no_arguments(&self, command: &str, args: &[String]) -> Result<(), ParseFailure> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(self.failure(format!(
                "{command}: unrecognized arguments: {}",
                args.join(" ")
            )))
        }
    }

    fn failure(&self, reason: impl Into<String>) -> ParseFailure {
        ParseFailure {
            reason: reason.into(),
            usage: self.usage(),
        }
    }
}

/// Backslash-escape every `#` that starts an unquoted word, so the
/// splitter keeps it as text instead of dropping the rest of the line
/// as a shell comment.
fn escape_comment_marks(text: &str) -> Cow<'_, str> {
    if !text.contains('#') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 4);
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut word_start = true;
    for c in text.chars() {
        if escaped {
            escaped = false;
            word_start = false;
            out.push(c);
            continue;
        }
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (None | Some('"'), '\\') => escaped = true,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '#') if word_start => out.push('\\'),
            (None, _) => {}
        }
        word_start = quote.is_none() && c.is_whitespace();
        out.push(c);
    }
    Cow::Owned(out)
}
