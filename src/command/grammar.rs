//! Recognizes `<trigger> list projects` and `<trigger> run <name>`.

use regex::Regex;
use tracing::warn;

use crate::core::models::{ParsedCommand, Verb};
use crate::errors::BridgeError;

/// A command body the grammar knows about.
struct CommandPattern {
    verb: Verb,
    body: &'static str,
    expects_args: bool,
}

/// Registered command bodies, tried in order. The first one that matches wins.
const COMMAND_PATTERNS: &[CommandPattern] = &[
    CommandPattern {
        verb: Verb::ListProjects,
        body: "list projects",
        expects_args: false,
    },
    CommandPattern {
        verb: Verb::RunProject,
        body: r"run ([\p{L}\p{N}[:ascii:]\W]+)",
        expects_args: true,
    },
];

fn build_matcher(trigger_word: &str, body: &str) -> Result<Regex, BridgeError> {
    let pattern = format!("^{} {}$", regex::escape(trigger_word), body);
    Regex::new(&pattern).map_err(|e| BridgeError::MalformedCommand(e.to_string()))
}

/// Parses `text` against the registered commands for `trigger_word`.
///
/// Text that does not start with `"<trigger_word> "` or matches no command
/// body resolves to [`Verb::Unrecognized`].
///
/// # Errors
///
/// Returns [`BridgeError::MalformedCommand`] if a command body matches but
/// the expected parameter cannot be captured.
///
/// # Examples
///
/// ```
/// use buildbridge::command::grammar::parse_command;
/// use buildbridge::core::models::Verb;
///
/// let parsed = parse_command("jenkins", "jenkins run widget-ci").unwrap();
/// assert_eq!(parsed.verb, Verb::RunProject);
/// assert_eq!(parsed.args, vec!["widget-ci".to_string()]);
///
/// let parsed = parse_command("jenkins", "hello there").unwrap();
/// assert_eq!(parsed.verb, Verb::Unrecognized);
/// ```
pub fn parse_command(trigger_word: &str, text: &str) -> Result<ParsedCommand, BridgeError> {
    for pattern in COMMAND_PATTERNS {
        let matcher = build_matcher(trigger_word, pattern.body)?;
        let Some(captures) = matcher.captures(text) else {
            continue;
        };

        let args: Vec<String> = captures
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().to_string())
            .collect();

        if pattern.expects_args && args.is_empty() {
            return Err(BridgeError::MalformedCommand(format!(
                "no parameters captured from {:?}",
                text
            )));
        }

        return Ok(ParsedCommand {
            verb: pattern.verb,
            args,
        });
    }

    Ok(ParsedCommand::unrecognized())
}

/// Like [`parse_command`], but a malformed command is logged and treated as unrecognized.
#[must_use]
pub fn parse_or_unrecognized(trigger_word: &str, text: &str) -> ParsedCommand {
    parse_command(trigger_word, text).unwrap_or_else(|e| {
        warn!("Ignoring command {:?}: {}", text, e);
        ParsedCommand::unrecognized()
    })
}
