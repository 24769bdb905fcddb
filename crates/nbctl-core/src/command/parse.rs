// ── Command batch parsing ──
//
// `cmd1 args -- [--opt] cmd2 args -- ...`: commands are separated by
// `--`, and each command's leading `--option[=value]` words are its
// options. Everything is validated here, before any store access.

use std::collections::BTreeMap;

use super::{CommandSyntax, find_command};
use crate::error::CoreError;

/// One validated command of a batch.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub syntax: &'static CommandSyntax,
    /// Positional arguments, command name excluded.
    pub args: Vec<String>,
    pub options: BTreeMap<String, Option<String>>,
}

pub fn parse_commands<S: AsRef<str>>(words: &[S]) -> Result<Vec<ParsedCommand>, CoreError> {
    let words: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
    if words.is_empty() {
        return Err(missing_command());
    }
    words.split(|word| *word == "--").map(parse_one).collect()
}

fn parse_one(words: &[&str]) -> Result<ParsedCommand, CoreError> {
    let mut options = BTreeMap::new();
    let mut rest = words;
    while let Some((first, tail)) = rest.split_first() {
        let Some(option) = first.strip_prefix("--").filter(|o| !o.is_empty()) else {
            break;
        };
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (format!("--{name}"), Some(value.to_owned())),
            None => (format!("--{option}"), None),
        };
        if options.contains_key(&name) {
            return Err(CoreError::Usage(format!("'{name}' option specified multiple times")));
        }
        options.insert(name, value);
        rest = tail;
    }

    let (name, args) = rest.split_first().ok_or_else(missing_command)?;
    let syntax = find_command(name).ok_or_else(|| {
        CoreError::Usage(format!("unknown command '{name}'; use --help for help"))
    })?;

    for (option, value) in &options {
        check_option(syntax, option, value.as_deref())?;
    }

    if args.len() < syntax.min_args {
        return Err(CoreError::Usage(format!(
            "'{}' command requires at least {} arguments",
            syntax.name, syntax.min_args
        )));
    }
    if args.len() > syntax.max_args {
        return Err(CoreError::Usage(format!(
            "'{}' command takes at most {} arguments",
            syntax.name, syntax.max_args
        )));
    }

    Ok(ParsedCommand {
        syntax,
        args: args.iter().map(|&arg| arg.to_owned()).collect(),
        options,
    })
}

fn check_option(syntax: &CommandSyntax, option: &str, value: Option<&str>) -> Result<(), CoreError> {
    let takes_value = syntax
        .options
        .iter()
        .find_map(|accepted| match accepted.strip_suffix('=') {
            Some(bare) if bare == option => Some(true),
            None if *accepted == option => Some(false),
            _ => None,
        })
        .ok_or_else(|| {
            CoreError::Usage(format!("'{}' command has no '{option}' option", syntax.name))
        })?;

    match (takes_value, value) {
        (true, None) => Err(CoreError::Usage(format!(
            "'{option}' option on '{}' command requires an argument",
            syntax.name
        ))),
        (false, Some(_)) => Err(CoreError::Usage(format!(
            "'{option}' option on '{}' command does not accept an argument",
            syntax.name
        ))),
        _ => Ok(()),
    }
}

fn missing_command() -> CoreError {
    CoreError::Usage("missing command name (use --help for help)".into())
}
