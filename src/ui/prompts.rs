//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! The engine asks questions through the [`Prompter`] trait so it never reads
//! the terminal itself. [`TerminalPrompter`] asks on stdin/stderr with a
//! numbered list for selections; [`ScriptedPrompter`] replays pre-seeded
//! answers for tests and for non-interactive callers.
//!
//! In non-interactive mode, operations requiring user input must either have
//! defaults or fail with [`PromptError::NotInteractive`].

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("nothing to choose from")]
    NoOptions,

    #[error("selection {index} is out of range for {options} options")]
    InvalidSelection { index: usize, options: usize },

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::IoError(e.to_string())
    }
}

/// Source of answers to user-facing questions.
pub trait Prompter: Send + Sync + fmt::Debug {
    /// Whether questions can be answered at all.
    fn is_interactive(&self) -> bool;

    /// Ask a yes/no question.
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Ask for a line of text. An empty answer yields the default, if any.
    fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Ask the user to pick one option; returns its index.
    fn select(
        &self,
        message: &str,
        options: &[String],
        default: Option<usize>,
    ) -> Result<usize, PromptError>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Create a prompter; interactive only when requested and stdin is a TTY.
    pub fn new(allow_interactive: bool) -> Self {
        Self {
            interactive: allow_interactive && io::stdin().is_terminal(),
        }
    }

    fn ensure_interactive(&self) -> Result<(), PromptError> {
        if self.interactive {
            Ok(())
        } else {
            Err(PromptError::NotInteractive)
        }
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.ensure_interactive()?;
        confirm_with(&mut io::stdin().lock(), &mut io::stderr(), message, default)
    }

    fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        input_with(&mut io::stdin().lock(), &mut io::stderr(), message, default)
    }

    fn select(
        &self,
        message: &str,
        options: &[String],
        default: Option<usize>,
    ) -> Result<usize, PromptError> {
        self.ensure_interactive()?;
        select_with(
            &mut io::stdin().lock(),
            &mut io::stderr(),
            message,
            options,
            default,
        )
    }
}

/// Read one line; `None` at end of input.
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, PromptError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn confirm_with(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
    default: bool,
) -> Result<bool, PromptError> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(out, "{} {} ", message, hint)?;
        out.flush()?;
        let answer = read_line(reader)?.ok_or(PromptError::Cancelled)?;
        match answer.to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(out, "Please answer y or n.")?,
        }
    }
}

fn input_with(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
    default: Option<&str>,
) -> Result<String, PromptError> {
    match default {
        Some(d) => write!(out, "{} [{}]: ", message, d)?,
        None => write!(out, "{}: ", message)?,
    }
    out.flush()?;
    let answer = read_line(reader)?.ok_or(PromptError::Cancelled)?;
    if answer.is_empty() {
        if let Some(d) = default {
            return Ok(d.to_string());
        }
    }
    Ok(answer)
}

fn select_with(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
    options: &[String],
    default: Option<usize>,
) -> Result<usize, PromptError> {
    if options.is_empty() {
        return Err(PromptError::NoOptions);
    }

    writeln!(out, "{}", message)?;
    for (i, option) in options.iter().enumerate() {
        let marker = if Some(i) == default { "*" } else { " " };
        writeln!(out, "{} {:>3}. {}", marker, i + 1, option)?;
    }

    loop {
        match default {
            Some(d) => write!(out, "Select [1-{}] ({}): ", options.len(), d + 1)?,
            None => write!(out, "Select [1-{}]: ", options.len())?,
        }
        out.flush()?;

        let answer = read_line(reader)?.ok_or(PromptError::Cancelled)?;
        if answer.is_empty() {
            if let Some(d) = default.filter(|d| *d < options.len()) {
                return Ok(d);
            }
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
            _ => writeln!(
                out,
                "Please enter a number between 1 and {}.",
                options.len()
            )?,
        }
    }
}

/// A pre-seeded answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Input(String),
    Select(usize),
}

/// Replays answers in order; reports non-interactive once they run out.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create a prompter with the given answers.
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// A prompter that answers nothing.
    pub fn silent() -> Self {
        Self::default()
    }

    /// The messages asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    fn next(&self, message: &str) -> Result<Answer, PromptError> {
        self.asked.lock().push(message.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or(PromptError::NotInteractive)
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        !self.answers.lock().is_empty()
    }

    fn confirm(&self, message: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(PromptError::IoError(format!(
                "scripted answer {:?} does not fit a confirmation",
                other
            ))),
        }
    }

    fn input(&self, message: &str, _default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message)? {
            Answer::Input(text) => Ok(text),
            other => Err(PromptError::IoError(format!(
                "scripted answer {:?} does not fit a text input",
                other
            ))),
        }
    }

    fn select(
        &self,
        message: &str,
        options: &[String],
        _default: Option<usize>,
    ) -> Result<usize, PromptError> {
        if options.is_empty() {
            return Err(PromptError::NoOptions);
        }
        match self.next(message)? {
            Answer::Select(i) if i < options.len() => Ok(i),
            Answer::Select(i) => Err(PromptError::IoError(format!(
                "scripted selection {} out of range",
                i
            ))),
            other => Err(PromptError::IoError(format!(
                "scripted answer {:?} does not fit a selection",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn options() -> Vec<String> {
        vec!["first".into(), "second".into(), "third".into()]
    }

    #[test]
    fn confirm_parses_answers() {
        let mut out = Vec::new();
        assert!(confirm_with(&mut Cursor::new("y\n"), &mut out, "ok?", false).unwrap());
        assert!(!confirm_with(&mut Cursor::new("no\n"), &mut out, "ok?", true).unwrap());
        assert!(confirm_with(&mut Cursor::new("\n"), &mut out, "ok?", true).unwrap());
        assert!(confirm_with(&mut Cursor::new("maybe\nY\n"), &mut out, "ok?", false).unwrap());
    }

    #[test]
    fn confirm_eof_is_cancelled() {
        let mut out = Vec::new();
        let err = confirm_with(&mut Cursor::new(""), &mut out, "ok?", true).unwrap_err();
        assert!(matches!(err, PromptError::Cancelled));
    }

    #[test]
    fn input_uses_default_on_empty() {
        let mut out = Vec::new();
        let got = input_with(&mut Cursor::new("\n"), &mut out, "name", Some("me/data")).unwrap();
        assert_eq!(got, "me/data");
        let got = input_with(&mut Cursor::new("you/db\n"), &mut out, "name", None).unwrap();
        assert_eq!(got, "you/db");
    }

    #[test]
    fn select_is_one_based_and_reprompts() {
        let mut out = Vec::new();
        let got = select_with(&mut Cursor::new("0\n7\n2\n"), &mut out, "pick", &options(), None)
            .unwrap();
        assert_eq!(got, 1);

        let listing = String::from_utf8(out).unwrap();
        assert!(listing.contains("  1. first"));
        assert!(listing.contains("Please enter a number between 1 and 3."));
    }

    #[test]
    fn select_empty_answer_takes_default() {
        let mut out = Vec::new();
        let got = select_with(&mut Cursor::new("\n"), &mut out, "pick", &options(), Some(2))
            .unwrap();
        assert_eq!(got, 2);
    }

    #[test]
    fn select_without_options_fails() {
        let mut out = Vec::new();
        let err = select_with(&mut Cursor::new("1\n"), &mut out, "pick", &[], None).unwrap_err();
        assert!(matches!(err, PromptError::NoOptions));
    }

    #[test]
    fn scripted_replays_in_order() {
        let prompter = ScriptedPrompter::new([
            Answer::Confirm(true),
            Answer::Input("me/db".into()),
            Answer::Select(1),
        ]);
        assert!(prompter.is_interactive());
        assert!(prompter.confirm("link?", false).unwrap());
        assert_eq!(prompter.input("repo", None).unwrap(), "me/db");
        assert_eq!(prompter.select("pick", &options(), None).unwrap(), 1);

        assert!(!prompter.is_interactive());
        assert!(matches!(
            prompter.confirm("again?", true),
            Err(PromptError::NotInteractive)
        ));
        assert_eq!(prompter.asked(), vec!["link?", "repo", "pick", "again?"]);
    }

    #[test]
    fn scripted_rejects_mismatched_answer() {
        let prompter = ScriptedPrompter::new([Answer::Select(0)]);
        assert!(prompter.confirm("sure?", false).is_err());
    }
}
