//! Interactive terminal input: line prompts and single-keypress prompts.
//!
//! Both prompt kinds retry in a loop with one read per iteration until the
//! validator accepts the answer or the optional attempt bound is reached.

use std::io::{self, IsTerminal, Write};

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("terminal input failed: {0}")]
    Io(#[from] io::Error),
    #[error("no valid answer after {attempts} attempts")]
    TooManyAttempts { attempts: usize },
}

/// Raw terminal primitives. Implementations return the answer untrimmed.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn read_line(&self, message: &str) -> io::Result<String>;

    /// Reads a single keypress; Enter yields an empty string.
    async fn read_key(&self, message: &str) -> io::Result<String>;
}

/// Free-text prompt answered with Enter.
#[derive(Clone, Copy)]
pub struct LinePrompt<'a> {
    message: &'a str,
    retry_message: Option<&'a str>,
    default: &'a str,
    allow_empty: bool,
    transform: Option<fn(&str) -> String>,
    max_attempts: Option<usize>,
}

impl<'a> LinePrompt<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            retry_message: None,
            default: "",
            allow_empty: false,
            transform: None,
            max_attempts: None,
        }
    }

    pub fn retry_message(mut self, message: &'a str) -> Self {
        self.retry_message = Some(message);
        self
    }

    /// Value returned for an empty answer when empty answers are allowed.
    pub fn default_value(mut self, value: &'a str) -> Self {
        self.default = value;
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    pub fn transform(mut self, transform: fn(&str) -> String) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub async fn ask<T, V>(&self, terminal: &T, validator: V) -> Result<String, PromptError>
    where
        T: Terminal + ?Sized,
        V: Fn(&str) -> bool,
    {
        let mut message = self.message;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let raw = terminal.read_line(message).await?;
            let trimmed = raw.trim();
            let answer = match self.transform {
                Some(transform) => transform(trimmed),
                None => trimmed.to_string(),
            };

            if answer.is_empty() && self.allow_empty {
                return Ok(self.default.to_string());
            }
            if validator(&answer) {
                return Ok(answer);
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(PromptError::TooManyAttempts { attempts });
            }
            message = self.retry_message.unwrap_or(self.message);
        }
    }
}

/// Single-keypress prompt. Answers are lower-cased and an empty answer always yields the default.
#[derive(Clone, Copy)]
pub struct KeyPrompt<'a> {
    message: &'a str,
    retry_message: Option<&'a str>,
    default: &'a str,
    max_attempts: Option<usize>,
}

impl<'a> KeyPrompt<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            retry_message: None,
            default: "",
            max_attempts: None,
        }
    }

    pub fn retry_message(mut self, message: &'a str) -> Self {
        self.retry_message = Some(message);
        self
    }

    pub fn default_value(mut self, value: &'a str) -> Self {
        self.default = value;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub async fn ask<T, V>(&self, terminal: &T, validator: V) -> Result<String, PromptError>
    where
        T: Terminal + ?Sized,
        V: Fn(&str) -> bool,
    {
        let mut message = self.message;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let answer = terminal.read_key(message).await?.trim().to_lowercase();
            if answer.is_empty() {
                return Ok(self.default.to_string());
            }
            if validator(&answer) {
                return Ok(answer);
            }
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(PromptError::TooManyAttempts { attempts });
            }
            message = self.retry_message.unwrap_or(self.message);
        }
    }
}

/// Asks a y/n question where an empty answer means "no".
pub async fn confirm<T>(terminal: &T, message: &str) -> Result<bool, PromptError>
where
    T: Terminal + ?Sized,
{
    let answer = LinePrompt::new(message)
        .retry_message("Invalid input, please enter y or n: ")
        .default_value("n")
        .allow_empty()
        .transform(str::to_lowercase)
        .ask(terminal, |input| input == "y" || input == "n")
        .await?;
    Ok(answer == "y")
}

/// Terminal backed by the process stdin/stdout.
#[derive(Clone, Copy, Default)]
pub struct ConsoleTerminal;

#[async_trait]
impl Terminal for ConsoleTerminal {
    async fn read_line(&self, message: &str) -> io::Result<String> {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || read_line_blocking(&message))
            .await
            .map_err(io::Error::other)?
    }

    async fn read_key(&self, message: &str) -> io::Result<String> {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            if io::stdin().is_terminal() {
                read_key_blocking(&message)
            } else {
                read_line_blocking(&message)
            }
        })
        .await
        .map_err(io::Error::other)?
    }
}

fn read_line_blocking(message: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", message.yellow())?;
    stdout.flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line)
}

fn read_key_blocking(message: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", message.yellow())?;
    stdout.flush()?;

    terminal::enable_raw_mode()?;
    let result = wait_for_key();
    terminal::disable_raw_mode()?;

    if let Ok(answer) = &result {
        writeln!(stdout, "{}", answer)?;
    }
    result
}

fn wait_for_key() -> io::Result<String> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
                }
                KeyCode::Char(c) => return Ok(c.to_string()),
                KeyCode::Enter | KeyCode::Esc => return Ok(String::new()),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTerminal;

    #[tokio::test]
    async fn line_prompt_retries_until_valid_with_retry_message() {
        let terminal = ScriptedTerminal::new(["bad", "  also bad ", "ok"]);
        let answer = LinePrompt::new("Enter: ")
            .retry_message("Again: ")
            .ask(&terminal, |input| input == "ok")
            .await
            .expect("answer");

        assert_eq!(answer, "ok");
        assert_eq!(terminal.prompts(), vec!["Enter: ", "Again: ", "Again: "]);
    }

    #[tokio::test]
    async fn line_prompt_empty_answer_returns_default_when_allowed() {
        let terminal = ScriptedTerminal::new([""]);
        let answer = LinePrompt::new("Save? ")
            .default_value("n")
            .allow_empty()
            .ask(&terminal, |input| input == "y")
            .await
            .expect("answer");
        assert_eq!(answer, "n");
    }

    #[tokio::test]
    async fn line_prompt_empty_answer_is_retried_when_not_allowed() {
        let terminal = ScriptedTerminal::new(["", "value"]);
        let answer = LinePrompt::new("Token: ")
            .ask(&terminal, |input| !input.is_empty())
            .await
            .expect("answer");
        assert_eq!(answer, "value");
        assert_eq!(terminal.remaining(), 0);
    }

    #[tokio::test]
    async fn line_prompt_applies_transform_before_validation() {
        let terminal = ScriptedTerminal::new(["dev-12"]);
        let answer = LinePrompt::new("Key: ")
            .transform(str::to_uppercase)
            .ask(&terminal, |input| input == "DEV-12")
            .await
            .expect("answer");
        assert_eq!(answer, "DEV-12");
    }

    #[tokio::test]
    async fn bounded_prompt_gives_up_after_max_attempts() {
        let terminal = ScriptedTerminal::new(["x", "y", "z", "never read"]);
        let err = LinePrompt::new("Pick: ")
            .max_attempts(3)
            .ask(&terminal, |_| false)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptError::TooManyAttempts { attempts: 3 }));
        assert_eq!(terminal.remaining(), 1);
    }

    #[tokio::test]
    async fn exhausted_input_surfaces_io_error() {
        let terminal = ScriptedTerminal::new(Vec::<&str>::new());
        let err = LinePrompt::new("Anything: ")
            .ask(&terminal, |_| true)
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::Io(_)));
    }

    #[tokio::test]
    async fn key_prompt_lowercases_and_defaults_on_enter() {
        let terminal = ScriptedTerminal::new(["Q", "U", ""]);
        let validator = |input: &str| matches!(input, "u" | "d" | "n");

        let first = KeyPrompt::new("Round: ")
            .default_value("")
            .ask(&terminal, validator)
            .await
            .expect("answer");
        assert_eq!(first, "u");

        let second = KeyPrompt::new("Round: ")
            .default_value("a")
            .ask(&terminal, validator)
            .await
            .expect("answer");
        assert_eq!(second, "a");
    }

    #[tokio::test]
    async fn confirm_accepts_uppercase_yes_and_defaults_to_no() {
        let terminal = ScriptedTerminal::new(["Y", "", "maybe", "n"]);
        assert!(confirm(&terminal, "Sure? ").await.expect("first"));
        assert!(!confirm(&terminal, "Sure? ").await.expect("second"));
        assert!(!confirm(&terminal, "Sure? ").await.expect("third"));
    }
}
