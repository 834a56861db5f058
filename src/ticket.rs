//! Ticket key extraction and per-entry resolution of key plus clean description.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::MergedEntry;
use crate::prompt::{LinePrompt, PromptError, Terminal};
use crate::summary::SkipReason;

pub const DEFAULT_TICKET_PATTERN: &str = "[A-Z][A-Z0-9]*-[0-9]+";

static DEFAULT_PATTERN: Lazy<TicketPattern> = Lazy::new(|| {
    TicketPattern::new(DEFAULT_TICKET_PATTERN).expect("default ticket pattern is valid")
});

static LEADING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\p{L}\p{N}]+").expect("separator regex is valid"));

/// Upper-case ticket key that matched the ticket pattern. Existence in the tracker is not implied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketKey {
    key: String,
    project: (usize, usize),
}

impl TicketKey {
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Project prefix used for rounding lists and account mapping: the `project` capture group of the
    /// ticket pattern when it has one, otherwise the part before the first `-`.
    pub fn project_key(&self) -> &str {
        let (start, end) = self.project;
        &self.key[start..end]
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone)]
pub struct TicketPattern {
    extract: Regex,
    validate: Regex,
}

impl TicketPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            extract: Regex::new(&format!("^(?:{pattern})"))?,
            validate: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    pub fn default_pattern() -> &'static TicketPattern {
        &DEFAULT_PATTERN
    }

    /// Finds a key at the start of `description`, matched as written (no case folding); returns it
    /// with the byte length it occupied.
    pub fn extract(&self, description: &str) -> Option<(TicketKey, usize)> {
        let found = self.extract.find(description)?;
        let key = self.parse(found.as_str())?;
        Some((key, found.end()))
    }

    /// Upper-cases `input` and accepts it only when the whole string matches the pattern.
    pub fn parse(&self, input: &str) -> Option<TicketKey> {
        let candidate = input.trim().to_uppercase();
        let captures = self.validate.captures(&candidate)?;
        let project = match captures.name("project") {
            Some(group) => (group.start(), group.end()),
            None => (0, candidate.find('-').unwrap_or(candidate.len())),
        };
        Some(TicketKey {
            key: candidate,
            project,
        })
    }
}

/// Removes separators such as `: ` or ` - ` left after the key was cut from the description.
pub fn clean_description(rest: &str) -> String {
    LEADING_SEPARATOR.replace(rest, "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { key: TicketKey, description: String },
    Skipped(SkipReason),
}

/// Resolves the ticket key and worklog description of a merged entry, prompting when either is missing.
pub struct TicketResolver<'a> {
    pattern: &'a TicketPattern,
}

impl<'a> TicketResolver<'a> {
    pub fn new(pattern: &'a TicketPattern) -> Self {
        Self { pattern }
    }

    pub async fn resolve<T>(&self, entry: &MergedEntry, terminal: &T) -> Result<Resolution, PromptError>
    where
        T: Terminal + ?Sized,
    {
        let text = entry.description.as_deref().unwrap_or("").trim();

        let (key, remainder) = match self.pattern.extract(text) {
            Some((key, end)) => (key, clean_description(&text[end..])),
            None => {
                log::warn!("No issue key found in \"{}\"", entry.label());
                let entered = LinePrompt::new("Enter new issue key or leave empty to skip: ")
                    .retry_message("Invalid issue key, try again or leave empty to skip: ")
                    .allow_empty()
                    .transform(str::to_uppercase)
                    .ask(terminal, |input| self.pattern.parse(input).is_some())
                    .await?;
                match self.pattern.parse(&entered) {
                    Some(key) => (key, text.to_string()),
                    None if entered.is_empty() => {
                        return Ok(Resolution::Skipped(SkipReason::NoTicketKey))
                    }
                    None => return Ok(Resolution::Skipped(SkipReason::InvalidTicketKey)),
                }
            }
        };

        if !remainder.is_empty() {
            return Ok(Resolution::Resolved {
                key,
                description: remainder,
            });
        }

        log::warn!("No description left for {}", key);
        let prompt = LinePrompt::new("Enter new issue description: ")
            .retry_message("Description must not be empty: ")
            .max_attempts(3);
        match prompt.ask(terminal, |input| !input.is_empty()).await {
            Ok(description) => Ok(Resolution::Resolved { key, description }),
            Err(PromptError::TooManyAttempts { .. }) => {
                Ok(Resolution::Skipped(SkipReason::NoDescription))
            }
            Err(err) => Err(err),
        }
    }
}
