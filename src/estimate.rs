//! Remaining-estimate reconciliation, computed before posting and sent with the worklog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::format::format_time;
use crate::model::{EstimateBasis, ResolvedTicket};
use crate::prompt::{KeyPrompt, LinePrompt, PromptError, Terminal};
use crate::ticket::TicketKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStrategy {
    Keep,
    #[default]
    Auto,
    Manual,
}

/// New remaining estimate after logging `logged_seconds`; never negative.
pub fn auto_subtract(remaining_seconds: i64, logged_seconds: i64) -> i64 {
    (remaining_seconds - logged_seconds).max(0)
}

/// Remaining estimate to attach to one worklog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateUpdate {
    pub seconds: i64,
    pub basis: EstimateBasis,
}

/// Tracks the projected remaining estimate per ticket so several worklogs on
/// one ticket subtract from each other's result instead of the stale tracker value.
pub struct EstimateReconciler {
    strategy: EstimateStrategy,
    projected: HashMap<TicketKey, i64>,
}

impl EstimateReconciler {
    pub fn new(strategy: EstimateStrategy) -> Self {
        Self {
            strategy,
            projected: HashMap::new(),
        }
    }

    /// Uses the estimate fetched when the ticket was validated; no extra tracker call.
    pub async fn reconcile<T>(
        &mut self,
        ticket: &ResolvedTicket,
        logged_seconds: i64,
        terminal: &T,
    ) -> Result<Option<EstimateUpdate>, PromptError>
    where
        T: Terminal + ?Sized,
    {
        if self.strategy == EstimateStrategy::Keep {
            return Ok(None);
        }

        let key = &ticket.key;
        let remaining = self
            .projected
            .get(key)
            .copied()
            .or(ticket.remaining_estimate_seconds);
        let Some(remaining) = remaining else {
            log::warn!("{} has no remaining estimate, leaving it untouched", key);
            return Ok(None);
        };

        let update = match self.strategy {
            EstimateStrategy::Keep => return Ok(None),
            EstimateStrategy::Auto => Some(subtracted(remaining, logged_seconds)),
            EstimateStrategy::Manual => ask_manual(key, remaining, logged_seconds, terminal).await?,
        };

        if let Some(update) = update {
            self.projected.insert(key.clone(), update.seconds);
            log::debug!(
                "{}: remaining estimate {} -> {}",
                key,
                format_time(remaining),
                format_time(update.seconds)
            );
        }
        Ok(update)
    }
}

fn subtracted(remaining: i64, logged: i64) -> EstimateUpdate {
    EstimateUpdate {
        seconds: auto_subtract(remaining, logged),
        basis: EstimateBasis::Subtracted {
            before_seconds: remaining,
        },
    }
}

async fn ask_manual<T>(
    ticket: &TicketKey,
    remaining: i64,
    logged: i64,
    terminal: &T,
) -> Result<Option<EstimateUpdate>, PromptError>
where
    T: Terminal + ?Sized,
{
    log::info!(
        "{} has {} remaining, logging {}",
        ticket,
        format_time(remaining),
        format_time(logged)
    );
    let choice = KeyPrompt::new("Remaining estimate: (a)uto-subtract, (k)eep, (m)anual or (z)ero? ")
        .retry_message("Please press a, k, m or z: ")
        .default_value("a")
        .ask(terminal, |input| matches!(input, "a" | "k" | "m" | "z"))
        .await?;

    let fixed = |seconds| EstimateUpdate {
        seconds,
        basis: EstimateBasis::Fixed {
            before_seconds: remaining,
        },
    };
    Ok(match choice.as_str() {
        "k" => None,
        "z" => Some(fixed(0)),
        "m" => {
            let minutes = LinePrompt::new("New remaining estimate in minutes: ")
                .retry_message("Enter a whole number of minutes: ")
                .ask(terminal, |input| input.parse::<u32>().is_ok())
                .await?;
            minutes.parse::<i64>().ok().map(|minutes| fixed(minutes * 60))
        }
        _ => Some(subtracted(remaining, logged)),
    })
}
