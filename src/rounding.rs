//! Rounding policy: which projects are rounded, the automatic up/down rule and
//! the interactive fallback for durations in the ambiguous middle of an interval.
//!
//! Every rounded duration is floored to a whole minute afterwards, and projects
//! covered by the strategy are raised to the configured minimum entry length.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::RoundingSettings;
use crate::format::format_time;
use crate::prompt::{KeyPrompt, PromptError, Terminal};
use crate::ticket::TicketKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoundingStrategy {
    #[default]
    All,
    None,
    Blacklist,
    Whitelist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDecision {
    /// Already on an interval boundary.
    Unchanged,
    Auto(Direction),
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundingConfig {
    pub enabled: bool,
    pub interval_seconds: i64,
    pub upper_threshold_seconds: i64,
    pub lower_threshold_seconds: i64,
    pub strategy: RoundingStrategy,
    pub project_list: BTreeSet<String>,
    pub min_entry_seconds: i64,
}

impl RoundingConfig {
    pub fn from_settings(settings: &RoundingSettings) -> Self {
        let project_list = match settings.strategy {
            RoundingStrategy::Blacklist => settings.blacklist.clone(),
            RoundingStrategy::Whitelist => settings.whitelist.clone(),
            RoundingStrategy::All | RoundingStrategy::None => BTreeSet::new(),
        };
        Self {
            enabled: settings.enabled,
            interval_seconds: i64::from(settings.interval_minutes.max(1)) * 60,
            upper_threshold_seconds: i64::from(settings.round_up_threshold_minutes) * 60,
            lower_threshold_seconds: i64::from(settings.round_down_threshold_minutes) * 60,
            strategy: settings.strategy,
            project_list,
            min_entry_seconds: i64::from(settings.min_entry_minutes) * 60,
        }
    }

    pub fn applies_to(&self, project_key: &str) -> bool {
        match self.strategy {
            RoundingStrategy::All => true,
            RoundingStrategy::None => false,
            RoundingStrategy::Blacklist => !self.project_list.contains(project_key),
            RoundingStrategy::Whitelist => self.project_list.contains(project_key),
        }
    }
}

/// Automatic rule for a duration the strategy covers: up when close to the next
/// boundary, down when close to the previous one, otherwise ask.
pub fn decide(duration_seconds: i64, config: &RoundingConfig) -> RoundingDecision {
    let interval = config.interval_seconds;
    let remainder = duration_seconds.rem_euclid(interval);
    if remainder == 0 {
        RoundingDecision::Unchanged
    } else if interval - remainder <= config.upper_threshold_seconds {
        RoundingDecision::Auto(Direction::Up)
    } else if remainder <= config.lower_threshold_seconds {
        RoundingDecision::Auto(Direction::Down)
    } else {
        RoundingDecision::Ambiguous
    }
}

/// Rounds to a multiple of `interval`; `Nearest` rounds half up.
pub fn round_to_interval(duration_seconds: i64, interval: i64, direction: Direction) -> i64 {
    match direction {
        Direction::Up => -(-duration_seconds).div_euclid(interval) * interval,
        Direction::Down => duration_seconds.div_euclid(interval) * interval,
        Direction::Nearest => (2 * duration_seconds + interval).div_euclid(2 * interval) * interval,
    }
}

pub fn floor_to_minute(duration_seconds: i64) -> i64 {
    duration_seconds.div_euclid(60) * 60
}

pub fn apply_min_entry(duration_seconds: i64, min_entry_seconds: i64) -> i64 {
    if min_entry_seconds > 0 && duration_seconds < min_entry_seconds {
        min_entry_seconds
    } else {
        duration_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundingOutcome {
    pub original_seconds: i64,
    pub final_seconds: i64,
}

impl RoundingOutcome {
    pub fn delta(&self) -> i64 {
        self.final_seconds - self.original_seconds
    }
}

pub struct RoundingEngine {
    config: RoundingConfig,
}

impl RoundingEngine {
    pub fn new(config: RoundingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoundingConfig {
        &self.config
    }

    pub async fn round<T>(
        &self,
        duration_seconds: i64,
        ticket: &TicketKey,
        terminal: &T,
    ) -> Result<RoundingOutcome, PromptError>
    where
        T: Terminal + ?Sized,
    {
        let config = &self.config;
        let applies = config.applies_to(ticket.project_key());
        let mut seconds = duration_seconds;

        if config.enabled && applies {
            let direction = match decide(seconds, config) {
                RoundingDecision::Unchanged => None,
                RoundingDecision::Auto(direction) => Some(direction),
                RoundingDecision::Ambiguous => self.ask_direction(seconds, ticket, terminal).await?,
            };
            if let Some(direction) = direction {
                seconds = round_to_interval(seconds, config.interval_seconds, direction);
            }
        }

        seconds = floor_to_minute(seconds);
        if applies {
            seconds = apply_min_entry(seconds, config.min_entry_seconds);
        }

        if seconds != duration_seconds {
            log::debug!(
                "{}: {} -> {}",
                ticket,
                format_time(duration_seconds),
                format_time(seconds)
            );
        }

        Ok(RoundingOutcome {
            original_seconds: duration_seconds,
            final_seconds: seconds,
        })
    }

    async fn ask_direction<T>(
        &self,
        seconds: i64,
        ticket: &TicketKey,
        terminal: &T,
    ) -> Result<Option<Direction>, PromptError>
    where
        T: Terminal + ?Sized,
    {
        log::info!(
            "{} took {}, which is not close to a {} boundary",
            ticket,
            format_time(seconds),
            format_time(self.config.interval_seconds)
        );
        let answer = KeyPrompt::new("Round (u)p, (d)own, (n)earest or empty to skip rounding: ")
            .retry_message("Please press u, d, n or Enter: ")
            .ask(terminal, |input| matches!(input, "u" | "d" | "n"))
            .await?;
        Ok(match answer.as_str() {
            "u" => Some(Direction::Up),
            "d" => Some(Direction::Down),
            "n" => Some(Direction::Nearest),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{key, ScriptedTerminal};

    fn config(strategy: RoundingStrategy) -> RoundingConfig {
        RoundingConfig {
            enabled: true,
            interval_seconds: 900,
            upper_threshold_seconds: 60,
            lower_threshold_seconds: 60,
            strategy,
            project_list: BTreeSet::new(),
            min_entry_seconds: 0,
        }
    }

    async fn round_with(config: RoundingConfig, seconds: i64, answers: &[&str]) -> i64 {
        let terminal = ScriptedTerminal::new(answers.iter().copied());
        RoundingEngine::new(config)
            .round(seconds, &key("DEV-1"), &terminal)
            .await
            .expect("round")
            .final_seconds
    }

    #[test]
    fn decide_picks_direction_from_thresholds() {
        let config = config(RoundingStrategy::All);
        assert_eq!(decide(840, &config), RoundingDecision::Auto(Direction::Up));
        assert_eq!(decide(60, &config), RoundingDecision::Auto(Direction::Down));
        assert_eq!(decide(450, &config), RoundingDecision::Ambiguous);
        assert_eq!(decide(1800, &config), RoundingDecision::Unchanged);
    }

    #[test]
    fn overlapping_thresholds_prefer_rounding_up() {
        let mut config = config(RoundingStrategy::All);
        config.upper_threshold_seconds = 600;
        config.lower_threshold_seconds = 600;
        assert_eq!(decide(450, &config), RoundingDecision::Auto(Direction::Up));
        assert_eq!(decide(200, &config), RoundingDecision::Auto(Direction::Down));
    }

    #[test]
    fn round_to_interval_directions() {
        assert_eq!(round_to_interval(840, 900, Direction::Up), 900);
        assert_eq!(round_to_interval(900, 900, Direction::Up), 900);
        assert_eq!(round_to_interval(1000, 900, Direction::Down), 900);
        assert_eq!(round_to_interval(450, 900, Direction::Nearest), 900);
        assert_eq!(round_to_interval(449, 900, Direction::Nearest), 0);
        assert_eq!(round_to_interval(1400, 900, Direction::Nearest), 1800);
    }

    #[test]
    fn strategy_membership() {
        let mut blacklist = config(RoundingStrategy::Blacklist);
        blacklist.project_list.insert("DEV".into());
        assert!(!blacklist.applies_to("DEV"));
        assert!(blacklist.applies_to("OPS"));

        let mut whitelist = config(RoundingStrategy::Whitelist);
        whitelist.project_list.insert("DEV".into());
        assert!(whitelist.applies_to("DEV"));
        assert!(!whitelist.applies_to("OPS"));

        assert!(config(RoundingStrategy::All).applies_to("ANY"));
        assert!(!config(RoundingStrategy::None).applies_to("ANY"));
    }

    #[test]
    fn from_settings_converts_minutes_and_picks_list() {
        let mut settings = RoundingSettings::default();
        settings.strategy = RoundingStrategy::Whitelist;
        settings.whitelist.insert("DEV".into());
        settings.blacklist.insert("OPS".into());
        settings.min_entry_minutes = 5;

        let config = RoundingConfig::from_settings(&settings);
        assert_eq!(config.interval_seconds, 900);
        assert_eq!(config.upper_threshold_seconds, 300);
        assert_eq!(config.min_entry_seconds, 300);
        assert!(config.project_list.contains("DEV"));
        assert!(!config.project_list.contains("OPS"));
    }

    #[tokio::test]
    async fn rounds_up_near_boundary() {
        assert_eq!(round_with(config(RoundingStrategy::All), 840, &[]).await, 900);
    }

    #[tokio::test]
    async fn rounds_down_to_zero() {
        assert_eq!(round_with(config(RoundingStrategy::All), 60, &[]).await, 0);
    }

    #[tokio::test]
    async fn ambiguous_duration_asks_and_nearest_rounds_half_up() {
        assert_eq!(round_with(config(RoundingStrategy::All), 450, &["n"]).await, 900);
    }

    #[tokio::test]
    async fn ambiguous_duration_can_be_left_unrounded() {
        assert_eq!(round_with(config(RoundingStrategy::All), 455, &[""]).await, 420);
    }

    #[tokio::test]
    async fn ambiguous_prompt_retries_invalid_keys() {
        assert_eq!(round_with(config(RoundingStrategy::All), 450, &["x", "d"]).await, 0);
    }

    #[tokio::test]
    async fn strategy_none_only_floors_to_minute() {
        for (upper, lower) in [(0, 0), (60, 60), (900, 900), (300, 0)] {
            let mut config = config(RoundingStrategy::None);
            config.upper_threshold_seconds = upper;
            config.lower_threshold_seconds = lower;
            config.min_entry_seconds = 600;
            for seconds in [0, 59, 61, 450, 840, 899, 3599, 3661] {
                assert_eq!(
                    round_with(config.clone(), seconds, &[]).await,
                    floor_to_minute(seconds)
                );
            }
        }
    }

    #[tokio::test]
    async fn disabled_rounding_still_floors_to_minute() {
        let mut config = config(RoundingStrategy::All);
        config.enabled = false;
        assert_eq!(round_with(config, 845, &[]).await, 840);
    }

    #[tokio::test]
    async fn min_entry_raises_short_durations_only() {
        let mut config = config(RoundingStrategy::All);
        config.enabled = false;
        config.min_entry_seconds = 300;
        assert_eq!(round_with(config.clone(), 120, &[]).await, 300);
        assert_eq!(round_with(config, 600, &[]).await, 600);
    }

    #[tokio::test]
    async fn min_entry_ignores_excluded_projects() {
        let mut config = config(RoundingStrategy::Blacklist);
        config.project_list.insert("DEV".into());
        config.min_entry_seconds = 300;
        assert_eq!(round_with(config, 120, &[]).await, 120);
    }

    #[tokio::test]
    async fn outcome_reports_signed_delta() {
        let terminal = ScriptedTerminal::new(Vec::<&str>::new());
        let engine = RoundingEngine::new(config(RoundingStrategy::All));

        let up = engine.round(840, &key("DEV-1"), &terminal).await.unwrap();
        let down = engine.round(960, &key("DEV-1"), &terminal).await.unwrap();

        assert_eq!(up.delta(), 60);
        assert_eq!(down.delta(), -60);
    }
}
