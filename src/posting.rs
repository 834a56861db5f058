//! Posting orchestrator: submits prepared worklogs and collects failures instead of aborting.
//!
//! Worklogs for different tickets are posted concurrently; worklogs for the same
//! ticket go one after another so chained remaining estimates land in order.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use crate::estimate::auto_subtract;
use crate::format::format_time;
use crate::model::{EstimateBasis, PreparedWorklog};
use crate::services::WorklogService;
use crate::summary::{FailedRecord, PostedEntry};
use crate::ticket::TicketKey;

#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Posted { worklog: PreparedWorklog, worklog_id: i64 },
    Failed { worklog: PreparedWorklog, reason: String },
}

impl PostOutcome {
    pub fn worklog(&self) -> &PreparedWorklog {
        match self {
            PostOutcome::Posted { worklog, .. } | PostOutcome::Failed { worklog, .. } => worklog,
        }
    }
}

pub struct PostingOrchestrator {
    concurrency: usize,
}

impl PostingOrchestrator {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Posts every worklog once. Outcomes come back in input order.
    pub async fn post_all(
        &self,
        service: &dyn WorklogService,
        worklogs: Vec<PreparedWorklog>,
    ) -> Vec<PostOutcome> {
        let total = worklogs.len();
        let mut groups: Vec<Vec<(usize, PreparedWorklog)>> = Vec::new();
        let mut group_of: HashMap<TicketKey, usize> = HashMap::new();
        for (index, worklog) in worklogs.into_iter().enumerate() {
            let group = *group_of
                .entry(worklog.ticket.key.clone())
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
            groups[group].push((index, worklog));
        }

        let mut outcomes: Vec<(usize, PostOutcome)> = stream::iter(groups)
            .map(|group| post_group(service, group))
            .buffer_unordered(self.concurrency)
            .flat_map(stream::iter)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);
        debug_assert_eq!(outcomes.len(), total);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Posts one ticket's worklogs in order. `settled` is the ticket's estimate after the worklogs handled
/// so far; a failed worklog leaves it where it was, and later subtracted estimates are re-derived from it.
async fn post_group(
    service: &dyn WorklogService,
    group: Vec<(usize, PreparedWorklog)>,
) -> Vec<(usize, PostOutcome)> {
    let mut outcomes = Vec::with_capacity(group.len());
    let mut settled: Option<i64> = None;
    for (index, mut worklog) in group {
        if let Some(actual) = settled {
            rebase_estimate(&mut worklog, actual);
        }
        let outcome = post_one(service, worklog).await;
        settled = settled_estimate(&outcome, settled);
        outcomes.push((index, outcome));
    }
    outcomes
}

fn rebase_estimate(worklog: &mut PreparedWorklog, actual_before: i64) {
    let Some(basis) = worklog.estimate_basis else {
        return;
    };
    if basis.before_seconds() == actual_before {
        return;
    }
    match basis {
        EstimateBasis::Subtracted { .. } => {
            let seconds = auto_subtract(actual_before, worklog.billable_seconds);
            log::debug!(
                "{}: remaining estimate recalculated from {} to {}",
                worklog.ticket.key,
                format_time(actual_before),
                format_time(seconds)
            );
            worklog.remaining_estimate_seconds = Some(seconds);
            worklog.estimate_basis = Some(EstimateBasis::Subtracted {
                before_seconds: actual_before,
            });
        }
        EstimateBasis::Fixed { .. } => {
            worklog.estimate_basis = Some(EstimateBasis::Fixed {
                before_seconds: actual_before,
            });
        }
    }
}

fn settled_estimate(outcome: &PostOutcome, settled: Option<i64>) -> Option<i64> {
    match outcome {
        PostOutcome::Posted { worklog, .. } => worklog.remaining_estimate_seconds.or(settled),
        PostOutcome::Failed { worklog, .. } => worklog
            .estimate_basis
            .map(|basis| basis.before_seconds())
            .or(settled),
    }
}

async fn post_one(service: &dyn WorklogService, worklog: PreparedWorklog) -> PostOutcome {
    match service.post_worklog(&worklog).await {
        Ok(posted) => match posted.id {
            Some(worklog_id) => {
                log::info!("✓ Posted {}", worklog.nicename());
                PostOutcome::Posted { worklog, worklog_id }
            }
            None => PostOutcome::Failed {
                worklog,
                reason: "response did not contain a worklog id".to_string(),
            },
        },
        Err(err) => PostOutcome::Failed {
            worklog,
            reason: err.to_string(),
        },
    }
}

/// Splits outcomes into summary records, keeping input order within each list.
pub fn summarize(outcomes: &[PostOutcome]) -> (Vec<PostedEntry>, Vec<FailedRecord>) {
    let mut posted = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            PostOutcome::Posted { worklog, worklog_id } => posted.push(PostedEntry {
                label: worklog.nicename(),
                worklog_id: *worklog_id,
                seconds: worklog.billable_seconds,
            }),
            PostOutcome::Failed { worklog, reason } => failed.push(FailedRecord {
                label: worklog.nicename(),
                reason: reason.clone(),
            }),
        }
    }
    (posted, failed)
}
