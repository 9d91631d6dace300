//! Vote Admission Service
//!
//! Per-submission orchestration of the decision pipeline:
//!
//! 1. window lookup: a vote from this address inside the last 24 hours
//!    short-circuits everything else
//! 2. intelligence lookup: unavailable means the ballot is declined,
//!    never an escaped error
//! 3. policy evaluation: confirmed anonymization signals decline
//! 4. append: exactly one store write, on the accept path only
//!
//! The service holds no state between submissions; both backends are
//! injected at construction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::admission::policy::{self, Decision};
use crate::database::votes::{
    MAX_ADDRESS_LEN, MAX_CHOICE_LEN, MAX_PLACE_LEN, MAX_USER_AGENT_LEN, NewVote, VoteRecord,
    VoteStore,
};
use crate::intel::IntelLookup;

/// Rolling duplicate window, measured backward from submission time.
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;

/// An incoming submission, not yet admitted or rejected.
#[derive(Debug, Clone)]
pub struct CandidateVote {
    pub ip_address: String,
    pub user_agent: String,
    pub first_vote: String,
    pub second_vote: String,
}

/// Terminal state of one submission.
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Persisted; carries the record as stored.
    Accepted(VoteRecord),
    /// A vote from this address already sits inside the rolling window.
    RejectedDuplicate { next_eligible: DateTime<Utc> },
    /// A vpn, proxy or tor signal was confirmed.
    RejectedAnonymized,
    /// The intelligence service could not be consulted; the caller may retry.
    RejectedLookupUnavailable,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Store read or write failed; the vote is not counted.
    #[error("vote store failure: {0}")]
    Store(String),
}

pub struct VoteService {
    store: Arc<dyn VoteStore>,
    intel: Arc<dyn IntelLookup>,
}

impl VoteService {
    pub fn new(store: Arc<dyn VoteStore>, intel: Arc<dyn IntelLookup>) -> Self {
        Self { store, intel }
    }

    /// Run one candidate submission through the admission pipeline.
    ///
    /// The window check and the append are separate store calls with no
    /// isolation between them; near-simultaneous submissions from one
    /// address can both pass the check. Known limitation, see DESIGN.md.
    pub async fn submit_vote(
        &self,
        candidate: CandidateVote,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let now = Utc::now();
        let window_start = now - Duration::hours(DUPLICATE_WINDOW_HOURS);

        // The clamped address is the dedup key. Check, lookup and append
        // must all use it; clamping only at the append would let an
        // overlong source dodge the window check.
        let address = clamp(candidate.ip_address, MAX_ADDRESS_LEN);

        // Duplicate check comes first: a known duplicate must not spend
        // an externally billed intelligence lookup.
        if let Some(prior) = self
            .store
            .find_recent_by_address(&address, window_start)
            .await
            .map_err(SubmitError::Store)?
        {
            let next_eligible = prior.cast_at + Duration::hours(DUPLICATE_WINDOW_HOURS);
            debug!(
                address = %address,
                next_eligible = %next_eligible,
                "Duplicate submission inside the rolling window"
            );
            return Ok(SubmissionOutcome::RejectedDuplicate { next_eligible });
        }

        let report = match self.intel.lookup(&address).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    address = %address,
                    error = %e,
                    "Intelligence lookup unavailable, ballot declined"
                );
                return Ok(SubmissionOutcome::RejectedLookupUnavailable);
            }
        };

        let enrichment = match policy::evaluate(&report) {
            Decision::Accept(enrichment) => enrichment,
            Decision::Reject(signals) => {
                info!(
                    address = %address,
                    vpn = signals.vpn,
                    proxy = signals.proxy,
                    tor = signals.tor,
                    "Anonymized source rejected"
                );
                return Ok(SubmissionOutcome::RejectedAnonymized);
            }
        };

        let record = self
            .store
            .append(NewVote {
                ip_address: address,
                user_agent: clamp(candidate.user_agent, MAX_USER_AGENT_LEN),
                country: clamp(enrichment.country, MAX_PLACE_LEN),
                city: clamp(enrichment.city, MAX_PLACE_LEN),
                vpn: enrichment.vpn,
                proxy: enrichment.proxy,
                tor: enrichment.tor,
                first_vote: clamp(candidate.first_vote, MAX_CHOICE_LEN),
                second_vote: clamp(candidate.second_vote, MAX_CHOICE_LEN),
            })
            .await
            .map_err(SubmitError::Store)?;

        info!(
            vote_id = record.id,
            country = %record.country,
            "Vote accepted"
        );
        Ok(SubmissionOutcome::Accepted(record))
    }
}

/// Truncate to at most `max` characters, on a char boundary, so an
/// overlong field never voids an admitted ballot at the column bound.
fn clamp(value: String, max: usize) -> String {
    if value.len() <= max {
        return value;
    }
    value.chars().take(max).collect()
}
