//! Vote Admission Module
//!
//! The decision pipeline core: a pure policy over intelligence reports,
//! and the per-submission orchestration around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐    window     ┌───────────────┐
//! │ VoteService   │──────────────►│ VoteStore     │
//! │ (one request) │    lookup     │ (append-only) │
//! └───────┬───────┘◄──────────────└───────────────┘
//!         │
//!         │ report         ┌───────────────┐
//!         ├───────────────►│ IntelLookup   │
//!         │                └───────────────┘
//!         ▼
//! ┌───────────────┐
//! │ policy        │  pure: Accept(enrichment) / Reject(signals)
//! └───────────────┘
//! ```

pub mod policy;
pub mod service;

pub use policy::{AnonymizationDetected, Decision, Enrichment, TriState, UNKNOWN_FIELD, evaluate};
pub use service::{
    CandidateVote, DUPLICATE_WINDOW_HOURS, SubmissionOutcome, SubmitError, VoteService,
};
