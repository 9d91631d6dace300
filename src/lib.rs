//! Pollbox
//!
//! Single-endpoint public opinion poll collector. Every ballot passes
//! through a vote-admission pipeline: duplicate suppression per address,
//! IP intelligence screening against anonymizing networks, then durable
//! persistence of the full vote record.
//!
//! ## Module Structure
//!
//! ```text
//! pollbox/src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── admission/     - Vote admission pipeline
//! │   ├── policy.rs  - Anonymization policy & tri-state signals
//! │   └── service.rs - Submission orchestrator
//! ├── intel/         - IP intelligence lookups
//! │   └── client.rs  - vpnapi.io-style HTTP client
//! ├── api/           - HTTP API endpoints
//! │   └── poll.rs    - Ballot form, submission, acknowledgment, health
//! └── database/      - Vote persistence
//!     ├── votes.rs   - Vote records & PostgreSQL repository
//!     ├── memory.rs  - In-memory fallback store
//!     └── pool.rs    - Connection pool & schema
//! ```

pub mod admission;
pub mod api;
pub mod config;
pub mod database;
pub mod intel;

// Re-export main types for convenience
pub use config::PollConfig;
pub use database::pool::DatabasePool;
pub use database::{MemoryVoteStore, NewVote, VoteRecord, VoteRepository, VoteStore};

// Re-export admission types
pub use admission::{
    CandidateVote, Decision, Enrichment, SubmissionOutcome, SubmitError, TriState, VoteService,
};

// Re-export intelligence types
pub use intel::{IntelClient, IntelConfig, IntelLookup, IntelReport, LookupError};

// Re-export API types
pub use api::{PollApiState, create_router};
