//! Vote Storage Module
//!
//! Provides the append-only store of accepted ballots: the `VoteStore`
//! contract, the PostgreSQL repository behind it, and an in-memory
//! backend for development and tests.

pub mod memory;
pub mod pool;
pub mod votes;

pub use memory::MemoryVoteStore;
pub use pool::DatabasePool;
pub use votes::{NewVote, VoteRecord, VoteRepository, VoteStore};
