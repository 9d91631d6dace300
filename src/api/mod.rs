//! HTTP API for the poll collector
//!
//! One public surface: the ballot form, the submission endpoint, the
//! acknowledgment page and a liveness check. Handlers stay thin; the
//! admission pipeline lives in `crate::admission`.

pub mod poll;

pub use poll::{ApiError, BallotForm, PollApiState, create_router};
