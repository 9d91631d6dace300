//! Vote Repository - PostgreSQL operations for accepted ballots using sqlx
//!
//! `VoteStore` is the storage contract: an append-only collection of
//! accepted ballots, queryable by source address within a time window.
//! `VoteRepository` backs it with PostgreSQL; `MemoryVoteStore`
//! (database::memory) backs development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use crate::admission::TriState;

/// Column bounds, enforced before append and mirrored by the schema.
pub const MAX_ADDRESS_LEN: usize = 45;
pub const MAX_USER_AGENT_LEN: usize = 256;
pub const MAX_PLACE_LEN: usize = 100;
pub const MAX_CHOICE_LEN: usize = 128;

/// One accepted ballot, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: i64,
    /// Acceptance time, assigned by the store. Never mutated.
    pub cast_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub country: String,
    pub city: String,
    pub vpn: TriState,
    pub proxy: TriState,
    pub tor: TriState,
    pub first_vote: String,
    pub second_vote: String,
}

/// Field set for an append. Identifier and timestamp are assigned by
/// the store, not the caller.
#[derive(Debug, Clone)]
pub struct NewVote {
    pub ip_address: String,
    pub user_agent: String,
    pub country: String,
    pub city: String,
    pub vpn: TriState,
    pub proxy: TriState,
    pub tor: TriState,
    pub first_vote: String,
    pub second_vote: String,
}

/// Append-only vote storage.
///
/// `append` is atomic and durable before it returns; no reader observes
/// a partial record. `find_recent_by_address` returns the latest record
/// with `cast_at` strictly after `since`; equal timestamps resolve by
/// identifier, descending.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn find_recent_by_address(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<VoteRecord>, String>;

    async fn append(&self, vote: NewVote) -> Result<VoteRecord, String>;
}

#[derive(Debug, Clone)]
pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteStore for VoteRepository {
    async fn find_recent_by_address(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<VoteRecord>, String> {
        let row = sqlx::query(
            r#"
            SELECT id, cast_at, ip_address, user_agent, country, city,
                   vpn, proxy, tor, first_vote, second_vote
            FROM votes
            WHERE ip_address = $1 AND cast_at > $2
            ORDER BY cast_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(address)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to query recent vote: {}", e))?;

        if let Some(row) = row {
            Ok(Some(VoteRecord {
                id: row.get("id"),
                cast_at: row.get("cast_at"),
                ip_address: row.get("ip_address"),
                user_agent: row.get("user_agent"),
                country: row.get("country"),
                city: row.get("city"),
                vpn: tri_state_column(row.get("vpn")),
                proxy: tri_state_column(row.get("proxy")),
                tor: tri_state_column(row.get("tor")),
                first_vote: row.get("first_vote"),
                second_vote: row.get("second_vote"),
            }))
        } else {
            Ok(None)
        }
    }

    async fn append(&self, vote: NewVote) -> Result<VoteRecord, String> {
        let cast_at = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO votes
            (cast_at, ip_address, user_agent, country, city,
             vpn, proxy, tor, first_vote, second_vote)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(cast_at)
        .bind(&vote.ip_address)
        .bind(&vote.user_agent)
        .bind(&vote.country)
        .bind(&vote.city)
        .bind(vote.vpn.as_str())
        .bind(vote.proxy.as_str())
        .bind(vote.tor.as_str())
        .bind(&vote.first_vote)
        .bind(&vote.second_vote)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| format!("Failed to append vote: {}", e))?;

        let record = VoteRecord {
            id: row.get("id"),
            cast_at,
            ip_address: vote.ip_address,
            user_agent: vote.user_agent,
            country: vote.country,
            city: vote.city,
            vpn: vote.vpn,
            proxy: vote.proxy,
            tor: vote.tor,
            first_vote: vote.first_vote,
            second_vote: vote.second_vote,
        };

        debug!(vote_id = record.id, address = %record.ip_address, "Vote appended");
        Ok(record)
    }
}

/// Flags are written as `true`/`false`/`unknown`; anything else reads
/// back as `Unknown` instead of failing the lookup.
fn tri_state_column(raw: String) -> TriState {
    raw.parse().unwrap_or_else(|_| {
        warn!(value = %raw, "Unrecognized anonymization flag in store");
        TriState::Unknown
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_state_column_decode() {
        assert_eq!(tri_state_column("true".to_string()), TriState::True);
        assert_eq!(tri_state_column("false".to_string()), TriState::False);
        assert_eq!(tri_state_column("unknown".to_string()), TriState::Unknown);
        assert_eq!(tri_state_column("garbage".to_string()), TriState::Unknown);
    }
}
