//! In-Memory Vote Storage
//!
//! Backs development runs without PostgreSQL and the test suite. Same
//! contract as `VoteRepository`; contents live and die with the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::votes::{NewVote, VoteRecord, VoteStore};

#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: Vec<VoteRecord>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn find_recent_by_address(
        &self,
        address: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<VoteRecord>, String> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|r| r.ip_address == address && r.cast_at > since)
            .max_by_key(|r| (r.cast_at, r.id))
            .cloned())
    }

    async fn append(&self, vote: NewVote) -> Result<VoteRecord, String> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;

        let record = VoteRecord {
            id: inner.next_id,
            cast_at: Utc::now(),
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

        inner.records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::TriState;
    use chrono::Duration;

    fn sample_vote(address: &str) -> NewVote {
        NewVote {
            ip_address: address.to_string(),
            user_agent: "test-agent".to_string(),
            country: "Poland".to_string(),
            city: "Warsaw".to_string(),
            vpn: TriState::False,
            proxy: TriState::False,
            tor: TriState::False,
            first_vote: "A".to_string(),
            second_vote: "B".to_string(),
        }
    }

    fn record_at(id: i64, address: &str, cast_at: DateTime<Utc>) -> VoteRecord {
        VoteRecord {
            id,
            cast_at,
            ip_address: address.to_string(),
            user_agent: "test-agent".to_string(),
            country: "Poland".to_string(),
            city: "Warsaw".to_string(),
            vpn: TriState::False,
            proxy: TriState::False,
            tor: TriState::False,
            first_vote: "A".to_string(),
            second_vote: "B".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let store = MemoryVoteStore::new();
        let first = store.append(sample_vote("1.2.3.4")).await.unwrap();
        let second = store.append(sample_vote("5.6.7.8")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_is_scoped_to_address() {
        let store = MemoryVoteStore::new();
        store.append(sample_vote("1.2.3.4")).await.unwrap();

        let since = Utc::now() - Duration::hours(24);
        assert!(
            store
                .find_recent_by_address("1.2.3.4", since)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find_recent_by_address("5.6.7.8", since)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_window_boundary_is_strict() {
        let store = MemoryVoteStore::new();
        let record = store.append(sample_vote("1.2.3.4")).await.unwrap();

        // A record cast exactly at the window start does not count.
        let at_boundary = store
            .find_recent_by_address("1.2.3.4", record.cast_at)
            .await
            .unwrap();
        assert!(at_boundary.is_none());

        let inside = store
            .find_recent_by_address("1.2.3.4", record.cast_at - Duration::seconds(1))
            .await
            .unwrap();
        assert!(inside.is_some());
    }

    #[tokio::test]
    async fn test_latest_record_wins() {
        let store = MemoryVoteStore::new();
        let now = Utc::now();

        // Inserted out of timestamp order on purpose.
        {
            let mut inner = store.inner.write().await;
            inner.records.push(record_at(1, "1.2.3.4", now - Duration::hours(1)));
            inner.records.push(record_at(2, "1.2.3.4", now - Duration::hours(5)));
        }

        let found = store
            .find_recent_by_address("1.2.3.4", now - Duration::hours(24))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 1);
    }

    #[tokio::test]
    async fn test_timestamp_ties_resolve_by_id() {
        let store = MemoryVoteStore::new();
        let now = Utc::now();

        {
            let mut inner = store.inner.write().await;
            inner.records.push(record_at(1, "1.2.3.4", now));
            inner.records.push(record_at(2, "1.2.3.4", now));
        }

        let found = store
            .find_recent_by_address("1.2.3.4", now - Duration::hours(24))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 2);
    }

    #[tokio::test]
    async fn test_find_is_idempotent() {
        let store = MemoryVoteStore::new();
        store.append(sample_vote("1.2.3.4")).await.unwrap();

        let since = Utc::now() - Duration::hours(24);
        let first = store.find_recent_by_address("1.2.3.4", since).await.unwrap();
        let second = store.find_recent_by_address("1.2.3.4", since).await.unwrap();

        assert_eq!(first.as_ref().map(|r| r.id), second.as_ref().map(|r| r.id));
        assert_eq!(
            first.as_ref().map(|r| r.cast_at),
            second.as_ref().map(|r| r.cast_at)
        );
    }
}
