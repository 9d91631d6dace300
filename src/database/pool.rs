//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::votes::VoteRepository;

pub struct DatabasePool {
    pool: PgPool,
    votes: VoteRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, String> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

        info!("Connected to PostgreSQL");

        let votes = VoteRepository::new(pool.clone());

        Ok(Self { pool, votes })
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing database schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id BIGSERIAL PRIMARY KEY,
                cast_at TIMESTAMPTZ NOT NULL,
                ip_address VARCHAR(45) NOT NULL,
                user_agent VARCHAR(256) NOT NULL,
                country VARCHAR(100) NOT NULL,
                city VARCHAR(100) NOT NULL,
                vpn VARCHAR(8) NOT NULL,
                proxy VARCHAR(8) NOT NULL,
                tor VARCHAR(8) NOT NULL,
                first_vote VARCHAR(128) NOT NULL,
                second_vote VARCHAR(128) NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create votes table: {}", e))?;

        // The window lookup scans one address, newest first.
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_votes_address_cast_at
            ON votes (ip_address, cast_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create votes index: {}", e))?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn votes(&self) -> &VoteRepository {
        &self.votes
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
