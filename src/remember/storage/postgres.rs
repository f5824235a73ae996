//! Postgres triplet store.
//!
//! Only SHA-256 digests of the (salted) tokens are persisted, so a leaked
//! table cannot be replayed as cookies.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{TripletLookup, TripletStore};
use crate::remember::{token::hash_token, triplet::Triplet};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Split a schema file into executable statements, dropping `--` comments.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Clone, Debug)]
pub struct PgTripletStore {
    pool: PgPool,
}

impl PgTripletStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the triplet table and indexes if they do not exist.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DDL",
                db.statement = statement.as_str()
            );
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(span)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

#[async_trait]
impl TripletStore for PgTripletStore {
    async fn find_triplet(&self, triplet: &Triplet, now: i64) -> Result<TripletLookup> {
        let query = r"
            SELECT current_token_hash
            FROM remember_triplets
            WHERE identity = $1
              AND persistent_token_hash = $2
              AND expires_at > $3
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(triplet.identity())
            .bind(hash_token(triplet.persistent_token()))
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup triplet")?;

        let Some(row) = row else {
            return Ok(TripletLookup::NotFound);
        };

        let stored: Vec<u8> = row.get("current_token_hash");
        if stored == hash_token(triplet.current_token()) {
            Ok(TripletLookup::Found)
        } else {
            Ok(TripletLookup::Invalid)
        }
    }

    async fn store_triplet(&self, triplet: &Triplet, expires_at: i64) -> Result<()> {
        let query = r"
            INSERT INTO remember_triplets
                (identity, persistent_token_hash, current_token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identity, persistent_token_hash) DO UPDATE
            SET current_token_hash = EXCLUDED.current_token_hash,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(triplet.identity())
            .bind(hash_token(triplet.persistent_token()))
            .bind(hash_token(triplet.current_token()))
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store triplet")?;
        Ok(())
    }

    async fn replace_triplet(
        &self,
        triplet: &Triplet,
        previous_token: &str,
        expires_at: i64,
    ) -> Result<bool> {
        // Matches zero rows once another request rotated or deleted the chain.
        let query = r"
            UPDATE remember_triplets
            SET current_token_hash = $4,
                expires_at = $5,
                updated_at = NOW()
            WHERE identity = $1
              AND persistent_token_hash = $2
              AND current_token_hash = $3
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(triplet.identity())
            .bind(hash_token(triplet.persistent_token()))
            .bind(hash_token(previous_token))
            .bind(hash_token(triplet.current_token()))
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to replace triplet")?;
        Ok(result.rows_affected() == 1)
    }

    async fn clean_triplet(&self, identity: &str, persistent_token: &str) -> Result<bool> {
        let query =
            "DELETE FROM remember_triplets WHERE identity = $1 AND persistent_token_hash = $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(identity)
            .bind(hash_token(persistent_token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete triplet")?;
        Ok(result.rows_affected() > 0)
    }

    async fn clean_all_triplets(&self, identity: &str) -> Result<u64> {
        let query = "DELETE FROM remember_triplets WHERE identity = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(identity)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete triplets for identity")?;
        Ok(result.rows_affected())
    }

    async fn clean_expired_tokens(&self, cutoff: i64) -> Result<u64> {
        let query = "DELETE FROM remember_triplets WHERE expires_at <= $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete expired triplets")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_statements() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS remember_triplets"));
        assert!(statements[1].starts_with("CREATE INDEX IF NOT EXISTS"));
    }

    #[test]
    fn split_skips_comments_and_blanks() {
        let statements = split_sql_statements("-- note\nSELECT 1;\n\n;SELECT 2");
        assert_eq!(statements, vec!["SELECT 1".to_string(), "SELECT 2".to_string()]);
    }
}
