use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::middleware::Identity;

pub const ANONYMOUS_USERNAME: &str = "anonymous";
pub const ANONYMOUS_EMAIL: &str = "anonymous@example.com";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Get-or-create for the shared anonymous account. The conflict clause
    /// makes concurrent calls converge on a single row instead of racing
    /// duplicate inserts.
    pub async fn ensure_anonymous(pool: &PgPool) -> Result<Uuid, sqlx::Error> {
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (username, email) VALUES ($1, $2)
             ON CONFLICT (username) DO UPDATE SET email = EXCLUDED.email
             RETURNING id",
        )
        .bind(ANONYMOUS_USERNAME)
        .bind(ANONYMOUS_EMAIL)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Owner id for a write: the caller when authenticated, otherwise the
    /// shared anonymous account.
    pub async fn resolve_owner(pool: &PgPool, identity: &Identity) -> Result<Uuid, sqlx::Error> {
        match identity {
            Identity::User { id, .. } => Ok(*id),
            Identity::Guest => Self::ensure_anonymous(pool).await,
        }
    }
}
