//! # Client Repository
//!
//! Minimal access to the client directory mirror. Client CRUD belongs to
//! the directory module; credit sales only need existence checks.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use aurum_core::Client;

/// Repository for client directory lookups.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Gets a client by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, is_active, created_at FROM clients WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    /// Checks whether an active client exists, inside a caller transaction.
    pub async fn exists(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM clients WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(found.is_some())
    }

    /// Inserts a client row (seeding and tests).
    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        debug!(name = %client.name, "Inserting client");

        sqlx::query(
            "INSERT INTO clients (id, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(client.is_active)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Builds a client row for seeding and tests.
pub fn new_client(name: &str) -> Client {
    Client {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}
