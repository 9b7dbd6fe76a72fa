//! # Inventory Movement Ledger
//!
//! Append-only stock movement records with before/after snapshots. One row
//! is created per stock-affecting event (sale line with a product, manual
//! adjustment, approved return); rows are never mutated or deleted.
//!
//! The ledger trusts its caller for the `stock_after >= 0` pre-condition;
//! the services enforce it with the conditional update in
//! [`crate::repository::product::ProductRepository::try_adjust_stock`], and
//! the schema carries a CHECK as a last line of defense.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use aurum_core::{InventoryMovement, MovementKind};

const MOVEMENT_COLUMNS: &str =
    "id, product_id, kind, quantity, stock_before, stock_after, actor, reason, created_at";

/// Repository for the immutable inventory movement ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Appends one movement row inside a caller-owned transaction.
    ///
    /// Runs in the same transaction as the stock change it records, so the
    /// decrement and its audit row land (or roll back) together.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        movement: &InventoryMovement,
    ) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            kind = %movement.kind.as_str(),
            quantity = %movement.quantity,
            "Recording inventory movement"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, kind, quantity,
                stock_before, stock_after,
                actor, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.actor)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Returns a product's movements, most recent first.
    pub async fn history_for(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE product_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Counts a product's movements of a given kind (test/report helper).
    pub async fn count_for(&self, product_id: &str, kind: MovementKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_movements WHERE product_id = ?1 AND kind = ?2",
        )
        .bind(product_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Builds a movement row ready for [`InventoryRepository::record`].
pub fn new_movement(
    product_id: &str,
    kind: MovementKind,
    quantity: i64,
    stock_before: i64,
    stock_after: i64,
    actor: &str,
    reason: &str,
    created_at: DateTime<Utc>,
) -> InventoryMovement {
    InventoryMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        kind,
        quantity,
        stock_before,
        stock_after,
        actor: actor.to_string(),
        reason: reason.to_string(),
        created_at,
    }
}
