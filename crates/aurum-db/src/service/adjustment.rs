//! # Stock Adjustment Service
//!
//! Manual stock corrections (recounts, approved returns, received
//! merchandise) applied atomically with their audit movement: the stock
//! change and the `inventory_movements` row land in the same transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{new_movement, InventoryRepository};
use crate::repository::product::ProductRepository;
use aurum_core::{CoreError, InventoryMovement, MovementKind, ValidationError};

/// Applies manual stock deltas with their audit trail.
#[derive(Debug, Clone)]
pub struct AdjustmentService {
    pool: SqlitePool,
}

impl AdjustmentService {
    /// Creates a new AdjustmentService.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentService { pool }
    }

    /// Applies a signed stock delta to a product.
    ///
    /// ## Arguments
    /// * `delta` - positive to receive stock, negative to remove it
    /// * `kind` - `Entrada` for received stock/returns, `Ajuste` for
    ///   corrections; `Salida` is reserved for sales
    ///
    /// Fails with `InsufficientStock` when a negative delta would take the
    /// count below zero, and writes nothing in that case.
    pub async fn adjust(
        &self,
        product_id: &str,
        delta: i64,
        kind: MovementKind,
        actor: &str,
        reason: &str,
    ) -> DbResult<InventoryMovement> {
        if delta == 0 {
            return Err(DbError::Domain(
                ValidationError::MustBePositive {
                    field: "cantidad".to_string(),
                }
                .into(),
            ));
        }

        let products = ProductRepository::new(self.pool.clone());
        let inventory = InventoryRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await?;

        let product = products
            .get_for_update(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::Domain(CoreError::ProductNotFound(product_id.to_string())))?;

        let before = product.current_stock;
        let after = before + delta;
        if after < 0 {
            return Err(DbError::Domain(CoreError::InsufficientStock {
                name: product.name,
                available: before,
                requested: -delta,
            }));
        }

        if !products.try_adjust_stock(&mut tx, product_id, delta).await? {
            return Err(DbError::Domain(CoreError::InsufficientStock {
                name: product.name,
                available: before,
                requested: -delta,
            }));
        }

        let movement = new_movement(
            product_id,
            kind,
            delta.abs(),
            before,
            after,
            actor,
            reason,
            Utc::now(),
        );
        inventory.record(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            delta = %delta,
            stock = %after,
            kind = %kind.as_str(),
            "Stock adjusted"
        );

        Ok(movement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::new_product;

    #[tokio::test]
    async fn test_adjust_up_and_down() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("Topo Perla", 120_000, 5);
        db.products().insert(&product).await.unwrap();

        let movement = db
            .adjustments()
            .adjust(&product.id, 3, MovementKind::Entrada, "bodega1", "Recepcion proveedor")
            .await
            .unwrap();
        assert_eq!(movement.stock_before, 5);
        assert_eq!(movement.stock_after, 8);
        assert_eq!(movement.quantity, 3);

        db.adjustments()
            .adjust(&product.id, -2, MovementKind::Ajuste, "bodega1", "Conteo fisico")
            .await
            .unwrap();
        assert_eq!(db.products().stock_of(&product.id).await.unwrap(), Some(6));

        let history = db.inventory().history_for(&product.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_adjust_below_zero_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("Broche Zafiro", 450_000, 1);
        db.products().insert(&product).await.unwrap();

        let err = db
            .adjustments()
            .adjust(&product.id, -2, MovementKind::Ajuste, "bodega1", "Conteo fisico")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // Nothing written.
        assert_eq!(db.products().stock_of(&product.id).await.unwrap(), Some(1));
        assert!(db.inventory().history_for(&product.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.adjustments()
                .adjust("no-such-id", 1, MovementKind::Entrada, "bodega1", "x")
                .await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
    }
}
