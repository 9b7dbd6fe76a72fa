//! # Product Repository (Inventory Stock Store)
//!
//! Stock reads and conditional stock mutation for the jewelry catalog
//! mirror. Catalog CRUD lives elsewhere; this core only needs names, prices
//! and a stock count it can decrement safely.
//!
//! ## Conditional Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: check-then-write as two statements                          │
//! │     SELECT current_stock ...   (another checkout runs here!)           │
//! │     UPDATE products SET current_stock = 7                              │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional statement                                 │
//! │     UPDATE products                                                     │
//! │        SET current_stock = current_stock + :delta                      │
//! │      WHERE id = :id AND current_stock + :delta >= 0                    │
//! │                                                                         │
//! │  rows_affected == 0 means the guard failed: stock never goes           │
//! │  negative, even when two sales race for the last unit.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use aurum_core::Product;

const PRODUCT_COLUMNS: &str =
    "id, name, price_cents, current_stock, is_active, created_at, updated_at";

/// Repository for product stock operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product inside a caller-owned transaction.
    ///
    /// Used by checkout so the stock value it validates against belongs to
    /// the same transaction that will decrement it.
    pub async fn get_for_update(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Returns the current stock of a product, if it exists.
    pub async fn stock_of(&self, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stock)
    }

    /// Applies a stock delta, refusing any change that would go negative.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock changed
    /// * `Ok(false)` - guard failed (not enough stock, or unknown id)
    ///
    /// Must run inside the transaction of the use case that owns the
    /// decrement, together with its inventory movement row.
    pub async fn try_adjust_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE id = ?1 AND current_stock + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts a new product (seeding and tests; catalog CRUD is external).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, current_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists active products, sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a product row for seeding and tests.
pub fn new_product(name: &str, price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        name: name.to_string(),
        price_cents,
        current_stock: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
