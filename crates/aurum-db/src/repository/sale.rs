//! # Sale Repository
//!
//! Database operations for sales and sale items across both partitions.
//!
//! ## Partition Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Partitions                                   │
//! │                                                                         │
//! │  day_sales / day_sale_items         sales / sale_items                 │
//! │  ─────────────────────────          ──────────────────                 │
//! │  Today's not-yet-closed             Permanent history:                 │
//! │  cash-basis sales                   • credit sales immediately         │
//! │                                     • cash-basis sales after the       │
//! │         ┌──────────────────────►      register close migrates them     │
//! │         │   close() copies row       (fresh id, original timestamp)    │
//! │         │   then deletes source                                        │
//! │                                                                         │
//! │  A sale is created once and never mutated. Listings merge both         │
//! │  partitions, newest first.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use aurum_core::{PaymentMethod, Sale, SaleItem};

/// Which physical table a sale row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Ephemeral: today's open-register sales.
    Day,
    /// Permanent history.
    History,
}

impl Partition {
    const fn sales_table(&self) -> &'static str {
        match self {
            Partition::Day => "day_sales",
            Partition::History => "sales",
        }
    }

    const fn items_table(&self) -> &'static str {
        match self {
            Partition::Day => "day_sale_items",
            Partition::History => "sale_items",
        }
    }
}

/// Filters for the merged sale listing.
#[derive(Debug, Clone, Default)]
pub struct SaleListFilter {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

/// One page of the merged listing plus partition counts.
#[derive(Debug, Clone)]
pub struct SalesPage {
    pub sales: Vec<Sale>,
    /// Total rows matching the filter across both partitions.
    pub total: i64,
    pub day_count: i64,
    pub history_count: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Writes (caller transaction)
    // =========================================================================

    /// Inserts a sale and its items into the given partition.
    ///
    /// Runs inside a caller-owned transaction: the sale row and every item
    /// row land together or not at all.
    pub async fn insert_with_items(
        &self,
        conn: &mut SqliteConnection,
        partition: Partition,
        sale: &Sale,
        items: &[SaleItem],
    ) -> DbResult<()> {
        debug!(
            id = %sale.id,
            partition = ?partition,
            total = %sale.total_cents,
            items = items.len(),
            "Inserting sale"
        );

        let sql = format!(
            r#"
            INSERT INTO {} (
                id, kind, payment_method,
                subtotal_cents, discount_cents, total_cents,
                cash_received_cents, change_cents,
                cash_part_cents, card_part_cents, transfer_part_cents,
                client_id, notes, created_at{}
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14{})
            "#,
            partition.sales_table(),
            if partition == Partition::History {
                ", closed_at"
            } else {
                ""
            },
            if partition == Partition::History {
                ", ?15"
            } else {
                ""
            },
        );

        let mut query = sqlx::query(&sql)
            .bind(&sale.id)
            .bind(sale.kind)
            .bind(sale.payment_method)
            .bind(sale.subtotal_cents)
            .bind(sale.discount_cents)
            .bind(sale.total_cents)
            .bind(sale.cash_received_cents)
            .bind(sale.change_cents)
            .bind(sale.cash_part_cents)
            .bind(sale.card_part_cents)
            .bind(sale.transfer_part_cents)
            .bind(&sale.client_id)
            .bind(&sale.notes)
            .bind(sale.created_at);
        if partition == Partition::History {
            query = query.bind(sale.closed_at);
        }
        query.execute(&mut *conn).await?;

        for item in items {
            self.insert_item(conn, partition, item).await?;
        }

        Ok(())
    }

    /// Inserts one sale item into the given partition.
    pub async fn insert_item(
        &self,
        conn: &mut SqliteConnection,
        partition: Partition,
        item: &SaleItem,
    ) -> DbResult<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                id, sale_id, product_id, description,
                quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            partition.items_table(),
        );

        sqlx::query(&sql)
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.subtotal_cents)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Deletes a day sale and its items (items before parent, to satisfy
    /// referential integrity). Used only by the register close.
    pub async fn delete_day_sale(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM day_sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM day_sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetches one sale and its items, searching day then history.
    pub async fn get_with_items(
        &self,
        id: &str,
    ) -> DbResult<Option<(Sale, Vec<SaleItem>, Partition)>> {
        for partition in [Partition::Day, Partition::History] {
            let sql = format!(
                "SELECT {} FROM {} WHERE id = ?1",
                select_columns(partition),
                partition.sales_table(),
            );
            if let Some(sale) = sqlx::query_as::<_, Sale>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            {
                let items = self.items_for(id, partition).await?;
                return Ok(Some((sale, items, partition)));
            }
        }

        Ok(None)
    }

    /// Returns the items of a sale in the given partition.
    pub async fn items_for(&self, sale_id: &str, partition: Partition) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT id, sale_id, product_id, description, quantity, \
             unit_price_cents, subtotal_cents \
             FROM {} WHERE sale_id = ?1 ORDER BY id",
            partition.items_table(),
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Same as [`Self::items_for`], inside a caller transaction (closing).
    pub async fn items_for_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        partition: Partition,
    ) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT id, sale_id, product_id, description, quantity, \
             unit_price_cents, subtotal_cents \
             FROM {} WHERE sale_id = ?1 ORDER BY id",
            partition.items_table(),
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items)
    }

    /// Returns the whole day partition, oldest first.
    pub async fn day_sales(&self) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM day_sales ORDER BY created_at",
            select_columns(Partition::Day),
        );
        let sales = sqlx::query_as::<_, Sale>(&sql).fetch_all(&self.pool).await?;

        Ok(sales)
    }

    /// Same as [`Self::day_sales`], inside a caller transaction (closing).
    pub async fn day_sales_in(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {} FROM day_sales ORDER BY created_at",
            select_columns(Partition::Day),
        );
        let sales = sqlx::query_as::<_, Sale>(&sql).fetch_all(&mut *conn).await?;

        Ok(sales)
    }

    /// Counts the day partition.
    pub async fn day_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM day_sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Lists sales across both partitions, merged newest first.
    ///
    /// ## How It Works
    /// Both partitions are queried with the same filter, merged in memory,
    /// sorted by timestamp descending and then paginated. A single-store
    /// day partition is small, and history queries are bounded by the date
    /// filter in practice.
    pub async fn list_merged(&self, filter: &SaleListFilter) -> DbResult<SalesPage> {
        let day = self.list_partition(Partition::Day, filter).await?;
        let history = self.list_partition(Partition::History, filter).await?;

        let day_count = day.len() as i64;
        let history_count = history.len() as i64;

        let mut merged: Vec<Sale> = day.into_iter().chain(history).collect();
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = merged.len() as i64;
        let page = filter.page.max(1);
        let page_size = if filter.page_size == 0 { 20 } else { filter.page_size };
        let start = ((page - 1) * page_size) as usize;
        let sales = merged
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Ok(SalesPage {
            sales,
            total,
            day_count,
            history_count,
        })
    }

    async fn list_partition(
        &self,
        partition: Partition,
        filter: &SaleListFilter,
    ) -> DbResult<Vec<Sale>> {
        let mut sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1",
            select_columns(partition),
            partition.sales_table(),
        );
        if filter.date_from.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if filter.date_to.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        if filter.method.is_some() {
            sql.push_str(" AND payment_method = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, Sale>(&sql);
        if let Some(from) = filter.date_from {
            query = query.bind(from);
        }
        if let Some(to) = filter.date_to {
            query = query.bind(to);
        }
        if let Some(method) = filter.method {
            query = query.bind(method);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

/// Column list for reading a `Sale` out of either partition.
///
/// The day partition has no `closed_at` column; a NULL literal keeps the
/// two row shapes identical for `FromRow`.
fn select_columns(partition: Partition) -> &'static str {
    match partition {
        Partition::Day => {
            "id, kind, payment_method, subtotal_cents, discount_cents, total_cents, \
             cash_received_cents, change_cents, cash_part_cents, card_part_cents, \
             transfer_part_cents, client_id, notes, created_at, NULL AS closed_at"
        }
        Partition::History => {
            "id, kind, payment_method, subtotal_cents, discount_cents, total_cents, \
             cash_received_cents, change_cents, cash_part_cents, card_part_cents, \
             transfer_part_cents, client_id, notes, created_at, closed_at"
        }
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}
