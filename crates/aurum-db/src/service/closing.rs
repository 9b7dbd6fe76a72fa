//! # Register Closing Service
//!
//! End-of-day migration of the ephemeral day partition into permanent
//! history, plus the read-only reconciliation preview.
//!
//! ## Close Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      close(actor) - one transaction                     │
//! │                                                                         │
//! │  1. read the day partition          empty? ──► NothingToClose          │
//! │  2. read today's open abonos                                           │
//! │  3. per day sale:                                                      │
//! │       copy row into history (FRESH id, ORIGINAL timestamp)             │
//! │       copy its items                                                   │
//! │  4. per day sale: delete items, then the row (children first)          │
//! │  5. stamp the summarized abonos closed                                 │
//! │  6. persist the RegisterClosing snapshot                               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A crash anywhere rolls the whole close back: the day partition is     │
//! │  intact and the close can simply be retried. No sale can be            │
//! │  double-transferred or silently dropped.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `summarize_today()` aggregates the same data without mutating anything
//! and is safe to call repeatedly before (or without) a close.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::receivable::ReceivableRepository;
use crate::repository::sale::{generate_sale_id, generate_sale_item_id, Partition, SaleRepository};
use aurum_core::{CoreError, DaySummary, RegisterClosing, Sale, SaleItem};

/// What the caller gets back from a committed close.
#[derive(Debug, Clone)]
pub struct ClosingOutcome {
    pub closing: RegisterClosing,
    pub migrated_count: i64,
    pub migrated_total_cents: i64,
    pub summary: DaySummary,
}

/// Migrates day sales into history and snapshots the day's totals.
#[derive(Debug, Clone)]
pub struct ClosingService {
    pool: SqlitePool,
}

impl ClosingService {
    /// Creates a new ClosingService.
    pub fn new(pool: SqlitePool) -> Self {
        ClosingService { pool }
    }

    /// Closes the register.
    ///
    /// Fails with `NothingToClose` when the day partition is empty; no
    /// snapshot row is written in that case.
    pub async fn close(&self, actor: &str) -> DbResult<ClosingOutcome> {
        let sales = SaleRepository::new(self.pool.clone());
        let receivables = ReceivableRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let day_sales = sales.day_sales_in(&mut tx).await?;
        if day_sales.is_empty() {
            return Err(DbError::Domain(CoreError::NothingToClose));
        }

        let payments = receivables
            .open_payments_since_in(&mut tx, utc_day_start())
            .await?;

        let mut summary = DaySummary::default();
        for sale in &day_sales {
            summary.add_sale(sale);
        }
        for payment in &payments {
            summary.add_payment(payment);
        }
        let summary = summary.finish();

        // Migrate every day sale: fresh history identity, original
        // timestamp. Items are copied before anything is deleted.
        for sale in &day_sales {
            let new_id = generate_sale_id();
            let items = sales.items_for_in(&mut tx, &sale.id, Partition::Day).await?;

            let migrated = Sale {
                id: new_id.clone(),
                closed_at: Some(now),
                ..sale.clone()
            };
            let migrated_items: Vec<SaleItem> = items
                .into_iter()
                .map(|item| SaleItem {
                    id: generate_sale_item_id(),
                    sale_id: new_id.clone(),
                    ..item
                })
                .collect();

            sales
                .insert_with_items(&mut tx, Partition::History, &migrated, &migrated_items)
                .await?;
        }

        // Drain the day partition: items before parents.
        for sale in &day_sales {
            sales.delete_day_sale(&mut tx, &sale.id).await?;
        }

        let payment_ids: Vec<String> = payments.iter().map(|p| p.id.clone()).collect();
        receivables
            .mark_payments_closed(&mut tx, &payment_ids, now)
            .await?;

        let closing = RegisterClosing {
            id: Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            cash_total_cents: summary.cash_sales_cents + summary.cash_payments_cents,
            card_total_cents: summary.card_sales_cents + summary.card_payments_cents,
            transfer_total_cents: summary.transfer_sales_cents + summary.transfer_payments_cents,
            sales_total_cents: summary.sales_total_cents,
            payments_total_cents: summary.payments_total_cents,
            other_income_cents: 0,
            grand_total_cents: summary.grand_total_cents,
            sales_migrated: day_sales.len() as i64,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO register_closings (
                id, actor,
                cash_total_cents, card_total_cents, transfer_total_cents,
                sales_total_cents, payments_total_cents, other_income_cents,
                grand_total_cents, sales_migrated, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&closing.id)
        .bind(&closing.actor)
        .bind(closing.cash_total_cents)
        .bind(closing.card_total_cents)
        .bind(closing.transfer_total_cents)
        .bind(closing.sales_total_cents)
        .bind(closing.payments_total_cents)
        .bind(closing.other_income_cents)
        .bind(closing.grand_total_cents)
        .bind(closing.sales_migrated)
        .bind(closing.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            closing_id = %closing.id,
            migrated = %closing.sales_migrated,
            total = %closing.grand_total_cents,
            actor = %actor,
            "Register closed"
        );

        Ok(ClosingOutcome {
            migrated_count: closing.sales_migrated,
            migrated_total_cents: summary.sales_total_cents,
            summary,
            closing,
        })
    }

    /// Today's reconciliation preview: day-partition sales plus today's
    /// open abonos, bucketed by tender. Mutates nothing.
    pub async fn summarize_today(&self) -> DbResult<(DaySummary, Vec<Sale>)> {
        let sales = SaleRepository::new(self.pool.clone());
        let receivables = ReceivableRepository::new(self.pool.clone());

        let day_sales = sales.day_sales().await?;
        let payments = receivables.open_payments_since(utc_day_start()).await?;

        let mut summary = DaySummary::default();
        for sale in &day_sales {
            summary.add_sale(sale);
        }
        for payment in &payments {
            summary.add_payment(payment);
        }

        Ok((summary.finish(), day_sales))
    }

    /// Most recent closing snapshots, newest first.
    pub async fn recent_closings(&self, limit: u32) -> DbResult<Vec<RegisterClosing>> {
        let closings = sqlx::query_as::<_, RegisterClosing>(
            "SELECT id, actor, cash_total_cents, card_total_cents, transfer_total_cents, \
             sales_total_cents, payments_total_cents, other_income_cents, \
             grand_total_cents, sales_migrated, created_at \
             FROM register_closings ORDER BY created_at DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(closings)
    }
}

/// Start of the current UTC day; the boundary for "today's" abonos.
fn utc_day_start() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::client::new_client;
    use crate::repository::product::new_product;
    use aurum_core::checkout::{CheckoutLine, CheckoutRequest, MixedSplit};
    use aurum_core::{Money, PaymentMethod, SaleKind};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, stock: i64) -> String {
        let product = new_product("Anillo Oro 18k", 150_000, stock);
        db.products().insert(&product).await.unwrap();
        product.id
    }

    fn request(product_id: &str, method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            method,
            kind: SaleKind::CashBasis,
            lines: vec![CheckoutLine {
                product_id: Some(product_id.to_string()),
                description: None,
                quantity: 1,
                unit_price: Money::from_cents(150_000),
            }],
            discount: Money::zero(),
            client_id: None,
            cash_received: None,
            mixed: None,
            notes: None,
        }
    }

    /// Seeds the four cash-basis sales of the store walkthrough.
    async fn seed_day_sales(db: &Database, product_id: &str) -> i64 {
        let checkout = db.checkout();

        let mut cash = request(product_id, PaymentMethod::Cash);
        cash.cash_received = Some(Money::from_cents(200_000));
        checkout.process(cash, "vendedor1").await.unwrap();

        checkout
            .process(request(product_id, PaymentMethod::Card), "vendedor1")
            .await
            .unwrap();

        let mut transfer = request(product_id, PaymentMethod::Transfer);
        transfer.discount = Money::from_cents(10_000);
        checkout.process(transfer, "vendedor1").await.unwrap();

        let mut mixed = request(product_id, PaymentMethod::Mixed);
        mixed.mixed = Some(MixedSplit {
            cash: Money::from_cents(100_000),
            card: Money::from_cents(50_000),
            transfer: Money::zero(),
        });
        checkout.process(mixed, "vendedor1").await.unwrap();

        // 150000 + 150000 + 140000 + 150000
        590_000
    }

    #[tokio::test]
    async fn test_close_is_a_bijection_into_history() {
        let db = test_db().await;
        let product_id = seed_product(&db, 10).await;
        let expected_total = seed_day_sales(&db, &product_id).await;

        let before = db.sales().day_sales().await.unwrap();
        assert_eq!(before.len(), 4);

        let outcome = db.closing().close("cajero1").await.unwrap();
        assert_eq!(outcome.migrated_count, 4);
        assert_eq!(outcome.migrated_total_cents, expected_total);
        assert_eq!(outcome.closing.sales_migrated, 4);

        // Day partition drained.
        assert_eq!(db.sales().day_count().await.unwrap(), 0);

        // History gained exactly those rows: same per-row total/tender,
        // same original timestamps, fresh identities.
        let page = db
            .sales()
            .list_merged(&Default::default())
            .await
            .unwrap();
        assert_eq!(page.history_count, 4);

        let mut before_keys: Vec<(i64, String, DateTime<Utc>)> = before
            .iter()
            .map(|s| (s.total_cents, s.payment_method.as_str().to_string(), s.created_at))
            .collect();
        let mut after_keys: Vec<(i64, String, DateTime<Utc>)> = page
            .sales
            .iter()
            .map(|s| (s.total_cents, s.payment_method.as_str().to_string(), s.created_at))
            .collect();
        before_keys.sort();
        after_keys.sort();
        assert_eq!(before_keys, after_keys);

        for (old, new) in before.iter().zip(page.sales.iter()) {
            assert_ne!(old.id, new.id, "migrated sales must get fresh ids");
        }
        assert!(page.sales.iter().all(|s| s.closed_at.is_some()));

        // Items were copied along.
        let (_, items, partition) = db
            .sales()
            .get_with_items(&page.sales[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(partition, Partition::History);
        assert_eq!(items.len(), 1);

        // An immediate second close has nothing to do.
        assert!(matches!(
            db.closing().close("cajero1").await,
            Err(DbError::Domain(CoreError::NothingToClose))
        ));
    }

    #[tokio::test]
    async fn test_close_on_empty_register_fails() {
        let db = test_db().await;
        assert!(matches!(
            db.closing().close("cajero1").await,
            Err(DbError::Domain(CoreError::NothingToClose))
        ));

        // And no snapshot row was written.
        assert!(db.closing().recent_closings(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_today_buckets_and_is_read_only() {
        let db = test_db().await;
        let product_id = seed_product(&db, 10).await;
        seed_day_sales(&db, &product_id).await;

        let (summary, ventas) = db.closing().summarize_today().await.unwrap();
        assert_eq!(ventas.len(), 4);
        assert_eq!(summary.sales_count, 4);
        // cash 150000 + mixed cash part 100000
        assert_eq!(summary.cash_sales_cents, 250_000);
        // card 150000 + mixed card part 50000
        assert_eq!(summary.card_sales_cents, 200_000);
        // transfer sale had a 10000 discount
        assert_eq!(summary.transfer_sales_cents, 140_000);
        assert_eq!(summary.sales_total_cents, 590_000);
        assert_eq!(summary.grand_total_cents, 590_000);

        // Calling it again changes nothing.
        let (again, _) = db.closing().summarize_today().await.unwrap();
        assert_eq!(again.sales_total_cents, summary.sales_total_cents);
        assert_eq!(db.sales().day_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_close_reconciles_todays_abonos() {
        let db = test_db().await;
        let product_id = seed_product(&db, 10).await;
        let client = new_client("Cliente Credito");
        db.clients().insert(&client).await.unwrap();

        // One cash-basis sale so there is something to close.
        let mut cash = request(&product_id, PaymentMethod::Cash);
        cash.cash_received = Some(Money::from_cents(150_000));
        db.checkout().process(cash, "vendedor1").await.unwrap();

        // A credit sale and a partial abono against it.
        let mut credit = request(&product_id, PaymentMethod::Credit);
        credit.kind = SaleKind::Credit;
        credit.client_id = Some(client.id.clone());
        let outcome = db.checkout().process(credit, "vendedor1").await.unwrap();
        let account_id = outcome.receivable_account_id.unwrap();
        db.receivables()
            .apply_payment(&account_id, 50_000, PaymentMethod::Cash, "cajero1", None)
            .await
            .unwrap();

        let (summary, _) = db.closing().summarize_today().await.unwrap();
        assert_eq!(summary.payments_total_cents, 50_000);
        assert_eq!(summary.cash_payments_cents, 50_000);
        assert_eq!(summary.grand_total_cents, 150_000 + 50_000);

        let outcome = db.closing().close("cajero1").await.unwrap();
        assert_eq!(outcome.closing.payments_total_cents, 50_000);
        assert_eq!(outcome.closing.cash_total_cents, 150_000 + 50_000);

        // The abono is now reconciled: it leaves the preview.
        let payments = db.receivables().payments_for(&account_id).await.unwrap();
        assert!(payments[0].closed);
        assert!(payments[0].closed_at.is_some());
    }
}
