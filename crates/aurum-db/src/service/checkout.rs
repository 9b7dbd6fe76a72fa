//! # Checkout Service
//!
//! The per-request sale orchestrator: sequences stock validation, ledger
//! writes, and receivable updates for one sale, inside one transaction.
//!
//! ## Write Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Transaction                                │
//! │                                                                         │
//! │  validate_and_total()          pure, no I/O, rejects bad tenders       │
//! │       │                                                                 │
//! │  BEGIN TRANSACTION                                                      │
//! │       │                                                                 │
//! │  1. credit? client must exist                                          │
//! │  2. resolve every product, pre-validate ALL stock   ── no writes yet   │
//! │  3. insert sale + items (day or history partition)                     │
//! │  4. per product line: conditional decrement + movement row             │
//! │  5. credit? create-or-consolidate receivable account                   │
//! │       │                                                                 │
//! │  COMMIT ── or ROLLBACK on any failure, leaving no residue              │
//! │                                                                         │
//! │  Steps 2 and 4 together make overselling impossible: the pre-check     │
//! │  fails fast with a useful message, and the conditional UPDATE is the   │
//! │  authoritative guard even if another checkout committed in between.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::client::ClientRepository;
use crate::repository::inventory::{new_movement, InventoryRepository};
use crate::repository::product::ProductRepository;
use crate::repository::receivable::ReceivableRepository;
use crate::repository::sale::{generate_sale_id, generate_sale_item_id, Partition, SaleRepository};
use aurum_core::checkout::{validate_and_total, CheckoutRequest};
use aurum_core::{CoreError, MovementKind, PaymentMethod, Product, Sale, SaleItem, SaleKind};

/// What the caller gets back from a committed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub sale_id: String,
    pub total_cents: i64,
    pub change_cents: Option<i64>,
    /// Set for credit sales: the account that absorbed the sale.
    pub receivable_account_id: Option<String>,
    /// Set for credit sales: whether the account was newly opened.
    pub account_created: Option<bool>,
}

/// Orchestrates one checkout request as a single transaction.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Processes one checkout request.
    ///
    /// All tender math is validated before the transaction opens; all stock
    /// is validated before the first write. Any failure after that rolls
    /// the whole transaction back.
    pub async fn process(&self, request: CheckoutRequest, actor: &str) -> DbResult<CheckoutOutcome> {
        let totals = validate_and_total(&request).map_err(DbError::Domain)?;

        let products = ProductRepository::new(self.pool.clone());
        let clients = ClientRepository::new(self.pool.clone());
        let inventory = InventoryRepository::new(self.pool.clone());
        let sales = SaleRepository::new(self.pool.clone());
        let receivables = ReceivableRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await?;

        // Credit sales need a real client before anything is written.
        let is_credit = request.kind == SaleKind::Credit;
        if is_credit {
            let client_id = request.client_id.as_deref().unwrap_or_default();
            if !clients.exists(&mut tx, client_id).await? {
                return Err(DbError::Domain(CoreError::ClientNotFound(
                    client_id.to_string(),
                )));
            }
        }

        // Resolve every referenced product and pre-validate ALL stock.
        // Quantities are aggregated per product so duplicate lines of the
        // same piece cannot slip past the check individually.
        let mut resolved: HashMap<String, Product> = HashMap::new();
        let mut required: HashMap<String, i64> = HashMap::new();
        for line in &request.lines {
            if let Some(product_id) = &line.product_id {
                if !resolved.contains_key(product_id) {
                    let product = products
                        .get_for_update(&mut tx, product_id)
                        .await?
                        .filter(|p| p.is_active)
                        .ok_or_else(|| {
                            DbError::Domain(CoreError::ProductNotFound(product_id.clone()))
                        })?;
                    resolved.insert(product_id.clone(), product);
                }
                *required.entry(product_id.clone()).or_insert(0) += line.quantity;
            }
        }
        for (product_id, requested) in &required {
            let product = &resolved[product_id];
            if *requested > product.current_stock {
                return Err(DbError::Domain(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.current_stock,
                    requested: *requested,
                }));
            }
        }

        // Build the immutable sale + items.
        let sale_id = generate_sale_id();
        let now = Utc::now();

        let items: Vec<SaleItem> = request
            .lines
            .iter()
            .map(|line| SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                description: match &line.product_id {
                    Some(product_id) => resolved[product_id].name.clone(),
                    None => line.description.clone().unwrap_or_default(),
                },
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal().cents(),
            })
            .collect();

        let (cash_received_cents, change_cents) = match request.method {
            PaymentMethod::Cash | PaymentMethod::Mixed => (
                request.cash_received.map(|m| m.cents()),
                totals.change.map(|m| m.cents()),
            ),
            _ => (None, None),
        };
        // Split columns describe a mixed tender only.
        let split = request.mixed.filter(|_| request.method == PaymentMethod::Mixed);

        let sale = Sale {
            id: sale_id.clone(),
            kind: request.kind,
            payment_method: request.method,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: request.discount.cents(),
            total_cents: totals.total.cents(),
            cash_received_cents,
            change_cents,
            cash_part_cents: split.map(|m| m.cash.cents()),
            card_part_cents: split.map(|m| m.card.cents()),
            transfer_part_cents: split.map(|m| m.transfer.cents()),
            client_id: request.client_id.clone(),
            notes: request.notes.clone(),
            created_at: now,
            closed_at: None,
        };

        // Credit sales are history immediately; cash-basis sales wait in
        // the day partition for the register close.
        let partition = if is_credit {
            Partition::History
        } else {
            Partition::Day
        };
        sales.insert_with_items(&mut tx, partition, &sale, &items).await?;

        // Decrement stock and append one movement per product line.
        let mut running: HashMap<String, i64> = resolved
            .iter()
            .map(|(id, p)| (id.clone(), p.current_stock))
            .collect();
        for line in &request.lines {
            let Some(product_id) = &line.product_id else {
                continue;
            };
            let before = running[product_id];
            let after = before - line.quantity;

            let adjusted = products
                .try_adjust_stock(&mut tx, product_id, -line.quantity)
                .await?;
            if !adjusted {
                // Pre-check passed inside this same transaction, so this
                // only fires if the row vanished under us.
                return Err(DbError::Domain(CoreError::InsufficientStock {
                    name: resolved[product_id].name.clone(),
                    available: before,
                    requested: line.quantity,
                }));
            }

            inventory
                .record(
                    &mut tx,
                    &new_movement(
                        product_id,
                        MovementKind::Salida,
                        line.quantity,
                        before,
                        after,
                        actor,
                        &format!("Venta #{sale_id}"),
                        now,
                    ),
                )
                .await?;
            running.insert(product_id.clone(), after);
        }

        // Credit: open or grow the client's consolidated account.
        let (receivable_account_id, account_created) = if is_credit {
            let client_id = request.client_id.as_deref().unwrap_or_default();
            let outcome = receivables
                .create_or_consolidate(&mut tx, client_id, &sale_id, totals.total.cents(), actor)
                .await?;
            (Some(outcome.account_id), Some(outcome.created))
        } else {
            (None, None)
        };

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            total = %totals.total,
            method = %request.method.as_str(),
            kind = %request.kind.as_str(),
            items = items.len(),
            "Sale committed"
        );
        debug!(change = ?change_cents, account = ?receivable_account_id, "Checkout outcome");

        Ok(CheckoutOutcome {
            sale_id,
            total_cents: totals.total.cents(),
            change_cents,
            receivable_account_id,
            account_created,
        })
    }
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
    use aurum_core::checkout::{CheckoutLine, MixedSplit};
    use aurum_core::Money;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, price: i64, stock: i64) -> String {
        let product = new_product(name, price, stock);
        db.products().insert(&product).await.unwrap();
        product.id
    }

    async fn seed_client(db: &Database, name: &str) -> String {
        let client = new_client(name);
        db.clients().insert(&client).await.unwrap();
        client.id
    }

    fn cash_request(product_id: &str, qty: i64, price: i64) -> CheckoutRequest {
        CheckoutRequest {
            method: PaymentMethod::Cash,
            kind: SaleKind::CashBasis,
            lines: vec![CheckoutLine {
                product_id: Some(product_id.to_string()),
                description: None,
                quantity: qty,
                unit_price: Money::from_cents(price),
            }],
            discount: Money::zero(),
            client_id: None,
            cash_received: None,
            mixed: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_cash_sale_with_change() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Anillo Oro 18k", 150_000, 10).await;

        let mut request = cash_request(&product_id, 1, 150_000);
        request.cash_received = Some(Money::from_cents(200_000));

        let outcome = db.checkout().process(request, "vendedor1").await.unwrap();
        assert_eq!(outcome.total_cents, 150_000);
        assert_eq!(outcome.change_cents, Some(50_000));
        assert!(outcome.receivable_account_id.is_none());

        // Stock decremented, one salida movement with snapshots.
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(9));
        let movements = db.inventory().history_for(&product_id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Salida);
        assert_eq!(movements[0].stock_before, 10);
        assert_eq!(movements[0].stock_after, 9);
        assert_eq!(movements[0].reason, format!("Venta #{}", outcome.sale_id));

        // Cash-basis sale landed in the day partition.
        assert_eq!(db.sales().day_count().await.unwrap(), 1);
        let (sale, items, partition) = db
            .sales()
            .get_with_items(&outcome.sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(partition, Partition::Day);
        assert_eq!(sale.total_cents, sale.subtotal_cents - sale.discount_cents);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Anillo Oro 18k");
    }

    /// The full store walkthrough: six sales against a stock of 10.
    #[tokio::test]
    async fn test_checkout_scenario_all_tenders() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Anillo Oro 18k", 150_000, 10).await;
        let client_id = seed_client(&db, "Cliente Frecuente").await;
        let checkout = db.checkout();

        // 1. cash, tendered 200000 -> change 50000
        let mut request = cash_request(&product_id, 1, 150_000);
        request.cash_received = Some(Money::from_cents(200_000));
        let outcome = checkout.process(request, "vendedor1").await.unwrap();
        assert_eq!(outcome.change_cents, Some(50_000));

        // 2. card
        let mut request = cash_request(&product_id, 1, 150_000);
        request.method = PaymentMethod::Card;
        checkout.process(request, "vendedor1").await.unwrap();
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(8));

        // 3. transfer with discount 10000 -> total 140000
        let mut request = cash_request(&product_id, 1, 150_000);
        request.method = PaymentMethod::Transfer;
        request.discount = Money::from_cents(10_000);
        let outcome = checkout.process(request, "vendedor1").await.unwrap();
        assert_eq!(outcome.total_cents, 140_000);

        // 4. mixed: 100000 cash + 50000 card = 150000 = total
        let mut request = cash_request(&product_id, 1, 150_000);
        request.method = PaymentMethod::Mixed;
        request.mixed = Some(MixedSplit {
            cash: Money::from_cents(100_000),
            card: Money::from_cents(50_000),
            transfer: Money::zero(),
        });
        checkout.process(request, "vendedor1").await.unwrap();

        // 5. two pieces on credit -> account created with total 300000
        let mut request = cash_request(&product_id, 1, 150_000);
        request.lines.push(CheckoutLine {
            product_id: Some(product_id.clone()),
            description: None,
            quantity: 1,
            unit_price: Money::from_cents(150_000),
        });
        request.method = PaymentMethod::Credit;
        request.kind = SaleKind::Credit;
        request.client_id = Some(client_id.clone());
        let outcome = checkout.process(request, "vendedor1").await.unwrap();
        assert_eq!(outcome.total_cents, 300_000);
        assert_eq!(outcome.account_created, Some(true));

        let account_id = outcome.receivable_account_id.unwrap();
        let account = db.receivables().get_by_id(&account_id).await.unwrap().unwrap();
        assert_eq!(account.total_cents, 300_000);
        assert_eq!(account.outstanding_cents, 300_000);

        // Final stock: 10 - 1 - 1 - 1 - 1 - 2 = 4, one salida per line.
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(4));
        let salidas = db
            .inventory()
            .count_for(&product_id, MovementKind::Salida)
            .await
            .unwrap();
        assert_eq!(salidas, 6);
        let units: i64 = db
            .inventory()
            .history_for(&product_id, 50)
            .await
            .unwrap()
            .iter()
            .map(|m| m.quantity)
            .sum();
        assert_eq!(units, 6);

        // Four cash-basis sales in the day partition; credit went straight
        // to history.
        assert_eq!(db.sales().day_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Pulsera Esmeralda", 800_000, 2).await;

        let request = cash_request(&product_id, 3, 800_000);
        let err = db.checkout().process(request, "vendedor1").await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                name,
                available,
                requested,
            }) => {
                assert_eq!(name, "Pulsera Esmeralda");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Nothing happened: no sale, no movement, stock untouched.
        assert_eq!(db.sales().day_count().await.unwrap(), 0);
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(2));
        assert!(db.inventory().history_for(&product_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_in_aggregate() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Dije Corazon", 90_000, 3).await;

        let mut request = cash_request(&product_id, 2, 90_000);
        request.lines.push(CheckoutLine {
            product_id: Some(product_id.clone()),
            description: None,
            quantity: 2,
            unit_price: Money::from_cents(90_000),
        });

        // 2 + 2 > 3: rejected even though each line alone would fit.
        assert!(matches!(
            db.checkout().process(request, "vendedor1").await,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_credit_sale_unknown_client_rolls_back() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Reloj Acero", 500_000, 5).await;

        let mut request = cash_request(&product_id, 1, 500_000);
        request.method = PaymentMethod::Credit;
        request.kind = SaleKind::Credit;
        request.client_id = Some("99999999-9999-9999-9999-999999999999".to_string());

        assert!(matches!(
            db.checkout().process(request, "vendedor1").await,
            Err(DbError::Domain(CoreError::ClientNotFound(_)))
        ));

        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(5));
        assert_eq!(db.sales().day_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_line_touches_no_stock() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Argolla Matrimonio", 600_000, 2).await;

        let mut request = cash_request(&product_id, 1, 600_000);
        request.lines.push(CheckoutLine {
            product_id: None,
            description: Some("Grabado personalizado".to_string()),
            quantity: 1,
            unit_price: Money::from_cents(30_000),
        });

        let outcome = db.checkout().process(request, "vendedor1").await.unwrap();
        assert_eq!(outcome.total_cents, 630_000);

        // Only the catalog line moved stock.
        assert_eq!(db.products().stock_of(&product_id).await.unwrap(), Some(1));
        let movements = db.inventory().history_for(&product_id, 10).await.unwrap();
        assert_eq!(movements.len(), 1);

        let (_, items, _) = db
            .sales()
            .get_with_items(&outcome.sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.description == "Grabado personalizado"));
    }

    #[tokio::test]
    async fn test_consecutive_credit_sales_consolidate() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cadena Oro", 200_000, 10).await;
        let client_id = seed_client(&db, "Cliente Credito").await;

        let mut first = cash_request(&product_id, 1, 200_000);
        first.method = PaymentMethod::Credit;
        first.kind = SaleKind::Credit;
        first.client_id = Some(client_id.clone());
        let outcome1 = db.checkout().process(first, "vendedor1").await.unwrap();
        assert_eq!(outcome1.account_created, Some(true));

        let mut second = cash_request(&product_id, 2, 200_000);
        second.method = PaymentMethod::Credit;
        second.kind = SaleKind::Credit;
        second.client_id = Some(client_id.clone());
        let outcome2 = db.checkout().process(second, "vendedor1").await.unwrap();
        assert_eq!(outcome2.account_created, Some(false));

        // Same account both times, totals added in place.
        assert_eq!(
            outcome1.receivable_account_id,
            outcome2.receivable_account_id
        );
        let account_id = outcome1.receivable_account_id.unwrap();
        let account = db.receivables().get_by_id(&account_id).await.unwrap().unwrap();
        assert_eq!(account.total_cents, 600_000);
        assert_eq!(account.outstanding_cents, 600_000);

        // One movement per credit sale.
        let movements = db.receivables().movements_for(&account_id, 10).await.unwrap();
        assert_eq!(movements.len(), 2);
    }
}
