//! # Receivables Ledger
//!
//! One consolidated running account per client, an append-only movement
//! log, and payment (abono) records.
//!
//! ## Consolidation Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              create_or_consolidate(client, sale, amount)                │
//! │                                                                         │
//! │  Pending account for client?                                            │
//! │       │                                                                 │
//! │       ├── NO  ──► INSERT account  total=amount, outstanding=amount     │
//! │       │           + AccountMovement(venta_credito)                     │
//! │       │                                                                 │
//! │       └── YES ──► UPDATE account  total += amount,                     │
//! │                   outstanding += amount (same row, no new account)     │
//! │                   + AccountMovement(venta_credito)                     │
//! │                                                                         │
//! │  A client holds at most ONE Pending account no matter how many         │
//! │  credit sales occur. The partial unique index on                        │
//! │  (client_id) WHERE status='pendiente' backs this up against races.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Rule
//! `outstanding = total - paid` always, and an account flips to Paid
//! exactly when outstanding drops to the 1-cent tolerance or below. A
//! payment larger than the outstanding balance (beyond tolerance) is
//! rejected and changes nothing.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use aurum_core::{
    AccountMovement, AccountMovementKind, AccountStatus, CoreError, PaymentMethod,
    ReceivableAccount, ReceivablePayment, TENDER_TOLERANCE_CENTS,
};

const ACCOUNT_COLUMNS: &str = "id, client_id, sale_id, total_cents, paid_cents, \
     outstanding_cents, status, due_date, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, account_id, amount_cents, payment_method, notes, actor, \
     closed, closed_at, created_at";

/// Outcome of [`ReceivableRepository::create_or_consolidate`].
#[derive(Debug, Clone)]
pub struct ConsolidationOutcome {
    pub account_id: String,
    /// true when a new account was opened; false when an existing Pending
    /// account absorbed the sale.
    pub created: bool,
}

/// Filters for the account listing.
#[derive(Debug, Clone, Default)]
pub struct AccountListFilter {
    /// Explicit status filter. When absent, Consolidated is excluded.
    pub status: Option<AccountStatus>,
    /// When set together with no status, include every status.
    pub include_all: bool,
    pub client_id: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

/// Aggregated receivables overview (Consolidated excluded).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReceivableSummary {
    pub pending_count: i64,
    pub paid_count: i64,
    pub total_outstanding_cents: i64,
    pub total_collected_cents: i64,
}

/// Repository for receivable accounts, movements and payments.
#[derive(Debug, Clone)]
pub struct ReceivableRepository {
    pool: SqlitePool,
}

impl ReceivableRepository {
    /// Creates a new ReceivableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceivableRepository { pool }
    }

    // =========================================================================
    // Create or consolidate (inside the checkout transaction)
    // =========================================================================

    /// Opens a client's account or grows the existing Pending one.
    ///
    /// Appends exactly one AccountMovement either way. Runs inside the
    /// checkout transaction, so a failed sale never leaves a dangling
    /// account change.
    pub async fn create_or_consolidate(
        &self,
        conn: &mut SqliteConnection,
        client_id: &str,
        sale_id: &str,
        amount_cents: i64,
        actor: &str,
    ) -> DbResult<ConsolidationOutcome> {
        let now = Utc::now();

        let existing = sqlx::query_as::<_, ReceivableAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM receivable_accounts \
             WHERE client_id = ?1 AND status = 'pendiente'"
        ))
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (account_id, created) = match existing {
            Some(account) => {
                debug!(
                    account_id = %account.id,
                    amount = %amount_cents,
                    "Consolidating credit sale into existing account"
                );

                sqlx::query(
                    r#"
                    UPDATE receivable_accounts
                    SET
                        total_cents = total_cents + ?2,
                        outstanding_cents = outstanding_cents + ?2,
                        updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&account.id)
                .bind(amount_cents)
                .bind(now)
                .execute(&mut *conn)
                .await?;

                (account.id, false)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                debug!(account_id = %id, amount = %amount_cents, "Opening receivable account");

                sqlx::query(
                    r#"
                    INSERT INTO receivable_accounts (
                        id, client_id, sale_id,
                        total_cents, paid_cents, outstanding_cents,
                        status, due_date, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, 0, ?4, 'pendiente', NULL, ?5, ?5)
                    "#,
                )
                .bind(&id)
                .bind(client_id)
                .bind(sale_id)
                .bind(amount_cents)
                .bind(now)
                .execute(&mut *conn)
                .await?;

                (id, true)
            }
        };

        self.append_movement(
            conn,
            &AccountMovement {
                id: Uuid::new_v4().to_string(),
                account_id: account_id.clone(),
                kind: AccountMovementKind::CreditSale,
                amount_cents,
                sale_id: Some(sale_id.to_string()),
                description: format!("Venta a credito #{sale_id}"),
                actor: actor.to_string(),
                created_at: now,
            },
        )
        .await?;

        Ok(ConsolidationOutcome {
            account_id,
            created,
        })
    }

    // =========================================================================
    // Payments (abonos)
    // =========================================================================

    /// Applies a client payment against an account.
    ///
    /// ## What This Does (one transaction)
    /// 1. Fetches the account; `NotFound` if it doesn't exist
    /// 2. Rejects `ExcessPayment` when the amount exceeds the outstanding
    ///    balance by more than the tolerance
    /// 3. Inserts the immutable payment row
    /// 4. Recomputes `paid`/`outstanding` and flips the status to Paid
    ///    when the balance is settled
    /// 5. Appends an AccountMovement
    pub async fn apply_payment(
        &self,
        account_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        actor: &str,
        notes: Option<String>,
    ) -> DbResult<(ReceivablePayment, ReceivableAccount)> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let account = sqlx::query_as::<_, ReceivableAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM receivable_accounts WHERE id = ?1"
        ))
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::Domain(CoreError::AccountNotFound(account_id.to_string())))?;

        if amount_cents > account.outstanding_cents + TENDER_TOLERANCE_CENTS {
            return Err(DbError::Domain(CoreError::ExcessPayment {
                outstanding_cents: account.outstanding_cents,
                requested_cents: amount_cents,
            }));
        }

        let payment = ReceivablePayment {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            amount_cents,
            payment_method: method,
            notes,
            actor: actor.to_string(),
            closed: false,
            closed_at: None,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO receivable_payments (
                id, account_id, amount_cents, payment_method,
                notes, actor, closed, closed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.account_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_method)
        .bind(&payment.notes)
        .bind(&payment.actor)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        let paid = account.paid_cents + amount_cents;
        let outstanding = account.total_cents - paid;
        let status = if outstanding <= TENDER_TOLERANCE_CENTS {
            AccountStatus::Paid
        } else {
            AccountStatus::Pending
        };

        sqlx::query(
            r#"
            UPDATE receivable_accounts
            SET
                paid_cents = ?2,
                outstanding_cents = ?3,
                status = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(account_id)
        .bind(paid)
        .bind(outstanding)
        .bind(status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        self.append_movement(
            &mut tx,
            &AccountMovement {
                id: Uuid::new_v4().to_string(),
                account_id: account_id.to_string(),
                kind: AccountMovementKind::Payment,
                amount_cents,
                sale_id: None,
                description: format!("Abono ({})", method.as_str()),
                actor: actor.to_string(),
                created_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            account_id = %account_id,
            amount = %amount_cents,
            outstanding = %outstanding,
            status = %status.as_str(),
            "Payment applied"
        );

        let mut updated = account;
        updated.paid_cents = paid;
        updated.outstanding_cents = outstanding;
        updated.status = status;
        updated.updated_at = now;

        Ok((payment, updated))
    }

    /// Appends one immutable account movement (caller transaction).
    async fn append_movement(
        &self,
        conn: &mut SqliteConnection,
        movement: &AccountMovement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_movements (
                id, account_id, kind, amount_cents,
                sale_id, description, actor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.account_id)
        .bind(movement.kind)
        .bind(movement.amount_cents)
        .bind(&movement.sale_id)
        .bind(&movement.description)
        .bind(&movement.actor)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an account by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ReceivableAccount>> {
        let account = sqlx::query_as::<_, ReceivableAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM receivable_accounts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists accounts, newest first.
    ///
    /// Consolidated accounts are an archival state and are excluded unless
    /// the caller filters for them explicitly (or asks for everything).
    pub async fn list(
        &self,
        filter: &AccountListFilter,
    ) -> DbResult<(Vec<ReceivableAccount>, i64)> {
        let mut sql = format!("SELECT {ACCOUNT_COLUMNS} FROM receivable_accounts WHERE 1 = 1");
        let mut count_sql = "SELECT COUNT(*) FROM receivable_accounts WHERE 1 = 1".to_string();

        let status_clause = match (&filter.status, filter.include_all) {
            (Some(_), _) => " AND status = ?",
            (None, true) => "",
            (None, false) => " AND status != 'consolidada'",
        };
        sql.push_str(status_clause);
        count_sql.push_str(status_clause);

        if filter.client_id.is_some() {
            sql.push_str(" AND client_id = ?");
            count_sql.push_str(" AND client_id = ?");
        }

        sql.push_str(" ORDER BY updated_at DESC LIMIT ? OFFSET ?");

        let page = filter.page.max(1);
        let page_size = if filter.page_size == 0 { 20 } else { filter.page_size };
        let offset = (page - 1) * page_size;

        let mut query = sqlx::query_as::<_, ReceivableAccount>(&sql);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = filter.status {
            query = query.bind(status);
            count_query = count_query.bind(status);
        }
        if let Some(client_id) = &filter.client_id {
            query = query.bind(client_id);
            count_query = count_query.bind(client_id);
        }
        query = query.bind(page_size).bind(offset);

        let accounts = query.fetch_all(&self.pool).await?;
        let total = count_query.fetch_one(&self.pool).await?;

        Ok((accounts, total))
    }

    /// Aggregated overview of open receivables (Consolidated excluded).
    pub async fn summary(&self) -> DbResult<ReceivableSummary> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'pendiente' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'pagada' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'pendiente' THEN outstanding_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status != 'consolidada' THEN paid_cents ELSE 0 END), 0)
            FROM receivable_accounts
            WHERE status != 'consolidada'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ReceivableSummary {
            pending_count: row.0,
            paid_count: row.1,
            total_outstanding_cents: row.2,
            total_collected_cents: row.3,
        })
    }

    /// Returns an account's movements, most recent first.
    pub async fn movements_for(
        &self,
        account_id: &str,
        limit: u32,
    ) -> DbResult<Vec<AccountMovement>> {
        let movements = sqlx::query_as::<_, AccountMovement>(
            "SELECT id, account_id, kind, amount_cents, sale_id, description, actor, created_at \
             FROM account_movements WHERE account_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Returns an account's payments, most recent first.
    pub async fn payments_for(&self, account_id: &str) -> DbResult<Vec<ReceivablePayment>> {
        let payments = sqlx::query_as::<_, ReceivablePayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM receivable_payments \
             WHERE account_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Payments not yet reconciled by a register close, since `since`.
    pub async fn open_payments_since(
        &self,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<ReceivablePayment>> {
        let payments = sqlx::query_as::<_, ReceivablePayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM receivable_payments \
             WHERE closed = 0 AND created_at >= ?1 ORDER BY created_at"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Same as [`Self::open_payments_since`], inside a caller transaction.
    pub async fn open_payments_since_in(
        &self,
        conn: &mut SqliteConnection,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<ReceivablePayment>> {
        let payments = sqlx::query_as::<_, ReceivablePayment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM receivable_payments \
             WHERE closed = 0 AND created_at >= ?1 ORDER BY created_at"
        ))
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        Ok(payments)
    }

    /// Stamps payments as reconciled by a register close.
    pub async fn mark_payments_closed(
        &self,
        conn: &mut SqliteConnection,
        payment_ids: &[String],
        closed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        for id in payment_ids {
            sqlx::query(
                "UPDATE receivable_payments SET closed = 1, closed_at = ?2 WHERE id = ?1",
            )
            .bind(id)
            .bind(closed_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_client(db: &Database) -> String {
        let client = new_client("Cliente Credito");
        db.clients().insert(&client).await.unwrap();
        client.id
    }

    /// Opens an account through the same path checkout uses.
    async fn open_account(db: &Database, client_id: &str, amount: i64) -> ConsolidationOutcome {
        let repo = db.receivables();
        let mut tx = db.pool().begin().await.unwrap();
        let outcome = repo
            .create_or_consolidate(&mut tx, client_id, "venta-1", amount, "vendedor1")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        outcome
    }

    #[tokio::test]
    async fn test_create_then_consolidate() {
        let db = test_db().await;
        let client_id = seed_client(&db).await;
        let repo = db.receivables();

        let first = open_account(&db, &client_id, 200_000).await;
        assert!(first.created);

        let mut tx = db.pool().begin().await.unwrap();
        let second = repo
            .create_or_consolidate(&mut tx, &client_id, "venta-2", 100_000, "vendedor1")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Same account, totals added in place, one movement per sale.
        assert!(!second.created);
        assert_eq!(first.account_id, second.account_id);

        let account = repo.get_by_id(&first.account_id).await.unwrap().unwrap();
        assert_eq!(account.total_cents, 300_000);
        assert_eq!(account.outstanding_cents, 300_000);
        assert_eq!(account.paid_cents, 0);
        assert_eq!(account.status, AccountStatus::Pending);

        let movements = repo.movements_for(&first.account_id, 10).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements
            .iter()
            .all(|m| m.kind == AccountMovementKind::CreditSale));
    }

    #[tokio::test]
    async fn test_pending_uniqueness_enforced_by_schema() {
        let db = test_db().await;
        let client_id = seed_client(&db).await;
        open_account(&db, &client_id, 200_000).await;

        // A second Pending row for the same client must hit the partial
        // unique index, even when inserted behind the repository's back.
        let result = sqlx::query(
            r#"
            INSERT INTO receivable_accounts (
                id, client_id, sale_id, total_cents, paid_cents,
                outstanding_cents, status, due_date, created_at, updated_at
            ) VALUES ('dup', ?1, 'venta-x', 1, 0, 1, 'pendiente', NULL, ?2, ?2)
            "#,
        )
        .bind(&client_id)
        .bind(Utc::now())
        .execute(db.pool())
        .await;

        let err: DbError = result.unwrap_err().into();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_payment_ladder_settles_account() {
        let db = test_db().await;
        let client_id = seed_client(&db).await;
        let repo = db.receivables();
        let account_id = open_account(&db, &client_id, 300_000).await.account_id;

        for amount in [100_000_i64, 80_000, 50_000] {
            let (_, account) = repo
                .apply_payment(&account_id, amount, PaymentMethod::Cash, "cajero1", None)
                .await
                .unwrap();
            assert_eq!(
                account.outstanding_cents,
                account.total_cents - account.paid_cents
            );
        }

        let account = repo.get_by_id(&account_id).await.unwrap().unwrap();
        assert_eq!(account.paid_cents, 230_000);
        assert_eq!(account.outstanding_cents, 70_000);
        assert_eq!(account.status, AccountStatus::Pending);

        // The final 70000 settles it.
        let (_, account) = repo
            .apply_payment(&account_id, 70_000, PaymentMethod::Transfer, "cajero1", None)
            .await
            .unwrap();
        assert_eq!(account.outstanding_cents, 0);
        assert_eq!(account.status, AccountStatus::Paid);

        // One movement per credit sale + one per abono.
        let movements = repo.movements_for(&account_id, 10).await.unwrap();
        assert_eq!(movements.len(), 5);
        assert_eq!(repo.payments_for(&account_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_excess_payment_rejected_and_changes_nothing() {
        let db = test_db().await;
        let client_id = seed_client(&db).await;
        let repo = db.receivables();
        let account_id = open_account(&db, &client_id, 70_000).await.account_id;

        let err = repo
            .apply_payment(&account_id, 80_000, PaymentMethod::Cash, "cajero1", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ExcessPayment { .. })
        ));

        let account = repo.get_by_id(&account_id).await.unwrap().unwrap();
        assert_eq!(account.paid_cents, 0);
        assert_eq!(account.outstanding_cents, 70_000);
        assert_eq!(account.status, AccountStatus::Pending);
        assert!(repo.payments_for(&account_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_within_tolerance_settles() {
        let db = test_db().await;
        let client_id = seed_client(&db).await;
        let repo = db.receivables();
        let account_id = open_account(&db, &client_id, 100_000).await.account_id;

        // One cent short is still considered settled.
        let (_, account) = repo
            .apply_payment(&account_id, 99_999, PaymentMethod::Cash, "cajero1", None)
            .await
            .unwrap();
        assert_eq!(account.outstanding_cents, 1);
        assert_eq!(account.status, AccountStatus::Paid);
    }

    #[tokio::test]
    async fn test_payment_on_unknown_account() {
        let db = test_db().await;
        assert!(matches!(
            db.receivables()
                .apply_payment("no-such-id", 1_000, PaymentMethod::Cash, "cajero1", None)
                .await,
            Err(DbError::Domain(CoreError::AccountNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_listing_excludes_consolidated_by_default() {
        let db = test_db().await;
        let repo = db.receivables();

        let client_a = seed_client(&db).await;
        let account_a = open_account(&db, &client_a, 100_000).await.account_id;

        let client_b = new_client("Otro Cliente");
        db.clients().insert(&client_b).await.unwrap();
        let account_b = open_account(&db, &client_b.id, 200_000).await.account_id;

        // Archive one account administratively.
        sqlx::query("UPDATE receivable_accounts SET status = 'consolidada' WHERE id = ?1")
            .bind(&account_a)
            .execute(db.pool())
            .await
            .unwrap();

        let (accounts, total) = repo.list(&AccountListFilter::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(accounts[0].id, account_b);

        // Explicitly asking for them brings them back.
        let filter = AccountListFilter {
            status: Some(AccountStatus::Consolidated),
            ..Default::default()
        };
        let (accounts, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(accounts[0].id, account_a);

        let filter = AccountListFilter {
            include_all: true,
            ..Default::default()
        };
        let (_, total) = repo.list(&filter).await.unwrap();
        assert_eq!(total, 2);

        // The summary also skips the archived account.
        let summary = repo.summary().await.unwrap();
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.total_outstanding_cents, 200_000);
    }
}
