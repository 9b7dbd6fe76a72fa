//! # Domain Types
//!
//! Core domain types used throughout Aurum POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │InventoryMovement│   │ReceivableAccount│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  kind           │   │  kind           │   │  status         │       │
//! │  │  payment_method │   │  stock_before   │   │  total/paid     │       │
//! │  │  total_cents    │   │  stock_after    │   │  outstanding    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Closed enumerations (validated at the HTTP boundary):                 │
//! │    PaymentMethod   efectivo | tarjeta | transferencia | mixto | credito│
//! │    SaleKind        contado | credito                                   │
//! │    AccountStatus   pendiente | pagada | consolidada                    │
//! │    MovementKind    entrada | salida | ajuste                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sale Partitions
//! Sales live in two disjoint partitions: the **day partition** (today's
//! not-yet-closed cash-basis sales) and the **history partition** (credit
//! sales immediately, cash-basis sales once the register closes). A sale is
//! created once and never mutated; closing migrates a day sale's identity to
//! a fresh history id while preserving its original timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale or receivable payment was tendered.
///
/// Wire and storage values are the Spanish terms the POS frontend sends
/// (`metodo_pago: "efectivo"`); the enum keeps them closed and typo-proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMethod {
    /// Physical cash.
    #[serde(rename = "efectivo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "efectivo"))]
    Cash,
    /// Card on the external terminal.
    #[serde(rename = "tarjeta")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "tarjeta"))]
    Card,
    /// Bank transfer.
    #[serde(rename = "transferencia")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "transferencia"))]
    Transfer,
    /// Split across cash + card + transfer; the parts must sum to the total.
    #[serde(rename = "mixto")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "mixto"))]
    Mixed,
    /// Credit sale: nothing tendered now, a receivable account absorbs it.
    #[serde(rename = "credito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credito"))]
    Credit,
}

impl PaymentMethod {
    /// Parses a wire value, rejecting anything outside the closed set.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "efectivo" => Ok(PaymentMethod::Cash),
            "tarjeta" => Ok(PaymentMethod::Card),
            "transferencia" => Ok(PaymentMethod::Transfer),
            "mixto" => Ok(PaymentMethod::Mixed),
            "credito" | "crédito" => Ok(PaymentMethod::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "metodo_pago".to_string(),
                allowed: vec![
                    "efectivo".to_string(),
                    "tarjeta".to_string(),
                    "transferencia".to_string(),
                    "mixto".to_string(),
                    "credito".to_string(),
                ],
            }),
        }
    }

    /// Canonical wire value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "efectivo",
            PaymentMethod::Card => "tarjeta",
            PaymentMethod::Transfer => "transferencia",
            PaymentMethod::Mixed => "mixto",
            PaymentMethod::Credit => "credito",
        }
    }
}

// =============================================================================
// Sale Kind
// =============================================================================

/// Cash-basis vs. credit sale.
///
/// Cash-basis sales land in the day partition until the register closes;
/// credit sales go straight to history and open (or grow) a receivable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SaleKind {
    #[serde(rename = "contado")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "contado"))]
    CashBasis,
    #[serde(rename = "credito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credito"))]
    Credit,
}

impl SaleKind {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "contado" => Ok(SaleKind::CashBasis),
            "credito" | "crédito" => Ok(SaleKind::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "tipo_venta".to_string(),
                allowed: vec!["contado".to_string(), "credito".to_string()],
            }),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleKind::CashBasis => "contado",
            SaleKind::Credit => "credito",
        }
    }
}

// =============================================================================
// Account Status
// =============================================================================

/// Lifecycle of a receivable account.
///
/// `Pending → Paid` through payments; `Consolidated` is an administrative
/// archival state (manual merge/write-off) that listing operations exclude
/// by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum AccountStatus {
    #[serde(rename = "pendiente")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pendiente"))]
    Pending,
    #[serde(rename = "pagada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pagada"))]
    Paid,
    #[serde(rename = "consolidada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "consolidada"))]
    Consolidated,
}

impl AccountStatus {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_lowercase().as_str() {
            "pendiente" => Ok(AccountStatus::Pending),
            "pagada" => Ok(AccountStatus::Paid),
            "consolidada" => Ok(AccountStatus::Consolidated),
            _ => Err(ValidationError::NotAllowed {
                field: "estado".to_string(),
                allowed: vec![
                    "pendiente".to_string(),
                    "pagada".to_string(),
                    "consolidada".to_string(),
                ],
            }),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pendiente",
            AccountStatus::Paid => "pagada",
            AccountStatus::Consolidated => "consolidada",
        }
    }
}

// =============================================================================
// Inventory Movement Kind
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum MovementKind {
    /// Stock received (restock, approved return).
    #[serde(rename = "entrada")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "entrada"))]
    Entrada,
    /// Stock leaving (sale line).
    #[serde(rename = "salida")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "salida"))]
    Salida,
    /// Manual correction to either side.
    #[serde(rename = "ajuste")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ajuste"))]
    Ajuste,
}

impl MovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entrada => "entrada",
            MovementKind::Salida => "salida",
            MovementKind::Ajuste => "ajuste",
        }
    }
}

// =============================================================================
// Account Movement Kind
// =============================================================================

/// What changed a receivable account's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum AccountMovementKind {
    /// A credit sale created or grew the balance.
    #[serde(rename = "venta_credito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "venta_credito"))]
    CreditSale,
    /// A client payment reduced the balance.
    #[serde(rename = "abono")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "abono"))]
    Payment,
}

// =============================================================================
// Product (stock store)
// =============================================================================

/// A jewelry piece as this core sees it: a priced, counted stock row.
///
/// Catalog CRUD (descriptions, images, categories) belongs to the catalog
/// module; checkout only reads `name`/`price_cents` and mutates
/// `current_stock` inside a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Display name shown on receipts and in stock errors.
    pub name: String,
    /// List price in cents.
    pub price_cents: i64,
    /// Current stock level. Never negative.
    pub current_stock: i64,
    /// Whether product is active (soft delete).
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Client (directory)
// =============================================================================

/// A client directory row; credit sales require an existing active client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// One checkout transaction.
///
/// Invariants:
/// - `total_cents = subtotal_cents - discount_cents`
/// - for `Mixed`, the three part columns sum to the total within 1 cent
/// - `change_cents = cash_received_cents - total` for cash tenders
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub kind: SaleKind,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Cash handed over (cash tender, or the cash component of a mixed one).
    pub cash_received_cents: Option<i64>,
    /// Change returned to the customer.
    pub change_cents: Option<i64>,
    /// Mixed tender split. All three set for `Mixed`, all NULL otherwise.
    pub cash_part_cents: Option<i64>,
    pub card_part_cents: Option<i64>,
    pub transfer_part_cents: Option<i64>,
    /// Client reference; required for credit sales.
    pub client_id: Option<String>,
    pub notes: Option<String>,
    /// When the sale actually happened. Preserved verbatim when the register
    /// close migrates a day sale into history.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// When the register close migrated this row (history partition only).
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// `product_id` is NULL for "other/custom" lines (engraving, repairs, a
/// piece sold outside the catalog); those still carry a description and
/// price but touch no stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen), or the custom line text.
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub subtotal_cents: i64,
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Immutable stock-change audit row. Created exactly once per
/// stock-affecting event, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Units moved; always positive, the kind carries the direction.
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub actor: String,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receivable Account
// =============================================================================

/// A client's consolidated running credit balance.
///
/// Invariants:
/// - `outstanding_cents = total_cents - paid_cents`
/// - `outstanding_cents <= 1` iff `status == Paid`
/// - at most one account per client in `Pending` (schema-enforced)
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReceivableAccount {
    pub id: String,
    pub client_id: String,
    /// The sale that opened the account.
    pub sale_id: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    pub status: AccountStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Account Movement
// =============================================================================

/// Audit entry appended every time an account's totals change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AccountMovement {
    pub id: String,
    pub account_id: String,
    pub kind: AccountMovementKind,
    pub amount_cents: i64,
    pub sale_id: Option<String>,
    pub description: String,
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receivable Payment (Abono)
// =============================================================================

/// A client payment against a receivable account. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReceivablePayment {
    pub id: String,
    pub account_id: String,
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub actor: String,
    /// Stamped by the register close that reconciled this payment.
    pub closed: bool,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Register Closing
// =============================================================================

/// Immutable end-of-day snapshot, one row per close operation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RegisterClosing {
    pub id: String,
    pub actor: String,
    pub cash_total_cents: i64,
    pub card_total_cents: i64,
    pub transfer_total_cents: i64,
    pub sales_total_cents: i64,
    pub payments_total_cents: i64,
    pub other_income_cents: i64,
    pub grand_total_cents: i64,
    /// Day sales migrated into history by this close.
    pub sales_migrated: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Day Summary (not persisted)
// =============================================================================

/// Read-only end-of-day reconciliation preview: today's day-partition sales
/// plus today's open receivable payments, bucketed by tender.
///
/// Mixed sales contribute their split parts to each bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DaySummary {
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub cash_payments_cents: i64,
    pub card_payments_cents: i64,
    pub transfer_payments_cents: i64,
    pub sales_total_cents: i64,
    pub payments_total_cents: i64,
    pub grand_total_cents: i64,
    pub sales_count: i64,
    pub payments_count: i64,
}

impl DaySummary {
    /// Adds one sale's tender contribution to the sale buckets.
    pub fn add_sale(&mut self, sale: &Sale) {
        match sale.payment_method {
            PaymentMethod::Cash => self.cash_sales_cents += sale.total_cents,
            PaymentMethod::Card => self.card_sales_cents += sale.total_cents,
            PaymentMethod::Transfer => self.transfer_sales_cents += sale.total_cents,
            PaymentMethod::Mixed => {
                self.cash_sales_cents += sale.cash_part_cents.unwrap_or(0);
                self.card_sales_cents += sale.card_part_cents.unwrap_or(0);
                self.transfer_sales_cents += sale.transfer_part_cents.unwrap_or(0);
            }
            // Credit sales tender nothing on the day they happen.
            PaymentMethod::Credit => {}
        }
        self.sales_total_cents += sale.total_cents;
        self.sales_count += 1;
    }

    /// Adds one receivable payment to the payment buckets.
    pub fn add_payment(&mut self, payment: &ReceivablePayment) {
        match payment.payment_method {
            PaymentMethod::Cash => self.cash_payments_cents += payment.amount_cents,
            PaymentMethod::Card => self.card_payments_cents += payment.amount_cents,
            PaymentMethod::Transfer => self.transfer_payments_cents += payment.amount_cents,
            // Abonos are validated to cash/card/transfer at the boundary.
            PaymentMethod::Mixed | PaymentMethod::Credit => {}
        }
        self.payments_total_cents += payment.amount_cents;
        self.payments_count += 1;
    }

    /// Recomputes the grand total after all sales/payments were added.
    pub fn finish(mut self) -> Self {
        self.grand_total_cents = self.sales_total_cents + self.payments_total_cents;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("efectivo").unwrap(), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::parse(" Tarjeta ").unwrap(), PaymentMethod::Card);
        assert_eq!(PaymentMethod::parse("crédito").unwrap(), PaymentMethod::Credit);
        assert!(PaymentMethod::parse("bitcoin").is_err());
        assert!(PaymentMethod::parse("").is_err());
    }

    #[test]
    fn test_account_status_parse() {
        assert_eq!(AccountStatus::parse("pendiente").unwrap(), AccountStatus::Pending);
        assert_eq!(AccountStatus::parse("pagada").unwrap(), AccountStatus::Paid);
        assert!(AccountStatus::parse("abierta").is_err());
    }

    #[test]
    fn test_wire_values_round_trip() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Card,
            PaymentMethod::Transfer,
            PaymentMethod::Mixed,
            PaymentMethod::Credit,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()).unwrap(), method);
        }
    }

    #[test]
    fn test_serde_emits_wire_values() {
        assert_eq!(
            serde_json::to_value(PaymentMethod::Cash).unwrap(),
            serde_json::json!("efectivo")
        );
        assert_eq!(
            serde_json::to_value(AccountStatus::Consolidated).unwrap(),
            serde_json::json!("consolidada")
        );
        assert_eq!(
            serde_json::to_value(MovementKind::Salida).unwrap(),
            serde_json::json!("salida")
        );

        let parsed: SaleKind = serde_json::from_str("\"contado\"").unwrap();
        assert_eq!(parsed, SaleKind::CashBasis);
    }

    #[test]
    fn test_day_summary_buckets() {
        let mut summary = DaySummary::default();

        let mut sale = sample_sale(PaymentMethod::Cash, 15_000_000);
        summary.add_sale(&sale);

        sale = sample_sale(PaymentMethod::Mixed, 15_000_000);
        sale.cash_part_cents = Some(10_000_000);
        sale.card_part_cents = Some(5_000_000);
        sale.transfer_part_cents = Some(0);
        summary.add_sale(&sale);

        let summary = summary.finish();
        assert_eq!(summary.cash_sales_cents, 25_000_000);
        assert_eq!(summary.card_sales_cents, 5_000_000);
        assert_eq!(summary.sales_total_cents, 30_000_000);
        assert_eq!(summary.grand_total_cents, 30_000_000);
        assert_eq!(summary.sales_count, 2);
    }

    fn sample_sale(method: PaymentMethod, total: i64) -> Sale {
        Sale {
            id: "s1".to_string(),
            kind: SaleKind::CashBasis,
            payment_method: method,
            subtotal_cents: total,
            discount_cents: 0,
            total_cents: total,
            cash_received_cents: None,
            change_cents: None,
            cash_part_cents: None,
            card_part_cents: None,
            transfer_part_cents: None,
            client_id: None,
            notes: None,
            created_at: Utc::now(),
            closed_at: None,
        }
    }
}
