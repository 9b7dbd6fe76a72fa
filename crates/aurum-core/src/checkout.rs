//! # Checkout Rules
//!
//! Pure validation and totals computation for one checkout request.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Pipeline                                  │
//! │                                                                         │
//! │  POST /ventas (JSON)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DTO parsing + enum validation (pos-api)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_and_total() ← THIS MODULE (no I/O, rejects before any write) │
//! │       │                                                                 │
//! │       ├── empty lines / bad quantities ──► ValidationError             │
//! │       ├── credit without client ────────► ValidationError              │
//! │       ├── mixed parts ≠ total ──────────► InvalidTender                │
//! │       ├── cash received < due ──────────► InsufficientCash             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutService (aurum-db): stock checks + writes, one transaction    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tender Rules
//! - `total = subtotal - discount`
//! - Mixed: `|cash + card + transfer - total| <= 1 cent`
//! - Cash with cash received: `change = received - total`, never negative
//! - The cash rule also applies to the cash component of a mixed tender

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, SaleKind};
use crate::validation::{
    validate_discount, validate_item_count, validate_note, validate_price_cents, validate_quantity,
};
use crate::TENDER_TOLERANCE_CENTS;

// =============================================================================
// Request Types
// =============================================================================

/// One requested sale line.
///
/// `product_id == None` marks an "other/custom" line (repairs, engraving):
/// it needs a description and touches no stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CheckoutLine {
    /// Line subtotal: quantity × unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Mixed tender split; the three parts must cover the sale total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MixedSplit {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
}

impl MixedSplit {
    pub fn sum(&self) -> Money {
        self.cash + self.card + self.transfer
    }
}

/// A fully-parsed checkout request, ready for validation.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub method: PaymentMethod,
    pub kind: SaleKind,
    pub lines: Vec<CheckoutLine>,
    pub discount: Money,
    pub client_id: Option<String>,
    /// Cash handed over by the customer (cash tender or mixed cash part).
    pub cash_received: Option<Money>,
    pub mixed: Option<MixedSplit>,
    pub notes: Option<String>,
}

/// Computed checkout amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub total: Money,
    /// Change due back, when cash was received.
    pub change: Option<Money>,
}

// =============================================================================
// Validation + Totals
// =============================================================================

/// Validates a checkout request and computes its totals.
///
/// ## What This Checks (in order)
/// 1. Line list is non-empty and within limits, quantities and prices valid
/// 2. Kind and tender method agree (credit ⇔ credito)
/// 3. Credit sales carry a client reference
/// 4. Discount within `[0, subtotal]`
/// 5. Mixed tender parts sum to the total within the 1-cent tolerance
/// 6. Cash received covers the amount due; computes change
///
/// No I/O: stock availability is the database layer's job and is checked
/// there, before any write, inside the same transaction that decrements.
pub fn validate_and_total(request: &CheckoutRequest) -> CoreResult<CheckoutTotals> {
    validate_item_count(request.lines.len())?;

    for line in &request.lines {
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price.cents())?;
        if line.product_id.is_none()
            && line.description.as_deref().map_or(true, |d| d.trim().is_empty())
        {
            return Err(crate::error::ValidationError::Required {
                field: "descripcion".to_string(),
            }
            .into());
        }
    }

    if let Some(notes) = &request.notes {
        validate_note(notes)?;
    }

    // Sale kind and tender method must describe the same sale.
    let credit_kind = request.kind == SaleKind::Credit;
    let credit_method = request.method == PaymentMethod::Credit;
    if credit_kind != credit_method {
        return Err(crate::error::ValidationError::InvalidFormat {
            field: "tipo_venta".to_string(),
            reason: "una venta a credito requiere metodo_pago credito".to_string(),
        }
        .into());
    }

    if credit_kind && request.client_id.as_deref().map_or(true, str::is_empty) {
        return Err(crate::error::ValidationError::Required {
            field: "id_cliente".to_string(),
        }
        .into());
    }

    let subtotal = request
        .lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.subtotal());

    validate_discount(request.discount.cents(), subtotal.cents())?;
    let total = subtotal - request.discount;

    // Mixed tender: the three parts must sum to the total within tolerance.
    if request.method == PaymentMethod::Mixed {
        let split = request.mixed.ok_or_else(|| {
            CoreError::Validation(crate::error::ValidationError::Required {
                field: "monto_efectivo/monto_tarjeta/monto_transferencia".to_string(),
            })
        })?;

        if split.cash.is_negative() || split.card.is_negative() || split.transfer.is_negative() {
            return Err(crate::error::ValidationError::MustBePositive {
                field: "montos del pago mixto".to_string(),
            }
            .into());
        }

        let parts = split.sum();
        if (parts - total).cents().abs() > TENDER_TOLERANCE_CENTS {
            return Err(CoreError::InvalidTender {
                parts_cents: parts.cents(),
                total_cents: total.cents(),
            });
        }
    }

    // Cash rule: change = received - due, and it can never be negative.
    // For a mixed tender the amount due in cash is the cash component.
    let change = match (request.method, request.cash_received) {
        (PaymentMethod::Cash, Some(received)) => {
            let change = received - total;
            if change.is_negative() {
                return Err(CoreError::InsufficientCash {
                    required_cents: total.cents(),
                    received_cents: received.cents(),
                });
            }
            Some(change)
        }
        (PaymentMethod::Mixed, Some(received)) => {
            let cash_due = request.mixed.map(|m| m.cash).unwrap_or_else(Money::zero);
            let change = received - cash_due;
            if change.is_negative() {
                return Err(CoreError::InsufficientCash {
                    required_cents: cash_due.cents(),
                    received_cents: received.cents(),
                });
            }
            Some(change)
        }
        _ => None,
    };

    Ok(CheckoutTotals {
        subtotal,
        total,
        change,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, qty: i64) -> CheckoutLine {
        CheckoutLine {
            product_id: Some("11111111-1111-1111-1111-111111111111".to_string()),
            description: None,
            quantity: qty,
            unit_price: Money::from_cents(price),
        }
    }

    fn cash_request(lines: Vec<CheckoutLine>) -> CheckoutRequest {
        CheckoutRequest {
            method: PaymentMethod::Cash,
            kind: SaleKind::CashBasis,
            lines,
            discount: Money::zero(),
            client_id: None,
            cash_received: None,
            mixed: None,
            notes: None,
        }
    }

    #[test]
    fn test_totals_with_discount() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.discount = Money::from_cents(1_000_000);

        let totals = validate_and_total(&request).unwrap();
        assert_eq!(totals.subtotal.cents(), 15_000_000);
        assert_eq!(totals.total.cents(), 14_000_000);
    }

    #[test]
    fn test_empty_lines_rejected() {
        let request = cash_request(vec![]);
        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_change_computation() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.cash_received = Some(Money::from_cents(20_000_000));

        let totals = validate_and_total(&request).unwrap();
        assert_eq!(totals.change.unwrap().cents(), 5_000_000);
    }

    #[test]
    fn test_insufficient_cash_rejected() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.cash_received = Some(Money::from_cents(10_000_000));

        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::InsufficientCash { .. })
        ));
    }

    #[test]
    fn test_mixed_tender_exact_sum_accepted() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.method = PaymentMethod::Mixed;
        request.mixed = Some(MixedSplit {
            cash: Money::from_cents(10_000_000),
            card: Money::from_cents(5_000_000),
            transfer: Money::zero(),
        });

        let totals = validate_and_total(&request).unwrap();
        assert_eq!(totals.total.cents(), 15_000_000);
    }

    #[test]
    fn test_mixed_tender_tolerance_edges() {
        // Off by exactly the tolerance: accepted.
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.method = PaymentMethod::Mixed;
        request.mixed = Some(MixedSplit {
            cash: Money::from_cents(10_000_000),
            card: Money::from_cents(5_000_001),
            transfer: Money::zero(),
        });
        assert!(validate_and_total(&request).is_ok());

        // Off by one more than the tolerance: rejected.
        request.mixed = Some(MixedSplit {
            cash: Money::from_cents(10_000_000),
            card: Money::from_cents(5_000_002),
            transfer: Money::zero(),
        });
        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::InvalidTender { .. })
        ));
    }

    #[test]
    fn test_mixed_cash_component_change() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.method = PaymentMethod::Mixed;
        request.mixed = Some(MixedSplit {
            cash: Money::from_cents(10_000_000),
            card: Money::from_cents(5_000_000),
            transfer: Money::zero(),
        });
        request.cash_received = Some(Money::from_cents(12_000_000));

        let totals = validate_and_total(&request).unwrap();
        assert_eq!(totals.change.unwrap().cents(), 2_000_000);

        // Received less than the cash component: rejected.
        request.cash_received = Some(Money::from_cents(9_000_000));
        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::InsufficientCash { .. })
        ));
    }

    #[test]
    fn test_credit_requires_client() {
        let mut request = cash_request(vec![line(15_000_000, 2)]);
        request.method = PaymentMethod::Credit;
        request.kind = SaleKind::Credit;

        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::Validation(_))
        ));

        request.client_id = Some("22222222-2222-2222-2222-222222222222".to_string());
        let totals = validate_and_total(&request).unwrap();
        assert_eq!(totals.total.cents(), 30_000_000);
    }

    #[test]
    fn test_kind_method_mismatch_rejected() {
        let mut request = cash_request(vec![line(15_000_000, 1)]);
        request.kind = SaleKind::Credit;
        request.client_id = Some("22222222-2222-2222-2222-222222222222".to_string());
        // method still Cash

        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_custom_line_needs_description() {
        let mut request = cash_request(vec![CheckoutLine {
            product_id: None,
            description: None,
            quantity: 1,
            unit_price: Money::from_cents(50_000),
        }]);
        assert!(validate_and_total(&request).is_err());

        request.lines[0].description = Some("Grabado personalizado".to_string());
        assert!(validate_and_total(&request).is_ok());
    }

    #[test]
    fn test_discount_larger_than_subtotal_rejected() {
        let mut request = cash_request(vec![line(1_000_000, 1)]);
        request.discount = Money::from_cents(2_000_000);

        assert!(matches!(
            validate_and_total(&request),
            Err(CoreError::Validation(_))
        ));
    }
}
