//! # Request/Response DTOs
//!
//! Wire types for the POS frontend. Field names are the Spanish terms the
//! frontend already speaks (`metodo_pago`, `descuento`, ...). Monetary
//! amounts travel in currency units (possibly with two decimals) and are
//! converted to integer cents at this boundary; quantities must be whole
//! numbers. Both accept a number or a numeric string, because POS terminals
//! are not consistent about it.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use aurum_core::{ReceivableAccount, Sale, SaleItem};

// =============================================================================
// Flexible input scalars
// =============================================================================

/// A currency amount: number or numeric string, converted to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monto(pub i64);

impl<'de> Deserialize<'de> for Monto {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let units = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| D::Error::custom("monto invalido"))?;

        if !units.is_finite() {
            return Err(D::Error::custom("monto invalido"));
        }

        Ok(Monto((units * 100.0).round() as i64))
    }
}

/// A whole-number quantity: integer, integral float, or numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cantidad(pub i64);

impl<'de> Deserialize<'de> for Cantidad {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let qty = match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| D::Error::custom("cantidad invalida"))?;

        Ok(Cantidad(qty))
    }
}

/// Formats integer cents back into wire currency units.
pub fn cents_to_currency(cents: i64) -> f64 {
    cents as f64 / 100.0
}

// =============================================================================
// Requests
// =============================================================================

/// POST /ventas request body.
///
/// `items` and `metodo_pago` are checked by the handler rather than serde
/// so their absence is a 400 with a useful message, like every other
/// validation failure.
#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub tipo_venta: Option<String>,
    #[serde(default)]
    pub descuento: Option<Monto>,
    #[serde(default)]
    pub id_cliente: Option<String>,
    #[serde(default)]
    pub efectivo_recibido: Option<Monto>,
    #[serde(default)]
    pub monto_efectivo: Option<Monto>,
    #[serde(default)]
    pub monto_tarjeta: Option<Monto>,
    #[serde(default)]
    pub monto_transferencia: Option<Monto>,
    #[serde(default)]
    pub notas: Option<String>,
}

/// One line of a POST /ventas request.
#[derive(Debug, Deserialize)]
pub struct SaleLineRequest {
    /// Product reference; omit for "other/custom" lines.
    #[serde(default)]
    pub id_joya: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub cantidad: Cantidad,
    pub precio_unitario: Monto,
}

/// POST /cuentas-por-cobrar/:id/abonos request body.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default)]
    pub monto: Option<Monto>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
}

/// GET /ventas query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SaleListQuery {
    #[serde(default)]
    pub fecha_inicio: Option<String>,
    #[serde(default)]
    pub fecha_fin: Option<String>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub pagina: Option<u32>,
}

/// GET /cuentas-por-cobrar query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub id_cliente: Option<String>,
    #[serde(default)]
    pub pagina: Option<u32>,
}

// =============================================================================
// Responses
// =============================================================================

/// A sale as the frontend sees it.
#[derive(Debug, Serialize)]
pub struct SaleDto {
    pub id: String,
    pub tipo_venta: &'static str,
    pub metodo_pago: &'static str,
    pub subtotal: f64,
    pub descuento: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efectivo_recibido: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cambio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto_efectivo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto_tarjeta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto_transferencia: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_cliente: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
    pub fecha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SaleItemDto>>,
}

#[derive(Debug, Serialize)]
pub struct SaleItemDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_joya: Option<String>,
    pub descripcion: String,
    pub cantidad: i64,
    pub precio_unitario: f64,
    pub subtotal: f64,
}

/// A receivable account as the frontend sees it.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: String,
    pub id_cliente: String,
    pub id_venta: String,
    pub total: f64,
    pub abonado: f64,
    pub saldo_pendiente: f64,
    pub estado: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_vencimiento: Option<String>,
    pub fecha_creacion: String,
    pub fecha_actualizacion: String,
}

pub fn sale_to_dto(sale: &Sale, items: Option<&[SaleItem]>) -> SaleDto {
    SaleDto {
        id: sale.id.clone(),
        tipo_venta: sale.kind.as_str(),
        metodo_pago: sale.payment_method.as_str(),
        subtotal: cents_to_currency(sale.subtotal_cents),
        descuento: cents_to_currency(sale.discount_cents),
        total: cents_to_currency(sale.total_cents),
        efectivo_recibido: sale.cash_received_cents.map(cents_to_currency),
        cambio: sale.change_cents.map(cents_to_currency),
        monto_efectivo: sale.cash_part_cents.map(cents_to_currency),
        monto_tarjeta: sale.card_part_cents.map(cents_to_currency),
        monto_transferencia: sale.transfer_part_cents.map(cents_to_currency),
        id_cliente: sale.client_id.clone(),
        notas: sale.notes.clone(),
        fecha: sale.created_at.to_rfc3339(),
        items: items.map(|items| items.iter().map(sale_item_to_dto).collect()),
    }
}

pub fn sale_item_to_dto(item: &SaleItem) -> SaleItemDto {
    SaleItemDto {
        id: item.id.clone(),
        id_joya: item.product_id.clone(),
        descripcion: item.description.clone(),
        cantidad: item.quantity,
        precio_unitario: cents_to_currency(item.unit_price_cents),
        subtotal: cents_to_currency(item.subtotal_cents),
    }
}

pub fn account_to_dto(account: &ReceivableAccount) -> AccountDto {
    AccountDto {
        id: account.id.clone(),
        id_cliente: account.client_id.clone(),
        id_venta: account.sale_id.clone(),
        total: cents_to_currency(account.total_cents),
        abonado: cents_to_currency(account.paid_cents),
        saldo_pendiente: cents_to_currency(account.outstanding_cents),
        estado: account.status.as_str(),
        fecha_vencimiento: account.due_date.map(|d| d.to_rfc3339()),
        fecha_creacion: account.created_at.to_rfc3339(),
        fecha_actualizacion: account.updated_at.to_rfc3339(),
    }
}

/// The day summary as the frontend sees it.
#[derive(Debug, Serialize)]
pub struct SummaryDto {
    pub ventas_efectivo: f64,
    pub ventas_tarjeta: f64,
    pub ventas_transferencia: f64,
    pub abonos_efectivo: f64,
    pub abonos_tarjeta: f64,
    pub abonos_transferencia: f64,
    pub total_ventas: f64,
    pub total_abonos: f64,
    pub total_general: f64,
    pub numero_ventas: i64,
    pub numero_abonos: i64,
}

pub fn summary_to_dto(summary: &aurum_core::DaySummary) -> SummaryDto {
    SummaryDto {
        ventas_efectivo: cents_to_currency(summary.cash_sales_cents),
        ventas_tarjeta: cents_to_currency(summary.card_sales_cents),
        ventas_transferencia: cents_to_currency(summary.transfer_sales_cents),
        abonos_efectivo: cents_to_currency(summary.cash_payments_cents),
        abonos_tarjeta: cents_to_currency(summary.card_payments_cents),
        abonos_transferencia: cents_to_currency(summary.transfer_payments_cents),
        total_ventas: cents_to_currency(summary.sales_total_cents),
        total_abonos: cents_to_currency(summary.payments_total_cents),
        total_general: cents_to_currency(summary.grand_total_cents),
        numero_ventas: summary.sales_count,
        numero_abonos: summary.payments_count,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monto_accepts_number_and_string() {
        let m: Monto = serde_json::from_str("150000").unwrap();
        assert_eq!(m.0, 15_000_000);

        let m: Monto = serde_json::from_str("150000.50").unwrap();
        assert_eq!(m.0, 15_000_050);

        let m: Monto = serde_json::from_str("\"150000\"").unwrap();
        assert_eq!(m.0, 15_000_000);

        assert!(serde_json::from_str::<Monto>("\"abc\"").is_err());
        assert!(serde_json::from_str::<Monto>("null").is_err());
    }

    #[test]
    fn test_cantidad_requires_whole_numbers() {
        let c: Cantidad = serde_json::from_str("3").unwrap();
        assert_eq!(c.0, 3);

        let c: Cantidad = serde_json::from_str("3.0").unwrap();
        assert_eq!(c.0, 3);

        let c: Cantidad = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(c.0, 3);

        assert!(serde_json::from_str::<Cantidad>("2.5").is_err());
        assert!(serde_json::from_str::<Cantidad>("\"dos\"").is_err());
    }

    #[test]
    fn test_create_sale_request_parses() {
        let body = serde_json::json!({
            "items": [
                {"id_joya": "abc", "cantidad": 1, "precio_unitario": 150000},
                {"descripcion": "Grabado", "cantidad": "1", "precio_unitario": "30000"}
            ],
            "metodo_pago": "efectivo",
            "efectivo_recibido": 200000
        });

        let request: CreateSaleRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[0].precio_unitario.0, 15_000_000);
        assert_eq!(request.items[1].cantidad.0, 1);
        assert_eq!(request.efectivo_recibido.unwrap().0, 20_000_000);
        assert!(request.tipo_venta.is_none());
    }

    #[test]
    fn test_currency_round_trip() {
        assert_eq!(cents_to_currency(15_000_000), 150_000.0);
        assert_eq!(cents_to_currency(15_000_050), 150_000.5);
    }
}
