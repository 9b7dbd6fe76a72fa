//! # Sales Routes
//!
//! `POST /ventas` runs one checkout; `GET /ventas` lists both partitions
//! merged newest first; `GET /ventas/:id` fetches one sale with its items.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde_json::json;

use aurum_core::checkout::{CheckoutLine, CheckoutRequest, MixedSplit};
use aurum_core::{CoreError, Money, PaymentMethod, SaleKind};
use aurum_db::repository::sale::SaleListFilter;
use aurum_db::Database;

use crate::dto::{cents_to_currency, sale_to_dto, CreateSaleRequest, SaleListQuery};
use crate::error::ApiError;
use crate::routes::actor_from_headers;

/// Sales listing page size.
const PAGE_SIZE: u32 = 20;

pub fn router() -> Router<Database> {
    Router::new()
        .route("/", post(create_sale).get(list_sales))
        .route("/:id", get(get_sale))
}

async fn create_sale(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(body): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers);

    let metodo = body
        .metodo_pago
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("metodo_pago es requerido"))?;
    let method = PaymentMethod::parse(metodo)?;
    // tipo_venta may be omitted; the tender method implies it then.
    let kind = match &body.tipo_venta {
        Some(tipo) => SaleKind::parse(tipo)?,
        None if method == PaymentMethod::Credit => SaleKind::Credit,
        None => SaleKind::CashBasis,
    };

    let lines: Vec<CheckoutLine> = body
        .items
        .iter()
        .map(|item| CheckoutLine {
            product_id: item.id_joya.clone().filter(|s| !s.trim().is_empty()),
            description: item.descripcion.clone(),
            quantity: item.cantidad.0,
            unit_price: Money::from_cents(item.precio_unitario.0),
        })
        .collect();

    let mixed = match (
        body.monto_efectivo,
        body.monto_tarjeta,
        body.monto_transferencia,
    ) {
        (None, None, None) => None,
        (cash, card, transfer) => Some(MixedSplit {
            cash: Money::from_cents(cash.map_or(0, |m| m.0)),
            card: Money::from_cents(card.map_or(0, |m| m.0)),
            transfer: Money::from_cents(transfer.map_or(0, |m| m.0)),
        }),
    };

    let request = CheckoutRequest {
        method,
        kind,
        lines,
        discount: Money::from_cents(body.descuento.map_or(0, |m| m.0)),
        client_id: body.id_cliente.clone().filter(|s| !s.trim().is_empty()),
        cash_received: body.efectivo_recibido.map(|m| Money::from_cents(m.0)),
        mixed,
        notes: body.notas.clone().filter(|s| !s.trim().is_empty()),
    };

    let outcome = db.checkout().process(request, &actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": outcome.sale_id,
            "total": cents_to_currency(outcome.total_cents),
            "cambio": outcome.change_cents.map(cents_to_currency),
            "id_cuenta_por_cobrar": outcome.receivable_account_id,
        })),
    ))
}

async fn list_sales(
    State(db): State<Database>,
    Query(query): Query<SaleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let method = query
        .metodo_pago
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(PaymentMethod::parse)
        .transpose()?;

    let filter = SaleListFilter {
        date_from: parse_date(query.fecha_inicio.as_deref(), "fecha_inicio")?,
        // fecha_fin is an inclusive calendar day: filter to the next day start.
        date_to: parse_date(query.fecha_fin.as_deref(), "fecha_fin")?
            .and_then(|d| d.checked_add_days(Days::new(1))),
        method,
        page: query.pagina.unwrap_or(1),
        page_size: PAGE_SIZE,
    };

    let page = db.sales().list_merged(&filter).await?;

    Ok(Json(json!({
        "ventas": page.sales.iter().map(|s| sale_to_dto(s, None)).collect::<Vec<_>>(),
        "total": page.total,
        "ventas_dia_count": page.day_count,
        "ventas_historial_count": page.history_count,
    })))
}

async fn get_sale(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (sale, items, _) = db
        .sales()
        .get_with_items(&id)
        .await?
        .ok_or(CoreError::SaleNotFound(id))?;

    Ok(Json(sale_to_dto(&sale, Some(&items))))
}

/// Parses a `YYYY-MM-DD` query value into the UTC start of that day.
fn parse_date(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!("{field} debe tener formato YYYY-MM-DD"))
    })?;

    Ok(Some(date.and_time(NaiveTime::MIN).and_utc()))
}
