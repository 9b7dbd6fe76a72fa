//! # Accounts Receivable Routes
//!
//! `GET /cuentas-por-cobrar` lists accounts (Consolidated excluded unless
//! requested); `POST /cuentas-por-cobrar/:id/abonos` registers a payment.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use aurum_core::validation::validate_payment_amount;
use aurum_core::{PaymentMethod, ValidationError};
use aurum_db::repository::receivable::AccountListFilter;
use aurum_db::Database;

use crate::dto::{account_to_dto, cents_to_currency, AccountListQuery, CreatePaymentRequest};
use crate::error::ApiError;
use crate::routes::actor_from_headers;

/// Accounts listing page size.
const PAGE_SIZE: u32 = 20;

pub fn router() -> Router<Database> {
    Router::new()
        .route("/", get(list_accounts))
        .route("/:id/abonos", post(create_payment))
}

async fn list_accounts(
    State(db): State<Database>,
    Query(query): Query<AccountListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut filter = AccountListFilter {
        client_id: query.id_cliente.clone().filter(|s| !s.trim().is_empty()),
        page: query.pagina.unwrap_or(1),
        page_size: PAGE_SIZE,
        ..Default::default()
    };

    // Consolidated accounts are archival; they only show up when asked for
    // ("estado=consolidada") or when the caller wants everything.
    match query.estado.as_deref().map(str::trim) {
        None | Some("") => {}
        Some("todas") => filter.include_all = true,
        Some(raw) => filter.status = Some(aurum_core::AccountStatus::parse(raw)?),
    }

    let (accounts, total) = db.receivables().list(&filter).await?;

    Ok(Json(json!({
        "cuentas": accounts.iter().map(account_to_dto).collect::<Vec<_>>(),
        "total": total,
    })))
}

async fn create_payment(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers);

    let monto = body
        .monto
        .ok_or_else(|| ApiError::validation("monto es requerido"))?;
    validate_payment_amount(monto.0)?;

    let metodo = body
        .metodo_pago
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("metodo_pago es requerido"))?;
    let method = PaymentMethod::parse(metodo)?;
    // An abono is tendered one way; mixed splits and "credit" make no
    // sense against a credit balance.
    if matches!(method, PaymentMethod::Mixed | PaymentMethod::Credit) {
        return Err(ValidationError::NotAllowed {
            field: "metodo_pago".to_string(),
            allowed: vec![
                "efectivo".to_string(),
                "tarjeta".to_string(),
                "transferencia".to_string(),
            ],
        }
        .into());
    }

    let notes = body.notas.clone().filter(|s| !s.trim().is_empty());
    let (payment, account) = db
        .receivables()
        .apply_payment(&id, monto.0, method, &actor, notes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id_abono": payment.id,
            "nuevo_saldo": cents_to_currency(account.outstanding_cents),
            "estado": account.status.as_str(),
        })),
    ))
}
