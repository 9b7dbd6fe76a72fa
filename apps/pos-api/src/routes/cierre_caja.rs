//! # Register Closing Routes
//!
//! `POST /cierrecaja/cerrar-caja` migrates the day partition into history
//! and snapshots the totals; `GET /cierrecaja/resumen-dia` previews the
//! same numbers without touching anything.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use aurum_db::Database;

use crate::dto::{cents_to_currency, sale_to_dto, summary_to_dto};
use crate::error::ApiError;
use crate::routes::actor_from_headers;

pub fn router() -> Router<Database> {
    Router::new()
        .route("/cerrar-caja", post(close_register))
        .route("/resumen-dia", get(day_summary))
}

async fn close_register(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers);
    let outcome = db.closing().close(&actor).await?;

    Ok(Json(json!({
        "mensaje": format!(
            "Caja cerrada: {} ventas transferidas al historial",
            outcome.migrated_count
        ),
        "resumen": {
            "id_cierre": outcome.closing.id,
            "ventas_transferidas": outcome.migrated_count,
            "total_ventas": cents_to_currency(outcome.migrated_total_cents),
            "detalle": summary_to_dto(&outcome.summary),
        },
    })))
}

async fn day_summary(State(db): State<Database>) -> Result<impl IntoResponse, ApiError> {
    let (summary, sales) = db.closing().summarize_today().await?;

    Ok(Json(json!({
        "resumen": summary_to_dto(&summary),
        "ventas": sales.iter().map(|s| sale_to_dto(s, None)).collect::<Vec<_>>(),
    })))
}
