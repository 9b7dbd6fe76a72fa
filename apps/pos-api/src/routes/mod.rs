//! HTTP routes, one file per domain area.

pub mod cierre_caja;
pub mod cuentas_por_cobrar;
pub mod system;
pub mod ventas;

use axum::http::HeaderMap;
use axum::Router;

use aurum_db::Database;

/// Builds the full route tree over a shared database handle.
pub fn router(db: Database) -> Router {
    Router::new()
        .nest("/ventas", ventas::router())
        .nest("/cierrecaja", cierre_caja::router())
        .nest("/cuentas-por-cobrar", cuentas_por_cobrar::router())
        .merge(system::router())
        .with_state(db)
}

/// The acting user, as reported by the authenticated session layer.
///
/// Session management is an upstream concern; it forwards the user name in
/// the `x-usuario` header. Absent that, actions are attributed to the
/// system itself.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-usuario")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("sistema")
        .to_string()
}
