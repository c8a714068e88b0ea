pub mod handlers;

pub use handlers::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;

/// 构建路由
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let reconcile_routes = Router::new()
        .route("/api/shipments/reconcile/preview", post(preview_reconcile))
        .route("/api/shipments/reconcile/apply", post(apply_reconcile))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/shipments/recent", get(recent_shipments))
        .route("/api/items", get(item_list))
        .route("/api/items/:item_code/electrodes", get(electrode_status))
        .route("/api/defects", get(defect_list).post(register_defect))
        .route("/api/defects/:id", put(revise_defect).delete(remove_defect))
        .merge(reconcile_routes)
        .layer(ServiceBuilder::new())
        .with_state(state)
}
