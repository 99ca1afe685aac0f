use axum::{http::Method, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod assist;
pub mod error;
pub mod inquiries;
pub mod live;
pub mod middleware;
pub mod quotes;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let authenticated = Router::new()
        .merge(inquiries::routes())
        .merge(quotes::routes())
        .merge(live::routes())
        .merge(assist::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::caller_auth_middleware,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(authenticated)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
