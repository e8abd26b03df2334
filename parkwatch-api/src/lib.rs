use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod live;
pub mod slots;
pub mod state;
pub mod worker;

pub use state::{AppState, LiveFeed};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(slots::routes())
        .merge(live::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
