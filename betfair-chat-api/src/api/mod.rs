pub mod assets;
pub mod chat;

use axum::{Router, middleware, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{error_handler, request_id};
use assets::AssetsState;
use chat::ChatState;

pub fn router(chat_state: ChatState, assets_state: AssetsState) -> Router {
    let chat_routes = Router::new()
        .route("/chat/", get(chat::get_chat).post(chat::post_chat))
        .route("/chat", get(chat::get_chat).post(chat::post_chat))
        .with_state(chat_state);

    let asset_routes = Router::new()
        .route("/", get(assets::index))
        .route("/chat_app.ts", get(assets::chat_app_ts))
        .with_state(assets_state);

    Router::new()
        .route("/health", get(health_check))
        .merge(chat_routes)
        .merge(asset_routes)
        .layer(middleware::from_fn(error_handler::handle_errors))
        .layer(middleware::from_fn(request_id::add_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}
