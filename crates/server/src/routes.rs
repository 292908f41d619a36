use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::realtime;
use crate::state::AppState;

pub mod carts;
pub mod products;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK")))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: JSON API, realtime socket, docs and
/// static assets from `public_dir` as fallback.
pub fn build_router(state: AppState, cors: CorsLayer, public_dir: &str) -> Router {
    let products = Router::new()
        .route("/api/products", get(products::list_products).post(products::create_product))
        .route(
            "/api/products/:pid",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        );

    let carts = Router::new()
        .route("/api/carts", get(carts::list_carts).post(carts::create_cart))
        .route(
            "/api/carts/:cid",
            get(carts::get_cart).put(carts::replace_products).delete(carts::clear_cart),
        )
        .route(
            "/api/carts/:cid/products/:pid",
            post(carts::add_product)
                .put(carts::set_quantity)
                .delete(carts::remove_product),
        )
        // singular form kept for older clients
        .route("/api/carts/:cid/product/:pid", post(carts::add_product));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(realtime::ws_handler))
        .merge(products)
        .merge(carts)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
