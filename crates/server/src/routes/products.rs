use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use common::types::Envelope;
use models::{Product, ProductInput, ProductPatch};
use service::pagination::{self, ProductPage, ProductQuery};

use crate::errors::JsonApiError;
use crate::state::AppState;

const LISTING_PATH: &str = "/api/products";

/// Absolute listing URL used for pagination links, built from the Host header.
fn listing_base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}{}", host, LISTING_PATH)
}

#[utoipa::path(
    get, path = "/api/products", tag = "products",
    params(crate::openapi::ProductQueryDoc),
    responses(
        (status = 200, description = "One page of products"),
        (status = 400, description = "Invalid limit or page")
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ProductPage>, JsonApiError> {
    let Query(params) = query?;
    let products = state.products.list().await?;
    let page = pagination::paginate(products, &params, &listing_base_url(&headers))?;
    info!(count = page.payload.len(), page = page.page, "list products");
    Ok(Json(page))
}

#[utoipa::path(
    get, path = "/api/products/{pid}", tag = "products",
    params(("pid" = String, Path, description = "Product id")),
    responses((status = 200, description = "Product"), (status = 404, description = "Not Found"))
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<Json<Envelope<Product>>, JsonApiError> {
    match state.products.get_by_id(&pid).await? {
        Some(product) => Ok(Json(Envelope::success(product))),
        None => Err(JsonApiError::not_found(format!("product {} not found", pid))),
    }
}

#[utoipa::path(
    post, path = "/api/products", tag = "products",
    request_body = crate::openapi::ProductInputDoc,
    responses((status = 201, description = "Created; returns the catalog"), (status = 400, description = "Validation Error"))
)]
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Vec<Product>>>), JsonApiError> {
    let Json(input) = body?;
    let products = state.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(products))))
}

#[utoipa::path(
    put, path = "/api/products/{pid}", tag = "products",
    params(("pid" = String, Path, description = "Product id")),
    request_body = crate::openapi::ProductPatchDoc,
    responses((status = 200, description = "Updated; returns the catalog"), (status = 404, description = "Not Found"))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Envelope<Vec<Product>>>, JsonApiError> {
    let Json(patch) = body?;
    let products = state.products.update(&pid, patch).await?;
    Ok(Json(Envelope::success(products)))
}

#[utoipa::path(
    delete, path = "/api/products/{pid}", tag = "products",
    params(("pid" = String, Path, description = "Product id")),
    responses((status = 200, description = "Deleted (or already absent); returns the catalog"))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<Json<Envelope<Vec<Product>>>, JsonApiError> {
    let products = state.products.delete_by_id(&pid).await?;
    Ok(Json(Envelope::success(products)))
}
