use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use common::types::Envelope;
use models::cart::{quantity_from_value, LineItemInput};
use models::{Cart, PopulatedCart};

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReplaceProductsBody {
    pub products: Vec<LineItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    #[serde(default)]
    pub quantity: Value,
}

#[utoipa::path(get, path = "/api/carts", tag = "carts", responses((status = 200, description = "All carts")))]
pub async fn list_carts(State(state): State<AppState>) -> Result<Json<Envelope<Vec<Cart>>>, JsonApiError> {
    Ok(Json(Envelope::success(state.carts.list().await?)))
}

#[utoipa::path(post, path = "/api/carts", tag = "carts", responses((status = 201, description = "Created")))]
pub async fn create_cart(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Envelope<Cart>>), JsonApiError> {
    let cart = state.carts.create().await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(cart))))
}

#[utoipa::path(
    get, path = "/api/carts/{cid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id")),
    responses((status = 200, description = "Cart with products resolved"), (status = 404, description = "Not Found"))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<Envelope<PopulatedCart>>, JsonApiError> {
    Ok(Json(Envelope::success(state.carts.get_populated(&cid).await?)))
}

#[utoipa::path(
    put, path = "/api/carts/{cid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id")),
    request_body = crate::openapi::ReplaceProductsDoc,
    responses((status = 200, description = "Replaced"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn replace_products(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    body: Result<Json<ReplaceProductsBody>, JsonRejection>,
) -> Result<Json<Envelope<Cart>>, JsonApiError> {
    let Json(body) = body
        .map_err(|_| JsonApiError::bad_request("body must contain a 'products' array"))?;
    let cart = state.carts.replace_products(&cid, body.products).await?;
    Ok(Json(Envelope::success(cart)))
}

#[utoipa::path(
    delete, path = "/api/carts/{cid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id")),
    responses((status = 200, description = "Emptied"), (status = 404, description = "Not Found"))
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<Envelope<Cart>>, JsonApiError> {
    Ok(Json(Envelope::success(state.carts.clear(&cid).await?)))
}

#[utoipa::path(
    post, path = "/api/carts/{cid}/products/{pid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id"), ("pid" = String, Path, description = "Product id")),
    responses((status = 200, description = "Added"), (status = 404, description = "Cart or product not found"))
)]
pub async fn add_product(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<Json<Envelope<Cart>>, JsonApiError> {
    Ok(Json(Envelope::success(state.carts.add_product(&cid, &pid).await?)))
}

#[utoipa::path(
    put, path = "/api/carts/{cid}/products/{pid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id"), ("pid" = String, Path, description = "Product id")),
    request_body = crate::openapi::QuantityDoc,
    responses((status = 200, description = "Quantity set"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn set_quantity(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
    body: Result<Json<QuantityBody>, JsonRejection>,
) -> Result<Json<Envelope<Cart>>, JsonApiError> {
    let Json(body) = body?;
    let quantity = quantity_from_value(&body.quantity)?;
    let cart = state.carts.set_quantity(&cid, &pid, i64::from(quantity)).await?;
    Ok(Json(Envelope::success(cart)))
}

#[utoipa::path(
    delete, path = "/api/carts/{cid}/products/{pid}", tag = "carts",
    params(("cid" = String, Path, description = "Cart id"), ("pid" = String, Path, description = "Product id")),
    responses((status = 200, description = "Removed (or already absent)"), (status = 404, description = "Cart not found"))
)]
pub async fn remove_product(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<Json<Envelope<Cart>>, JsonApiError> {
    Ok(Json(Envelope::success(state.carts.remove_product(&cid, &pid).await?)))
}
