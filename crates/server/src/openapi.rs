use utoipa::OpenApi;
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQueryDoc {
    /// Items per page, default 10
    pub limit: Option<u32>,
    /// 1-based page, default 1
    pub page: Option<u32>,
    /// `asc` or `desc` by price
    pub sort: Option<String>,
    /// `true`/`false` for availability, otherwise a category
    pub query: Option<String>,
}

#[derive(ToSchema)]
pub struct ProductInputDoc {
    pub id: Option<String>,
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
    pub available: Option<bool>,
}

#[derive(ToSchema)]
pub struct ProductPatchDoc {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub available: Option<bool>,
}

#[derive(ToSchema)]
pub struct LineItemDoc { pub product: String, pub quantity: u32 }

#[derive(ToSchema)]
pub struct ReplaceProductsDoc { pub products: Vec<LineItemDoc> }

#[derive(ToSchema)]
pub struct QuantityDoc { pub quantity: u32 }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::products::list_products,
        crate::routes::products::get_product,
        crate::routes::products::create_product,
        crate::routes::products::update_product,
        crate::routes::products::delete_product,
        crate::routes::carts::list_carts,
        crate::routes::carts::create_cart,
        crate::routes::carts::get_cart,
        crate::routes::carts::replace_products,
        crate::routes::carts::clear_cart,
        crate::routes::carts::add_product,
        crate::routes::carts::set_quantity,
        crate::routes::carts::remove_product,
    ),
    components(schemas(
        HealthResponse, ProductInputDoc, ProductPatchDoc, LineItemDoc, ReplaceProductsDoc, QuantityDoc
    )),
    tags(
        (name = "health", description = "Health"),
        (name = "products", description = "Product catalog"),
        (name = "carts", description = "Shopping carts")
    )
)]
pub struct ApiDoc;
