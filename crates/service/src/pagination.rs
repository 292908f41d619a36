//! Catalog query utilities: filter, then sort, then paginate.
//!
//! Pure functions over a full product listing; nothing here touches storage.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use models::Product;

use crate::errors::ServiceError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_PAGE: u32 = 1;

/// Raw query parameters as received. Empty strings count as absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ProductQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self { Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT } }
}

impl Pagination {
    /// Both values must be integers greater than zero.
    pub fn parse(limit: Option<&str>, page: Option<&str>) -> Result<Self, ServiceError> {
        Ok(Self {
            limit: parse_positive("limit", limit, DEFAULT_LIMIT)?,
            page: parse_positive("page", page, DEFAULT_PAGE)?,
        })
    }

    /// Half-open index window `[start, end)` of this page.
    pub fn window(self) -> (usize, usize) {
        let start = (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize);
        (start, start.saturating_add(self.limit as usize))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// `"asc"` / `"desc"`; anything else means "keep stored order".
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("asc") => Some(Self::Asc),
            Some("desc") => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Filter interpretation of the single `query` parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductFilter {
    Available(bool),
    Category(String),
}

impl ProductFilter {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "true" => Some(Self::Available(true)),
            "false" => Some(Self::Available(false)),
            other => Some(Self::Category(other.to_string())),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::Available(flag) => product.available == *flag,
            Self::Category(category) => product.in_category(category),
        }
    }
}

/// One page of the catalog plus navigation data.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub status: &'static str,
    pub payload: Vec<Product>,
    pub total_pages: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub page: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

fn parse_positive(name: &str, raw: Option<&str>, default: u32) -> Result<u32, ServiceError> {
    let Some(raw) = raw else { return Ok(default) };
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ServiceError::Validation(format!("{} must be an integer greater than 0", name))),
    }
}

/// Keep matching products in their original relative order.
pub fn filter_products(products: Vec<Product>, filter: Option<&ProductFilter>) -> Vec<Product> {
    match filter {
        Some(f) => products.into_iter().filter(|p| f.matches(p)).collect(),
        None => products,
    }
}

/// Stable sort by price.
pub fn sort_products(products: &mut [Product], order: Option<SortOrder>) {
    match order {
        Some(SortOrder::Asc) => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
        Some(SortOrder::Desc) => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
        None => {}
    }
}

/// Apply filter, sort and pagination. `base_url` is the listing URL without
/// a query string; navigation links are built from it.
pub fn paginate(products: Vec<Product>, params: &ProductQuery, base_url: &str) -> Result<ProductPage, ServiceError> {
    let pagination = Pagination::parse(non_empty(&params.limit), non_empty(&params.page))?;
    let sort = non_empty(&params.sort);
    let query = non_empty(&params.query);

    let filter = ProductFilter::parse(query);
    let mut products = filter_products(products, filter.as_ref());
    sort_products(&mut products, SortOrder::parse(sort));

    let total = products.len();
    let total_pages = total.div_ceil(pagination.limit as usize) as u32;
    let (start, end) = pagination.window();
    let payload: Vec<Product> = products.into_iter().skip(start).take(end - start).collect();

    let page = pagination.page;
    let has_prev_page = page > 1;
    let has_next_page = page < total_pages;
    let link = |target: u32| page_link(base_url, pagination.limit, target, sort, query);

    Ok(ProductPage {
        status: "success",
        payload,
        total_pages,
        prev_page: has_prev_page.then(|| page - 1),
        next_page: has_next_page.then(|| page + 1),
        page,
        has_prev_page,
        has_next_page,
        prev_link: has_prev_page.then(|| link(page - 1)),
        next_link: has_next_page.then(|| link(page + 1)),
    })
}

fn page_link(base_url: &str, limit: u32, page: u32, sort: Option<&str>, query: Option<&str>) -> String {
    let qs = form_urlencoded::Serializer::new(String::new())
        .append_pair("limit", &limit.to_string())
        .append_pair("page", &page.to_string())
        .append_pair("sort", sort.unwrap_or(""))
        .append_pair("query", query.unwrap_or(""))
        .finish();
    format!("{}?{}", base_url, qs)
}
