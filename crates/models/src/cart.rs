use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;
use crate::product::{id_as_string, id_from_value, Product};

/// One product reference inside a cart. At most one per product id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    #[serde(deserialize_with = "id_as_string")]
    pub product: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
}

/// Unchecked line-item as received from a client; checked by
/// [`LineItemInput::parse`] before it can reach a cart.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LineItemInput {
    #[serde(default)]
    pub product: Value,
    #[serde(default)]
    pub quantity: Value,
}

/// Read-only projection of a cart with each product id resolved.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PopulatedCart {
    pub id: String,
    pub products: Vec<PopulatedLineItem>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PopulatedLineItem {
    pub product: Product,
    pub quantity: u32,
}

impl Cart {
    pub fn new(id: String) -> Self {
        Self { id, products: Vec::new() }
    }

    pub fn line_for(&self, product_id: &str) -> Option<&LineItem> {
        self.products.iter().find(|item| item.product == product_id)
    }

    /// Add one unit of `product_id`, accumulating onto an existing line.
    pub fn add_one(&mut self, product_id: &str) {
        match self.products.iter_mut().find(|item| item.product == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.products.push(LineItem { product: product_id.to_string(), quantity: 1 }),
        }
    }

    /// Drop the line for `product_id`; returns whether one existed.
    pub fn remove_line(&mut self, product_id: &str) -> bool {
        let before = self.products.len();
        self.products.retain(|item| item.product != product_id);
        before != self.products.len()
    }
}

impl LineItemInput {
    pub fn new(product: impl Into<String>, quantity: u32) -> Self {
        Self { product: Value::String(product.into()), quantity: Value::from(quantity) }
    }

    pub fn parse(&self) -> Result<LineItem, ModelError> {
        let product = id_from_value(&self.product)
            .ok_or_else(|| ModelError::Validation("line-item product must be an id".into()))?;
        let quantity = quantity_from_value(&self.quantity)?;
        Ok(LineItem { product, quantity })
    }
}

/// Accept only JSON numbers holding a positive whole quantity.
pub fn quantity_from_value(value: &Value) -> Result<u32, ModelError> {
    let invalid = || ModelError::Validation("quantity must be a positive number".into());
    let n = match value {
        Value::Number(n) => n,
        _ => return Err(invalid()),
    };
    if let Some(q) = n.as_u64() {
        return positive_quantity(q as i64);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f > 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(invalid()),
    }
}

/// Range check shared by typed callers.
pub fn positive_quantity(q: i64) -> Result<u32, ModelError> {
    if q <= 0 || q > u32::MAX as i64 {
        return Err(ModelError::Validation("quantity must be a positive number".into()));
    }
    Ok(q as u32)
}
