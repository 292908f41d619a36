use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelError;

/// Catalog entry as persisted in the products document.
///
/// Documents written by form posts may hold `price` and `available` as text;
/// they are read back as their typed values.
///
/// Only the fields the store reasons about are typed; anything else found in
/// the document (`description`, `stock`, `thumbnails`, ...) rides along in
/// `extra` and is written back untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub available: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Creation input. Form posts send every value as a string, so `price` and
/// `available` accept both their JSON type and a textual form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "opt_id_as_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_available", deserialize_with = "lenient_bool")]
    pub available: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update: absent fields are left as they are.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_price", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_bool", skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_available() -> bool { true }

impl ProductInput {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }

    /// Build the stored document under the given identity.
    pub fn into_product(mut self, id: String) -> Product {
        self.extra.remove("id");
        Product {
            id,
            name: self.name.trim().to_string(),
            price: self.price,
            category: self.category,
            available: self.available,
            extra: self.extra,
        }
    }
}

impl Product {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)?;
        validate_price(self.price)
    }

    /// Merge `patch` into this product. Identity never changes: an `id` key in
    /// the patch is dropped. Nothing is modified when the merged result fails
    /// validation.
    pub fn apply_patch(&mut self, patch: ProductPatch) -> Result<(), ModelError> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = name.trim().to_string();
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(available) = patch.available {
            next.available = available;
        }
        for (key, value) in patch.extra {
            if key == "id" {
                continue;
            }
            next.extra.insert(key, value);
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Case-insensitive category comparison used by catalog filtering.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.to_lowercase() == category.to_lowercase()
    }
}

fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name must not be empty".into()));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), ModelError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ModelError::Validation("price must be a non-negative number".into()));
    }
    Ok(())
}

/// Turn a JSON id (string or number) into its string form.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Older product files carry numeric ids; identity is compared as text everywhere.
pub(crate) fn id_as_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    id_from_value(&value).ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

fn opt_id_as_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    Ok(id_from_value(&value))
}

fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn bool_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_price<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    price_from_value(&value).ok_or_else(|| serde::de::Error::custom("price must be a number"))
}

fn opt_lenient_price<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    if value.is_null() {
        return Ok(None);
    }
    price_from_value(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("price must be a number"))
}

fn lenient_bool<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    bool_from_value(&value).ok_or_else(|| serde::de::Error::custom("available must be a boolean"))
}

fn opt_lenient_bool<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(de)?;
    if value.is_null() {
        return Ok(None);
    }
    bool_from_value(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("available must be a boolean"))
}
