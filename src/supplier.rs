// Raw provider JSON shapes
// Providers disagree on where the hotel list lives and on whether numbers are
// sent as strings. Everything here deserializes leniently; missing fields fall
// back to defaults instead of failing the whole response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Where a provider response keeps its hotel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"hotels": {"hotels": [...]}}`
    NestedHotels,
    /// `{"results": {"hotels": [...]}}`
    ResultsHotels,
    /// `{"data": {"hotels": [...]}}`
    DataHotels,
    Unrecognized,
}

impl ResponseShape {
    /// Probes the known layouts in priority order.
    pub fn detect(body: &Value) -> Self {
        let has_list = |outer: &str| {
            matches!(
                body.get(outer).and_then(|v| v.get("hotels")),
                Some(Value::Array(_))
            )
        };

        if has_list("hotels") {
            ResponseShape::NestedHotels
        } else if has_list("results") {
            ResponseShape::ResultsHotels
        } else if has_list("data") {
            ResponseShape::DataHotels
        } else {
            ResponseShape::Unrecognized
        }
    }

    pub fn hotel_list<'a>(&self, body: &'a Value) -> &'a [Value] {
        let outer = match self {
            ResponseShape::NestedHotels => "hotels",
            ResponseShape::ResultsHotels => "results",
            ResponseShape::DataHotels => "data",
            ResponseShape::Unrecognized => return &[],
        };
        body.get(outer)
            .and_then(|v| v.get("hotels"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierHotel {
    #[serde(deserialize_with = "loose_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub category_code: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub category_name: Option<String>,
    #[serde(deserialize_with = "loose_vec")]
    pub images: Vec<SupplierImage>,
    #[serde(deserialize_with = "loose_option")]
    pub media: Option<SupplierMedia>,
    #[serde(deserialize_with = "loose_string")]
    pub destination_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub zone_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub latitude: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub longitude: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "loose_vec")]
    pub rooms: Vec<SupplierRoom>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierImage {
    #[serde(deserialize_with = "loose_string")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierMedia {
    #[serde(deserialize_with = "loose_string")]
    pub main_image: Option<String>,
    #[serde(deserialize_with = "loose_vec")]
    pub gallery: Vec<SupplierImage>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierRoom {
    #[serde(deserialize_with = "loose_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_vec")]
    pub rates: Vec<SupplierRate>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierRate {
    #[serde(deserialize_with = "loose_string")]
    pub rate_key: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub net: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub board_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub adults: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub children: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub allotment: Option<String>,
    #[serde(deserialize_with = "loose_bool")]
    pub packaging: bool,
    #[serde(deserialize_with = "loose_bool")]
    pub free_cancellation: bool,
    #[serde(deserialize_with = "loose_bool")]
    pub breakfast_included: bool,
    #[serde(deserialize_with = "loose_vec")]
    pub cancellation_policies: Vec<SupplierCancellationPolicy>,
    #[serde(deserialize_with = "loose_vec")]
    pub offers: Vec<SupplierOffer>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierCancellationPolicy {
    #[serde(deserialize_with = "loose_string")]
    pub amount: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub from: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierOffer {
    #[serde(deserialize_with = "loose_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub amount: Option<String>,
}

/// Accepts strings, numbers and booleans; anything else becomes `None`.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

fn loose_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Non-array values become an empty list; elements that fail to parse are
/// skipped.
fn loose_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
