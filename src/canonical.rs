// Provider-agnostic hotel and room results

use serde::{Deserialize, Serialize};

pub const LOCAL_SOURCE: &str = "local";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountOffer {
    pub code: String,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRoomResult {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub description: String,
    pub price: f64,
    pub original_price: f64,
    pub currency: String,
    pub capacity: u32,
    pub amenities: Vec<String>,
    pub quantity: u32,
    pub cancellation_fee: Option<f64>,
    pub offers: Vec<DiscountOffer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalHotelResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub star_rating: u8,
    pub image: String,
    pub gallery: Vec<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub price_range: String,
    pub currency: String,
    pub rooms: Vec<CanonicalRoomResult>,
}

impl CanonicalHotelResult {
    pub fn is_local(&self) -> bool {
        self.source == LOCAL_SOURCE
    }
}

/// Namespaces an upstream id with its source so two providers can reuse codes.
pub fn prefixed_id(source: &str, upstream_id: &str) -> String {
    format!("{}_{}", source, upstream_id)
}

/// `"min - max"` over room prices, a single value when they agree and an
/// empty string without rooms.
pub fn price_range(rooms: &[CanonicalRoomResult]) -> String {
    let mut prices = rooms.iter().map(|r| r.price);
    let Some(first) = prices.next() else {
        return String::new();
    };
    let (min, max) = prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

    if (max - min).abs() < f64::EPSILON {
        format!("{:.2}", min)
    } else {
        format!("{:.2} - {:.2}", min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(price: f64) -> CanonicalRoomResult {
        CanonicalRoomResult {
            id: "r".to_string(),
            room_type: "DBL".to_string(),
            description: String::new(),
            price,
            original_price: price,
            currency: "EUR".to_string(),
            capacity: 2,
            amenities: Vec::new(),
            quantity: 1,
            cancellation_fee: None,
            offers: Vec::new(),
        }
    }

    #[test]
    fn test_price_range() {
        assert_eq!(price_range(&[]), "");
        assert_eq!(price_range(&[room(80.0), room(80.0)]), "80.00");
        assert_eq!(price_range(&[room(120.5), room(80.0), room(99.99)]), "80.00 - 120.50");
    }

    #[test]
    fn test_prefixed_id() {
        assert_eq!(prefixed_id("hotelbeds", "1234"), "hotelbeds_1234");
        assert_ne!(prefixed_id("alpha", "1234"), prefixed_id("beta", "1234"));
    }

    #[test]
    fn test_room_type_serializes_as_type() {
        let json = serde_json::to_value(room(10.0)).unwrap();
        assert_eq!(json["type"], "DBL");
        assert_eq!(json["originalPrice"], 10.0);
        assert!(json["cancellationFee"].is_null());
    }
}
