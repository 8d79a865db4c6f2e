// Supplier JSON -> canonical hotel/room results
// One canonical room per rate: a room offering N rates yields N entries.

use serde_json::Value;
use tracing::debug;

use crate::canonical::{
    prefixed_id, price_range, CanonicalHotelResult, CanonicalRoomResult, DiscountOffer,
};
use crate::supplier::{ResponseShape, SupplierHotel, SupplierRate, SupplierRoom};

pub const DEFAULT_STAR_RATING: u8 = 3;
pub const MAX_STAR_RATING: u8 = 5;
pub const DEFAULT_ALLOTMENT: u32 = 10;
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Normalizes a whole provider response. Unknown layouts produce an empty list.
pub fn normalize_response(source: &str, body: &Value) -> Vec<CanonicalHotelResult> {
    let shape = ResponseShape::detect(body);
    if shape == ResponseShape::Unrecognized {
        debug!(provider = source, "Unrecognized provider response shape");
        return Vec::new();
    }

    shape
        .hotel_list(body)
        .iter()
        .filter_map(|raw| match serde_json::from_value::<SupplierHotel>(raw.clone()) {
            Ok(hotel) => normalize_hotel(source, &hotel),
            Err(e) => {
                debug!(provider = source, error = %e, "Skipping malformed hotel entry");
                None
            }
        })
        .collect()
}

/// Returns `None` for hotels carrying neither `code` nor `id`.
pub fn normalize_hotel(source: &str, hotel: &SupplierHotel) -> Option<CanonicalHotelResult> {
    let upstream_id = non_empty(&hotel.code).or_else(|| non_empty(&hotel.id))?;

    let currency = non_empty(&hotel.currency).unwrap_or(DEFAULT_CURRENCY).to_string();
    let rooms: Vec<CanonicalRoomResult> = hotel
        .rooms
        .iter()
        .flat_map(|room| normalize_room(source, room, &currency))
        .collect();

    let image = hotel
        .images
        .first()
        .and_then(|img| non_empty(&img.url))
        .or_else(|| hotel.media.as_ref().and_then(|m| non_empty(&m.main_image)))
        .unwrap_or_default()
        .to_string();

    let gallery = if hotel.images.is_empty() {
        hotel
            .media
            .as_ref()
            .map(|m| collect_urls(&m.gallery))
            .unwrap_or_default()
    } else {
        collect_urls(&hotel.images)
    };

    Some(CanonicalHotelResult {
        id: prefixed_id(source, upstream_id),
        name: hotel.name.clone().unwrap_or_default(),
        description: hotel.description.clone().unwrap_or_default(),
        star_rating: star_rating(hotel.category_code.as_deref(), hotel.category_name.as_deref()),
        image,
        gallery,
        location: join_non_empty(&[&hotel.destination_name, &hotel.zone_name], ", "),
        latitude: parse_f64(&hotel.latitude).unwrap_or(0.0),
        longitude: parse_f64(&hotel.longitude).unwrap_or(0.0),
        source: source.to_string(),
        price_range: price_range(&rooms),
        currency,
        rooms,
    })
}

fn normalize_room(source: &str, room: &SupplierRoom, currency: &str) -> Vec<CanonicalRoomResult> {
    let room_code = room.code.as_deref().unwrap_or_default();
    room.rates
        .iter()
        .map(|rate| normalize_rate(source, room, room_code, rate, currency))
        .collect()
}

fn normalize_rate(
    source: &str,
    room: &SupplierRoom,
    room_code: &str,
    rate: &SupplierRate,
    currency: &str,
) -> CanonicalRoomResult {
    let rate_key = rate.rate_key.as_deref().unwrap_or_default();
    let price = parse_f64(&rate.net).unwrap_or(0.0);
    let discount = rate
        .offers
        .first()
        .and_then(|offer| parse_f64(&offer.amount))
        .map(f64::abs)
        .unwrap_or(0.0);

    let adults = parse_u32(&rate.adults).unwrap_or(1);
    let children = parse_u32(&rate.children).unwrap_or(0);

    let mut amenities = Vec::new();
    if let Some(board) = non_empty(&rate.board_name) {
        amenities.push(board.to_string());
    }
    if rate.packaging {
        amenities.push("Package deal".to_string());
    }
    if rate.free_cancellation {
        amenities.push("Free cancellation".to_string());
    }
    if rate.breakfast_included {
        amenities.push("Breakfast included".to_string());
    }

    CanonicalRoomResult {
        id: prefixed_id(source, &format!("{}_{}", room_code, rate_key)),
        room_type: non_empty(&room.name).unwrap_or(room_code).to_string(),
        description: join_non_empty(&[&room.name, &rate.board_name], " - "),
        price,
        original_price: price + discount,
        currency: currency.to_string(),
        capacity: adults.saturating_add(children),
        amenities,
        quantity: parse_u32(&rate.allotment).unwrap_or(DEFAULT_ALLOTMENT),
        cancellation_fee: rate
            .cancellation_policies
            .first()
            .and_then(|policy| parse_f64(&policy.amount)),
        offers: rate
            .offers
            .iter()
            .map(|offer| DiscountOffer {
                code: offer.code.clone().unwrap_or_default(),
                name: offer.name.clone().unwrap_or_default(),
                amount: parse_f64(&offer.amount).unwrap_or(0.0),
            })
            .collect(),
    }
}

/// First integer in `category_code`, then in `category_name`, else 3.
/// Clamped to 0..=5.
pub fn star_rating(category_code: Option<&str>, category_name: Option<&str>) -> u8 {
    category_code
        .and_then(first_integer)
        .or_else(|| category_name.and_then(first_integer))
        .map(|n| n.min(MAX_STAR_RATING as u32) as u8)
        .unwrap_or(DEFAULT_STAR_RATING)
}

/// Leading digit run of `text`, saturating at `u32::MAX`.
fn first_integer(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let value = text[start..]
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0u32, |acc, digit| acc.saturating_mul(10).saturating_add(digit));
    Some(value)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn join_non_empty(parts: &[&Option<String>], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|part| non_empty(part))
        .collect::<Vec<_>>()
        .join(separator)
}

fn collect_urls(images: &[crate::supplier::SupplierImage]) -> Vec<String> {
    images
        .iter()
        .filter_map(|img| non_empty(&img.url))
        .map(str::to_string)
        .collect()
}

fn parse_f64(value: &Option<String>) -> Option<f64> {
    non_empty(value)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_u32(value: &Option<String>) -> Option<u32> {
    non_empty(value).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn sample_body() -> Value {
        json!({
            "hotels": {
                "hotels": [
                    {
                        "code": 6613,
                        "name": "Hotel Barcelona Center",
                        "categoryCode": "4EST",
                        "categoryName": "4 STARS",
                        "destinationName": "Barcelona",
                        "zoneName": "Eixample",
                        "latitude": "41.3851",
                        "longitude": "not-a-number",
                        "currency": "EUR",
                        "images": [{"url": "https://img/1.jpg"}, {"url": "https://img/2.jpg"}],
                        "rooms": [
                            {
                                "code": "DBL.ST",
                                "name": "Double Standard",
                                "rates": [
                                    {
                                        "rateKey": "rk-ro",
                                        "net": "120.50",
                                        "boardName": "ROOM ONLY",
                                        "adults": 2,
                                        "children": 1,
                                        "allotment": 4,
                                        "freeCancellation": true,
                                        "cancellationPolicies": [{"amount": "60.25", "from": "2024-05-30T23:59:00+02:00"}],
                                        "offers": [{"code": "EARLY", "name": "Early booking", "amount": "-15.50"}]
                                    },
                                    {
                                        "rateKey": "rk-bb",
                                        "net": 140,
                                        "boardName": "BED AND BREAKFAST",
                                        "packaging": true,
                                        "breakfastIncluded": true
                                    }
                                ]
                            },
                            {"code": "SUI", "name": "Suite", "rates": []}
                        ]
                    },
                    {
                        "id": "H-2",
                        "name": "Media Hotel",
                        "categoryName": "Boutique",
                        "media": {"mainImage": "https://img/main.jpg", "gallery": [{"url": "https://img/g1.jpg"}]},
                        "rooms": []
                    },
                    {"name": "No identity"}
                ]
            }
        })
    }

    #[test]
    fn test_normalize_sample_response() {
        let hotels = normalize_response("hotelbeds", &sample_body());
        assert_eq!(hotels.len(), 2);

        let hotel = &hotels[0];
        assert_eq!(hotel.id, "hotelbeds_6613");
        assert_eq!(hotel.star_rating, 4);
        assert_eq!(hotel.image, "https://img/1.jpg");
        assert_eq!(hotel.gallery.len(), 2);
        assert_eq!(hotel.location, "Barcelona, Eixample");
        assert_eq!(hotel.latitude, 41.3851);
        assert_eq!(hotel.longitude, 0.0);
        assert_eq!(hotel.source, "hotelbeds");
        assert_eq!(hotel.price_range, "120.50 - 140.00");

        let media_hotel = &hotels[1];
        assert_eq!(media_hotel.id, "hotelbeds_H-2");
        assert_eq!(media_hotel.star_rating, DEFAULT_STAR_RATING);
        assert_eq!(media_hotel.image, "https://img/main.jpg");
        assert_eq!(media_hotel.gallery, vec!["https://img/g1.jpg".to_string()]);
        assert!(media_hotel.rooms.is_empty());
        assert_eq!(media_hotel.price_range, "");
    }

    #[test]
    fn test_rates_explode_into_rooms() {
        let hotels = normalize_response("hotelbeds", &sample_body());
        let rooms = &hotels[0].rooms;

        // two rates on the double room, none on the suite
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, "hotelbeds_DBL.ST_rk-ro");
        assert_eq!(rooms[1].id, "hotelbeds_DBL.ST_rk-bb");

        let ro = &rooms[0];
        assert_eq!(ro.description, "Double Standard - ROOM ONLY");
        assert_eq!(ro.price, 120.5);
        assert_eq!(ro.original_price, 136.0);
        assert_eq!(ro.capacity, 3);
        assert_eq!(ro.quantity, 4);
        assert_eq!(ro.cancellation_fee, Some(60.25));
        assert_eq!(ro.amenities, vec!["ROOM ONLY", "Free cancellation"]);
        assert_eq!(
            ro.offers,
            vec![DiscountOffer {
                code: "EARLY".to_string(),
                name: "Early booking".to_string(),
                amount: -15.5,
            }]
        );

        let bb = &rooms[1];
        assert_eq!(bb.price, 140.0);
        assert_eq!(bb.original_price, 140.0);
        assert_eq!(bb.capacity, 1);
        assert_eq!(bb.quantity, DEFAULT_ALLOTMENT);
        assert_eq!(bb.cancellation_fee, None);
        assert_eq!(
            bb.amenities,
            vec!["BED AND BREAKFAST", "Package deal", "Breakfast included"]
        );
    }

    #[test]
    fn test_same_upstream_code_from_two_providers() {
        let alpha = normalize_response("alpha", &sample_body());
        let beta = normalize_response("beta", &sample_body());
        assert_ne!(alpha[0].id, beta[0].id);
        assert_ne!(alpha[0].rooms[0].id, beta[0].rooms[0].id);
    }

    #[test_case(Some("5EST"), None, 5; "code with suffix")]
    #[test_case(None, Some("4 Stars Deluxe"), 4; "name fallback")]
    #[test_case(None, None, 3; "default")]
    #[test_case(Some("HS"), Some("3 keys"), 3; "code without digits")]
    #[test_case(Some("BOUTIQUE"), Some("Luxury"), 3; "no digits anywhere")]
    #[test_case(Some("H2_5"), None, 2; "first integer wins")]
    #[test_case(Some("7LUX"), None, 5; "clamped")]
    #[test_case(Some("99999999999"), Some("2 stars"), 5; "oversized digit run clamped")]
    fn test_star_rating(code: Option<&str>, name: Option<&str>, expected: u8) {
        assert_eq!(star_rating(code, name), expected);
    }

    #[test]
    fn test_guest_counts_near_u32_max_saturate() {
        let body = json!({
            "hotels": {
                "hotels": [{
                    "code": "BIG",
                    "rooms": [{
                        "code": "DBL",
                        "rates": [{"rateKey": "rk", "net": "10", "adults": "4294967295", "children": "1"}]
                    }]
                }]
            }
        });

        let hotels = normalize_response("p", &body);
        assert_eq!(hotels[0].rooms[0].capacity, u32::MAX);
    }

    #[test]
    fn test_other_shapes() {
        let results = json!({"results": {"hotels": [{"code": "R1", "rooms": []}]}});
        let data = json!({"data": {"hotels": [{"id": 77}]}});

        assert_eq!(normalize_response("p", &results)[0].id, "p_R1");
        assert_eq!(normalize_response("p", &data)[0].id, "p_77");
        assert!(normalize_response("p", &json!({"unexpected": true})).is_empty());
    }
}
