// Aggregated hotel search
// Local inventory and every active provider are searched concurrently. Each
// provider runs in its own task with its own timeout; a failed, slow or
// panicking provider only removes its own results. The merge happens after
// everything settled: local first, then providers in registry order.

use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapter::{
    search_isolated, DistanceUnit, GeoFilter, Occupancy, ProviderAdapter, ProviderError,
    RequestContext, SearchFilters,
};
use crate::availability::{remaining_units, StayRange};
use crate::canonical::{price_range, CanonicalHotelResult, CanonicalRoomResult, LOCAL_SOURCE};
use crate::config::EngineConfig;
use crate::geocoder::Geocoder;
use crate::inventory::{Hotel, InventoryError, InventoryStore, RoomType};
use crate::registry::ProviderRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Invalid stay: check-out {check_out} must be after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Local search failed: {0}")]
    LocalSearch(#[from] InventoryError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    pub location: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
    pub rooms: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub local_count: usize,
    pub external_count: usize,
    pub provider_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub meta: SearchMeta,
    pub results: Vec<CanonicalHotelResult>,
}

pub struct Aggregator {
    store: Arc<dyn InventoryStore>,
    registry: Arc<ProviderRegistry>,
    adapter: Arc<dyn ProviderAdapter>,
    geocoder: Arc<dyn Geocoder>,
    config: EngineConfig,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        registry: Arc<ProviderRegistry>,
        adapter: Arc<dyn ProviderAdapter>,
        geocoder: Arc<dyn Geocoder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            registry,
            adapter,
            geocoder,
            config,
        }
    }

    pub async fn search_all(
        &self,
        query: SearchQuery,
    ) -> Result<AggregatedResponse, AggregationError> {
        let range = StayRange::new(query.check_in, query.check_out).map_err(|_| {
            AggregationError::InvalidRange {
                check_in: query.check_in,
                check_out: query.check_out,
            }
        })?;

        let geolocation = self.resolve_geolocation(query.location.as_deref()).await;
        let filters = SearchFilters {
            check_in: query.check_in,
            check_out: query.check_out,
            occupancies: vec![Occupancy {
                rooms: query.rooms.max(1),
                adults: query.adults.max(1),
                children: query.children,
            }],
            geolocation,
        };

        let providers = self.registry.active_providers();
        let tasks: Vec<_> = providers
            .iter()
            .map(|config| {
                let adapter = Arc::clone(&self.adapter);
                let config = config.clone();
                let filters = filters.clone();
                let ctx = RequestContext::new(self.config.provider_timeout);
                tokio::spawn(async move {
                    search_isolated(adapter.as_ref(), &config, &filters, &ctx).await
                })
            })
            .collect();

        let (local, provider_results) =
            tokio::join!(self.search_local(&query.query, &range), join_all(tasks));
        let local = local?;

        let mut results = local;
        let local_count = results.len();
        let mut external_count = 0;
        let mut provider_failures = 0;

        for (config, joined) in providers.iter().zip(provider_results) {
            let outcome = joined.unwrap_or_else(|e| Err(ProviderError::Aborted(e.to_string())));
            match outcome {
                Ok(hotels) => {
                    external_count += hotels.len();
                    results.extend(hotels);
                }
                Err(e) => {
                    provider_failures += 1;
                    warn!(provider = %config.slug, error = %e, "Provider search failed");
                }
            }
        }

        info!(
            local_count,
            external_count,
            provider_failures,
            providers = providers.len(),
            "Aggregated search complete"
        );

        Ok(AggregatedResponse {
            meta: SearchMeta {
                local_count,
                external_count,
                provider_failures,
            },
            results,
        })
    }

    async fn resolve_geolocation(&self, location: Option<&str>) -> Option<GeoFilter> {
        let location = location.map(str::trim).filter(|l| !l.is_empty())?;
        let point = self.geocoder.geocode(location).await?;
        Some(GeoFilter {
            latitude: point.lat,
            longitude: point.lng,
            radius: self.config.geo_radius_km,
            unit: DistanceUnit::Km,
        })
    }

    async fn search_local(
        &self,
        text: &str,
        range: &StayRange,
    ) -> Result<Vec<CanonicalHotelResult>, InventoryError> {
        let hotels = self.store.search_hotels(text).await?;
        let mut results = Vec::with_capacity(hotels.len());
        for hotel in hotels {
            let room_types = self.store.room_types_for_hotel(hotel.id).await?;
            let mut rooms = Vec::with_capacity(room_types.len());
            for room_type in room_types {
                let booked = self.store.booked_rooms(room_type.id, range).await?;
                rooms.push(local_room(room_type, booked));
            }
            results.push(local_hotel(hotel, rooms));
        }
        Ok(results)
    }
}

fn local_room(room_type: RoomType, booked: u32) -> CanonicalRoomResult {
    let price = room_type.price.to_f64().unwrap_or(0.0);
    CanonicalRoomResult {
        id: room_type.id.to_string(),
        room_type: room_type.room_type,
        description: room_type.description,
        price,
        original_price: price,
        currency: room_type.currency,
        capacity: u32::from(room_type.capacity),
        amenities: room_type.amenities,
        quantity: remaining_units(room_type.quantity, booked),
        cancellation_fee: None,
        offers: Vec::new(),
    }
}

fn local_hotel(hotel: Hotel, rooms: Vec<CanonicalRoomResult>) -> CanonicalHotelResult {
    let currency = rooms
        .first()
        .map(|r| r.currency.clone())
        .unwrap_or_default();
    CanonicalHotelResult {
        id: hotel.id.to_string(),
        name: hotel.name,
        description: hotel.description,
        star_rating: hotel.star_rating,
        image: hotel.image,
        gallery: hotel.gallery,
        location: hotel.location,
        latitude: hotel.latitude,
        longitude: hotel.longitude,
        source: LOCAL_SOURCE.to_string(),
        price_range: price_range(&rooms),
        currency,
        rooms,
    }
}
