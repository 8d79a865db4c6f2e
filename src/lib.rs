// Hotel availability, booking and multi-provider search engine

pub mod adapter;
pub mod aggregator;
pub mod auth;
pub mod availability;
pub mod booking;
pub mod canonical;
pub mod config;
pub mod geocoder;
pub mod inventory;
pub mod normalize;
pub mod registry;
pub mod supplier;

// Re-export key types for convenience
pub use adapter::{
    search_or_empty, GeoFilter, HttpProviderAdapter, Occupancy, ProviderAdapter, ProviderError,
    RequestContext, SearchFilters,
};
pub use aggregator::{AggregatedResponse, AggregationError, Aggregator, SearchMeta, SearchQuery};
pub use availability::{AvailabilityCalculator, AvailabilityError, StayRange};
pub use booking::{BookingError, BookingManager, BookingRequest};
pub use canonical::{CanonicalHotelResult, CanonicalRoomResult, DiscountOffer};
pub use config::{init_tracing, ConfigError, EngineConfig};
pub use geocoder::{GeoPoint, Geocoder, NominatimGeocoder};
pub use inventory::{
    Booking, BookingStatus, Hotel, InMemoryInventoryStore, InventoryError, InventoryStore,
    RoomType,
};
pub use registry::{AuthMethod, ProviderConfig, ProviderCredentials, ProviderRegistry};
