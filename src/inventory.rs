// Inventory store: hotels, room types and the bookings ledger
// The booking path goes through `InventoryStore::begin`, which serializes
// read-then-write sequences per room type.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::availability::{booked_units, StayRange};

pub type HotelId = Uuid;
pub type RoomTypeId = Uuid;
pub type BookingId = Uuid;

pub const DEFAULT_ROOM_QUANTITY: u32 = 30;
pub const MIN_CAPACITY: u8 = 1;
pub const MAX_CAPACITY: u8 = 10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    #[error("Hotel not found: {0}")]
    HotelNotFound(HotelId),

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(RoomTypeId),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("Invalid room type: {0}")]
    InvalidRoomType(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub star_rating: u8,
    pub image: String,
    pub gallery: Vec<String>,
    pub enabled: bool,
    pub featured: bool,
}

impl Hotel {
    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.location.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: RoomTypeId,
    pub hotel_id: HotelId,
    pub room_type: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub capacity: u8,
    pub quantity: u32,
    pub amenities: Vec<String>,
}

/// Input for creating a room type. `quantity` falls back to
/// [`DEFAULT_ROOM_QUANTITY`] when not given.
#[derive(Debug, Clone)]
pub struct NewRoomType {
    pub hotel_id: HotelId,
    pub room_type: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub capacity: u8,
    pub quantity: Option<u32>,
    pub amenities: Vec<String>,
}

impl NewRoomType {
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.price.is_sign_negative() {
            return Err(InventoryError::InvalidRoomType(format!(
                "price must not be negative, got {}",
                self.price
            )));
        }
        if self.price.normalize().scale() > 2 {
            return Err(InventoryError::InvalidRoomType(format!(
                "price has more than 2 decimal places: {}",
                self.price
            )));
        }
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(InventoryError::InvalidRoomType(format!(
                "capacity must be between {} and {}, got {}",
                MIN_CAPACITY, MAX_CAPACITY, self.capacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn holds_inventory(self) -> bool {
        self != BookingStatus::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: String,
    pub hotel_id: HotelId,
    pub room_type_id: RoomTypeId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_rooms: u32,
    pub total_price: Decimal,
    pub currency: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// True when this booking consumes units of its room type during `range`.
    pub fn occupies(&self, range: &StayRange) -> bool {
        self.status.holds_inventory()
            && self.check_in < range.check_out()
            && self.check_out > range.check_in()
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub hotel_id: HotelId,
    pub room_type_id: RoomTypeId,
    pub range: StayRange,
    pub number_of_rooms: u32,
    pub total_price: Decimal,
    pub currency: String,
}

/// Narrow query/command interface over the persisted inventory.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    async fn hotel(&self, id: HotelId) -> Result<Option<Hotel>, InventoryError>;

    async fn room_type(&self, id: RoomTypeId) -> Result<Option<RoomType>, InventoryError>;

    async fn room_types_for_hotel(&self, hotel_id: HotelId)
        -> Result<Vec<RoomType>, InventoryError>;

    /// Sum of `number_of_rooms` over non-cancelled bookings of `room_type_id`
    /// overlapping `range`.
    async fn booked_rooms(
        &self,
        room_type_id: RoomTypeId,
        range: &StayRange,
    ) -> Result<u32, InventoryError>;

    /// Enabled hotels whose name, description or location contains `text`
    /// (case-insensitive). Featured hotels come first, then by name.
    async fn search_hotels(&self, text: &str) -> Result<Vec<Hotel>, InventoryError>;

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, InventoryError>;

    /// Opens a transaction scoped to one room type. No other transaction for
    /// the same room type can run until this one is committed or dropped.
    async fn begin(
        &self,
        room_type_id: RoomTypeId,
    ) -> Result<Box<dyn InventoryTransaction>, InventoryError>;
}

/// Read-then-write unit against a single room type. Dropping it without
/// calling `commit` discards staged bookings and status transitions.
#[async_trait]
pub trait InventoryTransaction: Send {
    async fn room_type(&mut self) -> Result<Option<RoomType>, InventoryError>;

    async fn booked_rooms(&mut self, range: &StayRange) -> Result<u32, InventoryError>;

    /// A booking of this room type as seen by the transaction, staged
    /// transitions included.
    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, InventoryError>;

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, InventoryError>;

    /// Stages `from -> to` for a booking of this room type. Fails with
    /// `Conflict` if the booking is not currently in `from`; commit re-checks.
    async fn transition(
        &mut self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, InventoryError>;

    async fn commit(self: Box<Self>) -> Result<(), InventoryError>;
}

#[derive(Debug, Default)]
struct Ledger {
    hotels: HashMap<HotelId, Hotel>,
    room_types: HashMap<RoomTypeId, RoomType>,
    bookings: Vec<Booking>,
}

impl Ledger {
    fn booked_rooms(&self, room_type_id: RoomTypeId, range: &StayRange) -> u32 {
        booked_units(&self.bookings, room_type_id, range)
    }
}

/// Process-local store. Room-type locks live in a `DashMap` so unrelated
/// room types never contend.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    ledger: Arc<RwLock<Ledger>>,
    room_locks: Arc<DashMap<RoomTypeId, Arc<Mutex<()>>>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_hotel(&self, hotel: Hotel) -> HotelId {
        let id = hotel.id;
        self.ledger.write().hotels.insert(id, hotel);
        id
    }

    pub fn insert_room_type(&self, room: NewRoomType) -> Result<RoomType, InventoryError> {
        room.validate()?;

        let mut ledger = self.ledger.write();
        if !ledger.hotels.contains_key(&room.hotel_id) {
            return Err(InventoryError::HotelNotFound(room.hotel_id));
        }

        let room_type = RoomType {
            id: Uuid::new_v4(),
            hotel_id: room.hotel_id,
            room_type: room.room_type,
            description: room.description,
            price: room.price,
            currency: room.currency,
            capacity: room.capacity,
            quantity: room.quantity.unwrap_or(DEFAULT_ROOM_QUANTITY),
            amenities: room.amenities,
        };
        ledger.room_types.insert(room_type.id, room_type.clone());
        Ok(room_type)
    }

    /// Removes a hotel together with its room types.
    pub fn remove_hotel(&self, id: HotelId) -> Result<Hotel, InventoryError> {
        let mut ledger = self.ledger.write();
        let hotel = ledger
            .hotels
            .remove(&id)
            .ok_or(InventoryError::HotelNotFound(id))?;

        let removed: Vec<RoomTypeId> = ledger
            .room_types
            .values()
            .filter(|r| r.hotel_id == id)
            .map(|r| r.id)
            .collect();
        for room_type_id in removed {
            ledger.room_types.remove(&room_type_id);
            self.room_locks.remove(&room_type_id);
        }

        Ok(hotel)
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.ledger.read().bookings.clone()
    }

    fn lock_for(&self, room_type_id: RoomTypeId) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_type_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn hotel(&self, id: HotelId) -> Result<Option<Hotel>, InventoryError> {
        Ok(self.ledger.read().hotels.get(&id).cloned())
    }

    async fn room_type(&self, id: RoomTypeId) -> Result<Option<RoomType>, InventoryError> {
        Ok(self.ledger.read().room_types.get(&id).cloned())
    }

    async fn room_types_for_hotel(
        &self,
        hotel_id: HotelId,
    ) -> Result<Vec<RoomType>, InventoryError> {
        let ledger = self.ledger.read();
        let mut rooms: Vec<RoomType> = ledger
            .room_types
            .values()
            .filter(|r| r.hotel_id == hotel_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.room_type.cmp(&b.room_type)));
        Ok(rooms)
    }

    async fn booked_rooms(
        &self,
        room_type_id: RoomTypeId,
        range: &StayRange,
    ) -> Result<u32, InventoryError> {
        Ok(self.ledger.read().booked_rooms(room_type_id, range))
    }

    async fn search_hotels(&self, text: &str) -> Result<Vec<Hotel>, InventoryError> {
        let needle = text.trim().to_lowercase();
        let ledger = self.ledger.read();
        let mut hotels: Vec<Hotel> = ledger
            .hotels
            .values()
            .filter(|h| h.enabled && h.matches(&needle))
            .cloned()
            .collect();
        hotels.sort_by(|a, b| b.featured.cmp(&a.featured).then_with(|| a.name.cmp(&b.name)));
        Ok(hotels)
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, InventoryError> {
        Ok(self.ledger.read().bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn begin(
        &self,
        room_type_id: RoomTypeId,
    ) -> Result<Box<dyn InventoryTransaction>, InventoryError> {
        let guard = self.lock_for(room_type_id).lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            room_type_id,
            ledger: Arc::clone(&self.ledger),
            staged: Vec::new(),
            transitions: Vec::new(),
            _guard: guard,
        }))
    }
}

struct InMemoryTransaction {
    room_type_id: RoomTypeId,
    ledger: Arc<RwLock<Ledger>>,
    staged: Vec<Booking>,
    transitions: Vec<StatusTransition>,
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Clone, Copy)]
struct StatusTransition {
    id: BookingId,
    from: BookingStatus,
    to: BookingStatus,
}

impl InMemoryTransaction {
    fn current(&self, id: BookingId) -> Option<Booking> {
        let mut booking = self
            .ledger
            .read()
            .bookings
            .iter()
            .chain(self.staged.iter())
            .find(|b| b.id == id && b.room_type_id == self.room_type_id)
            .cloned()?;
        if let Some(t) = self.transitions.iter().rev().find(|t| t.id == id) {
            booking.status = t.to;
        }
        Some(booking)
    }
}

#[async_trait]
impl InventoryTransaction for InMemoryTransaction {
    async fn room_type(&mut self) -> Result<Option<RoomType>, InventoryError> {
        Ok(self.ledger.read().room_types.get(&self.room_type_id).cloned())
    }

    async fn booked_rooms(&mut self, range: &StayRange) -> Result<u32, InventoryError> {
        let committed = self.ledger.read().booked_rooms(self.room_type_id, range);
        let staged = booked_units(&self.staged, self.room_type_id, range);
        Ok(committed + staged)
    }

    async fn booking(&mut self, id: BookingId) -> Result<Option<Booking>, InventoryError> {
        Ok(self.current(id))
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> Result<Booking, InventoryError> {
        if booking.room_type_id != self.room_type_id {
            return Err(InventoryError::Conflict(format!(
                "transaction is scoped to room type {}, got {}",
                self.room_type_id, booking.room_type_id
            )));
        }

        let record = Booking {
            id: Uuid::new_v4(),
            user_id: booking.user_id,
            hotel_id: booking.hotel_id,
            room_type_id: booking.room_type_id,
            check_in: booking.range.check_in(),
            check_out: booking.range.check_out(),
            number_of_rooms: booking.number_of_rooms,
            total_price: booking.total_price,
            currency: booking.currency,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        self.staged.push(record.clone());
        Ok(record)
    }

    async fn transition(
        &mut self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, InventoryError> {
        let mut booking = self.current(id).ok_or(InventoryError::BookingNotFound(id))?;
        if booking.status != from {
            return Err(InventoryError::Conflict(format!(
                "booking {} is {:?}, expected {:?}",
                id, booking.status, from
            )));
        }
        self.transitions.push(StatusTransition { id, from, to });
        booking.status = to;
        Ok(booking)
    }

    async fn commit(self: Box<Self>) -> Result<(), InventoryError> {
        let InMemoryTransaction {
            room_type_id,
            ledger,
            staged,
            transitions,
            _guard,
        } = *self;
        let mut ledger = ledger.write();
        if !staged.is_empty() && !ledger.room_types.contains_key(&room_type_id) {
            return Err(InventoryError::RoomTypeNotFound(room_type_id));
        }

        // validate every transition before writing anything
        let mut expected: HashMap<BookingId, BookingStatus> = HashMap::new();
        for t in &transitions {
            let actual = match expected.get(&t.id) {
                Some(status) => *status,
                None => ledger
                    .bookings
                    .iter()
                    .chain(staged.iter())
                    .find(|b| b.id == t.id)
                    .map(|b| b.status)
                    .ok_or(InventoryError::BookingNotFound(t.id))?,
            };
            if actual != t.from {
                return Err(InventoryError::Conflict(format!(
                    "booking {} moved to {:?} before commit",
                    t.id, actual
                )));
            }
            expected.insert(t.id, t.to);
        }

        ledger.bookings.extend(staged);
        for (id, status) in expected {
            if let Some(booking) = ledger.bookings.iter_mut().find(|b| b.id == id) {
                booking.status = status;
            }
        }
        Ok(())
    }
}
