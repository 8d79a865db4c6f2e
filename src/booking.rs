// Booking transaction manager
// Availability check, pricing and insert run inside one store transaction so
// two concurrent requests for the same room type cannot both pass the check.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::availability::{remaining_units, AvailabilityError, StayRange};
use crate::inventory::{
    Booking, BookingId, BookingStatus, HotelId, InventoryError, InventoryStore,
    InventoryTransaction, NewBooking, RoomTypeId,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid stay: check-out {check_out} must be after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Number of rooms must be at least 1")]
    InvalidRoomCount,

    #[error("Only {available} room(s) left, {requested} requested")]
    Overbooking { requested: u32, available: u32 },

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(RoomTypeId),

    #[error("Room type {room_type_id} does not belong to hotel {hotel_id}")]
    HotelMismatch {
        hotel_id: HotelId,
        room_type_id: RoomTypeId,
    },

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("Cannot move booking from {from:?} to {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Total price overflow")]
    PriceOverflow,

    #[error("Store error: {0}")]
    Store(InventoryError),
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::RoomTypeNotFound(id) => BookingError::RoomTypeNotFound(id),
            InventoryError::BookingNotFound(id) => BookingError::BookingNotFound(id),
            other => BookingError::Store(other),
        }
    }
}

impl From<AvailabilityError> for BookingError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidRange {
                check_in,
                check_out,
            } => BookingError::InvalidRange {
                check_in,
                check_out,
            },
            AvailabilityError::RoomTypeNotFound(id) => BookingError::RoomTypeNotFound(id),
            AvailabilityError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub user_id: String,
    pub hotel_id: HotelId,
    pub room_type_id: RoomTypeId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_rooms: u32,
}

/// `price * nights * rooms` in exact decimal arithmetic.
pub fn stay_price(price: Decimal, nights: u32, rooms: u32) -> Result<Decimal, BookingError> {
    price
        .checked_mul(Decimal::from(nights))
        .and_then(|p| p.checked_mul(Decimal::from(rooms)))
        .ok_or(BookingError::PriceOverflow)
}

#[derive(Clone)]
pub struct BookingManager {
    store: Arc<dyn InventoryStore>,
}

impl BookingManager {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Reserves rooms and persists a PENDING booking, or fails without
    /// touching the ledger.
    pub async fn book(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        if request.number_of_rooms == 0 {
            return Err(BookingError::InvalidRoomCount);
        }
        let range = StayRange::new(request.check_in, request.check_out)?;
        let nights = range.nights();
        if nights < 1 {
            return Err(BookingError::InvalidRange {
                check_in: request.check_in,
                check_out: request.check_out,
            });
        }

        let mut tx = self.store.begin(request.room_type_id).await?;

        let room_type = tx
            .room_type()
            .await?
            .ok_or(BookingError::RoomTypeNotFound(request.room_type_id))?;
        if room_type.hotel_id != request.hotel_id {
            return Err(BookingError::HotelMismatch {
                hotel_id: request.hotel_id,
                room_type_id: request.room_type_id,
            });
        }

        let booked = tx.booked_rooms(&range).await?;
        let available = remaining_units(room_type.quantity, booked);
        if available < request.number_of_rooms {
            info!(
                room_type_id = %request.room_type_id,
                requested = request.number_of_rooms,
                available,
                "Rejecting booking: insufficient availability"
            );
            return Err(BookingError::Overbooking {
                requested: request.number_of_rooms,
                available,
            });
        }

        let total_price = stay_price(room_type.price, nights, request.number_of_rooms)?;

        let booking = tx
            .insert_booking(NewBooking {
                user_id: request.user_id,
                hotel_id: request.hotel_id,
                room_type_id: request.room_type_id,
                range,
                number_of_rooms: request.number_of_rooms,
                total_price,
                currency: room_type.currency,
            })
            .await?;
        tx.commit().await.map_err(|e| {
            warn!(room_type_id = %request.room_type_id, error = %e, "Booking commit failed");
            BookingError::from(e)
        })?;

        info!(
            booking_id = %booking.id,
            room_type_id = %booking.room_type_id,
            nights,
            rooms = booking.number_of_rooms,
            total_price = %booking.total_price,
            "Booking committed"
        );
        Ok(booking)
    }

    /// PENDING -> CONFIRMED.
    pub async fn confirm(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        let (mut tx, booking) = self.lock_booking(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }

        let confirmed = tx
            .transition(booking_id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Booking confirmed");
        Ok(confirmed)
    }

    /// Cancels a booking and releases its rooms. Cancelling twice is a no-op;
    /// completed stays cannot be cancelled.
    pub async fn cancel(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        let (mut tx, booking) = self.lock_booking(booking_id).await?;
        match booking.status {
            BookingStatus::Cancelled => Ok(booking),
            BookingStatus::Completed => Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            }),
            BookingStatus::Pending | BookingStatus::Confirmed => {
                let cancelled = tx
                    .transition(booking_id, booking.status, BookingStatus::Cancelled)
                    .await?;
                tx.commit().await?;
                info!(
                    booking_id = %booking_id,
                    rooms = cancelled.number_of_rooms,
                    "Booking cancelled"
                );
                Ok(cancelled)
            }
        }
    }

    /// Opens the booking's room-type transaction and re-reads the booking
    /// under it, so the returned status cannot change until the transaction
    /// ends.
    async fn lock_booking(
        &self,
        booking_id: BookingId,
    ) -> Result<(Box<dyn InventoryTransaction>, Booking), BookingError> {
        let room_type_id = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?
            .room_type_id;

        let mut tx = self.store.begin(room_type_id).await?;
        let booking = tx
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        Ok((tx, booking))
    }
}
