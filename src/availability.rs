// Availability calculation over the bookings ledger
// Stays are half-open: [check_in, check_out). A booking ending on day X and
// another starting on day X never overlap.

use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use crate::inventory::{Booking, InventoryError, InventoryStore, RoomTypeId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Invalid stay: check-out {check_out} must be after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Room type not found: {0}")]
    RoomTypeNotFound(RoomTypeId),

    #[error("Store error: {0}")]
    Store(#[from] InventoryError),
}

/// A non-empty half-open date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, AvailabilityError> {
        if check_out <= check_in {
            return Err(AvailabilityError::InvalidRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights in the stay, always at least 1.
    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

/// Rooms taken from `room_type_id` during `range` by the given bookings.
pub fn booked_units<'a, I>(bookings: I, room_type_id: RoomTypeId, range: &StayRange) -> u32
where
    I: IntoIterator<Item = &'a Booking>,
{
    bookings
        .into_iter()
        .filter(|b| b.room_type_id == room_type_id && b.occupies(range))
        .map(|b| b.number_of_rooms)
        .sum()
}

pub fn remaining_units(quantity: u32, booked: u32) -> u32 {
    quantity.saturating_sub(booked)
}

/// Read-only view of remaining sellable units. Every call re-reads the store.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    store: Arc<dyn InventoryStore>,
}

impl AvailabilityCalculator {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn availability(
        &self,
        room_type_id: RoomTypeId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<u32, AvailabilityError> {
        let range = StayRange::new(check_in, check_out)?;
        self.availability_for(room_type_id, &range).await
    }

    pub async fn availability_for(
        &self,
        room_type_id: RoomTypeId,
        range: &StayRange,
    ) -> Result<u32, AvailabilityError> {
        let room_type = self
            .store
            .room_type(room_type_id)
            .await?
            .ok_or(AvailabilityError::RoomTypeNotFound(room_type_id))?;
        let booked = self.store.booked_rooms(room_type_id, range).await?;

        Ok(remaining_units(room_type.quantity, booked))
    }
}
