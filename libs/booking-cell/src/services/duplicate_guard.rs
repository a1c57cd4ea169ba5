use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::error::BookingValidationError;
use crate::models::{BookingTarget, ExistingBooking};

/// Dates on which the current user already holds an active booking, per
/// doctor or service.
///
/// Built from the user's own booking history and used only to disable a
/// redundant confirm before it reaches the server. The backend remains the
/// only enforcer of one active booking per day: another tab or a stale
/// index can still race it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookedDatesIndex {
    dates: HashMap<BookingTarget, BTreeSet<NaiveDate>>,
}

impl BookedDatesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inactive bookings (cancelled, rejected, declined) are left out.
    pub fn from_bookings<'a, I>(bookings: I) -> Self
    where
        I: IntoIterator<Item = &'a ExistingBooking>,
    {
        let mut index = Self::new();
        for booking in bookings.into_iter().filter(|b| b.status.is_active()) {
            index.record(booking.target, booking.date);
        }
        index
    }

    pub fn is_booked(&self, target: BookingTarget, date: NaiveDate) -> bool {
        self.dates.get(&target).is_some_and(|dates| dates.contains(&date))
    }

    pub fn check(&self, target: BookingTarget, date: NaiveDate) -> Result<(), BookingValidationError> {
        if self.is_booked(target, date) {
            Err(BookingValidationError::AlreadyBooked { target, date })
        } else {
            Ok(())
        }
    }

    /// Returns false when the date was already present.
    pub fn record(&mut self, target: BookingTarget, date: NaiveDate) -> bool {
        self.dates.entry(target).or_default().insert(date)
    }

    pub fn dates_for(&self, target: BookingTarget) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.get(&target).into_iter().flat_map(|dates| dates.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.dates.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
