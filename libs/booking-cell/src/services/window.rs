use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::BookingValidationError;
use crate::services::slots::{format_time, generate_time_slots, TimeSlots};

/// Time-of-day range in which a service may be booked. Either bound may be
/// open; with neither set any time is admissible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookingWindow {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl BookingWindow {
    pub fn new(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn admits(&self, time: NaiveTime) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (Some(start), Some(end)) => start <= time && time <= end,
            (Some(start), None) => time >= start,
            (None, Some(end)) => time <= end,
        }
    }

    pub fn check(&self, time: NaiveTime) -> Result<(), BookingValidationError> {
        if self.admits(time) {
            Ok(())
        } else {
            Err(BookingValidationError::OutsideWindow(*self))
        }
    }

    pub fn violation_message(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!(
                "Please choose a time between {} and {}.",
                format_time(start),
                format_time(end)
            ),
            (Some(start), None) => format!("Please choose a time at or after {}.", format_time(start)),
            (None, Some(end)) => format!("Please choose a time at or before {}.", format_time(end)),
            (None, None) => "Please choose a time.".to_string(),
        }
    }

    /// Selectable times inside the window; open bounds extend to the whole day.
    pub fn slots(&self, step_minutes: u32) -> TimeSlots {
        let start = self.start.unwrap_or_default();
        let end = self
            .end
            .or_else(|| NaiveTime::from_hms_opt(23, 59, 0))
            .unwrap_or_default();
        generate_time_slots(start, end, step_minutes)
    }
}
