// libs/booking-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BookingValidationError, DraftField};
use crate::services::window::BookingWindow;

// ==============================================================================
// SCHEDULE AND SERVICE MODELS
// ==============================================================================

/// One recurring weekly availability window for a doctor at a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: i64,
    pub weekday: u8, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub visit_cost: Option<f64>,
    pub max_per_day: Option<u32>,
    pub hospital_user_id: i64,
    pub doctor_user_id: i64,
}

/// A bookable non-doctor service offered by a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub duration_minutes: u32,
    pub available: bool,
    pub max_per_day: Option<u32>,
    pub window_start_time: Option<NaiveTime>,
    pub window_end_time: Option<NaiveTime>,
}

impl ServiceOffering {
    pub fn booking_window(&self) -> BookingWindow {
        BookingWindow::new(self.window_start_time, self.window_end_time)
    }
}

// ==============================================================================
// BOOKING TARGETS AND EXISTING BOOKINGS
// ==============================================================================

/// Whom a booking is made with; keys the same-day duplicate guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BookingTarget {
    Doctor(i64),
    Service(i64),
}

impl fmt::Display for BookingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingTarget::Doctor(id) => write!(f, "doctor #{}", id),
            BookingTarget::Service(id) => write!(f, "service #{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Booked,
    Confirmed,
    Completed,
    Cancelled,
    Rejected,
    Declined,
    NoShow,
    Unknown,
}

impl BookingStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "requested" => BookingStatus::Pending,
            "booked" | "scheduled" => BookingStatus::Booked,
            "confirmed" | "accepted" | "approved" => BookingStatus::Confirmed,
            "completed" | "done" | "visited" => BookingStatus::Completed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            "rejected" => BookingStatus::Rejected,
            "declined" => BookingStatus::Declined,
            "no_show" | "noshow" => BookingStatus::NoShow,
            _ => BookingStatus::Unknown,
        }
    }

    /// Whether the booking still occupies its day for the user.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Rejected | BookingStatus::Declined
        )
    }
}

/// A booking the current user already holds, normalized from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingBooking {
    pub id: Option<i64>,
    pub target: BookingTarget,
    pub date: NaiveDate,
    pub status: BookingStatus,
}

// ==============================================================================
// DRAFTS AND REQUESTS
// ==============================================================================

/// Ephemeral doctor booking form state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DoctorBookingDraft {
    pub doctor_user_id: i64,
    pub hospital_user_id: i64,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

impl DoctorBookingDraft {
    pub fn complete(self) -> Result<DoctorBookingRequest, BookingValidationError> {
        let date = self.date.ok_or(BookingValidationError::IncompleteDraft(DraftField::Date))?;
        let start_time = self
            .start_time
            .ok_or(BookingValidationError::IncompleteDraft(DraftField::StartTime))?;
        let end_time = self
            .end_time
            .ok_or(BookingValidationError::IncompleteDraft(DraftField::EndTime))?;

        Ok(DoctorBookingRequest {
            doctor_user_id: self.doctor_user_id,
            hospital_user_id: self.hospital_user_id,
            date,
            start_time,
            end_time,
            notes: clean_notes(self.notes),
        })
    }
}

/// Ephemeral service booking form state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceBookingDraft {
    pub service_id: i64,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub notes: Option<String>,
}

impl ServiceBookingDraft {
    pub fn complete(self) -> Result<ServiceBookingRequest, BookingValidationError> {
        let date = self.date.ok_or(BookingValidationError::IncompleteDraft(DraftField::Date))?;
        let time = self.time.ok_or(BookingValidationError::IncompleteDraft(DraftField::Time))?;

        Ok(ServiceBookingRequest {
            service_id: self.service_id,
            date,
            time,
            notes: clean_notes(self.notes),
        })
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// A fully formed doctor booking, ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorBookingRequest {
    pub doctor_user_id: i64,
    pub hospital_user_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
}

impl DoctorBookingRequest {
    pub fn target(&self) -> BookingTarget {
        BookingTarget::Doctor(self.doctor_user_id)
    }
}

/// A fully formed service booking, ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBookingRequest {
    pub service_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

impl ServiceBookingRequest {
    pub fn target(&self) -> BookingTarget {
        BookingTarget::Service(self.service_id)
    }
}

// ==============================================================================
// SUBMISSION OUTCOMES
// ==============================================================================

/// Normalized success payload of a booking submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking_id: Option<i64>,
    pub target: BookingTarget,
    pub date: NaiveDate,
    pub serial: Option<u32>,
    pub approx_time: Option<NaiveTime>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

/// Failure codes the booking endpoints answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    NoSchedule,
    OutsideSchedule,
    CapacityFull,
    AlreadyBookedSameDay,
    TimeConflict,
    Other(String),
}

impl RejectionCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no_schedule" => RejectionCode::NoSchedule,
            "outside_schedule" | "outside_window" => RejectionCode::OutsideSchedule,
            "capacity_full" => RejectionCode::CapacityFull,
            "already_booked_same_day" => RejectionCode::AlreadyBookedSameDay,
            "time_conflict" => RejectionCode::TimeConflict,
            other => RejectionCode::Other(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            RejectionCode::NoSchedule => "no_schedule",
            RejectionCode::OutsideSchedule => "outside_schedule",
            RejectionCode::CapacityFull => "capacity_full",
            RejectionCode::AlreadyBookedSameDay => "already_booked_same_day",
            RejectionCode::TimeConflict => "time_conflict",
            RejectionCode::Other(code) => code,
        }
    }

    /// Fixed user-facing text; unknown codes fall back to the backend's detail.
    pub fn message(&self, detail: Option<&str>) -> String {
        match self {
            RejectionCode::NoSchedule => "The doctor has no schedule on the selected day.".to_string(),
            RejectionCode::OutsideSchedule => "The selected time is outside the doctor's schedule.".to_string(),
            RejectionCode::CapacityFull => "All slots for that day are already taken.".to_string(),
            RejectionCode::AlreadyBookedSameDay => "You already have a booking on that day.".to_string(),
            RejectionCode::TimeConflict => "The selected time conflicts with another booking.".to_string(),
            RejectionCode::Other(code) => detail.map(str::to_string).unwrap_or_else(|| code.clone()),
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}
