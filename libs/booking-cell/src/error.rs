use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use shared_models::ClientError;

use crate::models::{BookingTarget, RejectionCode};
use crate::services::calendar::weekday_name;
use crate::services::window::BookingWindow;

fn day_name(weekday: &u8) -> &'static str {
    weekday_name(*weekday)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Date,
    StartTime,
    EndTime,
    Time,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftField::Date => write!(f, "date"),
            DraftField::StartTime => write!(f, "start time"),
            DraftField::EndTime => write!(f, "end time"),
            DraftField::Time => write!(f, "time"),
        }
    }
}

/// Problems caught before a booking request leaves the client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingValidationError {
    #[error("Please select a {0}.")]
    IncompleteDraft(DraftField),

    #[error("{}", .0.violation_message())]
    OutsideWindow(BookingWindow),

    #[error("No schedule on {}, please pick another date.", day_name(.weekday))]
    NoSchedule { date: NaiveDate, weekday: u8 },

    #[error("You already have a booking with {target} on {date}.")]
    AlreadyBooked { target: BookingTarget, date: NaiveDate },

    #[error("This service is currently unavailable.")]
    ServiceUnavailable,

    #[error("Schedule block {0} is not offered on the selected date.")]
    UnknownBlock(i64),

    #[error("{0} is not one of the offered times.")]
    TimeNotOffered(String),

    #[error("Your account cannot make this booking.")]
    NotPermitted,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] BookingValidationError),

    #[error("Booking rejected: {}", .code.message(.detail.as_deref()))]
    Rejected {
        code: RejectionCode,
        detail: Option<String>,
    },

    #[error("A booking for {0} is already being submitted")]
    SubmissionInFlight(BookingTarget),

    #[error(transparent)]
    Api(ClientError),
}

impl BookingError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Validation(err) => err.to_string(),
            BookingError::Rejected { code, detail } => code.message(detail.as_deref()),
            BookingError::SubmissionInFlight(_) => "Your booking is already being submitted.".to_string(),
            BookingError::Api(err) => err.to_string(),
        }
    }

    pub fn rejection_code(&self) -> Option<&RejectionCode> {
        match self {
            BookingError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<ClientError> for BookingError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected { code, detail, .. } => BookingError::Rejected {
                code: RejectionCode::from_code(&code),
                detail,
            },
            other => BookingError::Api(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            BookingValidationError::IncompleteDraft(DraftField::StartTime).to_string(),
            "Please select a start time."
        );
        let window = BookingWindow::new(NaiveTime::from_hms_opt(10, 0, 0), NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(
            BookingValidationError::OutsideWindow(window).to_string(),
            "Please choose a time between 10:00 and 14:00."
        );
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            BookingValidationError::NoSchedule { date, weekday: 0 }.to_string(),
            "No schedule on Sunday, please pick another date."
        );
    }

    #[test]
    fn test_client_rejection_maps_to_code() {
        let err: BookingError = ClientError::Rejected {
            status: 400,
            code: "already_booked_same_day".to_string(),
            detail: None,
        }
        .into();
        assert_eq!(err.rejection_code(), Some(&RejectionCode::AlreadyBookedSameDay));
        assert_eq!(err.user_message(), "You already have a booking on that day.");
    }

    #[test]
    fn test_unclassified_failure_keeps_raw_message() {
        let err: BookingError = ClientError::Network("connection refused".to_string()).into();
        assert_eq!(err.user_message(), "Network error: connection refused");
        assert!(err.rejection_code().is_none());
    }
}
