//! Normalization of booking payloads at the API boundary.
//!
//! Endpoints written at different times name the same field differently
//! (`doctor_user_id` / `doctor_id`, `serial` / `serial_no` / `token`), send
//! numbers and booleans as strings, and wrap lists in `results` or `items`.
//! Everything past this module sees only the typed models.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::warn;

use shared_models::ClientError;

use crate::models::{
    BookingConfirmation, BookingStatus, BookingTarget, ExistingBooking, ScheduleBlock, ServiceOffering,
};
use crate::services::calendar::parse_date;
use crate::services::slots::parse_time;

const LIST_KEYS: [&str; 5] = ["results", "items", "data", "schedule", "bookings"];

fn list_items(body: &Value) -> Result<&[Value], ClientError> {
    if let Value::Array(items) = body {
        return Ok(items.as_slice());
    }
    LIST_KEYS
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .ok_or_else(|| ClientError::Decode(format!("expected a list, got {}", kind_of(body))))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn int_field(obj: &Value, keys: &[&str]) -> Option<i64> {
    match field(obj, keys)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(obj: &Value, keys: &[&str]) -> Option<f64> {
    match field(obj, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(obj, keys).and_then(Value::as_str)
}

fn bool_field(obj: &Value, keys: &[&str]) -> Option<bool> {
    match field(obj, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses a date, or the date part of a `YYYY-MM-DD[T ]HH:MM[:SS]` timestamp.
fn date_value(raw: &str) -> Option<NaiveDate> {
    parse_date(raw).or_else(|| datetime_value(raw).map(|dt| dt.date()))
}

fn datetime_value(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let raw = raw.strip_suffix('Z').unwrap_or(raw);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

/// Parses a time of day, or the time part of a timestamp.
fn time_value(raw: &str) -> Option<NaiveTime> {
    parse_time(raw).or_else(|| datetime_value(raw).map(|dt| dt.time()))
}

fn weekday_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_u64().filter(|d| *d <= 6).map(|d| d as u8),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            if let Ok(d) = s.parse::<u8>() {
                return (d <= 6).then_some(d);
            }
            let names = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
            names.iter().position(|name| s.starts_with(name)).map(|d| d as u8)
        }
        _ => None,
    }
}

fn unwrap_object<'a>(body: &'a Value, keys: &[&str]) -> &'a Value {
    keys.iter()
        .find_map(|key| body.get(*key).filter(|v| v.is_object()))
        .unwrap_or(body)
}

// ==============================================================================
// SCHEDULES AND SERVICES
// ==============================================================================

/// Missing doctor or hospital ids default to the ones the list was requested for.
pub fn schedule_blocks(body: &Value, doctor_user_id: i64, hospital_user_id: i64) -> Result<Vec<ScheduleBlock>, ClientError> {
    let items = list_items(body)?;
    let blocks = items
        .iter()
        .filter_map(|item| {
            let block = schedule_block(item, doctor_user_id, hospital_user_id);
            if block.is_none() {
                warn!("Skipping malformed schedule block: {}", item);
            }
            block
        })
        .collect();
    Ok(blocks)
}

fn schedule_block(item: &Value, doctor_user_id: i64, hospital_user_id: i64) -> Option<ScheduleBlock> {
    Some(ScheduleBlock {
        id: int_field(item, &["id", "schedule_id"])?,
        weekday: field(item, &["weekday", "day_of_week", "day"]).and_then(weekday_value)?,
        start_time: str_field(item, &["start_time", "start"]).and_then(time_value)?,
        end_time: str_field(item, &["end_time", "end"]).and_then(time_value)?,
        visit_cost: float_field(item, &["visit_cost", "cost", "fee"]),
        max_per_day: int_field(item, &["max_per_day", "capacity"]).and_then(|n| u32::try_from(n).ok()),
        hospital_user_id: int_field(item, &["hospital_user_id", "hospital_id"]).unwrap_or(hospital_user_id),
        doctor_user_id: int_field(item, &["doctor_user_id", "doctor_id"]).unwrap_or(doctor_user_id),
    })
}

pub fn service_offerings(body: &Value) -> Result<Vec<ServiceOffering>, ClientError> {
    let items = list_items(body)?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let offering = service_offering(item);
            if offering.is_none() {
                warn!("Skipping malformed service offering: {}", item);
            }
            offering
        })
        .collect())
}

fn service_offering(item: &Value) -> Option<ServiceOffering> {
    Some(ServiceOffering {
        id: int_field(item, &["id", "service_id"])?,
        name: str_field(item, &["name", "title", "service_name"]).unwrap_or("Service").to_string(),
        price: float_field(item, &["price", "cost"]).unwrap_or(0.0),
        duration_minutes: int_field(item, &["duration_minutes", "duration"])
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        available: bool_field(item, &["available", "is_available", "active"]).unwrap_or(true),
        max_per_day: int_field(item, &["max_per_day", "capacity"]).and_then(|n| u32::try_from(n).ok()),
        window_start_time: str_field(item, &["window_start_time", "window_start", "available_from"])
            .and_then(time_value),
        window_end_time: str_field(item, &["window_end_time", "window_end", "available_to"]).and_then(time_value),
    })
}

// ==============================================================================
// EXISTING BOOKINGS
// ==============================================================================

const BOOKING_DATE_KEYS: [&str; 7] = [
    "date",
    "appointment_date",
    "booking_date",
    "starts_at",
    "start_at",
    "scheduled_at",
    "scheduled_for",
];

pub fn existing_appointments(body: &Value) -> Result<Vec<ExistingBooking>, ClientError> {
    existing_bookings(body, |item| int_field(item, &["doctor_user_id", "doctor_id"]).map(BookingTarget::Doctor))
}

pub fn existing_service_bookings(body: &Value) -> Result<Vec<ExistingBooking>, ClientError> {
    existing_bookings(body, |item| int_field(item, &["service_id", "hospital_service_id"]).map(BookingTarget::Service))
}

fn existing_bookings<F>(body: &Value, target_of: F) -> Result<Vec<ExistingBooking>, ClientError>
where
    F: Fn(&Value) -> Option<BookingTarget>,
{
    let items = list_items(body)?;
    Ok(items
        .iter()
        .filter_map(|item| {
            let target = target_of(item)?;
            let date = str_field(item, &BOOKING_DATE_KEYS).and_then(date_value)?;
            let status = str_field(item, &["status", "state"])
                .map(BookingStatus::from_raw)
                .unwrap_or(BookingStatus::Unknown);
            Some(ExistingBooking {
                id: int_field(item, &["id", "appointment_id", "booking_id"]),
                target,
                date,
                status,
            })
        })
        .collect())
}

// ==============================================================================
// SUBMISSION RESULTS
// ==============================================================================

/// Maps a booking success payload; the date and requested times come from
/// the request when the backend does not echo them.
pub fn booking_confirmation(
    body: &Value,
    target: BookingTarget,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> BookingConfirmation {
    let record = unwrap_object(body, &["appointment", "booking", "result", "data"]);

    let serial = int_field(record, &["serial", "serial_no", "serial_number", "token", "token_no"])
        .or_else(|| int_field(body, &["serial", "serial_no", "token"]))
        .and_then(|n| u32::try_from(n).ok());

    let approx_time = str_field(
        record,
        &["approx_time", "approx_start_time", "approx_start", "estimated_time", "eta"],
    )
    .and_then(time_value);

    BookingConfirmation {
        booking_id: int_field(record, &["id", "appointment_id", "booking_id"]),
        target,
        date: str_field(record, &BOOKING_DATE_KEYS).and_then(date_value).unwrap_or(date),
        serial,
        approx_time,
        start_time: str_field(record, &["start_time", "starts_at"]).and_then(time_value).or(start_time),
        end_time: str_field(record, &["end_time", "ends_at"]).and_then(time_value).or(end_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(raw: &str) -> NaiveTime {
        parse_time(raw).unwrap()
    }

    fn d(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn test_schedule_blocks_with_alternate_names() {
        let body = json!({"results": [
            {"id": 1, "weekday": 1, "start_time": "09:00:00", "end_time": "12:00:00", "visit_cost": "500.00",
             "max_per_day": 20, "hospital_user_id": 3, "doctor_user_id": 7},
            {"schedule_id": "2", "day_of_week": "Wednesday", "start": "14:00", "end": "16:30", "fee": 300},
            {"id": 3, "weekday": 9, "start_time": "09:00", "end_time": "10:00"}
        ]});

        let blocks = schedule_blocks(&body, 7, 3).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].visit_cost, Some(500.0));
        assert_eq!(blocks[1].id, 2);
        assert_eq!(blocks[1].weekday, 3);
        assert_eq!(blocks[1].end_time, t("16:30"));
        assert_eq!(blocks[1].doctor_user_id, 7);
        assert_eq!(blocks[1].hospital_user_id, 3);
    }

    #[test]
    fn test_non_list_body_is_decode_error() {
        assert!(matches!(
            schedule_blocks(&json!({"detail": "ok"}), 1, 1),
            Err(ClientError::Decode(_))
        ));
    }

    #[test]
    fn test_service_offerings() {
        let body = json!([
            {"id": 4, "name": "X-Ray", "price": "1200.00", "duration_minutes": 30, "available": 1,
             "window_start_time": "10:00:00", "window_end_time": "14:00:00"},
            {"id": 5, "name": "Ambulance", "price": 0, "duration": "60", "is_available": "false"}
        ]);

        let services = service_offerings(&body).unwrap();
        assert_eq!(services[0].price, 1200.0);
        assert!(services[0].available);
        assert_eq!(services[0].window_start_time, Some(t("10:00")));
        assert!(!services[1].available);
        assert_eq!(services[1].duration_minutes, 60);
        assert!(services[1].booking_window().is_unbounded());
    }

    #[test]
    fn test_existing_appointments_date_sources() {
        let body = json!([
            {"id": 1, "doctor_user_id": 7, "starts_at": "2025-06-02T09:00:00", "status": "booked"},
            {"id": 2, "doctor_id": "8", "date": "2025-06-03", "status": "cancelled"},
            {"id": 3, "doctor_id": 9, "appointment_date": "2025-06-04 10:15:00"},
            {"id": 4, "starts_at": "2025-06-05T09:00:00"}
        ]);

        let bookings = existing_appointments(&body).unwrap();
        assert_eq!(bookings.len(), 3);
        assert_eq!(bookings[0].target, BookingTarget::Doctor(7));
        assert_eq!(bookings[0].date, d("2025-06-02"));
        assert_eq!(bookings[1].status, BookingStatus::Cancelled);
        assert_eq!(bookings[2].date, d("2025-06-04"));
        assert_eq!(bookings[2].status, BookingStatus::Unknown);
    }

    #[test]
    fn test_existing_service_bookings() {
        let body = json!({"items": [
            {"id": 10, "service_id": 4, "scheduled_at": "2025-06-02 10:00:00", "status": "confirmed"}
        ]});
        let bookings = existing_service_bookings(&body).unwrap();
        assert_eq!(bookings[0].target, BookingTarget::Service(4));
        assert!(bookings[0].status.is_active());
    }

    #[test]
    fn test_booking_confirmation_shapes() {
        let target = BookingTarget::Doctor(7);
        let date = d("2025-06-02");

        let flat = booking_confirmation(
            &json!({"id": 55, "serial": 3, "approx_time": "09:30"}),
            target,
            date,
            Some(t("09:00")),
            Some(t("09:15")),
        );
        assert_eq!(flat.booking_id, Some(55));
        assert_eq!(flat.serial, Some(3));
        assert_eq!(flat.approx_time, Some(t("09:30")));
        assert_eq!(flat.start_time, Some(t("09:00")));

        let nested = booking_confirmation(
            &json!({"appointment": {"appointment_id": "56", "serial_no": "4",
                    "approx_start_time": "2025-06-02T09:45:00Z"}}),
            target,
            date,
            None,
            None,
        );
        assert_eq!(nested.booking_id, Some(56));
        assert_eq!(nested.serial, Some(4));
        assert_eq!(nested.approx_time, Some(t("09:45")));
        assert_eq!(nested.date, date);
    }

    #[test]
    fn test_weekday_value_forms() {
        assert_eq!(weekday_value(&json!(0)), Some(0));
        assert_eq!(weekday_value(&json!("6")), Some(6));
        assert_eq!(weekday_value(&json!("Fri")), Some(5));
        assert_eq!(weekday_value(&json!(7)), None);
        assert_eq!(weekday_value(&json!("someday")), None);
    }
}
