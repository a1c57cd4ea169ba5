//! iCalendar export of a confirmed booking.

use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::models::BookingConfirmation;

const DEFAULT_DURATION_MINUTES: i64 = 15;
const PRODUCT_ID: &str = "-//CrisisIntel//Booking//EN";
const MAX_LINE_OCTETS: usize = 75;

/// Renders a single-event `VCALENDAR`. Local floating times are used since
/// the backend does not report a zone. Without any known time the event
/// covers the whole day.
pub fn booking_to_ics(
    confirmation: &BookingConfirmation,
    title: &str,
    duration_minutes: Option<u32>,
) -> String {
    let uid = format!("{}@crisisintel", Uuid::new_v4());
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODUCT_ID),
        "CALSCALE:GREGORIAN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", uid),
        format!("DTSTAMP:{}", stamp),
    ];

    match confirmation.start_time.or(confirmation.approx_time) {
        Some(start) => {
            let start_at = confirmation.date.and_time(start);
            let end_at = event_end(start_at, confirmation.end_time, duration_minutes);
            lines.push(format!("DTSTART:{}", local_stamp(start_at)));
            lines.push(format!("DTEND:{}", local_stamp(end_at)));
        }
        None => {
            let next_day = confirmation.date + Duration::days(1);
            lines.push(format!("DTSTART;VALUE=DATE:{}", confirmation.date.format("%Y%m%d")));
            lines.push(format!("DTEND;VALUE=DATE:{}", next_day.format("%Y%m%d")));
        }
    }

    lines.push(format!("SUMMARY:{}", escape_text(title)));
    if let Some(description) = description(confirmation) {
        lines.push(format!("DESCRIPTION:{}", escape_text(&description)));
    }
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut ics = String::new();
    for line in &lines {
        ics.push_str(&fold_line(line));
        ics.push_str("\r\n");
    }
    ics
}

fn event_end(start_at: NaiveDateTime, end_time: Option<NaiveTime>, duration_minutes: Option<u32>) -> NaiveDateTime {
    match end_time {
        Some(end) if end > start_at.time() => start_at.date().and_time(end),
        _ => {
            let minutes = duration_minutes
                .filter(|m| *m > 0)
                .map(i64::from)
                .unwrap_or(DEFAULT_DURATION_MINUTES);
            start_at + Duration::minutes(minutes)
        }
    }
}

fn local_stamp(at: NaiveDateTime) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

fn description(confirmation: &BookingConfirmation) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(serial) = confirmation.serial {
        parts.push(format!("Serial {}", serial));
    }
    if let Some(approx) = confirmation.approx_time {
        parts.push(format!("approx. {}", approx.format("%H:%M")));
    }
    if let Some(id) = confirmation.booking_id {
        parts.push(format!("booking #{}", id));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Splits a content line into 75-octet physical lines, continuing each with
/// CRLF and a single space. Multi-byte characters are never split.
fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(c);
        width += len;
    }
    folded
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
