use chrono::{NaiveTime, Timelike};

pub const DEFAULT_STEP_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parses `HH:MM` or `HH:MM:SS` into a time of day.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Renders a time of day as `HH:MM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Ordered, restartable sequence of times from `start` to `end` inclusive.
///
/// Iteration works in minutes since midnight, so a step that would pass
/// 23:59 ends the sequence instead of wrapping to the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlots {
    start: u32,
    end: u32,
    step: u32,
}

impl TimeSlots {
    pub fn new(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Self {
        Self {
            start: minutes_of(start),
            end: minutes_of(end),
            step: step_minutes,
        }
    }

    pub fn iter(&self) -> TimeSlotIter {
        TimeSlotIter {
            next: self.start,
            end: self.end,
            step: self.step,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.step == 0 || self.start > self.end
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.end - self.start) / self.step + 1) as usize
        }
    }

    pub fn to_vec(&self) -> Vec<NaiveTime> {
        self.iter().collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.iter().map(format_time).collect()
    }
}

impl IntoIterator for TimeSlots {
    type Item = NaiveTime;
    type IntoIter = TimeSlotIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &TimeSlots {
    type Item = NaiveTime;
    type IntoIter = TimeSlotIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct TimeSlotIter {
    next: u32,
    end: u32,
    step: u32,
}

impl Iterator for TimeSlotIter {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step == 0 || self.next > self.end {
            return None;
        }
        let current = time_of(self.next)?;
        // Saturating past the end keeps a huge step from wrapping back before start.
        self.next = self.next.checked_add(self.step).unwrap_or(u32::MAX);
        Some(current)
    }
}

pub fn generate_time_slots(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> TimeSlots {
    TimeSlots::new(start, end, step_minutes)
}

/// Label form of [`generate_time_slots`]; unparseable bounds give no slots.
pub fn generate_time_slot_labels(start: &str, end: &str, step_minutes: u32) -> Vec<String> {
    match (parse_time(start), parse_time(end)) {
        (Some(start), Some(end)) => generate_time_slots(start, end, step_minutes).labels(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> NaiveTime {
        parse_time(raw).unwrap()
    }

    #[test]
    fn test_huge_step_yields_only_start() {
        assert_eq!(generate_time_slot_labels("09:00", "10:00", u32::MAX), vec!["09:00"]);
        assert_eq!(generate_time_slot_labels("00:00", "23:59", u32::MAX - 1), vec!["00:00"]);
        let slots = generate_time_slots(t("23:59"), t("23:59"), u32::MAX);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.to_vec(), vec![t("23:59")]);
    }

    #[test]
    fn test_inclusive_range() {
        let labels = generate_time_slot_labels("09:00", "10:00", 15);
        assert_eq!(labels, vec!["09:00", "09:15", "09:30", "09:45", "10:00"]);
    }

    #[test]
    fn test_remainder_not_included() {
        let labels = generate_time_slot_labels("09:00", "09:40", 15);
        assert_eq!(labels, vec!["09:00", "09:15", "09:30"]);
    }

    #[test]
    fn test_start_after_end_is_empty() {
        let slots = generate_time_slots(t("12:00"), t("09:00"), 15);
        assert!(slots.is_empty());
        assert_eq!(slots.iter().count(), 0);
    }

    #[test]
    fn test_start_equals_end_yields_one() {
        assert_eq!(generate_time_slot_labels("09:00", "09:00", 15), vec!["09:00"]);
    }

    #[test]
    fn test_zero_step_is_empty() {
        assert!(generate_time_slots(t("09:00"), t("10:00"), 0).to_vec().is_empty());
    }

    #[test]
    fn test_does_not_wrap_past_midnight() {
        let labels = generate_time_slot_labels("23:30", "23:59", 15);
        assert_eq!(labels, vec!["23:30", "23:45"]);
    }

    #[test]
    fn test_restartable_and_len_matches() {
        let slots = generate_time_slots(t("08:00"), t("12:00"), 20);
        let first: Vec<_> = slots.iter().collect();
        let second: Vec<_> = (&slots).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(slots.len(), first.len());
    }

    #[test]
    fn test_sequence_properties_over_grid() {
        let bounds = ["00:00", "06:10", "09:00", "12:30", "17:45", "23:59"];
        for start in bounds {
            for end in bounds {
                for step in [1, 5, 15, 25, 60, 90] {
                    let (s, e) = (t(start), t(end));
                    let slots = generate_time_slots(s, e, step).to_vec();
                    if s > e {
                        assert!(slots.is_empty());
                        continue;
                    }
                    assert_eq!(slots.first(), Some(&s));
                    assert!(slots.windows(2).all(|w| w[0] < w[1]));
                    assert!(slots.iter().all(|slot| *slot <= e));
                }
            }
        }
    }

    #[test]
    fn test_parse_accepts_seconds() {
        assert_eq!(parse_time("09:30:00"), Some(t("09:30")));
        assert_eq!(parse_time(" 7:05 "), Some(t("07:05")));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time(""), None);
    }
}
