use chrono::{Datelike, Duration, Local, NaiveDate};

/// How far ahead the next-bookable-date search looks.
pub const SEARCH_HORIZON_DAYS: u32 = 120;

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Weekday index as schedule blocks encode it (0 = Sunday).
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_name(weekday: u8) -> &'static str {
    WEEKDAY_NAMES.get(weekday as usize).copied().unwrap_or("unknown day")
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn date_to_weekday(raw: &str) -> Option<u8> {
    parse_date(raw).map(weekday_index)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// First date from `today` (inclusive) whose weekday is in `weekdays`,
/// searching [`SEARCH_HORIZON_DAYS`] days.
pub fn next_date_for_weekdays<I>(weekdays: I, today: NaiveDate) -> Option<NaiveDate>
where
    I: IntoIterator<Item = u8>,
{
    next_date_for_weekdays_within(weekdays, today, SEARCH_HORIZON_DAYS)
}

pub fn next_date_for_weekdays_within<I>(weekdays: I, today: NaiveDate, horizon_days: u32) -> Option<NaiveDate>
where
    I: IntoIterator<Item = u8>,
{
    let mut wanted = [false; 7];
    for day in weekdays {
        if let Some(slot) = wanted.get_mut(day as usize) {
            *slot = true;
        }
    }
    if !wanted.contains(&true) {
        return None;
    }

    (0..horizon_days as i64)
        .map(|offset| today + Duration::days(offset))
        .find(|date| wanted[weekday_index(*date) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn test_date_to_weekday() {
        assert_eq!(date_to_weekday("2025-06-01"), Some(0)); // Sunday
        assert_eq!(date_to_weekday("2025-06-02"), Some(1));
        assert_eq!(date_to_weekday("2025-06-07"), Some(6));
        assert_eq!(date_to_weekday(""), None);
        assert_eq!(date_to_weekday("2025-02-30"), None);
        assert_eq!(date_to_weekday("next monday"), None);
    }

    #[test]
    fn test_today_is_inclusive() {
        let monday = d("2025-06-02");
        assert_eq!(next_date_for_weekdays([1], monday), Some(monday));
    }

    #[test]
    fn test_next_matching_day() {
        let monday = d("2025-06-02");
        assert_eq!(next_date_for_weekdays([3, 5], monday), Some(d("2025-06-04")));
        assert_eq!(next_date_for_weekdays([0], monday), Some(d("2025-06-08")));
    }

    #[test]
    fn test_empty_or_invalid_set() {
        let monday = d("2025-06-02");
        assert_eq!(next_date_for_weekdays(Vec::<u8>::new(), monday), None);
        assert_eq!(next_date_for_weekdays([9], monday), None);
    }

    #[test]
    fn test_horizon_bounds_search() {
        let monday = d("2025-06-02");
        assert_eq!(next_date_for_weekdays_within([0], monday, 6), None);
        assert_eq!(next_date_for_weekdays_within([0], monday, 7), Some(d("2025-06-08")));
    }

    #[test]
    fn test_result_is_earliest_within_horizon() {
        let start = d("2025-12-29");
        for mask in 1u8..128 {
            let set: Vec<u8> = (0..7).filter(|day| mask & (1 << day) != 0).collect();
            let found = next_date_for_weekdays(set.iter().copied(), start).unwrap();
            assert!(set.contains(&weekday_index(found)));
            assert!(found - start < Duration::days(SEARCH_HORIZON_DAYS as i64));
            let mut day = start;
            while day < found {
                assert!(!set.contains(&weekday_index(day)));
                day += Duration::days(1);
            }
        }
    }

    #[test]
    fn test_weekday_names() {
        assert_eq!(weekday_name(1), "Monday");
        assert_eq!(weekday_name(7), "unknown day");
    }
}
