use chrono::{Datelike, Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Friday departure / Sunday return pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendWindow {
    pub depart: NaiveDate,
    #[serde(rename = "return")]
    pub return_date: NaiveDate,
}

impl WeekendWindow {
    pub fn depart_str(&self) -> String {
        self.depart.format("%Y-%m-%d").to_string()
    }

    pub fn return_str(&self) -> String {
        self.return_date.format("%Y-%m-%d").to_string()
    }
}

/// Weekends for the next `weeks` weeks, counted from today's local date.
pub fn weekend_windows(weeks: u32) -> Vec<WeekendWindow> {
    weekend_windows_from(Local::now().date_naive(), weeks)
}

// Week i's Friday is found from the Sunday that starts today's week, so a
// Friday or Saturday "today" still skips to the following week's Friday.
pub fn weekend_windows_from(today: NaiveDate, weeks: u32) -> Vec<WeekendWindow> {
    let since_sunday = today.weekday().num_days_from_sunday() as u64;

    (1..=weeks as u64)
        .filter_map(|i| {
            let depart = today.checked_add_days(Days::new(i * 7 + 5 - since_sunday))?;
            let return_date = depart.checked_add_days(Days::new(2))?;
            Some(WeekendWindow {
                depart,
                return_date,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_every_window_is_friday_to_sunday() {
        // one start date per weekday
        for offset in 0..7 {
            let today = date(2025, 6, 1) + Days::new(offset);
            let windows = weekend_windows_from(today, 12);

            assert_eq!(windows.len(), 12);
            for w in &windows {
                assert_eq!(w.depart.weekday(), Weekday::Fri);
                assert_eq!(w.return_date.weekday(), Weekday::Sun);
                assert_eq!(w.return_date - w.depart, chrono::Duration::days(2));
                assert!(w.depart > today);
            }
            for pair in windows.windows(2) {
                assert_eq!(pair[1].depart - pair[0].depart, chrono::Duration::days(7));
            }
        }
    }

    #[test]
    fn test_first_friday_from_wednesday_is_next_week() {
        // 2025-06-04 is a Wednesday
        let windows = weekend_windows_from(date(2025, 6, 4), 2);
        assert_eq!(windows[0].depart_str(), "2025-06-13");
        assert_eq!(windows[0].return_str(), "2025-06-15");
        assert_eq!(windows[1].depart_str(), "2025-06-20");
    }

    #[test]
    fn test_first_friday_from_saturday() {
        // 2025-06-07 is a Saturday: the week starting Sunday 06-08 gives 06-13
        let windows = weekend_windows_from(date(2025, 6, 7), 1);
        assert_eq!(windows[0].depart_str(), "2025-06-13");
    }

    #[test]
    fn test_zero_weeks_and_idempotence() {
        assert!(weekend_windows_from(date(2025, 6, 4), 0).is_empty());
        assert_eq!(weekend_windows(6), weekend_windows(6));
    }

    #[test]
    fn test_serializes_with_return_key() {
        let w = weekend_windows_from(date(2025, 6, 4), 1)[0];
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"depart":"2025-06-13","return":"2025-06-15"}"#);
    }
}
