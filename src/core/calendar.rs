use chrono::{Datelike, Duration, NaiveDate};

/// 榜單日期：從 `start` 當天或之後的第一個星期日起，每 7 天一筆，直到 `end`（含）
pub fn sundays_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let offset = (7 - start.weekday().num_days_from_sunday()) % 7;
    let mut current = start + Duration::days(offset as i64);

    let mut dates = Vec::new();
    while current <= end {
        dates.push(current);
        current += Duration::days(7);
    }
    dates
}
