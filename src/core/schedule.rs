use crate::domain::model::AcquisitionWindow;
use crate::utils::error::{EtlError, Result};
use chrono::{Duration, NaiveDate};
use std::path::Path;

pub const DEFAULT_FIRST_YEAR: i32 = 2010;
pub const DEFAULT_LAST_YEAR: i32 = 2023;

pub fn default_first_acquisition_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 6).unwrap_or_default()
}

/// 一天只抓一個半年區間，避免超過 API 的每日配額
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionSchedule {
    windows: Vec<AcquisitionWindow>,
}

impl AcquisitionSchedule {
    /// 每年切成 1/1–6/30 與 7/1–12/31 兩段，依序每天排一段
    pub fn generate(first_year: i32, last_year: i32, first_acquisition: NaiveDate) -> Result<Self> {
        if first_year > last_year {
            return Err(EtlError::InvalidConfigValueError {
                field: "first_year".to_string(),
                value: first_year.to_string(),
                reason: format!("must not be after last_year ({})", last_year),
            });
        }

        let mut windows = Vec::new();
        for year in first_year..=last_year {
            for (start, end) in [((1, 1), (6, 30)), ((7, 1), (12, 31))] {
                let start_date = ymd(year, start.0, start.1)?;
                let end_date = ymd(year, end.0, end.1)?;
                let acquisition_date = first_acquisition + Duration::days(windows.len() as i64);
                windows.push(AcquisitionWindow {
                    acquisition_date,
                    start_date,
                    end_date,
                });
            }
        }

        Ok(Self { windows })
    }

    pub fn windows(&self) -> &[AcquisitionWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_for(&self, date: NaiveDate) -> Option<AcquisitionWindow> {
        self.windows
            .iter()
            .find(|w| w.acquisition_date == date)
            .copied()
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut windows = Vec::new();
        for row in rdr.deserialize() {
            let window: AcquisitionWindow = row?;
            if window.start_date > window.end_date {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "Schedule row for {} has start_date after end_date",
                        window.acquisition_date
                    ),
                });
            }
            windows.push(window);
        }
        Ok(Self { windows })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| EtlError::ScheduleFileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_csv_reader(file)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for window in &self.windows {
            wtr.serialize(window)?;
        }
        let bytes = wtr.into_inner().map_err(|e| EtlError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
            message: format!("Schedule CSV is not valid UTF-8: {}", e),
        })
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_csv_string()?)?;
        Ok(())
    }
}

/// 明確指定的區間優先（不讀排程表），否則找 `today` 那一列
pub fn resolve_window<P: AsRef<Path>>(
    today: NaiveDate,
    explicit: Option<(NaiveDate, NaiveDate)>,
    schedule_path: P,
) -> Result<Option<AcquisitionWindow>> {
    if let Some((start_date, end_date)) = explicit {
        if start_date > end_date {
            return Err(EtlError::InvalidConfigValueError {
                field: "start".to_string(),
                value: start_date.to_string(),
                reason: format!("must not be after --end ({})", end_date),
            });
        }
        return Ok(Some(AcquisitionWindow {
            acquisition_date: today,
            start_date,
            end_date,
        }));
    }

    let schedule_path = schedule_path.as_ref();
    tracing::info!("📁 Loading acquisition schedule from: {}", schedule_path.display());
    let schedule = AcquisitionSchedule::from_file(schedule_path)?;
    Ok(schedule.window_for(today))
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| EtlError::ProcessingError {
        message: format!("Invalid calendar date {}-{}-{}", year, month, day),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_schedule_layout() {
        let schedule = AcquisitionSchedule::generate(
            DEFAULT_FIRST_YEAR,
            DEFAULT_LAST_YEAR,
            default_first_acquisition_date(),
        )
        .unwrap();

        assert_eq!(schedule.len(), 28);

        let first = schedule.windows()[0];
        assert_eq!(first.acquisition_date, date(2024, 7, 6));
        assert_eq!(first.start_date, date(2010, 1, 1));
        assert_eq!(first.end_date, date(2010, 6, 30));

        let second = schedule.windows()[1];
        assert_eq!(second.acquisition_date, date(2024, 7, 7));
        assert_eq!(second.start_date, date(2010, 7, 1));
        assert_eq!(second.end_date, date(2010, 12, 31));

        let last = schedule.windows()[27];
        assert_eq!(last.acquisition_date, date(2024, 8, 2));
        assert_eq!(last.start_date, date(2023, 7, 1));
        assert_eq!(last.end_date, date(2023, 12, 31));
    }

    #[test]
    fn test_window_for_date() {
        let schedule = AcquisitionSchedule::generate(2014, 2015, date(2024, 7, 14)).unwrap();

        let window = schedule.window_for(date(2024, 7, 16)).unwrap();
        assert_eq!(window.start_date, date(2015, 1, 1));
        assert_eq!(window.end_date, date(2015, 6, 30));

        assert!(schedule.window_for(date(2024, 7, 13)).is_none());
        assert!(schedule.window_for(date(2024, 7, 18)).is_none());
    }

    #[test]
    fn test_csv_format() {
        let schedule = AcquisitionSchedule::generate(2010, 2010, date(2024, 7, 6)).unwrap();
        let csv = schedule.to_csv_string().unwrap();
        assert_eq!(
            csv,
            "acquisition_date,start_date,end_date\n\
             2024-07-06,2010-01-01,2010-06-30\n\
             2024-07-07,2010-07-01,2010-12-31\n"
        );

        let parsed = AcquisitionSchedule::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(parsed, schedule);
    }

    #[test]
    fn test_resolve_window_explicit_range_skips_schedule() {
        let window = resolve_window(
            date(2024, 7, 6),
            Some((date(2014, 1, 1), date(2014, 6, 30))),
            "does/not/exist.csv",
        )
        .unwrap()
        .unwrap();

        assert_eq!(window.acquisition_date, date(2024, 7, 6));
        assert_eq!(window.start_date, date(2014, 1, 1));
        assert_eq!(window.end_date, date(2014, 6, 30));
    }

    #[test]
    fn test_resolve_window_rejects_inverted_range() {
        let err = resolve_window(
            date(2024, 7, 6),
            Some((date(2014, 6, 30), date(2014, 1, 1))),
            "does/not/exist.csv",
        )
        .unwrap_err();

        assert!(matches!(err, EtlError::InvalidConfigValueError { ref field, .. } if field == "start"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_resolve_window_from_schedule() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("acquisition_dates.csv");
        AcquisitionSchedule::generate(2010, 2010, date(2024, 7, 6))
            .unwrap()
            .write_to_file(&path)
            .unwrap();

        let window = resolve_window(date(2024, 7, 7), None, &path).unwrap().unwrap();
        assert_eq!(window.start_date, date(2010, 7, 1));

        assert_eq!(resolve_window(date(2024, 7, 8), None, &path).unwrap(), None);
    }

    #[test]
    fn test_resolve_window_missing_schedule() {
        let err = resolve_window(date(2024, 7, 6), None, "does/not/exist.csv").unwrap_err();
        match err {
            EtlError::ScheduleFileError { ref path, .. } => assert_eq!(path, "does/not/exist.csv"),
            ref other => panic!("expected ScheduleFileError, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_inverted_years() {
        assert!(AcquisitionSchedule::generate(2020, 2010, date(2024, 7, 6)).is_err());
    }

    #[test]
    fn test_rejects_inverted_window_in_csv() {
        let csv = "acquisition_date,start_date,end_date\n2024-07-06,2010-06-30,2010-01-01\n";
        assert!(AcquisitionSchedule::from_csv_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_malformed_date_in_csv() {
        let csv = "acquisition_date,start_date,end_date\n07/06/2024,2010-01-01,2010-06-30\n";
        assert!(matches!(
            AcquisitionSchedule::from_csv_reader(csv.as_bytes()),
            Err(EtlError::CsvError(_))
        ));
    }
}
