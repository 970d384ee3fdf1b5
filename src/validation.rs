use crate::error::{DataError, ValidationError};
use crate::models::empirical::Bar;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

pub const BAR_COLUMNS: [&str; 7] = ["Date", "Timestamp", "Open", "High", "Low", "Close", "Volume"];

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Bar {
    fn validate(&self) -> Result<(), ValidationError> {
        for (name, price) in [
            ("Open", self.open),
            ("High", self.high),
            ("Low", self.low),
            ("Close", self.close),
        ] {
            if !(price > 0.0 && price.is_finite()) {
                return Err(ValidationError::InvalidPrice(format!(
                    "{} price must be positive and finite, got {}",
                    name, price
                )));
            }
        }

        if self.high < self.low {
            return Err(ValidationError::InvalidPrice(format!(
                "High {} is below low {}",
                self.high, self.low
            )));
        }

        if !(self.volume >= 0.0 && self.volume.is_finite()) {
            return Err(ValidationError::InvalidVolume(format!(
                "Volume must be non-negative and finite, got {}",
                self.volume
            )));
        }

        Ok(())
    }
}

/// Positions of the OHLCV columns in a CSV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarColumns {
    date: usize,
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl BarColumns {
    pub fn from_headers(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataError::MissingField(name.to_string()))
        };

        Ok(Self {
            date: find("Date")?,
            timestamp: find("Timestamp")?,
            open: find("Open")?,
            high: find("High")?,
            low: find("Low")?,
            close: find("Close")?,
            volume: find("Volume")?,
        })
    }
}

/// Parse and validate one OHLCV record.
pub fn validate_bar(record: &csv::StringRecord, columns: &BarColumns) -> Result<Bar, DataError> {
    let field = |index: usize, name: &str| {
        record
            .get(index)
            .ok_or_else(|| DataError::MissingField(name.to_string()))
    };

    let date = parse_date(field(columns.date, "Date")?)?;
    let time = parse_time(field(columns.timestamp, "Timestamp")?)?;

    let bar = Bar {
        timestamp: NaiveDateTime::new(date, time),
        open: parse_price(field(columns.open, "Open")?)?,
        high: parse_price(field(columns.high, "High")?)?,
        low: parse_price(field(columns.low, "Low")?)?,
        close: parse_price(field(columns.close, "Close")?)?,
        volume: parse_price(field(columns.volume, "Volume")?)?,
    };

    bar.validate()
        .map_err(|e| DataError::InvalidValue(e.to_string()))?;
    Ok(bar)
}

/// `Date` is an integer of the form YYYYMMDD.
fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DataError::InvalidFormat(format!(
            "Invalid date format. Expected YYYYMMDD, got: {}",
            s
        )));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| {
        DataError::InvalidValue(format!("Invalid calendar date: {}", s))
    })
}

fn parse_time(s: &str) -> Result<NaiveTime, DataError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").map_err(|_| {
        DataError::InvalidFormat(format!(
            "Invalid timestamp format. Expected HH:MM:SS, got: {}",
            s
        ))
    })
}

fn parse_price(s: &str) -> Result<f64, DataError> {
    f64::from_str(s.trim())
        .map_err(|_| DataError::InvalidValue(format!("Invalid numeric value: {}", s)))
}

pub fn validate_bar_series(bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::InsufficientData(
            "Empty bar series".to_string(),
        ));
    }

    // Check for monotonically increasing timestamps
    for window in bars.windows(2) {
        if window[0].timestamp >= window[1].timestamp {
            return Err(DataError::InvalidFormat(format!(
                "Timestamps must be strictly increasing: {} then {}",
                window[0].timestamp, window[1].timestamp
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> csv::StringRecord {
        csv::StringRecord::from(BAR_COLUMNS.to_vec())
    }

    fn bar(date: (i32, u32, u32), hms: (u32, u32, u32), close: f64) -> Bar {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let time = NaiveTime::from_hms_opt(hms.0, hms.1, hms.2).unwrap();
        Bar {
            timestamp: NaiveDateTime::new(date, time),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_bar_validation() {
        assert!(bar((2023, 1, 3), (9, 30, 0), 100.0).validate().is_ok());
        assert!(bar((2023, 1, 3), (9, 30, 0), 0.0).validate().is_err());
        assert!(bar((2023, 1, 3), (9, 30, 0), f64::NAN).validate().is_err());

        let mut inverted = bar((2023, 1, 3), (9, 30, 0), 100.0);
        inverted.high = 99.0;
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvalidPrice(_))
        ));

        let mut negative_volume = bar((2023, 1, 3), (9, 30, 0), 100.0);
        negative_volume.volume = -5.0;
        assert!(matches!(
            negative_volume.validate(),
            Err(ValidationError::InvalidVolume(_))
        ));
    }

    #[test]
    fn test_csv_record_validation() {
        let columns = BarColumns::from_headers(&headers()).unwrap();
        let record = csv::StringRecord::from(vec![
            "20230103", "09:30:01", "100.0", "100.5", "99.5", "100.2", "1200",
        ]);
        let parsed = validate_bar(&record, &columns).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
        assert_eq!(parsed.close, 100.2);

        let bad_date = csv::StringRecord::from(vec![
            "2023-01-03", "09:30:01", "100.0", "100.5", "99.5", "100.2", "1200",
        ]);
        assert!(matches!(
            validate_bar(&bad_date, &columns),
            Err(DataError::InvalidFormat(_))
        ));

        let bad_calendar = csv::StringRecord::from(vec![
            "20230230", "09:30:01", "100.0", "100.5", "99.5", "100.2", "1200",
        ]);
        assert!(validate_bar(&bad_calendar, &columns).is_err());

        let bad_close = csv::StringRecord::from(vec![
            "20230103", "09:30:01", "100.0", "100.5", "99.5", "-1", "1200",
        ]);
        assert!(matches!(
            validate_bar(&bad_close, &columns),
            Err(DataError::InvalidValue(_))
        ));

        let short = csv::StringRecord::from(vec!["20230103", "09:30:01"]);
        assert!(matches!(
            validate_bar(&short, &columns),
            Err(DataError::MissingField(_))
        ));
    }

    #[test]
    fn test_missing_header() {
        let headers = csv::StringRecord::from(vec!["Date", "Timestamp", "Close"]);
        assert!(matches!(
            BarColumns::from_headers(&headers),
            Err(DataError::MissingField(f)) if f == "Open"
        ));
    }

    #[test]
    fn test_bar_series_validation() {
        let ordered = vec![
            bar((2023, 1, 3), (9, 30, 0), 100.0),
            bar((2023, 1, 3), (9, 30, 1), 100.1),
            bar((2023, 1, 4), (9, 30, 0), 100.2),
        ];
        assert!(validate_bar_series(&ordered).is_ok());

        let duplicated = vec![
            bar((2023, 1, 3), (9, 30, 0), 100.0),
            bar((2023, 1, 3), (9, 30, 0), 100.1),
        ];
        assert!(validate_bar_series(&duplicated).is_err());
        assert!(validate_bar_series(&[]).is_err());
    }
}
