//! Record timestamps.
//!
//! Simulator logs store each instant as seven integer fields. They are
//! validated as a calendar instant and rendered into a fixed-width key so
//! that lexical order matches chronological order.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Result, VizError};

pub const DATETIME_FIELDS: [&str; 7] = [
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "microsecond",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateTimeTuple {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl DateTimeTuple {
    pub fn from_fields(fields: [f64; 7]) -> Result<Self> {
        for value in fields {
            if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
                return Err(VizError::malformed(format!(
                    "date-time field {value} is not a non-negative integer"
                )));
            }
        }
        Ok(Self {
            year: fields[0] as i32,
            month: fields[1] as u32,
            day: fields[2] as u32,
            hour: fields[3] as u32,
            minute: fields[4] as u32,
            second: fields[5] as u32,
            microsecond: fields[6] as u32,
        })
    }

    pub fn to_naive(&self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_micro_opt(self.hour, self.minute, self.second, self.microsecond))
            .ok_or_else(|| VizError::malformed(format!("{self:?} is not a valid instant")))
    }

    pub fn key(&self) -> Result<String> {
        Ok(timestamp_key(&self.to_naive()?))
    }
}

pub fn timestamp_key(instant: &NaiveDateTime) -> String {
    format!(
        "{}:{:06}",
        instant.format("%Y-%m-%d %H:%M:%S"),
        instant.nanosecond() / 1_000
    )
}

pub fn parse_timestamp_key(key: &str) -> Option<NaiveDateTime> {
    let (seconds, micros) = key.rsplit_once(':')?;
    let base = NaiveDateTime::parse_from_str(seconds, "%Y-%m-%d %H:%M:%S").ok()?;
    let micros: u32 = micros.parse().ok()?;
    base.with_nanosecond(micros.checked_mul(1_000)?)
}

pub fn clock_label(key: &str) -> String {
    match parse_timestamp_key(key) {
        Some(instant) => format!("{} UTC", instant.format("%Y-%m-%d %H:%M:%S")),
        None => format!("{key} UTC"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_zero_padded() {
        let t = DateTimeTuple::from_fields([2019.0, 4.0, 3.0, 2.0, 1.0, 9.0, 5.0]).unwrap();
        assert_eq!(t.key().unwrap(), "2019-04-03 02:01:09:000005");
    }

    #[test]
    fn key_order_is_chronological() {
        let a = DateTimeTuple::from_fields([2019.0, 4.0, 23.0, 12.0, 41.0, 9.0, 0.0]).unwrap();
        let b = DateTimeTuple::from_fields([2019.0, 4.0, 23.0, 12.0, 41.0, 10.0, 0.0]).unwrap();
        assert!(a.key().unwrap() < b.key().unwrap());
    }

    #[test]
    fn invalid_instant_is_malformed() {
        let t = DateTimeTuple::from_fields([2019.0, 2.0, 30.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(t.key().is_err());
        assert!(DateTimeTuple::from_fields([2019.0, 1.5, 1.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn key_parses_back() {
        let key = "2019-04-23 12:41:19:000250";
        let instant = parse_timestamp_key(key).unwrap();
        assert_eq!(timestamp_key(&instant), key);
        assert_eq!(clock_label(key), "2019-04-23 12:41:19 UTC");
    }
}
