// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

const SECONDS_PER_DAY: f64 = 86_400.;

/// Far outside of anything a spreadsheet can represent, keeps day arithmetic in range
const MAX_SERIAL_DAYS: f64 = 3_000_000.;

/// The type of a cell, as reported by the cell type queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    /// No value
    Empty,
    /// Number (integral or not)
    Float,
    /// Text
    String,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time of day
    DateTime,
    /// Fraction displayed as a percentage
    Percentage,
    /// The cell carries a formula
    Formula,
    /// The cell carries a hyperlink
    Link,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellType::Empty => "empty",
            CellType::Float => "float",
            CellType::String => "string",
            CellType::Boolean => "boolean",
            CellType::Date => "date",
            CellType::Time => "time",
            CellType::DateTime => "datetime",
            CellType::Percentage => "percentage",
            CellType::Formula => "formula",
            CellType::Link => "link",
        };
        f.write_str(s)
    }
}

/// A decoded cell value
///
/// The variant is the type tag: [`Data::data_type`] derives the
/// [`CellType`] from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    /// Empty cell
    #[default]
    Empty,
    /// Integral number
    Int(i64),
    /// Non integral number
    Float(f64),
    /// String
    String(String),
    /// Boolean, kept as the literal `"TRUE"` or `"FALSE"`
    Bool(String),
    /// Date
    Date(NaiveDate),
    /// Time of day, in seconds since midnight
    Time(u32),
    /// Date and time of day
    DateTime(NaiveDateTime),
    /// Percentage, as the raw fraction (`0.25` for 25%)
    Percentage(f64),
    /// Value of a hyperlinked cell
    Link {
        /// Displayed text
        text: String,
        /// Link target
        url: String,
    },
}

impl Data {
    /// The type tag of this value
    pub fn data_type(&self) -> CellType {
        match self {
            Data::Empty => CellType::Empty,
            Data::Int(_) | Data::Float(_) => CellType::Float,
            Data::String(_) => CellType::String,
            Data::Bool(_) => CellType::Boolean,
            Data::Date(_) => CellType::Date,
            Data::Time(_) => CellType::Time,
            Data::DateTime(_) => CellType::DateTime,
            Data::Percentage(_) => CellType::Percentage,
            Data::Link { .. } => CellType::Link,
        }
    }

    /// Assess if data is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Data::Empty)
    }

    /// Try getting a string slice out of textual values
    pub fn get_string(&self) -> Option<&str> {
        match self {
            Data::String(s) | Data::Bool(s) => Some(s),
            Data::Link { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Try converting data into a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Data::Int(v) => Some(*v as f64),
            Data::Float(v) | Data::Percentage(v) => Some(*v),
            _ => None,
        }
    }

    /// Try converting data into an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Int(v) => Some(*v),
            Data::Float(v) | Data::Percentage(v) if v.fract() == 0. => Some(*v as i64),
            _ => None,
        }
    }

    /// Interpret a boolean cell
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(s) => Some(s == "TRUE"),
            _ => None,
        }
    }

    /// Try converting data into a date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Data::Date(d) => Some(*d),
            Data::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Try converting data into a time of day
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Data::Time(secs) => NaiveTime::from_num_seconds_from_midnight_opt(*secs, 0),
            Data::DateTime(dt) => Some(dt.time()),
            _ => None,
        }
    }

    /// Try converting data into a datetime
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Data::DateTime(dt) => Some(*dt),
            Data::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Empty => Ok(()),
            Data::Int(v) => write!(f, "{v}"),
            Data::Float(v) | Data::Percentage(v) => write!(f, "{v}"),
            Data::String(s) | Data::Bool(s) => f.write_str(s),
            Data::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Data::Time(secs) => {
                let (h, m, s) = split_seconds(*secs);
                write!(f, "{h:02}:{m:02}:{s:02}")
            }
            Data::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Data::Link { text, .. } => f.write_str(text),
        }
    }
}

impl PartialEq<&str> for Data {
    fn eq(&self, other: &&str) -> bool {
        matches!(self.get_string(), Some(s) if s == *other)
    }
}

impl PartialEq<str> for Data {
    fn eq(&self, other: &str) -> bool {
        matches!(self.get_string(), Some(s) if s == other)
    }
}

impl PartialEq<f64> for Data {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, Data::Float(v) | Data::Percentage(v) if *v == *other)
            || matches!(self, Data::Int(v) if *v as f64 == *other)
    }
}

impl PartialEq<i64> for Data {
    fn eq(&self, other: &i64) -> bool {
        matches!(self, Data::Int(v) if *v == *other)
    }
}

/// How the undecoded value was stored in the sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    /// Shared, inline or formula string
    String,
    /// Numeric family value (also booleans and cached formula results),
    /// with the number format code of the cell style
    NumericOrFormula(String),
}

/// Undecoded value of a cell, as found in the sheet xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// How the value was stored
    pub kind: RawKind,
    /// The raw text (a shared string index stays an index)
    pub text: String,
}

/// A decoded cell
///
/// Positions are 1-based `(row, column)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pos: (u32, u32),
    value: Data,
    formula: Option<String>,
    raw: Option<RawValue>,
    style: usize,
}

impl Cell {
    pub(crate) fn new(
        pos: (u32, u32),
        value: Data,
        formula: Option<String>,
        raw: Option<RawValue>,
        style: usize,
    ) -> Cell {
        Cell {
            pos,
            value,
            formula,
            raw,
            style,
        }
    }

    /// Gets `Cell` position, `(row, column)`, both starting at 1
    pub fn get_position(&self) -> (u32, u32) {
        self.pos
    }

    /// Row number, starting at 1
    pub fn row(&self) -> u32 {
        self.pos.0
    }

    /// Column number, starting at 1
    pub fn column(&self) -> u32 {
        self.pos.1
    }

    /// Gets the decoded value (the cached result for formula cells)
    pub fn get_value(&self) -> &Data {
        &self.value
    }

    /// Reported type: `Formula` whenever the cell carries a formula
    pub fn cell_type(&self) -> CellType {
        if self.formula.is_some() {
            CellType::Formula
        } else {
            self.value.data_type()
        }
    }

    /// Type of the decoded (cached) value, ignoring any formula
    pub fn data_type(&self) -> CellType {
        self.value.data_type()
    }

    /// Formula text, verbatim (never evaluated)
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    /// Undecoded value
    pub fn raw(&self) -> Option<&RawValue> {
        self.raw.as_ref()
    }

    /// Index into the workbook style table
    pub fn style_index(&self) -> usize {
        self.style
    }

    pub(crate) fn into_value(self) -> Data {
        self.value
    }
}

/// Decomposes seconds since midnight into `(hours, minutes, seconds)`
pub fn split_seconds(secs: u32) -> (u32, u32, u32) {
    (secs / 3600, secs / 60 % 60, secs % 60)
}

/// Default epoch of serial dates (the 1900 date system)
pub(crate) fn epoch_1900() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Epoch of serial dates in the 1904 date system
pub(crate) fn epoch_1904() -> NaiveDate {
    NaiveDate::from_ymd_opt(1904, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// `base + floor(serial)` days
pub(crate) fn serial_to_date(base: NaiveDate, serial: f64) -> Option<NaiveDate> {
    let days = serial.floor();
    if !days.is_finite() || days.abs() > MAX_SERIAL_DAYS {
        return None;
    }
    base.checked_add_signed(TimeDelta::try_days(days as i64)?)
}

/// Seconds since midnight of a fractional day, rounded half away from zero
pub(crate) fn serial_to_seconds(serial: f64) -> Option<u32> {
    let secs = (serial * SECONDS_PER_DAY).round();
    if secs.is_finite() && secs >= 0. && secs <= u32::MAX as f64 {
        Some(secs as u32)
    } else {
        None
    }
}

/// Time of day of a serial below one day, in `0..86_400` seconds
///
/// Fractions rounding up to a full day wrap to midnight.
pub(crate) fn serial_to_time_of_day(serial: f64) -> Option<u32> {
    serial_to_seconds(serial).map(|secs| secs % SECONDS_PER_DAY as u32)
}

/// `base + floor(serial)` days, plus the fractional day rounded to the second
///
/// Everything is done on whole days and whole seconds so no float error
/// ends up in the timestamp.
pub(crate) fn serial_to_datetime(base: NaiveDate, serial: f64) -> Option<NaiveDateTime> {
    let date = serial_to_date(base, serial)?;
    let secs = serial_to_seconds(serial - serial.floor())?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_seconds(i64::from(secs))?)
}

/// Whether the fractional day is non zero at microsecond precision
pub(crate) fn has_time_component(serial: f64) -> bool {
    ((serial - serial.floor()) * 1e6).round() != 0.
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_epochs() {
        assert_eq!(serial_to_date(epoch_1900(), 1.), Some(ymd(1899, 12, 31)));
        assert_eq!(serial_to_date(epoch_1904(), 1.), Some(ymd(1904, 1, 2)));
        assert_eq!(serial_to_date(epoch_1900(), 25569.), Some(ymd(1970, 1, 1)));
        assert_eq!(serial_to_date(epoch_1900(), 44484.9), Some(ymd(2021, 10, 15)));
    }

    #[test]
    fn test_time_rounding() {
        assert_eq!(serial_to_seconds(0.5), Some(43_200));
        // 4:29:49.2 rounds down
        assert_eq!(serial_to_seconds(0.187375), Some(16_189));
        // exactly half a second rounds away from zero
        assert_eq!(serial_to_seconds(0.5 / 86_400.), Some(1));
        assert_eq!(serial_to_seconds(-0.5), None);
        assert_eq!(split_seconds(16_189), (4, 29, 49));
    }

    #[test]
    fn test_time_of_day_wraps_at_midnight() {
        assert_eq!(serial_to_time_of_day(0.999_999), Some(0));
        assert_eq!(serial_to_time_of_day(0.999_99), Some(86_399));
        assert_eq!(serial_to_time_of_day(0.25), Some(21_600));
        let time = Data::Time(serial_to_time_of_day(0.999_999).unwrap());
        assert_eq!(time.as_time(), NaiveTime::from_hms_opt(0, 0, 0));
    }

    #[test]
    fn test_datetime() {
        let dt = serial_to_datetime(epoch_1900(), 44484.7916666667).unwrap();
        assert_eq!(
            dt,
            ymd(2021, 10, 15).and_hms_opt(19, 0, 0).unwrap(),
            "float noise must not leak into the timestamp"
        );
        // rounding up to midnight carries into the next day
        let dt = serial_to_datetime(epoch_1900(), 2.999_999_999).unwrap();
        assert_eq!(dt, ymd(1900, 1, 2).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(serial_to_datetime(epoch_1900(), 1e20), None);
    }

    #[test]
    fn test_time_component() {
        assert!(!has_time_component(44000.));
        assert!(!has_time_component(44000.000_000_1));
        assert!(has_time_component(44000.25));
    }

    #[test]
    fn test_partial_eq() {
        assert_eq!(Data::String("value".to_string()), "value");
        assert_eq!(Data::Float(100.0), 100.0f64);
        assert_eq!(Data::Int(100), 100i64);
        assert_eq!(Data::Int(100), 100.0f64);
        assert_eq!(Data::Bool("TRUE".to_string()), "TRUE");
    }

    #[test]
    fn test_display() {
        assert_eq!(Data::Time(3_723).to_string(), "01:02:03");
        assert_eq!(Data::Date(ymd(2024, 2, 29)).to_string(), "2024-02-29");
        assert_eq!(Data::Int(3).to_string(), "3");
        assert_eq!(Data::Empty.to_string(), "");
        assert_eq!(CellType::DateTime.to_string(), "datetime");
    }

    #[test]
    fn test_formula_overrides_reported_type() {
        let cell = Cell::new((1, 1), Data::Int(3), Some("1+2".into()), None, 0);
        assert_eq!(cell.cell_type(), CellType::Formula);
        assert_eq!(cell.data_type(), CellType::Float);
        let cell = Cell::new((1, 1), Data::Int(3), None, None, 0);
        assert_eq!(cell.cell_type(), CellType::Float);
    }
}
