// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;

use super::cells_reader::RawCell;
use super::shared_strings::SharedStrings;
use super::style::StyleTable;
use super::XlsxError;
use crate::datatype::{
    has_time_component, serial_to_date, serial_to_datetime, serial_to_time_of_day, Cell, Data,
    RawKind, RawValue,
};
use crate::formats::{classify_format, FormatType};

/// Largest float which is still an exact integer
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.;

/// Everything needed to turn a [`RawCell`] into a [`Cell`]
pub(crate) struct DecodeContext<'a> {
    pub strings: &'a SharedStrings,
    pub styles: &'a StyleTable,
    pub base_date: NaiveDate,
    pub hyperlinks: Option<&'a BTreeMap<(u32, u32), String>>,
}

impl DecodeContext<'_> {
    pub(crate) fn decode(&self, raw: &RawCell) -> Result<Cell, XlsxError> {
        let (value, raw_value) = self.decode_value(raw)?;
        // only text and plain numbers become links, other types keep their value
        let value = match (self.hyperlinks.and_then(|h| h.get(&raw.pos)), value) {
            (Some(url), Data::String(text)) if !text.is_empty() => Data::Link {
                text,
                url: url.clone(),
            },
            (Some(url), number @ (Data::Int(_) | Data::Float(_))) => Data::Link {
                text: number.to_string(),
                url: url.clone(),
            },
            (_, value) => value,
        };
        Ok(Cell::new(
            raw.pos,
            value,
            raw.formula.clone(),
            raw_value,
            raw.style,
        ))
    }

    fn decode_value(&self, raw: &RawCell) -> Result<(Data, Option<RawValue>), XlsxError> {
        if let Some(text) = &raw.inline {
            return Ok((Data::String(text.clone()), Some(raw_string(text))));
        }
        let Some(v) = raw.value.as_deref() else {
            return Ok((Data::Empty, None));
        };
        let decoded = match raw.typ.as_deref() {
            Some("s") => {
                if v.trim().is_empty() {
                    return Ok((Data::Empty, None));
                }
                let index = v.trim().parse::<usize>()?;
                (
                    Data::String(self.strings.get(index)?.to_owned()),
                    Some(raw_string(v)),
                )
            }
            Some("b") => {
                let on = fast_float2::parse::<f64, _>(v.trim()).is_ok_and(|b| b.trunc() == 1.);
                let value = Data::Bool(if on { "TRUE" } else { "FALSE" }.to_owned());
                (value, Some(self.raw_numeric(raw, v)))
            }
            Some("str") | Some("e") | Some("inlineStr") => {
                (Data::String(v.to_owned()), Some(raw_string(v)))
            }
            Some("d") => {
                let value = parse_iso_datetime(v).unwrap_or_else(|| Data::String(v.to_owned()));
                (value, Some(self.raw_numeric(raw, v)))
            }
            Some("n") | None => self.decode_number(raw, v),
            Some(t) => {
                warn!("unknown cell type '{t}' at {:?}, read as a number", raw.pos);
                self.decode_number(raw, v)
            }
        };
        Ok(decoded)
    }

    /// Numeric family: the number format decides the semantic type
    fn decode_number(&self, raw: &RawCell, v: &str) -> (Data, Option<RawValue>) {
        let raw_value = Some(self.raw_numeric(raw, v));
        if v.trim().is_empty() {
            return (Data::Empty, raw_value);
        }
        let Ok(n) = fast_float2::parse::<f64, _>(v.trim()) else {
            return (Data::String(v.to_owned()), raw_value);
        };
        let format = self.styles.format_code(raw.style);
        let value = match classify_format(format) {
            FormatType::Date | FormatType::Time | FormatType::DateTime if n >= 1. => {
                if has_time_component(n) {
                    serial_to_datetime(self.base_date, n).map(Data::DateTime)
                } else {
                    serial_to_date(self.base_date, n).map(Data::Date)
                }
            }
            FormatType::Time | FormatType::DateTime => serial_to_time_of_day(n).map(Data::Time),
            FormatType::Date => serial_to_date(self.base_date, n).map(Data::Date),
            FormatType::Percentage => Some(Data::Percentage(n)),
            FormatType::Float => Some(number(n)),
        };
        (value.unwrap_or_else(|| Data::String(v.to_owned())), raw_value)
    }

    fn raw_numeric(&self, raw: &RawCell, v: &str) -> RawValue {
        RawValue {
            kind: RawKind::NumericOrFormula(self.styles.format_code(raw.style).to_owned()),
            text: v.to_owned(),
        }
    }
}

fn raw_string(v: &str) -> RawValue {
    RawValue {
        kind: RawKind::String,
        text: v.to_owned(),
    }
}

/// Integral values become integers
fn number(n: f64) -> Data {
    if n.fract() == 0. && n.abs() < MAX_EXACT_INT {
        Data::Int(n as i64)
    } else {
        Data::Float(n)
    }
}

/// `t="d"` cells hold ISO 8601 text
fn parse_iso_datetime(v: &str) -> Option<Data> {
    let v = v.trim().trim_end_matches('Z');
    if let Ok(dt) = NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(if dt.time() == NaiveTime::MIN {
            Data::Date(dt.date())
        } else {
            Data::DateTime(dt)
        });
    }
    if let Ok(date) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(Data::Date(date));
    }
    NaiveTime::parse_from_str(v, "%H:%M:%S%.f")
        .ok()
        .map(|t| Data::Time(t.signed_duration_since(NaiveTime::MIN).num_seconds() as u32))
}
