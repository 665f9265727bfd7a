// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::fmt;

/// Semantic type inferred from a number format code
///
/// This is what a numeric `<v>` value turns into once its style is known:
/// a plain number, a calendar date, a time of day, a timestamp or a
/// percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatType {
    /// Plain number
    Float,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time of day
    DateTime,
    /// Fraction displayed as a percentage
    Percentage,
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormatType::Float => "float",
            FormatType::Date => "date",
            FormatType::Time => "time",
            FormatType::DateTime => "datetime",
            FormatType::Percentage => "percentage",
        };
        f.write_str(s)
    }
}

/// Format codes which would be misclassified by the letter heuristic.
///
/// Compared against the lowercased code.
const EXCEPTIONAL_FORMATS: &[(&str, FormatType)] = &[
    ("h:mm am/pm", FormatType::Date),
    ("h:mm:ss am/pm", FormatType::Date),
];

/// The format code used when a style has no resolvable number format
pub const GENERAL_FORMAT: &str = "General";

/// Classifies a number format code
///
/// This is a heuristic over the letters of the code, not a format string
/// parser. Rules are applied in order, the first match wins:
///
/// 1. a small table of exceptional codes
/// 2. any `#` is a float
/// 3. `d` or `y` is a date, or a datetime if `h` or `s` also appear
/// 4. `h` or `s` is a time
/// 5. `%` is a percentage
/// 6. anything else is a float
///
/// # Examples
///
/// ```
/// use sheetgrid::{classify_format, FormatType};
///
/// assert_eq!(classify_format("yyyy-mm-dd"), FormatType::Date);
/// assert_eq!(classify_format("0.00%"), FormatType::Percentage);
/// assert_eq!(classify_format("#,##0.00"), FormatType::Float);
/// ```
pub fn classify_format(code: &str) -> FormatType {
    let code = code.to_lowercase();
    if let Some((_, typ)) = EXCEPTIONAL_FORMATS.iter().find(|(c, _)| *c == code) {
        return *typ;
    }
    let has = |c: char| code.contains(c);
    if has('#') {
        FormatType::Float
    } else if has('d') || has('y') {
        if has('h') || has('s') {
            FormatType::DateTime
        } else {
            FormatType::Date
        }
    } else if has('h') || has('s') {
        FormatType::Time
    } else if has('%') {
        FormatType::Percentage
    } else {
        FormatType::Float
    }
}

/// Get the format code of a builtin number format id
///
/// Ids not listed here (5-8, 23-36, 41-44, 50+) are locale dependent and
/// have no fixed code.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => GENERAL_FORMAT,
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}
