// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Rust OOXML spreadsheet reader
//!
//! # Status
//!
//! **sheetgrid** reads `xlsx`/`xlsm` workbooks and exposes every sheet as an
//! addressable grid of typed cells: numbers, strings, booleans, dates, times,
//! datetimes, percentages, formulas and hyperlinks.
//!
//! Two traversal strategies are available, selected when the workbook is
//! opened:
//! - loaded (the default): every sheet is materialized and cells can be
//!   queried at random, decoding happens once per sheet on first access
//! - streaming (`minimal_load`): rows are decoded one at a time in a single
//!   forward pass, random access queries are refused
//!
//! # Examples
//! ```no_run
//! use sheetgrid::{open_workbook, RowOptions, XlsxOptions};
//!
//! let mut workbook = open_workbook("tests/sample.xlsx", XlsxOptions::default())
//!     .expect("Cannot open file");
//!
//! // query single cells, 1-based (row, column), on the default sheet
//! if let Some(cell) = workbook.cell(1, 1, ()).expect("cannot read cell") {
//!     println!("A1 is a {} cell: {}", cell.cell_type(), cell.get_value());
//! }
//!
//! // iterate over rows, empty rows included
//! for row in workbook.each_row(RowOptions::new().sheet("Sheet1")).unwrap() {
//!     let row = row.expect("invalid row");
//!     println!("{} cells", row.iter().flatten().count());
//! }
//!
//! // named cells
//! if let Some(label) = workbook.label("total") {
//!     println!("total is at {}!{}:{}", label.sheet, label.row, label.column);
//! }
//! ```
#![deny(missing_docs)]

#[macro_use]
mod utils;

mod datatype;
mod formats;
mod xlsx;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;
use zip::ZipArchive;

pub use crate::datatype::{split_seconds, Cell, CellType, Data, RawKind, RawValue};
pub use crate::formats::{builtin_format_code, classify_format, FormatType, GENERAL_FORMAT};
pub use crate::xlsx::{
    column_name, parse_cell_ref, Font, Label, RowValues, Rows, Xlsx, XlsxError,
};

/// Traversal strategy of a workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Sheets are materialized at open, cells can be queried at random
    #[default]
    Loaded,
    /// Sheets are read row by row in a single forward pass
    Streaming,
}

/// Options recognized when opening a workbook
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct XlsxOptions {
    /// The file is an archive wrapping the spreadsheet
    pub packed: bool,
    /// Refuse workbooks whose declared sheet dimensions exceed this many cells
    pub cell_max: Option<u64>,
    /// Use the streaming strategy
    pub minimal_load: bool,
}

impl XlsxOptions {
    /// Default options: unpacked, uncapped, loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `packed` option
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Set the `cell_max` option
    pub fn cell_max(mut self, max: u64) -> Self {
        self.cell_max = Some(max);
        self
    }

    /// Set the `minimal_load` option
    pub fn minimal_load(mut self, minimal_load: bool) -> Self {
        self.minimal_load = minimal_load;
        self
    }

    /// Traversal strategy selected by these options
    pub fn load_mode(&self) -> LoadMode {
        if self.minimal_load {
            LoadMode::Streaming
        } else {
            LoadMode::Loaded
        }
    }
}

/// Reference to a sheet
///
/// Indexes start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetRef<'a> {
    /// The workbook default sheet
    #[default]
    Default,
    /// Sheet name
    Name(&'a str),
    /// Sheet position, starting at 1
    Index(usize),
}

impl<'a> From<&'a str> for SheetRef<'a> {
    fn from(name: &'a str) -> Self {
        SheetRef::Name(name)
    }
}

impl<'a> From<&'a String> for SheetRef<'a> {
    fn from(name: &'a String) -> Self {
        SheetRef::Name(name)
    }
}

impl From<usize> for SheetRef<'_> {
    fn from(index: usize) -> Self {
        SheetRef::Index(index)
    }
}

impl From<()> for SheetRef<'_> {
    fn from(_: ()) -> Self {
        SheetRef::Default
    }
}

impl<'a> From<Option<&'a str>> for SheetRef<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(SheetRef::Default, SheetRef::Name)
    }
}

impl fmt::Display for SheetRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Default => f.write_str("<default>"),
            SheetRef::Name(n) => f.write_str(n),
            SheetRef::Index(i) => write!(f, "#{i}"),
        }
    }
}

/// Options of a row iteration
#[derive(Debug, Clone, Default)]
pub struct RowOptions<'a> {
    /// Sheet to iterate
    pub sheet: SheetRef<'a>,
    /// Stop after this many rows (reconstructed empty rows included)
    pub max_rows: Option<usize>,
    /// Drop absent or empty cells at the end of each row
    pub strip_trailing_empty: bool,
}

impl<'a> RowOptions<'a> {
    /// Iterate the default sheet, without limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the sheet
    pub fn sheet(mut self, sheet: impl Into<SheetRef<'a>>) -> Self {
        self.sheet = sheet.into();
        self
    }

    /// Limit the number of rows
    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Strip trailing empty cells
    pub fn strip_trailing_empty(mut self, strip: bool) -> Self {
        self.strip_trailing_empty = strip;
        self
    }
}

/// A struct to hold a cell range, both corners 1-based and inclusive
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct Dimensions {
    /// start: (row, col)
    pub start: (u32, u32),
    /// end: (row, col)
    pub end: (u32, u32),
}

impl Dimensions {
    /// create dimensions info with start position and end position
    pub fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self { start, end }
    }

    /// check if a position is in it
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start.0 && row <= self.end.0 && col >= self.start.1 && col <= self.end.1
    }

    /// len
    pub fn len(&self) -> u64 {
        let rows = u64::from(self.end.0.saturating_sub(self.start.0)) + 1;
        let cols = u64::from(self.end.1.saturating_sub(self.start.1)) + 1;
        rows * cols
    }

    /// A range always holds at least one cell
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Readable and seekable bytes of a workbook opened from the filesystem
///
/// Packed workbooks are extracted in memory.
#[derive(Debug)]
pub enum DocumentSource {
    /// Spreadsheet file read in place
    File(BufReader<File>),
    /// Spreadsheet extracted from an outer archive
    Memory(Cursor<Vec<u8>>),
}

impl Read for DocumentSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DocumentSource::File(f) => f.read(buf),
            DocumentSource::Memory(m) => m.read(buf),
        }
    }
}

impl Seek for DocumentSource {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            DocumentSource::File(f) => f.seek(pos),
            DocumentSource::Memory(m) => m.seek(pos),
        }
    }
}

/// Opens a workbook from a file path
///
/// With the `packed` option the file is an archive holding the spreadsheet,
/// the first `.xlsx` or `.xlsm` entry is extracted in memory and opened.
pub fn open_workbook<P>(path: P, options: XlsxOptions) -> Result<Xlsx<DocumentSource>, XlsxError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.is_file() {
        return Err(XlsxError::FileNotFound(path.display().to_string()));
    }
    let file = BufReader::new(File::open(path)?);
    let source = if options.packed {
        DocumentSource::Memory(Cursor::new(unpack(file)?))
    } else {
        DocumentSource::File(file)
    };
    Xlsx::new(source, options)
}

/// Extracts the spreadsheet held by an outer archive
fn unpack<R: Read + Seek>(reader: R) -> Result<Vec<u8>, XlsxError> {
    let mut zip = ZipArchive::new(reader)?;
    let name = zip
        .file_names()
        .find(|n| {
            let n = n.to_ascii_lowercase();
            n.ends_with(".xlsx") || n.ends_with(".xlsm")
        })
        .map(str::to_owned)
        .ok_or_else(|| XlsxError::FileNotFound("*.xlsx".to_string()))?;
    debug!("unpacking '{name}'");
    let mut file = zip.by_name(&name)?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}
