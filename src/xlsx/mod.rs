// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

mod ancillary;
mod cells_reader;
mod decoder;
mod rows;
mod shared_strings;
mod store;
mod style;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Seek};

use chrono::NaiveDate;
use log::{debug, warn};
use quick_xml::{
    events::{
        attributes::{Attribute, Attributes},
        Event,
    },
    name::QName,
    Reader as XmlReader,
};
use zip::read::{ZipArchive, ZipFile};
use zip::result::ZipError;

use crate::datatype::{epoch_1900, epoch_1904, Cell, CellType, Data, RawValue};
use crate::utils::unescape_entity_to_buffer;
use crate::{Dimensions, LoadMode, RowOptions, SheetRef, XlsxOptions};

use ancillary::{
    folder_of, parse_label, read_comments, read_hyperlinks, read_relationships, rels_path,
    resolve_target, AncillaryIndex, Relationship,
};
use cells_reader::{read_dimension, SheetCursor, SheetTree};
use decoder::DecodeContext;
use rows::RowSource;
use shared_strings::SharedStrings;
use store::{CellStore, ScanState};
use style::StyleTable;

pub use ancillary::Label;
pub use rows::{RowValues, Rows};
pub use style::Font;

pub(crate) type XlReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

/// Maximum number of rows allowed in an xlsx file
pub(crate) const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns allowed in an xlsx file
pub(crate) const MAX_COLUMNS: u32 = 16_384;

/// An enum for Xlsx specific errors
#[derive(Debug)]
pub enum XlsxError {
    /// Io error
    Io(std::io::Error),
    /// Zip error
    Zip(zip::result::ZipError),
    /// Xml error
    Xml(quick_xml::Error),
    /// Xml attribute error
    XmlAttr(quick_xml::events::attributes::AttrError),
    /// XML Encoding error
    Encoding(quick_xml::encoding::EncodingError),
    /// `ParseInt` error
    ParseInt(std::num::ParseIntError),
    /// Unexpected end of xml
    XmlEof(&'static str),
    /// Unexpected node
    UnexpectedNode(&'static str),
    /// Document or package part not found
    FileNotFound(String),
    /// The declared dimensions exceed the `cell_max` option
    CellMaxExceeded {
        /// Sheet name
        sheet: String,
        /// Declared number of cells
        count: u64,
        /// Configured maximum
        max: u64,
    },
    /// Worksheet not found
    WorksheetNotFound(String),
    /// Worksheet position out of range (positions start at 1)
    WorksheetIndex(usize),
    /// Operation not available in the current load mode
    LoadMode(&'static str),
    /// Shared string index out of range
    SharedStringIndex(usize),
    /// Expecting alphanumeric character
    Alphanumeric(u8),
    /// Numeric column
    NumericColumn(u8),
    /// Wrong dimension count
    DimensionCount(usize),
    /// Row number outside of the sheet grid
    RowOutOfBounds(u32),
    /// Cell (row, column) outside of the sheet grid
    CellOutOfBounds(u32, u32),
    /// There is no column component in the range string
    RangeWithoutColumnComponent,
    /// There is no row component in the range string
    RangeWithoutRowComponent,
    /// Unexpected error
    Unexpected(&'static str),
}

from_err!(std::io::Error, XlsxError, Io);
from_err!(zip::result::ZipError, XlsxError, Zip);
from_err!(quick_xml::Error, XlsxError, Xml);
from_err!(std::num::ParseIntError, XlsxError, ParseInt);
from_err!(quick_xml::encoding::EncodingError, XlsxError, Encoding);
from_err!(quick_xml::events::attributes::AttrError, XlsxError, XmlAttr);

impl XlsxError {
    /// Whether the document itself is broken, as opposed to a wrong query
    /// or an unavailable operation
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            XlsxError::Io(_)
                | XlsxError::FileNotFound(_)
                | XlsxError::CellMaxExceeded { .. }
                | XlsxError::WorksheetNotFound(_)
                | XlsxError::WorksheetIndex(_)
                | XlsxError::LoadMode(_)
        )
    }
}

impl std::fmt::Display for XlsxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XlsxError::Io(e) => write!(f, "I/O error: {e}"),
            XlsxError::Zip(e) => write!(f, "Zip error: {e}"),
            XlsxError::Xml(e) => write!(f, "Xml error: {e}"),
            XlsxError::XmlAttr(e) => write!(f, "Xml attribute error: {e}"),
            XlsxError::Encoding(e) => write!(f, "XML encoding error: {e}"),
            XlsxError::ParseInt(e) => write!(f, "Parse integer error: {e}"),
            XlsxError::XmlEof(e) => write!(f, "Unexpected end of xml, expecting '</{e}>'"),
            XlsxError::UnexpectedNode(e) => write!(f, "Expecting '{e}' node"),
            XlsxError::FileNotFound(e) => write!(f, "File not found '{e}'"),
            XlsxError::CellMaxExceeded { sheet, count, max } => write!(
                f,
                "Worksheet '{sheet}' declares {count} cells, more than the maximum of {max}"
            ),
            XlsxError::WorksheetNotFound(n) => write!(f, "Worksheet '{n}' not found"),
            XlsxError::WorksheetIndex(i) => write!(f, "No worksheet at position {i}"),
            XlsxError::LoadMode(e) => write!(f, "{e}"),
            XlsxError::SharedStringIndex(i) => write!(f, "Shared string {i} out of range"),
            XlsxError::Alphanumeric(e) => {
                write!(f, "Expecting alphanumeric character, got {e:X}")
            }
            XlsxError::NumericColumn(e) => write!(
                f,
                "Numeric character is not allowed for column name, got {e}",
            ),
            XlsxError::DimensionCount(e) => {
                write!(f, "Range dimension must be lower than 2. Got {e}")
            }
            XlsxError::RowOutOfBounds(row) => {
                write!(f, "Row {row} is outside of the sheet (1..={MAX_ROWS})")
            }
            XlsxError::CellOutOfBounds(row, col) => write!(
                f,
                "Cell ({row}, {col}) is outside of the sheet ({MAX_ROWS} rows, {MAX_COLUMNS} columns)"
            ),
            XlsxError::RangeWithoutColumnComponent => {
                write!(f, "Range is missing the expected column component.")
            }
            XlsxError::RangeWithoutRowComponent => {
                write!(f, "Range is missing the expected row component.")
            }
            XlsxError::Unexpected(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for XlsxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XlsxError::Io(e) => Some(e),
            XlsxError::Zip(e) => Some(e),
            XlsxError::Xml(e) => Some(e),
            XlsxError::XmlAttr(e) => Some(e),
            XlsxError::Encoding(e) => Some(e),
            XlsxError::ParseInt(e) => Some(e),
            _ => None,
        }
    }
}

/// A worksheet declared in `xl/workbook.xml`
#[derive(Debug)]
struct SheetEntry {
    name: String,
    /// Part path inside the package
    path: String,
}

/// What is known about a sheet after opening
#[derive(Debug, Default)]
struct SheetState {
    /// Materialized rows, loaded mode only, `None` if the part is missing
    tree: Option<SheetTree>,
    cells: ScanState,
    /// Number of decoding passes over this sheet
    scans: usize,
    ancillary: AncillaryIndex,
}

/// A struct representing xml zipped excel file
/// Xlsx, Xlsm
pub struct Xlsx<RS> {
    zip: ZipArchive<RS>,
    /// Shared strings
    strings: SharedStrings,
    /// Number formats and fonts
    styles: StyleTable,
    /// 1904 datetime system
    is_1904: bool,
    /// Epoch of serial dates
    base_date: NaiveDate,
    /// Sheets, in workbook order
    sheets: Vec<SheetEntry>,
    states: Vec<SheetState>,
    /// Defined names and their formula
    defined_names: Vec<(String, String)>,
    /// Single cell defined names, parsed on first use
    labels: Option<BTreeMap<String, Label>>,
    /// Position of the default sheet
    default_sheet: usize,
    options: XlsxOptions,
}

impl<RS: Read + Seek> Xlsx<RS> {
    /// Opens a workbook from any readable and seekable source
    ///
    /// The `packed` option only applies to [`crate::open_workbook`].
    pub fn new(reader: RS, options: XlsxOptions) -> Result<Self, XlsxError> {
        let mut xlsx = Xlsx {
            zip: ZipArchive::new(reader)?,
            strings: SharedStrings::default(),
            styles: StyleTable::default(),
            is_1904: false,
            base_date: epoch_1900(),
            sheets: Vec::new(),
            states: Vec::new(),
            defined_names: Vec::new(),
            labels: None,
            default_sheet: 0,
            options,
        };
        let relationships = xlsx.read_relationships()?;
        xlsx.read_workbook(relationships.as_ref())?;
        if let Some(max) = xlsx.options.cell_max {
            xlsx.check_cell_max(max)?;
        }
        xlsx.read_shared_strings()?;
        xlsx.read_styles()?;
        if xlsx.load_mode() == LoadMode::Loaded {
            xlsx.load_sheets()?;
        }
        debug!(
            "workbook opened: {} sheets, {} shared strings, {} styles, {:?} mode",
            xlsx.sheets.len(),
            xlsx.strings.len(),
            xlsx.styles.len(),
            xlsx.load_mode()
        );
        Ok(xlsx)
    }

    fn read_relationships(&mut self) -> Result<Option<BTreeMap<Vec<u8>, Relationship>>, XlsxError> {
        match xml_reader(&mut self.zip, "xl/_rels/workbook.xml.rels") {
            None => Ok(None),
            Some(xml) => read_relationships(&mut xml?).map(Some),
        }
    }

    fn read_workbook(
        &mut self,
        relationships: Option<&BTreeMap<Vec<u8>, Relationship>>,
    ) -> Result<(), XlsxError> {
        let mut xml = match xml_reader(&mut self.zip, "xl/workbook.xml") {
            None => return Err(XlsxError::FileNotFound("xl/workbook.xml".to_string())),
            Some(x) => x?,
        };
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                    let mut name = String::new();
                    let mut path = None;
                    for a in e.attributes() {
                        let a = a.map_err(XlsxError::XmlAttr)?;
                        match a {
                            Attribute {
                                key: QName(b"name"),
                                ..
                            } => {
                                name = a.decode_and_unescape_value(xml.decoder())?.to_string();
                            }
                            Attribute {
                                key: QName(b"r:id"),
                                value: ref v,
                            }
                            | Attribute {
                                key: QName(b"relationships:id"),
                                value: ref v,
                            } => {
                                path = relationships
                                    .and_then(|r| r.get(&**v))
                                    .map(|r| resolve_target("xl", &r.target));
                            }
                            _ => (),
                        }
                    }
                    let path = path
                        .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", self.sheets.len() + 1));
                    debug!("sheet '{name}' at '{path}'");
                    self.sheets.push(SheetEntry { name, path });
                    self.states.push(SheetState::default());
                }
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"workbookPr" => {
                    self.is_1904 = match e.try_get_attribute("date1904")? {
                        Some(c) => ["1", "true"].contains(
                            &c.decode_and_unescape_value(xml.decoder())
                                .map_err(XlsxError::Xml)?
                                .as_ref(),
                        ),
                        None => false,
                    };
                }
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"definedName" => {
                    if let Some(name) = get_attribute(e.attributes(), QName(b"name"))? {
                        let name = xml.decoder().decode(name)?.into_owned();
                        let value = read_text(&mut xml, e.name())?;
                        self.defined_names.push((name, value));
                    }
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"workbook" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("workbook")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        self.base_date = if self.is_1904 {
            epoch_1904()
        } else {
            epoch_1900()
        };
        Ok(())
    }

    /// Refuses the workbook if any sheet declares more cells than `max`
    fn check_cell_max(&mut self, max: u64) -> Result<(), XlsxError> {
        for idx in 0..self.sheets.len() {
            let Some(dimensions) = self.declared_dimensions(idx)? else {
                continue;
            };
            let count = get_dimension(dimensions.as_bytes())?.len();
            if count > max {
                return Err(XlsxError::CellMaxExceeded {
                    sheet: self.sheets[idx].name.clone(),
                    count,
                    max,
                });
            }
        }
        Ok(())
    }

    fn declared_dimensions(&mut self, idx: usize) -> Result<Option<String>, XlsxError> {
        match xml_reader(&mut self.zip, &self.sheets[idx].path) {
            None => Ok(None),
            Some(xml) => read_dimension(xml?),
        }
    }

    fn read_shared_strings(&mut self) -> Result<(), XlsxError> {
        if let Some(xml) = xml_reader(&mut self.zip, "xl/sharedStrings.xml") {
            self.strings = SharedStrings::read(&mut xml?)?;
        }
        Ok(())
    }

    fn read_styles(&mut self) -> Result<(), XlsxError> {
        if let Some(xml) = xml_reader(&mut self.zip, "xl/styles.xml") {
            self.styles = StyleTable::read(&mut xml?)?;
        }
        Ok(())
    }

    /// Materializes the rows of every sheet
    fn load_sheets(&mut self) -> Result<(), XlsxError> {
        for (entry, state) in self.sheets.iter().zip(self.states.iter_mut()) {
            match xml_reader(&mut self.zip, &entry.path) {
                Some(xml) => {
                    let tree = SheetTree::read(xml?)?;
                    debug!("sheet '{}': {} cells loaded", entry.name, tree.cell_count());
                    state.tree = Some(tree);
                }
                None => warn!("sheet '{}' has no part at '{}'", entry.name, entry.path),
            }
        }
        Ok(())
    }

    /// Position (0-based) of a sheet
    fn resolve_sheet(&self, sheet: SheetRef<'_>) -> Result<usize, XlsxError> {
        match sheet {
            SheetRef::Default if self.sheets.is_empty() => {
                Err(XlsxError::WorksheetNotFound(sheet.to_string()))
            }
            SheetRef::Default => Ok(self.default_sheet),
            SheetRef::Name(name) => self
                .sheets
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| XlsxError::WorksheetNotFound(name.to_string())),
            SheetRef::Index(i) if i >= 1 && i <= self.sheets.len() => Ok(i - 1),
            SheetRef::Index(i) => Err(XlsxError::WorksheetIndex(i)),
        }
    }

    /// Decoded cells of a sheet, decoding them on first access
    fn scan_if_needed(&mut self, idx: usize) -> Result<&CellStore, XlsxError> {
        if self.load_mode() == LoadMode::Streaming {
            return Err(XlsxError::LoadMode(
                "random access queries need a loaded workbook, open it without minimal_load",
            ));
        }
        self.ensure_hyperlinks(idx)?;
        let name = &self.sheets[idx].name;
        let SheetState {
            tree,
            cells,
            scans,
            ancillary,
        } = &mut self.states[idx];
        let ctx = DecodeContext {
            strings: &self.strings,
            styles: &self.styles,
            base_date: self.base_date,
            hyperlinks: ancillary.hyperlinks.as_ref(),
        };
        cells.get_or_scan(|| {
            let tree = tree
                .as_ref()
                .ok_or_else(|| XlsxError::WorksheetNotFound(name.clone()))?;
            let store = CellStore::populate(tree, &ctx)?;
            *scans += 1;
            debug!("sheet '{name}': {} cells decoded", store.len());
            Ok(store)
        })
    }

    fn ensure_relationships(&mut self, idx: usize) -> Result<(), XlsxError> {
        if self.states[idx].ancillary.relationships.is_some() {
            return Ok(());
        }
        let path = rels_path(&self.sheets[idx].path);
        let relationships = match xml_reader(&mut self.zip, &path) {
            None => BTreeMap::new(),
            Some(xml) => read_relationships(&mut xml?)?,
        };
        self.states[idx].ancillary.relationships = Some(relationships);
        Ok(())
    }

    fn ensure_hyperlinks(&mut self, idx: usize) -> Result<(), XlsxError> {
        if self.states[idx].ancillary.hyperlinks.is_some() {
            return Ok(());
        }
        self.ensure_relationships(idx)?;
        let ancillary = &mut self.states[idx].ancillary;
        let hyperlinks = match xml_reader(&mut self.zip, &self.sheets[idx].path) {
            None => BTreeMap::new(),
            Some(xml) => {
                let relationships = ancillary.relationships.get_or_insert_with(BTreeMap::new);
                read_hyperlinks(&mut xml?, relationships)?
            }
        };
        ancillary.hyperlinks = Some(hyperlinks);
        Ok(())
    }

    fn ensure_comments(&mut self, idx: usize) -> Result<(), XlsxError> {
        if self.states[idx].ancillary.comments.is_some() {
            return Ok(());
        }
        self.ensure_relationships(idx)?;
        let sheet_path = &self.sheets[idx].path;
        let ancillary = &mut self.states[idx].ancillary;
        let relationships = ancillary.relationships.get_or_insert_with(BTreeMap::new);
        let path = if relationships.is_empty() {
            Some(format!("xl/comments{}.xml", idx + 1))
        } else {
            relationships
                .values()
                .find(|r| r.typ.ends_with("/comments"))
                .map(|r| resolve_target(folder_of(sheet_path), &r.target))
        };
        let comments = match path {
            Some(path) => match xml_reader(&mut self.zip, &path) {
                Some(xml) => read_comments(&mut xml?)?,
                None => BTreeMap::new(),
            },
            None => BTreeMap::new(),
        };
        debug!("sheet '{}': {} comments", self.sheets[idx].name, comments.len());
        ancillary.comments = Some(comments);
        Ok(())
    }

    /// Traversal strategy of this workbook
    pub fn load_mode(&self) -> LoadMode {
        self.options.load_mode()
    }

    /// Whether the workbook uses the 1904 date system
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// Epoch of serial dates: 1899-12-30, or 1904-01-01 in the 1904 system
    pub fn base_date(&self) -> NaiveDate {
        self.base_date
    }

    /// Sheet names, in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Position of a sheet, starting at 1
    pub fn sheet_index<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<usize, XlsxError> {
        self.resolve_sheet(sheet.into()).map(|idx| idx + 1)
    }

    /// Name of the sheet used when a query does not name one
    pub fn default_sheet(&self) -> Option<&str> {
        self.sheets.get(self.default_sheet).map(|s| s.name.as_str())
    }

    /// Changes the sheet used when a query does not name one
    pub fn set_default_sheet<'s>(&mut self, sheet: impl Into<SheetRef<'s>>) -> Result<(), XlsxError> {
        self.default_sheet = self.resolve_sheet(sheet.into())?;
        Ok(())
    }

    /// Defined names of the workbook with their formula, in document order
    pub fn defined_names(&self) -> &[(String, String)] {
        &self.defined_names
    }

    /// Cell at a 1-based (row, column), `None` if the sheet has no such cell
    ///
    /// Not available in streaming mode.
    pub fn cell<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<&Cell>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        Ok(self.scan_if_needed(idx)?.read(row, column))
    }

    /// Decoded value at a 1-based (row, column), `Data::Empty` when absent
    pub fn value<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Data, XlsxError> {
        Ok(self
            .cell(row, column, sheet)?
            .map_or(Data::Empty, |c| c.get_value().clone()))
    }

    /// Reported type of a cell, `Formula` for formula cells
    pub fn cell_type<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<CellType, XlsxError> {
        Ok(self
            .cell(row, column, sheet)?
            .map_or(CellType::Empty, Cell::cell_type))
    }

    /// Formula text of a cell
    pub fn formula<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<&str>, XlsxError> {
        Ok(self.cell(row, column, sheet)?.and_then(Cell::formula))
    }

    /// All formulas of a sheet as (row, column, formula), in row-major order
    pub fn formulas<'s>(
        &mut self,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Vec<(u32, u32, String)>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        Ok(self
            .scan_if_needed(idx)?
            .cells()
            .filter_map(|c| c.formula().map(|f| (c.row(), c.column(), f.to_string())))
            .collect())
    }

    /// Undecoded value of a cell
    pub fn raw_value<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<&RawValue>, XlsxError> {
        Ok(self.cell(row, column, sheet)?.and_then(Cell::raw))
    }

    /// Number format code applying to a cell, `General` for unstyled cells
    pub fn number_format<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<&str, XlsxError> {
        let style = self
            .cell(row, column, sheet)?
            .map_or(0, Cell::style_index);
        Ok(self.styles.format_code(style))
    }

    /// Font emphasis of a cell, all flags off for unstyled cells
    pub fn font<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Font, XlsxError> {
        let style = self
            .cell(row, column, sheet)?
            .map_or(0, Cell::style_index);
        Ok(self.styles.font(style))
    }

    /// Comment attached to a cell
    ///
    /// Available in both load modes.
    pub fn comment<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<&str>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        self.ensure_comments(idx)?;
        Ok(self.states[idx]
            .ancillary
            .comments
            .as_ref()
            .and_then(|c| c.get(&(row, column)))
            .map(String::as_str))
    }

    /// Whether a cell has a comment
    pub fn has_comment<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<bool, XlsxError> {
        Ok(self.comment(row, column, sheet)?.is_some())
    }

    /// All comments of a sheet as (row, column, text), in row-major order
    pub fn comments<'s>(
        &mut self,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Vec<(u32, u32, String)>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        self.ensure_comments(idx)?;
        Ok(self.states[idx]
            .ancillary
            .comments
            .iter()
            .flatten()
            .map(|(&(row, column), text)| (row, column, text.clone()))
            .collect())
    }

    /// Hyperlink target of a cell
    ///
    /// Available in both load modes.
    pub fn hyperlink<'s>(
        &mut self,
        row: u32,
        column: u32,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<&str>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        self.ensure_hyperlinks(idx)?;
        Ok(self.states[idx]
            .ancillary
            .hyperlinks
            .as_ref()
            .and_then(|h| h.get(&(row, column)))
            .map(String::as_str))
    }

    /// Defined names pointing at a single cell, by name
    pub fn labels(&mut self) -> &BTreeMap<String, Label> {
        let defined_names = &self.defined_names;
        self.labels.get_or_insert_with(|| {
            let mut labels = BTreeMap::new();
            for (name, formula) in defined_names {
                match parse_label(formula) {
                    Some(label) => {
                        labels.insert(name.clone(), label);
                    }
                    None => debug!("defined name '{name}' ({formula}) is not a single cell"),
                }
            }
            labels
        })
    }

    /// Cell designated by a defined name
    pub fn label(&mut self, name: &str) -> Option<&Label> {
        self.labels().get(name)
    }

    /// Declared dimensions of a sheet (e.g. `A1:C5`), `None` if undeclared
    ///
    /// Read from the sheet header, available in both load modes.
    pub fn dimensions<'s>(
        &mut self,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<Option<String>, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        match xml_reader(&mut self.zip, &self.sheets[idx].path) {
            None => Err(XlsxError::WorksheetNotFound(self.sheets[idx].name.clone())),
            Some(xml) => read_dimension(xml?),
        }
    }

    /// Number of decoding passes made over a sheet so far
    pub fn scan_count<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<usize, XlsxError> {
        let idx = self.resolve_sheet(sheet.into())?;
        Ok(self.states[idx].scans)
    }

    /// Iterates over the rows of a sheet with the strategy of the workbook
    ///
    /// Rows are vectors indexed by column (column 1 at index 0), holding
    /// `None` where the sheet has no cell. Rows missing from the sheet are
    /// yielded as empty vectors.
    pub fn each_row<'s>(&mut self, options: RowOptions<'s>) -> Result<Rows<'_, RS>, XlsxError> {
        match self.load_mode() {
            LoadMode::Loaded => self.each_row_loaded(options),
            LoadMode::Streaming => self.each_row_streaming(options),
        }
    }

    /// Same as [`Xlsx::each_row`], yielding plain values
    pub fn each_row_values<'s>(
        &mut self,
        options: RowOptions<'s>,
    ) -> Result<RowValues<'_, RS>, XlsxError> {
        self.each_row(options).map(RowValues::new)
    }

    /// Iterates over the materialized rows of a loaded workbook
    pub fn each_row_loaded<'s>(
        &mut self,
        options: RowOptions<'s>,
    ) -> Result<Rows<'_, RS>, XlsxError> {
        if self.load_mode() != LoadMode::Loaded {
            return Err(XlsxError::LoadMode(
                "sheets are not loaded, open the workbook without minimal_load",
            ));
        }
        let idx = self.resolve_sheet(options.sheet)?;
        self.ensure_hyperlinks(idx)?;
        let state = &self.states[idx];
        let tree = state
            .tree
            .as_ref()
            .ok_or_else(|| XlsxError::WorksheetNotFound(self.sheets[idx].name.clone()))?;
        let ctx = DecodeContext {
            strings: &self.strings,
            styles: &self.styles,
            base_date: self.base_date,
            hyperlinks: state.ancillary.hyperlinks.as_ref(),
        };
        Ok(Rows::new(RowSource::Loaded(tree.rows().iter()), ctx, &options))
    }

    /// Iterates over the rows of a streaming workbook in a single forward pass
    pub fn each_row_streaming<'s>(
        &mut self,
        options: RowOptions<'s>,
    ) -> Result<Rows<'_, RS>, XlsxError> {
        if self.load_mode() != LoadMode::Streaming {
            return Err(XlsxError::LoadMode(
                "sheets are already loaded, open the workbook with minimal_load",
            ));
        }
        let idx = self.resolve_sheet(options.sheet)?;
        self.ensure_hyperlinks(idx)?;
        let entry = &self.sheets[idx];
        let xml = xml_reader(&mut self.zip, &entry.path)
            .ok_or_else(|| XlsxError::WorksheetNotFound(entry.name.clone()))??;
        let cursor = SheetCursor::new(xml)?;
        let ctx = DecodeContext {
            strings: &self.strings,
            styles: &self.styles,
            base_date: self.base_date,
            hyperlinks: self.states[idx].ancillary.hyperlinks.as_ref(),
        };
        Ok(Rows::new(RowSource::Streaming(cursor), ctx, &options))
    }
}

fn xml_reader<'a, RS: Read + Seek>(
    zip: &'a mut ZipArchive<RS>,
    path: &str,
) -> Option<Result<XlReader<'a, RS>, XlsxError>> {
    let actual_path = zip
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(path))?
        .to_owned();
    match zip.by_name(&actual_path) {
        Ok(f) => {
            let mut r = XmlReader::from_reader(BufReader::new(f));
            configure(&mut r);
            Some(Ok(r))
        }
        Err(ZipError::FileNotFound) => None,
        Err(e) => Some(Err(e.into())),
    }
}

pub(crate) fn configure<B>(reader: &mut XmlReader<B>) {
    let config = reader.config_mut();
    config.check_end_names = false;
    config.trim_text(false);
    config.check_comments = false;
    config.expand_empty_elements = true;
}

/// search through an Element's attributes for the named one
pub(crate) fn get_attribute<'a>(
    atts: Attributes<'a>,
    n: QName,
) -> Result<Option<&'a [u8]>, XlsxError> {
    for a in atts {
        match a {
            Ok(Attribute {
                key,
                value: Cow::Borrowed(value),
            }) if key == n => return Ok(Some(value)),
            Err(e) => return Err(XlsxError::XmlAttr(e)),
            _ => {} // ignore other attributes
        }
    }
    Ok(None)
}

/// converts a text representation (e.g. "A6:G67") of a dimension into integers
/// - top left (row, column),
/// - bottom right (row, column)
pub(crate) fn get_dimension(dimension: &[u8]) -> Result<Dimensions, XlsxError> {
    let parts: Vec<_> = dimension
        .split(|c| *c == b':')
        .map(get_row_column)
        .collect::<Result<Vec<_>, XlsxError>>()?;

    match parts.len() {
        0 => Err(XlsxError::DimensionCount(0)),
        1 => Ok(Dimensions {
            start: parts[0],
            end: parts[0],
        }),
        2 => {
            if parts[1].0 > MAX_ROWS {
                warn!("xlsx has more than maximum number of rows ({} > {MAX_ROWS})", parts[1].0);
            }
            if parts[1].1 > MAX_COLUMNS {
                warn!("xlsx has more than maximum number of columns ({} > {MAX_COLUMNS})", parts[1].1);
            }
            Ok(Dimensions {
                start: parts[0],
                end: parts[1],
            })
        }
        len => Err(XlsxError::DimensionCount(len)),
    }
}

/// Converts a text cell name into its position (row, column), both starting at 1.
/// `$` markers are ignored.
/// If the row or column component in the range is missing, an Error is returned.
pub(crate) fn get_row_column(range: &[u8]) -> Result<(u32, u32), XlsxError> {
    let (row, col) = get_row_and_optional_column(range)?;
    let col = col.ok_or(XlsxError::RangeWithoutColumnComponent)?;
    Ok((row, col))
}

/// Converts a text row name into its position, starting at 1.
/// If the text row name also contains a column component, it is ignored.
pub(crate) fn get_row(range: &[u8]) -> Result<u32, XlsxError> {
    get_row_and_optional_column(range).map(|(row, _)| row)
}

fn get_row_and_optional_column(range: &[u8]) -> Result<(u32, Option<u32>), XlsxError> {
    let (mut row, mut col) = (0u32, 0u32);
    let mut pow = 1u32;
    let mut readrow = true;
    for c in range.iter().rev() {
        match *c {
            b'$' => (),
            c @ b'0'..=b'9' => {
                if readrow {
                    row = row.saturating_add(u32::from(c - b'0').saturating_mul(pow));
                    pow = pow.saturating_mul(10);
                } else {
                    return Err(XlsxError::NumericColumn(c));
                }
            }
            c @ (b'A'..=b'Z' | b'a'..=b'z') => {
                if readrow {
                    if row == 0 {
                        return Err(XlsxError::RangeWithoutRowComponent);
                    }
                    pow = 1;
                    readrow = false;
                }
                let digit = u32::from(c.to_ascii_uppercase() - b'A') + 1;
                col = col.saturating_add(digit.saturating_mul(pow));
                pow = pow.saturating_mul(26);
            }
            _ => return Err(XlsxError::Alphanumeric(*c)),
        }
    }
    if row == 0 {
        return Err(XlsxError::RangeWithoutRowComponent);
    }
    Ok((row, (col > 0).then_some(col)))
}

/// Parses a cell name such as `B7` or `$C$5` into (row, column), both starting at 1
///
/// # Examples
///
/// ```
/// assert_eq!(sheetgrid::parse_cell_ref("C5").unwrap(), (5, 3));
/// assert_eq!(sheetgrid::parse_cell_ref("$AA$10").unwrap(), (10, 27));
/// ```
pub fn parse_cell_ref(name: &str) -> Result<(u32, u32), XlsxError> {
    let (row, column) = get_row_column(name.trim().as_bytes())?;
    if row > MAX_ROWS || column > MAX_COLUMNS {
        return Err(XlsxError::Unexpected("cell reference outside of the sheet"));
    }
    Ok((row, column))
}

/// Column letters of a column number starting at 1
///
/// # Examples
///
/// ```
/// assert_eq!(sheetgrid::column_name(1).unwrap(), "A");
/// assert_eq!(sheetgrid::column_name(28).unwrap(), "AB");
/// ```
pub fn column_name(column: u32) -> Result<String, XlsxError> {
    if column == 0 || column > MAX_COLUMNS {
        return Err(XlsxError::Unexpected("column number overflow"));
    }
    let mut name = Vec::with_capacity(3);
    let mut num = column;
    while num > 0 {
        name.push(((num - 1) % 26) as u8 + b'A');
        num = (num - 1) / 26;
    }
    name.reverse();
    Ok(String::from_utf8_lossy(&name).into_owned())
}

/// Reads the text content of an element up to its closing tag
pub(crate) fn read_text<B: BufRead>(
    xml: &mut XmlReader<B>,
    closing: QName,
) -> Result<String, XlsxError> {
    let mut buf = Vec::with_capacity(64);
    let mut value = String::new();
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Text(t) => value.push_str(&t.xml10_content()?),
            Event::GeneralRef(e) => unescape_entity_to_buffer(&e, &mut value)?,
            Event::End(end) if end.name() == closing => break,
            Event::Eof => return Err(XlsxError::XmlEof("text")),
            _ => (),
        }
    }
    Ok(value)
}

/// attempts to read either a simple or richtext string
///
/// Phonetic runs (`rPh`) are skipped.
pub(crate) fn read_string<B: BufRead>(
    xml: &mut XmlReader<B>,
    closing: QName,
) -> Result<Option<String>, XlsxError> {
    let mut buf = Vec::with_capacity(1024);
    let mut rich_buffer: Option<String> = None;
    let mut is_phonetic_text = false;
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"r" => {
                if rich_buffer.is_none() {
                    // use a buffer since richtext has multiples <r> and <t> for the same cell
                    rich_buffer = Some(String::new());
                }
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"rPh" => {
                is_phonetic_text = true;
            }
            Ok(Event::End(ref e)) if e.name() == closing => {
                return Ok(rich_buffer);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"rPh" => {
                is_phonetic_text = false;
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" && !is_phonetic_text => {
                let value = read_text(xml, e.name())?;
                if let Some(ref mut s) = rich_buffer {
                    s.push_str(&value);
                } else {
                    // consume any remaining events up to expected closing tag
                    xml.read_to_end_into(closing, &mut Vec::new())?;
                    return Ok(Some(value));
                }
            }
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowOptions;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="false"/>
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Notes" sheetId="2" r:id="rId2"/>
  </sheets>
  <definedNames>
    <definedName name="total">Data!$B$3</definedName>
    <definedName name="_xlnm.Print_Area" localSheetId="0">Data!$A$1:$B$3</definedName>
  </definedNames>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/notes.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<styleSheet>
  <fonts><font/><font><b/></font></fonts>
  <cellXfs><xf numFmtId="0" fontId="0"/><xf numFmtId="14" fontId="1"/></cellXfs>
</styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst><si><t>name</t></si><si><t>value</t></si></sst>"#;

    const DATA_SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <dimension ref="A1:B3"/>
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
    <row r="3"><c r="A3" s="1"><v>45000</v></c><c r="B3"><f>SUM(B1:B2)</f><v>12</v></c></row>
  </sheetData>
  <hyperlinks><hyperlink ref="A1" r:id="rId7"/></hyperlinks>
</worksheet>"#;

    const DATA_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/>
  <Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments9.xml"/>
</Relationships>"#;

    const COMMENTS: &str = r#"<comments><authors><author>a</author></authors><commentList>
  <comment ref="B3" authorId="0"><text><t>sum of values</t></text></comment>
</commentList></comments>"#;

    const NOTES_SHEET: &str = r#"<worksheet><dimension ref="A1"/><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>hello</t></is></c></row></sheetData></worksheet>"#;

    fn package(parts: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in parts {
            zip_writer.start_file(*name, options).unwrap();
            zip_writer.write_all(data.as_bytes()).unwrap();
        }
        Cursor::new(zip_writer.finish().unwrap().into_inner())
    }

    fn workbook() -> Cursor<Vec<u8>> {
        package(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/data.xml", DATA_SHEET),
            ("xl/worksheets/_rels/data.xml.rels", DATA_RELS),
            ("xl/comments9.xml", COMMENTS),
            ("xl/worksheets/notes.xml", NOTES_SHEET),
        ])
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(get_row_column(b"A1").unwrap(), (1, 1));
        assert_eq!(get_row_column(b"C107").unwrap(), (107, 3));
        assert_eq!(get_row_column(b"$C$5").unwrap(), (5, 3));
        assert_eq!(
            get_dimension(b"C2:D35").unwrap(),
            Dimensions {
                start: (2, 3),
                end: (35, 4)
            }
        );
        assert_eq!(
            get_dimension(b"A1:XFD1048576").unwrap(),
            Dimensions {
                start: (1, 1),
                end: (MAX_ROWS, MAX_COLUMNS),
            }
        );
        assert_eq!(get_dimension(b"A1:Z99").unwrap().len(), 2_574);
        assert!(matches!(
            get_row_column(b"A"),
            Err(XlsxError::RangeWithoutRowComponent)
        ));
        assert!(matches!(
            get_row_column(b"12"),
            Err(XlsxError::RangeWithoutColumnComponent)
        ));
        assert!(matches!(
            get_row_column(b"A1B2"),
            Err(XlsxError::NumericColumn(b'1'))
        ));
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(1).unwrap(), "A");
        assert_eq!(column_name(26).unwrap(), "Z");
        assert_eq!(column_name(27).unwrap(), "AA");
        assert_eq!(column_name(MAX_COLUMNS).unwrap(), "XFD");
        assert!(column_name(0).is_err());
        assert!(column_name(MAX_COLUMNS + 1).is_err());
        for col in [1, 26, 52, 703, MAX_COLUMNS] {
            let name = column_name(col).unwrap();
            assert_eq!(parse_cell_ref(&format!("{name}1")).unwrap(), (1, col));
        }
    }

    #[test]
    fn test_read_string_with_namespaced_si_name() {
        let mut xml = XmlReader::from_reader(
            br#"<x:si><x:r><x:rPr><x:sz val="11"/></x:rPr><x:t>String</x:t></x:r><x:r><x:t> 2</x:t></x:r></x:si>"#
                .as_ref(),
        );
        configure(&mut xml);
        let mut buf = Vec::new();
        let value = loop {
            match xml.read_event_into(&mut buf).unwrap() {
                Event::Start(ref e) if e.local_name().as_ref() == b"si" => {
                    break read_string(&mut xml, e.name()).unwrap();
                }
                _ => (),
            }
        };
        assert_eq!(value.as_deref(), Some("String 2"));
    }

    #[test]
    fn test_open_workbook() {
        let xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        assert_eq!(xlsx.sheet_names(), ["Data", "Notes"]);
        assert_eq!(xlsx.default_sheet(), Some("Data"));
        assert!(!xlsx.is_1904());
        assert_eq!(xlsx.base_date(), epoch_1900());
        assert_eq!(xlsx.sheets[1].path, "xl/worksheets/notes.xml");
        assert_eq!(xlsx.defined_names().len(), 2);
    }

    #[test]
    fn test_random_access() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        assert_eq!(xlsx.value(1, 2, "Data").unwrap(), "value");
        assert_eq!(xlsx.cell_type(3, 1, ()).unwrap(), CellType::Date);
        assert_eq!(xlsx.cell_type(3, 2, ()).unwrap(), CellType::Formula);
        assert_eq!(xlsx.value(3, 2, ()).unwrap(), Data::Int(12));
        assert_eq!(xlsx.formula(3, 2, ()).unwrap(), Some("SUM(B1:B2)"));
        assert_eq!(xlsx.formulas(1).unwrap(), [(3, 2, "SUM(B1:B2)".to_string())]);
        assert!(xlsx.cell(2, 1, ()).unwrap().is_none());
        assert_eq!(xlsx.cell_type(2, 1, ()).unwrap(), CellType::Empty);
        assert_eq!(xlsx.number_format(3, 1, ()).unwrap(), "mm-dd-yy");
        assert_eq!(xlsx.number_format(1, 1, ()).unwrap(), "General");
        assert!(xlsx.font(3, 1, ()).unwrap().is_bold());
        assert!(!xlsx.font(1, 1, ()).unwrap().is_bold());
        assert_eq!(xlsx.value(1, 1, 2).unwrap(), "hello");
    }

    #[test]
    fn test_hyperlinks_and_comments() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        assert_eq!(xlsx.hyperlink(1, 1, ()).unwrap(), Some("https://example.com/"));
        assert_eq!(
            xlsx.value(1, 1, ()).unwrap(),
            Data::Link {
                text: "name".to_string(),
                url: "https://example.com/".to_string()
            }
        );
        assert_eq!(xlsx.comment(3, 2, "Data").unwrap(), Some("sum of values"));
        assert!(!xlsx.has_comment(1, 1, "Data").unwrap());
        assert_eq!(
            xlsx.comments("Data").unwrap(),
            [(3, 2, "sum of values".to_string())]
        );
        assert!(xlsx.comments("Notes").unwrap().is_empty());
    }

    #[test]
    fn test_labels() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        let label = xlsx.label("total").unwrap();
        assert_eq!((label.sheet.as_str(), label.row, label.column), ("Data", 3, 2));
        assert!(xlsx.label("_xlnm.Print_Area").is_none());
        assert_eq!(xlsx.labels().len(), 1);
    }

    #[test]
    fn test_sheet_references() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        assert_eq!(xlsx.sheet_index("Notes").unwrap(), 2);
        assert!(matches!(
            xlsx.cell(1, 1, "Missing"),
            Err(XlsxError::WorksheetNotFound(_))
        ));
        assert!(matches!(
            xlsx.cell(1, 1, 3),
            Err(XlsxError::WorksheetIndex(3))
        ));
        assert!(matches!(
            xlsx.cell(1, 1, 0),
            Err(XlsxError::WorksheetIndex(0))
        ));
        xlsx.set_default_sheet("Notes").unwrap();
        assert_eq!(xlsx.default_sheet(), Some("Notes"));
        assert_eq!(xlsx.value(1, 1, ()).unwrap(), "hello");
        assert_eq!(xlsx.dimensions(()).unwrap().as_deref(), Some("A1"));
    }

    #[test]
    fn test_decoding_happens_once() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::default()).unwrap();
        assert_eq!(xlsx.scan_count("Data").unwrap(), 0);
        for _ in 0..3 {
            xlsx.cell(1, 1, "Data").unwrap();
            xlsx.formulas("Data").unwrap();
            xlsx.font(3, 1, "Data").unwrap();
        }
        assert_eq!(xlsx.scan_count("Data").unwrap(), 1);
        assert_eq!(xlsx.scan_count("Notes").unwrap(), 0);
    }

    #[test]
    fn test_cell_max() {
        let err = Xlsx::new(workbook(), XlsxOptions::new().cell_max(5))
            .err()
            .unwrap();
        match err {
            XlsxError::CellMaxExceeded { sheet, count, max } => {
                assert_eq!((sheet.as_str(), count, max), ("Data", 6, 5));
            }
            e => panic!("unexpected error {e}"),
        }
        assert!(!XlsxError::LoadMode("").is_malformed());
        assert!(Xlsx::new(workbook(), XlsxOptions::new().cell_max(6)).is_ok());
    }

    #[test]
    fn test_streaming_refuses_random_access() {
        let mut xlsx = Xlsx::new(workbook(), XlsxOptions::new().minimal_load(true)).unwrap();
        assert!(matches!(xlsx.cell(1, 1, ()), Err(XlsxError::LoadMode(_))));
        assert!(matches!(
            xlsx.each_row_loaded(RowOptions::new()),
            Err(XlsxError::LoadMode(_))
        ));
        // ancillary queries still work
        assert_eq!(xlsx.comment(3, 2, ()).unwrap(), Some("sum of values"));
        assert_eq!(xlsx.label("total").map(|l| l.row), Some(3));
        assert_eq!(xlsx.dimensions(()).unwrap().as_deref(), Some("A1:B3"));
        let rows: Vec<_> = xlsx
            .each_row_values(RowOptions::new())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2][1], Data::Int(12));
    }

    #[test]
    fn test_missing_parts() {
        let err = Xlsx::new(
            package(&[("[Content_Types].xml", CONTENT_TYPES)]),
            XlsxOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, XlsxError::FileNotFound(ref p) if p == "xl/workbook.xml"));

        // no relationships: sheets are found at their conventional path
        let mut xlsx = Xlsx::new(
            package(&[
                ("xl/workbook.xml", r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#),
                ("xl/worksheets/sheet1.xml", NOTES_SHEET),
            ]),
            XlsxOptions::default(),
        )
        .unwrap();
        assert_eq!(xlsx.value(1, 1, "S").unwrap(), "hello");
    }
}
