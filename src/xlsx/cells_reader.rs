// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::io::BufRead;

use log::{debug, warn};
use quick_xml::{events::Event, name::QName, Reader as XmlReader};

use super::{
    column_name, get_attribute, get_row, get_row_column, read_string, read_text, XlsxError,
    MAX_COLUMNS, MAX_ROWS,
};

/// A `<c>` element, not decoded yet
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawCell {
    /// 1-based (row, column)
    pub pos: (u32, u32),
    /// `t` attribute
    pub typ: Option<String>,
    /// `s` attribute
    pub style: usize,
    /// `<f>` text, shared formulas expanded
    pub formula: Option<String>,
    /// `<v>` text
    pub value: Option<String>,
    /// `<is>` text
    pub inline: Option<String>,
}

/// A `<row>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawRow {
    /// 1-based row index
    pub index: u32,
    pub cells: Vec<RawCell>,
}

/// Rows of a sheet materialized in memory
#[derive(Debug, Default)]
pub(crate) struct SheetTree {
    rows: Vec<RawRow>,
}

impl SheetTree {
    pub(crate) fn read<B: BufRead>(xml: XmlReader<B>) -> Result<Self, XlsxError> {
        let mut cursor = SheetCursor::new(xml)?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row()? {
            rows.push(row);
        }
        Ok(SheetTree { rows })
    }

    pub(crate) fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }
}

/// Master of a shared formula group
#[derive(Debug)]
struct SharedFormula {
    text: String,
    origin: (u32, u32),
}

/// Forward only reader of the `<row>` elements of a worksheet
pub(crate) struct SheetCursor<B> {
    xml: XmlReader<B>,
    buf: Vec<u8>,
    row_buf: Vec<u8>,
    row_index: u32,
    shared_formulas: Vec<Option<SharedFormula>>,
    finished: bool,
}

impl<B: BufRead> SheetCursor<B> {
    /// Positions the reader inside `<sheetData>`
    ///
    /// Parts without any `<sheetData>` (chartsheets) yield no rows.
    pub(crate) fn new(mut xml: XmlReader<B>) -> Result<Self, XlsxError> {
        let mut buf = Vec::with_capacity(1024);
        let mut finished = false;
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf).map_err(XlsxError::Xml)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => break,
                Event::Eof => {
                    warn!("sheet has no sheetData element, no rows to read");
                    finished = true;
                    break;
                }
                _ => (),
            }
        }
        Ok(SheetCursor {
            xml,
            buf,
            row_buf: Vec::with_capacity(1024),
            row_index: 0,
            shared_formulas: Vec::new(),
            finished,
        })
    }

    /// Reads the next `<row>`, `None` once `</sheetData>` is reached
    ///
    /// Rows and cells without an `r` attribute follow the previous one.
    pub(crate) fn next_row(&mut self) -> Result<Option<RawRow>, XlsxError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            match self.xml.read_event_into(&mut self.buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                    let index = match get_attribute(e.attributes(), QName(b"r"))? {
                        Some(r) => get_row(r)?,
                        None => self.row_index.saturating_add(1),
                    };
                    if !(1..=MAX_ROWS).contains(&index) {
                        return Err(XlsxError::RowOutOfBounds(index));
                    }
                    self.row_index = index;
                    let row = read_row(
                        &mut self.xml,
                        &mut self.row_buf,
                        index,
                        &mut self.shared_formulas,
                    )?;
                    return Ok(Some(row));
                }
                Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                    self.finished = true;
                    return Ok(None);
                }
                Event::Eof => {
                    self.finished = true;
                    return Err(XlsxError::XmlEof("sheetData"));
                }
                _ => (),
            }
        }
    }
}

fn read_row<B: BufRead>(
    xml: &mut XmlReader<B>,
    buf: &mut Vec<u8>,
    index: u32,
    shared_formulas: &mut Vec<Option<SharedFormula>>,
) -> Result<RawRow, XlsxError> {
    let mut cells = Vec::new();
    let mut col_index: u32 = 0;
    loop {
        buf.clear();
        match xml.read_event_into(buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                let mut pos = None;
                let mut typ = None;
                let mut style = 0;
                for a in e.attributes() {
                    let a = a?;
                    match a.key {
                        QName(b"r") => pos = Some(get_row_column(&a.value)?),
                        QName(b"t") => typ = Some(xml.decoder().decode(&a.value)?.into_owned()),
                        QName(b"s") => style = atoi_simd::parse::<usize>(&a.value).unwrap_or(0),
                        _ => (),
                    }
                }
                let pos = match pos {
                    Some(pos) => pos,
                    None => (index, col_index.saturating_add(1)),
                };
                if !(1..=MAX_ROWS).contains(&pos.0) || !(1..=MAX_COLUMNS).contains(&pos.1) {
                    return Err(XlsxError::CellOutOfBounds(pos.0, pos.1));
                }
                col_index = pos.1;
                let cell = read_cell(xml, pos, typ, style, shared_formulas)?;
                cells.push(cell);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => break,
            Event::Eof => return Err(XlsxError::XmlEof("row")),
            _ => (),
        }
    }
    Ok(RawRow { index, cells })
}

fn read_cell<B: BufRead>(
    xml: &mut XmlReader<B>,
    pos: (u32, u32),
    typ: Option<String>,
    style: usize,
    shared_formulas: &mut Vec<Option<SharedFormula>>,
) -> Result<RawCell, XlsxError> {
    let mut cell = RawCell {
        pos,
        typ,
        style,
        ..Default::default()
    };
    let mut buf = Vec::with_capacity(128);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"v" => cell.value = Some(read_text(xml, e.name())?),
                b"is" => cell.inline = Some(read_string(xml, e.name())?.unwrap_or_default()),
                b"f" => {
                    let is_shared =
                        get_attribute(e.attributes(), QName(b"t"))? == Some(&b"shared"[..]);
                    let si = get_attribute(e.attributes(), QName(b"si"))?
                        .and_then(|v| atoi_simd::parse::<usize>(v).ok());
                    let text = read_text(xml, e.name())?;
                    cell.formula = match si {
                        Some(si) if is_shared => Some(shared_formula(shared_formulas, si, pos, text)),
                        _ => Some(text),
                    };
                }
                _ => {
                    xml.read_to_end_into(e.name(), &mut Vec::new())?;
                }
            },
            Event::End(ref e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => return Err(XlsxError::XmlEof("c")),
            _ => (),
        }
    }
    Ok(cell)
}

/// Registers the master of a shared formula group, or expands a member
fn shared_formula(
    shared_formulas: &mut Vec<Option<SharedFormula>>,
    si: usize,
    pos: (u32, u32),
    text: String,
) -> String {
    if !text.is_empty() {
        if shared_formulas.len() <= si {
            shared_formulas.resize_with(si + 1, || None);
        }
        shared_formulas[si] = Some(SharedFormula {
            text: text.clone(),
            origin: pos,
        });
        return text;
    }
    match shared_formulas.get(si) {
        Some(Some(master)) => {
            let offset = (
                i64::from(pos.0) - i64::from(master.origin.0),
                i64::from(pos.1) - i64::from(master.origin.1),
            );
            shift_cell_references(&master.text, offset)
        }
        _ => {
            debug!("shared formula {si} referenced before its master at {pos:?}");
            text
        }
    }
}

/// Moves the relative cell references of a formula by `offset` (rows, columns)
///
/// `$` marks an absolute component. Quoted strings, function names and
/// sheet names are left untouched.
pub(crate) fn shift_cell_references(formula: &str, offset: (i64, i64)) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut res = String::with_capacity(formula.len());
    let mut in_quote = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_quote = !in_quote;
        }
        let at_boundary = i == 0 || !is_name_char(chars[i - 1]);
        if !in_quote && at_boundary {
            if let Some((len, shifted)) = shift_reference(&chars[i..], offset) {
                res.push_str(&shifted);
                i += len;
                continue;
            }
        }
        res.push(c);
        i += 1;
    }
    res
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Matches `$?[A-Z]{1,3}$?[0-9]+` at the start of `s`
fn shift_reference(s: &[char], offset: (i64, i64)) -> Option<(usize, String)> {
    let mut i = 0;
    let col_absolute = s.first() == Some(&'$');
    if col_absolute {
        i += 1;
    }
    let col_start = i;
    while s.get(i).is_some_and(char::is_ascii_alphabetic) {
        i += 1;
    }
    let letters = &s[col_start..i];
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let row_absolute = s.get(i) == Some(&'$');
    if row_absolute {
        i += 1;
    }
    let row_start = i;
    while s.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if row_start == i {
        return None;
    }
    if s.get(i).is_some_and(|&c| is_name_char(c) || c == '(' || c == '!') {
        return None;
    }
    let col = letters.iter().fold(0i64, |acc, c| {
        acc * 26 + i64::from(c.to_ascii_uppercase() as u8 - b'A') + 1
    });
    let row: i64 = s[row_start..i].iter().collect::<String>().parse().ok()?;
    if row == 0 {
        return None;
    }
    let col = if col_absolute { col } else { col + offset.1 };
    let row = if row_absolute { row } else { row + offset.0 };
    if !(1..=i64::from(MAX_COLUMNS)).contains(&col) || !(1..=i64::from(MAX_ROWS)).contains(&row) {
        return None;
    }
    let name = column_name(col as u32).ok()?;
    let shifted = format!(
        "{}{name}{}{row}",
        if col_absolute { "$" } else { "" },
        if row_absolute { "$" } else { "" },
    );
    Some((i, shifted))
}

/// Reads the `ref` of `<dimension>` without going into `<sheetData>`
pub(crate) fn read_dimension<B: BufRead>(
    mut xml: XmlReader<B>,
) -> Result<Option<String>, XlsxError> {
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"dimension" => {
                return match get_attribute(e.attributes(), QName(b"ref"))? {
                    Some(r) => Ok(Some(xml.decoder().decode(r)?.into_owned())),
                    None => Err(XlsxError::UnexpectedNode("dimension")),
                };
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => return Ok(None),
            Event::Eof => return Ok(None),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::configure;

    fn reader(xml: &str) -> XmlReader<&[u8]> {
        let mut xml = XmlReader::from_reader(xml.as_bytes());
        configure(&mut xml);
        xml
    }

    fn sheet(data: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<dimension ref="A1:C5"/><sheetViews><sheetView workbookViewId="0"/></sheetViews>
<sheetData>{data}</sheetData></worksheet>"#
        )
    }

    #[test]
    fn test_rows_and_cells() {
        let xml = sheet(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" s="2"><v>1.5</v></c></row>
               <row r="3"><c r="B3" t="inlineStr"><is><t>inline</t></is></c></row>
               <row><c><v>7</v></c><c t="b"><v>1</v></c></row>"#,
        );
        let tree = SheetTree::read(reader(&xml)).unwrap();
        let rows = tree.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(tree.cell_count(), 5);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].cells[0].typ.as_deref(), Some("s"));
        assert_eq!(rows[0].cells[1].pos, (1, 3));
        assert_eq!(rows[0].cells[1].style, 2);
        assert_eq!(rows[0].cells[1].value.as_deref(), Some("1.5"));
        assert_eq!(rows[1].cells[0].inline.as_deref(), Some("inline"));
        // missing r attributes continue from the previous row and cell
        assert_eq!(rows[2].index, 4);
        assert_eq!(rows[2].cells[0].pos, (4, 1));
        assert_eq!(rows[2].cells[1].pos, (4, 2));
    }

    #[test]
    fn test_shared_formulas() {
        let xml = sheet(
            r#"<row r="1"><c r="B1"><f t="shared" ref="B1:B3" si="0">A1*2+$A$1</f><v>2</v></c></row>
               <row r="2"><c r="B2"><f t="shared" si="0"/><v>4</v></c></row>
               <row r="3"><c r="B3"><f t="shared" si="0"/><v>6</v></c><c r="C3"><f>SUM(A1:A3)</f></c></row>"#,
        );
        let tree = SheetTree::read(reader(&xml)).unwrap();
        let formulas: Vec<_> = tree
            .rows()
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter_map(|c| c.formula.as_deref())
            .collect();
        assert_eq!(formulas, ["A1*2+$A$1", "A2*2+$A$1", "A3*2+$A$1", "SUM(A1:A3)"]);
    }

    #[test]
    fn test_no_sheet_data() {
        let xml = r#"<chartsheet><sheetViews/><drawing r:id="rId1"/></chartsheet>"#;
        let mut cursor = SheetCursor::new(reader(xml)).unwrap();
        assert_eq!(cursor.next_row().unwrap(), None);
    }

    #[test]
    fn test_truncated_sheet() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v></c></row>"#;
        let mut cursor = SheetCursor::new(reader(xml)).unwrap();
        assert!(cursor.next_row().unwrap().is_some());
        assert!(matches!(
            cursor.next_row(),
            Err(XlsxError::XmlEof("sheetData"))
        ));
    }

    #[test]
    fn test_positions_outside_of_the_grid() {
        for data in [
            r#"<row r="1"><c r="ZZZZZZZ1"><v>1</v></c></row>"#,
            r#"<row r="1"><c r="XFE1"><v>1</v></c></row>"#,
            r#"<row r="1"><c r="A1048577"><v>1</v></c></row>"#,
        ] {
            let xml = sheet(data);
            let mut cursor = SheetCursor::new(reader(&xml)).unwrap();
            assert!(matches!(
                cursor.next_row(),
                Err(XlsxError::CellOutOfBounds(..))
            ));
        }
        // implicit column after the last one
        let xml = sheet(r#"<row r="1"><c r="XFD1"><v>1</v></c><c><v>2</v></c></row>"#);
        let mut cursor = SheetCursor::new(reader(&xml)).unwrap();
        assert!(matches!(
            cursor.next_row(),
            Err(XlsxError::CellOutOfBounds(1, 16_385))
        ));
        let xml = sheet(r#"<row r="99999999"><c><v>1</v></c></row>"#);
        let mut cursor = SheetCursor::new(reader(&xml)).unwrap();
        assert!(matches!(
            cursor.next_row(),
            Err(XlsxError::RowOutOfBounds(99_999_999))
        ));
        // the last cell of the grid is fine
        let xml = sheet(r#"<row r="1048576"><c r="XFD1048576"><v>1</v></c></row>"#);
        let mut cursor = SheetCursor::new(reader(&xml)).unwrap();
        assert_eq!(cursor.next_row().unwrap().unwrap().cells[0].pos, (MAX_ROWS, MAX_COLUMNS));
    }

    #[test]
    fn test_read_dimension() {
        assert_eq!(
            read_dimension(reader(&sheet(""))).unwrap().as_deref(),
            Some("A1:C5")
        );
        assert_eq!(
            read_dimension(reader("<worksheet><sheetData/></worksheet>")).unwrap(),
            None
        );
    }

    #[test]
    fn test_shift_cell_references() {
        assert_eq!(shift_cell_references("A1+B2", (1, 1)), "B2+C3");
        assert_eq!(shift_cell_references("$A1+A$1+$A$1", (2, 2)), "$A3+C$1+$A$1");
        assert_eq!(
            shift_cell_references("IF(A1=\"B1\",LOG10(A1),Sheet2!B1)", (1, 0)),
            "IF(A2=\"B1\",LOG10(A2),Sheet2!B2)"
        );
        // would leave the sheet
        assert_eq!(shift_cell_references("A1", (-1, 0)), "A1");
    }
}
