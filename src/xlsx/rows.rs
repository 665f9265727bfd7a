// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::io::{BufReader, Read, Seek};

use zip::read::ZipFile;

use super::cells_reader::{RawRow, SheetCursor};
use super::decoder::DecodeContext;
use super::XlsxError;
use crate::datatype::{Cell, Data};
use crate::RowOptions;

/// Where rows come from: the materialized sheet or the package itself
pub(crate) enum RowSource<'a, RS>
where
    RS: Read + Seek,
{
    Loaded(std::slice::Iter<'a, RawRow>),
    Streaming(SheetCursor<BufReader<ZipFile<'a, RS>>>),
}

/// Iterator over the rows of a sheet
///
/// Each row is indexed by column (column 1 at index 0) with `None` where
/// the sheet has no cell. Rows absent from the sheet are reconstructed as
/// empty vectors. Iteration stops at the first error.
pub struct Rows<'a, RS>
where
    RS: Read + Seek,
{
    source: RowSource<'a, RS>,
    ctx: DecodeContext<'a>,
    /// Index of the last row read from the source
    last_row: u32,
    /// Empty rows still to yield before `pending`
    blanks: u32,
    pending: Option<Vec<Option<Cell>>>,
    yielded: usize,
    max_rows: Option<usize>,
    strip_trailing_empty: bool,
    done: bool,
}

impl<'a, RS> Rows<'a, RS>
where
    RS: Read + Seek,
{
    pub(crate) fn new(
        source: RowSource<'a, RS>,
        ctx: DecodeContext<'a>,
        options: &RowOptions<'_>,
    ) -> Self {
        Rows {
            source,
            ctx,
            last_row: 0,
            blanks: 0,
            pending: None,
            yielded: 0,
            max_rows: options.max_rows,
            strip_trailing_empty: options.strip_trailing_empty,
            done: false,
        }
    }

    fn next_decoded(&mut self) -> Result<Option<(u32, Vec<Option<Cell>>)>, XlsxError> {
        match &mut self.source {
            RowSource::Loaded(rows) => match rows.next() {
                Some(raw) => Ok(Some((raw.index, decode_row(&self.ctx, raw)?))),
                None => Ok(None),
            },
            RowSource::Streaming(cursor) => match cursor.next_row()? {
                Some(raw) => Ok(Some((raw.index, decode_row(&self.ctx, &raw)?))),
                None => Ok(None),
            },
        }
    }

    fn next_row(&mut self) -> Result<Option<Vec<Option<Cell>>>, XlsxError> {
        if self.blanks > 0 {
            self.blanks -= 1;
            return Ok(Some(Vec::new()));
        }
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        let Some((index, row)) = self.next_decoded()? else {
            return Ok(None);
        };
        let gap = index.saturating_sub(self.last_row).saturating_sub(1);
        self.last_row = index;
        if gap == 0 {
            return Ok(Some(row));
        }
        self.blanks = gap - 1;
        self.pending = Some(row);
        Ok(Some(Vec::new()))
    }
}

impl<RS> Iterator for Rows<'_, RS>
where
    RS: Read + Seek,
{
    type Item = Result<Vec<Option<Cell>>, XlsxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.max_rows.is_some_and(|max| self.yielded >= max) {
            return None;
        }
        match self.next_row() {
            Ok(Some(mut row)) => {
                self.yielded += 1;
                if self.strip_trailing_empty {
                    strip_trailing_empty(&mut row);
                }
                Some(Ok(row))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Same as [`Rows`], yielding plain values with `Data::Empty` for absent cells
pub struct RowValues<'a, RS>
where
    RS: Read + Seek,
{
    rows: Rows<'a, RS>,
}

impl<'a, RS> RowValues<'a, RS>
where
    RS: Read + Seek,
{
    pub(crate) fn new(rows: Rows<'a, RS>) -> Self {
        RowValues { rows }
    }
}

impl<RS> Iterator for RowValues<'_, RS>
where
    RS: Read + Seek,
{
    type Item = Result<Vec<Data>, XlsxError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(row.map(|cells| {
            cells
                .into_iter()
                .map(|c| c.map_or(Data::Empty, Cell::into_value))
                .collect()
        }))
    }
}

fn decode_row(ctx: &DecodeContext<'_>, raw: &RawRow) -> Result<Vec<Option<Cell>>, XlsxError> {
    let width = raw.cells.iter().map(|c| c.pos.1).max().unwrap_or(0) as usize;
    let mut row = vec![None; width];
    for cell in &raw.cells {
        row[cell.pos.1 as usize - 1] = Some(ctx.decode(cell)?);
    }
    Ok(row)
}

fn strip_trailing_empty(row: &mut Vec<Option<Cell>>) {
    while row
        .last()
        .is_some_and(|c| c.as_ref().map_or(true, |c| c.get_value().is_empty()))
    {
        row.pop();
    }
}
