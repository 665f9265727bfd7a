// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::collections::BTreeMap;

use super::cells_reader::SheetTree;
use super::decoder::DecodeContext;
use super::XlsxError;
use crate::datatype::Cell;

/// Decoded cells of one sheet, keyed by 1-based (row, column)
#[derive(Debug, Default)]
pub(crate) struct CellStore {
    cells: BTreeMap<(u32, u32), Cell>,
}

impl CellStore {
    /// Decodes every cell of a materialized sheet
    pub(crate) fn populate(tree: &SheetTree, ctx: &DecodeContext<'_>) -> Result<Self, XlsxError> {
        let mut cells = BTreeMap::new();
        for row in tree.rows() {
            for raw in &row.cells {
                cells.insert(raw.pos, ctx.decode(raw)?);
            }
        }
        Ok(CellStore { cells })
    }

    pub(crate) fn read(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells.get(&(row, column))
    }

    /// Cells in row-major order
    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Decoding happens at most once per sheet
#[derive(Debug, Default)]
pub(crate) enum ScanState {
    #[default]
    Unscanned,
    Scanned(CellStore),
}

impl ScanState {
    pub(crate) fn get_or_scan<F>(&mut self, scan: F) -> Result<&CellStore, XlsxError>
    where
        F: FnOnce() -> Result<CellStore, XlsxError>,
    {
        if let ScanState::Unscanned = self {
            *self = ScanState::Scanned(scan()?);
        }
        match self {
            ScanState::Scanned(store) => Ok(store),
            ScanState::Unscanned => Err(XlsxError::Unexpected("sheet scan did not complete")),
        }
    }

    pub(crate) fn is_scanned(&self) -> bool {
        matches!(self, ScanState::Scanned(_))
    }
}
