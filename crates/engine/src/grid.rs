//! Grid store: the ordered rows of cells that make up a chart.
//!
//! Row indices are dense and zero-based. Columns are slot indices within a
//! row; rows grow and shrink independently (a Rounds chart usually has more
//! stitches per round the further out it goes).
//!
//! Mutation is `pub(crate)`: commands, layouts and snapshot restore are the
//! only writers.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::cell_id::CellId;
use crate::error::ChartError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    /// Next id to hand out. Never decreases.
    next_id: u64,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells in `row`; 0 for rows that don't exist.
    pub fn column_count(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(column)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Total cells across all rows.
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Every cell with its address, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter().enumerate().map(move |(c, cell)| (r, c, cell))
        })
    }

    /// Current (row, column) of a cell, by linear scan.
    pub fn find_grid_position(&self, id: CellId) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(r, row)| {
            row.iter().position(|cell| cell.id == id).map(|c| (r, c))
        })
    }

    pub fn find_cell(&self, id: CellId) -> Option<&Cell> {
        let (row, column) = self.find_grid_position(id)?;
        self.cell(row, column)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.find_grid_position(id).is_some()
    }

    // =========================================================================
    // Crate-private mutation
    // =========================================================================

    pub(crate) fn allocate_id(&mut self) -> CellId {
        let id = CellId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Give `cell` an id if it doesn't carry one yet.
    pub(crate) fn assign_id(&mut self, cell: &mut Cell) {
        if !cell.id.is_assigned() {
            cell.id = self.allocate_id();
        }
    }

    /// Insert a row of cells at `row`, shifting later rows down.
    /// `row == row_count()` appends; anything larger would leave a gap.
    pub(crate) fn insert_row(&mut self, row: usize, mut cells: Vec<Cell>) -> Result<(), ChartError> {
        if row > self.rows.len() {
            return Err(ChartError::OutOfRange { row, column: 0 });
        }
        for cell in &mut cells {
            self.assign_id(cell);
        }
        self.rows.insert(row, cells);
        Ok(())
    }

    /// Insert `cell` at (row, column). `column == column_count(row)` appends.
    pub(crate) fn insert_cell(&mut self, row: usize, column: usize, mut cell: Cell) -> Result<CellId, ChartError> {
        if column > self.column_count(row) || row >= self.rows.len() {
            return Err(ChartError::OutOfRange { row, column });
        }
        self.assign_id(&mut cell);
        let id = cell.id;
        self.rows[row].insert(column, cell);
        Ok(id)
    }

    /// Remove a cell, returning it with the slot it occupied.
    pub(crate) fn remove_cell(&mut self, id: CellId) -> Option<(usize, usize, Cell)> {
        let (row, column) = self.find_grid_position(id)?;
        let cell = self.rows[row].remove(column);
        Some((row, column, cell))
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        let (row, column) = self.find_grid_position(id)?;
        self.rows.get_mut(row)?.get_mut(column)
    }

    pub(crate) fn cell_at_mut(&mut self, row: usize, column: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row)?.get_mut(column)
    }

    /// Keep `next_id` past `id` so it is never handed out again.
    pub(crate) fn reserve_id(&mut self, id: CellId) {
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Repair ids after deserializing: `next_id` moves past every id
    /// present, and unassigned or repeated ids get fresh ones. The first
    /// cell carrying a repeated id keeps it.
    pub(crate) fn reseat_ids(&mut self) {
        let max = self.cells().map(|(_, _, c)| c.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max + 1);

        let mut seen = FxHashSet::default();
        let reseat: Vec<(usize, usize)> = self
            .cells()
            .filter(|(_, _, cell)| !cell.id.is_assigned() || !seen.insert(cell.id))
            .map(|(r, c, _)| (r, c))
            .collect();
        for (r, c) in reseat {
            let id = self.allocate_id();
            self.rows[r][c].id = id;
        }
    }
}
