//! Chart styles and their layout hooks.
//!
//! Every chart has exactly one style for its lifetime. Each style is a small
//! struct implementing [`ChartLayout`]; [`Layout`] is the closed set the
//! chart actually stores and dispatches through.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use stitchchart_core::{Point, Rect, Size};

use crate::cell::Cell;
use crate::cell_id::CellId;
use crate::error::ChartError;
use crate::geometry::{self, ChartMetrics};
use crate::grid::Grid;

/// Layout family of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartStyle {
    /// Flat rows laid out on a rectangular grid
    Rows,
    /// Concentric rounds laid out with trig
    Rounds,
    /// No computed layout; cells sit wherever they are put
    Blank,
}

impl ChartStyle {
    pub fn name(self) -> &'static str {
        match self {
            ChartStyle::Rows => "Rows",
            ChartStyle::Rounds => "Rounds",
            ChartStyle::Blank => "Blank",
        }
    }
}

impl std::fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Style-specific placement of cells.
pub trait ChartLayout {
    fn style(&self) -> ChartStyle;

    fn metrics(&self) -> &ChartMetrics;

    /// Computed position for a slot, or `None` when the style doesn't compute positions.
    fn position(&self, row: usize, column: usize, column_count: usize) -> Option<Point>;

    /// Closest valid slot to `pt`.
    fn locate(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)>;

    /// Where a cell dropped at `pt` is inserted. May be one past the last column.
    fn insertion_slot(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        self.locate(pt, grid)
    }

    /// Footprint of a cell at its layout position, before offset and stretch.
    fn base_bounds(&self, cell: &Cell) -> Rect {
        let size = self.span_size(cell);
        Rect::centered_at(cell.position(), size)
    }

    fn span_size(&self, cell: &Cell) -> Size {
        let cell_size = self.metrics().cell_size;
        Size::new(cell_size.width * cell.column_span() as f64, cell_size.height)
    }

    /// Scene-space footprint of a cell as drawn.
    fn cell_bounds(&self, cell: &Cell) -> Rect {
        let stretch = cell.stretch();
        self.base_bounds(cell)
            .translated(cell.offset())
            .scaled(stretch.x, stretch.y)
    }

    /// Cell drawn under `pt`, if any. The closest slot is tried first, then
    /// every cell, so moved cells can still be hit.
    fn hit_test(&self, pt: Point, grid: &Grid) -> Option<CellId> {
        if let Some((row, column)) = self.locate(pt, grid) {
            if let Some(cell) = grid.cell(row, column) {
                if self.cell_bounds(cell).contains(pt) {
                    return Some(cell.id());
                }
            }
        }
        grid.cells()
            .filter(|(_, _, cell)| self.cell_bounds(cell).contains(pt))
            .last()
            .map(|(_, _, cell)| cell.id())
    }

    /// Store the computed position of the cell at (row, column).
    ///
    /// Must run after the cell is in the grid: the position depends on the
    /// row's column count including that cell.
    fn set_cell_position(&self, grid: &mut Grid, row: usize, column: usize);

    /// Recompute every position in `row` so spacing stays uniform.
    fn redistribute_cells(&self, grid: &mut Grid, row: usize) {
        for column in 0..grid.column_count(row) {
            self.set_cell_position(grid, row, column);
        }
    }

    /// Add `cell` at the end of `row` and position it.
    fn append_cell(&self, grid: &mut Grid, row: usize, cell: Cell) -> Result<CellId, ChartError>;

    /// Seed `rows` rows of `columns` copies of `prototype`. `row_size`, when
    /// given, replaces the cell footprint used by the layout.
    fn create_chart(
        &mut self,
        grid: &mut Grid,
        rows: usize,
        columns: usize,
        prototype: &Cell,
        row_size: Option<Size>,
    ) -> Result<(), ChartError>;
}

fn set_computed_position(grid: &mut Grid, row: usize, column: usize, position: Option<Point>) {
    if let (Some(position), Some(cell)) = (position, grid.cell_at_mut(row, column)) {
        cell.position = position;
    }
}

fn seed_rows<L: ChartLayout + ?Sized>(
    layout: &L,
    grid: &mut Grid,
    rows: usize,
    columns: usize,
    prototype: &Cell,
) -> Result<(), ChartError> {
    for _ in 0..rows {
        let row = grid.row_count();
        let cells = (0..columns).map(|_| fresh_copy(prototype)).collect();
        grid.insert_row(row, cells)?;
        layout.redistribute_cells(grid, row);
    }
    Ok(())
}

/// Move every existing row onto the current metrics.
fn respace_rows<L: ChartLayout + ?Sized>(layout: &L, grid: &mut Grid) {
    for row in 0..grid.row_count() {
        layout.redistribute_cells(grid, row);
    }
}

/// Copy of `prototype` that will get its own id on insert.
pub(crate) fn fresh_copy(prototype: &Cell) -> Cell {
    let mut cell = prototype.clone();
    cell.id = CellId::UNASSIGNED;
    cell
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RowsLayout {
    metrics: ChartMetrics,
}

impl RowsLayout {
    pub fn new(metrics: ChartMetrics) -> Self {
        Self { metrics }
    }
}

impl ChartLayout for RowsLayout {
    fn style(&self) -> ChartStyle {
        ChartStyle::Rows
    }

    fn metrics(&self) -> &ChartMetrics {
        &self.metrics
    }

    fn position(&self, row: usize, column: usize, _column_count: usize) -> Option<Point> {
        Some(geometry::rows_position(row, column, &self.metrics))
    }

    fn locate(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        geometry::rows_locate(pt, &self.metrics, grid.row_count(), |row| grid.column_count(row))
    }

    fn base_bounds(&self, cell: &Cell) -> Rect {
        // Rows positions are the slot's top-left corner
        Rect::new(cell.position(), self.span_size(cell))
    }

    fn set_cell_position(&self, grid: &mut Grid, row: usize, column: usize) {
        let position = self.position(row, column, grid.column_count(row));
        set_computed_position(grid, row, column, position);
    }

    fn append_cell(&self, grid: &mut Grid, row: usize, cell: Cell) -> Result<CellId, ChartError> {
        let column = grid.column_count(row);
        let id = grid.insert_cell(row, column, cell)?;
        // Linear spacing: earlier cells don't move
        self.set_cell_position(grid, row, column);
        Ok(id)
    }

    fn create_chart(
        &mut self,
        grid: &mut Grid,
        rows: usize,
        columns: usize,
        prototype: &Cell,
        row_size: Option<Size>,
    ) -> Result<(), ChartError> {
        if let Some(size) = row_size.filter(|s| !s.is_empty()) {
            self.metrics.cell_size = size;
            respace_rows(self, grid);
        }
        seed_rows(self, grid, rows, columns, prototype)
    }
}

// =============================================================================
// Rounds
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RoundsLayout {
    metrics: ChartMetrics,
}

impl RoundsLayout {
    pub fn new(metrics: ChartMetrics) -> Self {
        Self { metrics }
    }

    pub fn closest_row(&self, pt: Point, grid: &Grid) -> Option<usize> {
        geometry::closest_row(pt, &self.metrics, grid.row_count())
    }

    pub fn closest_column(&self, pt: Point, row: usize, grid: &Grid) -> usize {
        geometry::closest_column(pt, self.metrics.origin, grid.column_count(row))
    }
}

impl ChartLayout for RoundsLayout {
    fn style(&self) -> ChartStyle {
        ChartStyle::Rounds
    }

    fn metrics(&self) -> &ChartMetrics {
        &self.metrics
    }

    fn position(&self, row: usize, column: usize, column_count: usize) -> Option<Point> {
        Some(geometry::rounds_position(row, column, column_count, &self.metrics))
    }

    fn locate(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        let row = self.closest_row(pt, grid)?;
        Some((row, self.closest_column(pt, row, grid)))
    }

    fn set_cell_position(&self, grid: &mut Grid, row: usize, column: usize) {
        let position = self.position(row, column, grid.column_count(row));
        set_computed_position(grid, row, column, position);
    }

    fn append_cell(&self, grid: &mut Grid, row: usize, cell: Cell) -> Result<CellId, ChartError> {
        let column = grid.column_count(row);
        let id = grid.insert_cell(row, column, cell)?;
        // Angular spacing depends on the count, so the whole round moves
        self.redistribute_cells(grid, row);
        Ok(id)
    }

    fn create_chart(
        &mut self,
        grid: &mut Grid,
        rows: usize,
        columns: usize,
        prototype: &Cell,
        row_size: Option<Size>,
    ) -> Result<(), ChartError> {
        if let Some(size) = row_size.filter(|s| !s.is_empty()) {
            self.metrics.cell_size = size;
            self.metrics.row_spacing = size.height;
            respace_rows(self, grid);
        }
        seed_rows(self, grid, rows, columns, prototype)
    }
}

// =============================================================================
// Blank
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BlankLayout {
    metrics: ChartMetrics,
}

impl BlankLayout {
    pub fn new(metrics: ChartMetrics) -> Self {
        Self { metrics }
    }
}

impl ChartLayout for BlankLayout {
    fn style(&self) -> ChartStyle {
        ChartStyle::Blank
    }

    fn metrics(&self) -> &ChartMetrics {
        &self.metrics
    }

    fn position(&self, _row: usize, _column: usize, _column_count: usize) -> Option<Point> {
        None
    }

    /// Slot of the nearest cell; the end of the last row when there are no cells.
    fn locate(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        let nearest = grid
            .cells()
            .min_by_key(|(_, _, cell)| OrderedFloat(cell.scene_pos().distance_to(pt)))
            .map(|(row, column, _)| (row, column));
        nearest.or_else(|| {
            let last = grid.row_count().checked_sub(1)?;
            Some((last, grid.column_count(last)))
        })
    }

    fn insertion_slot(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        let (row, _) = self.locate(pt, grid)?;
        Some((row, grid.column_count(row)))
    }

    fn hit_test(&self, pt: Point, grid: &Grid) -> Option<CellId> {
        grid.cells()
            .filter(|(_, _, cell)| self.cell_bounds(cell).contains(pt))
            .last()
            .map(|(_, _, cell)| cell.id())
    }

    fn set_cell_position(&self, _grid: &mut Grid, _row: usize, _column: usize) {}

    fn append_cell(&self, grid: &mut Grid, row: usize, cell: Cell) -> Result<CellId, ChartError> {
        let column = grid.column_count(row);
        grid.insert_cell(row, column, cell)
    }

    /// Blank charts start without stitches: only the empty rows are created.
    fn create_chart(
        &mut self,
        grid: &mut Grid,
        rows: usize,
        _columns: usize,
        _prototype: &Cell,
        row_size: Option<Size>,
    ) -> Result<(), ChartError> {
        if let Some(size) = row_size.filter(|s| !s.is_empty()) {
            self.metrics.cell_size = size;
        }
        for _ in 0..rows {
            grid.insert_row(grid.row_count(), Vec::new())?;
        }
        Ok(())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// The layout a chart stores: one of the three styles.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Rows(RowsLayout),
    Rounds(RoundsLayout),
    Blank(BlankLayout),
}

impl Layout {
    pub fn new(style: ChartStyle, metrics: ChartMetrics) -> Self {
        match style {
            ChartStyle::Rows => Layout::Rows(RowsLayout::new(metrics)),
            ChartStyle::Rounds => Layout::Rounds(RoundsLayout::new(metrics)),
            ChartStyle::Blank => Layout::Blank(BlankLayout::new(metrics)),
        }
    }

    fn inner(&self) -> &dyn ChartLayout {
        match self {
            Layout::Rows(l) => l,
            Layout::Rounds(l) => l,
            Layout::Blank(l) => l,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ChartLayout {
        match self {
            Layout::Rows(l) => l,
            Layout::Rounds(l) => l,
            Layout::Blank(l) => l,
        }
    }
}

impl ChartLayout for Layout {
    fn style(&self) -> ChartStyle {
        self.inner().style()
    }

    fn metrics(&self) -> &ChartMetrics {
        self.inner().metrics()
    }

    fn position(&self, row: usize, column: usize, column_count: usize) -> Option<Point> {
        self.inner().position(row, column, column_count)
    }

    fn locate(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        self.inner().locate(pt, grid)
    }

    fn insertion_slot(&self, pt: Point, grid: &Grid) -> Option<(usize, usize)> {
        self.inner().insertion_slot(pt, grid)
    }

    fn base_bounds(&self, cell: &Cell) -> Rect {
        self.inner().base_bounds(cell)
    }

    fn span_size(&self, cell: &Cell) -> Size {
        self.inner().span_size(cell)
    }

    fn cell_bounds(&self, cell: &Cell) -> Rect {
        self.inner().cell_bounds(cell)
    }

    fn hit_test(&self, pt: Point, grid: &Grid) -> Option<CellId> {
        self.inner().hit_test(pt, grid)
    }

    fn set_cell_position(&self, grid: &mut Grid, row: usize, column: usize) {
        self.inner().set_cell_position(grid, row, column)
    }

    fn redistribute_cells(&self, grid: &mut Grid, row: usize) {
        self.inner().redistribute_cells(grid, row)
    }

    fn append_cell(&self, grid: &mut Grid, row: usize, cell: Cell) -> Result<CellId, ChartError> {
        self.inner().append_cell(grid, row, cell)
    }

    fn create_chart(
        &mut self,
        grid: &mut Grid,
        rows: usize,
        columns: usize,
        prototype: &Cell,
        row_size: Option<Size>,
    ) -> Result<(), ChartError> {
        self.inner_mut().create_chart(grid, rows, columns, prototype, row_size)
    }
}
