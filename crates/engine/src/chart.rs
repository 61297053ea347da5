//! The chart document.
//!
//! `Chart` owns the grid, its layout, the indicator overlay, the selection
//! and the undo history (one history per chart). Every edit a caller can
//! make to an existing cell is built as a [`Command`] and executed through
//! the history; the resulting events reach subscribers before the call
//! returns.
//!
//! Seeding calls (`create_row`, `create_chart`, `append_cell`) build the
//! document's structure and are not undoable.

use serde::{Deserialize, Serialize};
use stitchchart_config::ChartSettings;
use stitchchart_core::{Color, Point, Polygon, Rect, Size};

use crate::cell::{Cell, ColorRole};
use crate::cell_id::CellId;
use crate::command::Command;
use crate::error::ChartError;
use crate::events::{ChartEvent, EventCallback};
use crate::geometry::{self, ChartMetrics};
use crate::gesture::GestureState;
use crate::grid::Grid;
use crate::history::{UndoStack, DEFAULT_HISTORY_LIMIT};
use crate::indicator::{Indicator, IndicatorId, IndicatorOverlay};
use crate::layout::{fresh_copy, ChartLayout, ChartStyle, Layout};
use crate::mode::EditMode;
use crate::selection::{RubberBand, Selection};

pub struct Chart {
    pub(crate) grid: Grid,
    pub(crate) layout: Layout,
    pub(crate) history: UndoStack,
    pub(crate) overlay: IndicatorOverlay,
    pub(crate) selection: Selection,
    pub(crate) rubber_band: RubberBand,
    pub(crate) gesture: GestureState,
    mode: EditMode,
    edit_stitch: String,
    edit_fg_color: Color,
    edit_bg_color: Color,
    listeners: Vec<EventCallback>,
}

impl std::fmt::Debug for Chart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart")
            .field("style", &self.style())
            .field("rows", &self.grid.row_count())
            .field("cells", &self.grid.cell_count())
            .field("mode", &self.mode)
            .field("history", &self.history.index())
            .finish_non_exhaustive()
    }
}

impl Chart {
    pub fn new(style: ChartStyle, metrics: ChartMetrics) -> Self {
        Self {
            grid: Grid::new(),
            layout: Layout::new(style, metrics),
            history: UndoStack::with_limit(DEFAULT_HISTORY_LIMIT),
            overlay: IndicatorOverlay::default(),
            selection: Selection::new(),
            rubber_band: RubberBand::new(),
            gesture: GestureState::default(),
            mode: EditMode::default(),
            edit_stitch: String::from("ch"),
            edit_fg_color: Color::BLACK,
            edit_bg_color: Color::WHITE,
            listeners: Vec::new(),
        }
    }

    pub fn from_settings(style: ChartStyle, settings: &ChartSettings) -> Self {
        let mut chart = Self::new(style, ChartMetrics::from_settings(settings));
        chart.apply_settings(settings);
        chart
    }

    /// Everything in `settings` except the metrics. Resets the history and
    /// the indicator overlay, so it only runs on a fresh chart.
    fn apply_settings(&mut self, settings: &ChartSettings) {
        self.history = UndoStack::with_limit(settings.history_limit);
        self.overlay = IndicatorOverlay::new(settings.indicator_hit_radius);
        self.edit_stitch = settings.default_stitch.clone();
        self.edit_fg_color = settings.foreground_color;
        self.edit_bg_color = settings.background_color;
    }

    pub fn style(&self) -> ChartStyle {
        self.layout.style()
    }

    pub fn metrics(&self) -> &ChartMetrics {
        self.layout.metrics()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // =========================================================================
    // Edit context
    // =========================================================================

    pub fn set_edit_mode(&mut self, mode: EditMode) {
        self.mode = mode;
    }

    pub fn edit_mode(&self) -> EditMode {
        self.mode
    }

    /// Menu names of every edit mode.
    pub fn modes(&self) -> Vec<&'static str> {
        EditMode::names()
    }

    pub fn set_edit_stitch(&mut self, stitch: impl Into<String>) {
        self.edit_stitch = stitch.into();
    }

    pub fn edit_stitch(&self) -> &str {
        &self.edit_stitch
    }

    pub fn set_edit_fg_color(&mut self, color: Color) {
        self.edit_fg_color = color;
    }

    pub fn edit_fg_color(&self) -> Color {
        self.edit_fg_color
    }

    pub fn set_edit_bg_color(&mut self, color: Color) {
        self.edit_bg_color = color;
    }

    pub fn edit_bg_color(&self) -> Color {
        self.edit_bg_color
    }

    /// A new cell in the current edit colors.
    pub fn new_cell(&self, stitch: impl Into<String>) -> Cell {
        Cell::new(stitch).with_colors(self.edit_fg_color, self.edit_bg_color)
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register a listener. Events arrive synchronously, in order, after
    /// the command that caused them has been applied or undone.
    pub fn subscribe(&mut self, listener: EventCallback) {
        self.listeners.push(listener);
    }

    fn emit(&mut self, events: &[ChartEvent]) {
        for event in events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
    }

    /// Bring derived state in line with the grid, then notify.
    fn after_change(&mut self, events: Vec<ChartEvent>) {
        self.overlay.sync_to_cells(&self.grid);
        self.selection.retain_existing(&self.grid);
        self.emit(&events);
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Create row `row` with `column_count` cells of `stitch`. Later rows
    /// shift down; a row past the end would leave a gap and is rejected.
    pub fn create_row(&mut self, row: usize, column_count: usize, stitch: &str) -> Result<(), ChartError> {
        if row > self.grid.row_count() {
            log::warn!("create_row: row {} would leave a gap ({} rows)", row, self.grid.row_count());
            return Err(ChartError::OutOfRange { row, column: 0 });
        }

        let prototype = self.new_cell(stitch);
        let cells = (0..column_count).map(|_| fresh_copy(&prototype)).collect();
        self.grid.insert_row(row, cells)?;
        self.history.row_inserted(row);
        for r in row..self.grid.row_count() {
            self.layout.redistribute_cells(&mut self.grid, r);
        }

        let events = self.added_events(row..row + 1);
        self.after_change(events);
        Ok(())
    }

    /// Append `rows` rows of `columns` cells of `stitch` using the style's
    /// seeding rules. `row_size` replaces the layout's cell size and
    /// respaces the rows already there.
    pub fn create_chart(
        &mut self,
        rows: usize,
        columns: usize,
        stitch: &str,
        row_size: Option<Size>,
    ) -> Result<(), ChartError> {
        let first = self.grid.row_count();
        let prototype = self.new_cell(stitch);
        self.layout
            .create_chart(&mut self.grid, rows, columns, &prototype, row_size)?;
        log::debug!(
            "create_chart: {} {}x{} from row {}",
            self.style(),
            rows,
            columns,
            first
        );

        let events = self.added_events(first..self.grid.row_count());
        self.after_change(events);
        Ok(())
    }

    /// Add `cell` to the end of `row`, positioned by the style.
    pub fn append_cell(&mut self, row: usize, cell: Cell) -> Result<CellId, ChartError> {
        if row >= self.grid.row_count() {
            return Err(ChartError::OutOfRange { row, column: self.column_count(row) });
        }
        let id = self.layout.append_cell(&mut self.grid, row, cell)?;
        let column = self.grid.column_count(row) - 1;
        self.after_change(vec![ChartEvent::CellAdded { cell: id, row, column }]);
        Ok(id)
    }

    fn added_events(&self, rows: std::ops::Range<usize>) -> Vec<ChartEvent> {
        rows.flat_map(|row| {
            self.grid.row(row).unwrap_or_default().iter().enumerate().map(move |(column, cell)| {
                ChartEvent::CellAdded { cell: cell.id(), row, column }
            })
        })
        .collect()
    }

    /// Insert `cell` at the slot nearest `point` (undoable). Blank charts
    /// keep `point` as the cell's position.
    pub fn add_cell(&mut self, point: Point, mut cell: Cell) -> Result<CellId, ChartError> {
        let (row, column) = self
            .layout
            .insertion_slot(point, &self.grid)
            .ok_or(ChartError::EmptyChart)?;

        if self.style() == ChartStyle::Blank {
            cell.position = point;
        }
        cell.id = self.grid.allocate_id();
        let id = cell.id;
        self.execute(Command::add_cell(row, column, cell));
        Ok(id)
    }

    /// Remove a cell (undoable); the rest of its row closes up.
    pub fn remove_cell(&mut self, id: CellId) -> Result<(), ChartError> {
        let Some(command) = Command::remove_cell(&self.grid, id) else {
            log::warn!("remove_cell: {} is not in the chart", id);
            return Err(ChartError::CellNotFound(id));
        };
        self.execute(command);
        Ok(())
    }

    /// Respace every cell in `row` for its current column count.
    pub fn redistribute_cells(&mut self, row: usize) {
        self.layout.redistribute_cells(&mut self.grid, row);
        self.overlay.sync_to_cells(&self.grid);
    }

    // =========================================================================
    // Cell edits
    // =========================================================================

    pub fn set_cell_stitch(&mut self, id: CellId, stitch: impl Into<String>) -> Result<(), ChartError> {
        let command = Command::set_cell_stitch(&self.grid, id, stitch).ok_or(ChartError::CellNotFound(id))?;
        self.execute(command);
        Ok(())
    }

    pub fn set_cell_color(&mut self, id: CellId, role: ColorRole, color: Color) -> Result<(), ChartError> {
        let command = Command::set_cell_color(&self.grid, id, role, color).ok_or(ChartError::CellNotFound(id))?;
        self.execute(command);
        Ok(())
    }

    pub fn set_cell_rotation(&mut self, id: CellId, degrees: f64) -> Result<(), ChartError> {
        let command = Command::set_cell_rotation(&self.grid, id, degrees).ok_or(ChartError::CellNotFound(id))?;
        self.execute(command);
        Ok(())
    }

    /// Apply and record `command`. Commands that change nothing are dropped,
    /// and so are inserts into missing rows, inserts of ids already in the
    /// chart and removals of cells that are not.
    pub fn execute(&mut self, command: Command) -> bool {
        if command.is_noop() {
            return false;
        }
        let text = command.text();
        let command = match command.prepare(&mut self.grid) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("execute: {} rejected: {}", text, e);
                return false;
            }
        };
        let events = self.history.push(command, &mut self.grid, &self.layout);
        self.after_change(events);
        true
    }

    // =========================================================================
    // History
    // =========================================================================

    pub fn undo_stack(&self) -> &UndoStack {
        &self.history
    }

    /// Revert the last command; false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.grid, &self.layout) {
            Some(events) => {
                self.after_change(events);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone command; false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.grid, &self.layout) {
            Some(events) => {
                self.after_change(events);
                true
            }
            None => false,
        }
    }

    /// Mark the current state as saved.
    pub fn set_clean(&mut self) {
        self.history.set_clean();
    }

    pub fn is_modified(&self) -> bool {
        !self.history.is_clean()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn row_count(&self) -> usize {
        self.grid.row_count()
    }

    pub fn column_count(&self, row: usize) -> usize {
        self.grid.column_count(row)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.grid.cell(row, column)
    }

    /// Cell drawn under `point`.
    pub fn cell_at(&self, point: Point) -> Option<&Cell> {
        let id = self.layout.hit_test(point, &self.grid)?;
        self.grid.find_cell(id)
    }

    pub fn cell_by_id(&self, id: CellId) -> Option<&Cell> {
        self.grid.find_cell(id)
    }

    pub fn find_grid_position(&self, id: CellId) -> Option<(usize, usize)> {
        self.grid.find_grid_position(id)
    }

    /// Closest (row, column) to `point`.
    pub fn locate(&self, point: Point) -> Option<(usize, usize)> {
        self.layout.locate(point, &self.grid)
    }

    /// Computed position of a slot; `None` on Blank charts.
    pub fn position(&self, row: usize, column: usize) -> Option<Point> {
        self.layout.position(row, column, self.grid.column_count(row))
    }

    pub fn cell_bounds(&self, id: CellId) -> Option<Rect> {
        self.grid.find_cell(id).map(|cell| self.layout.cell_bounds(cell))
    }

    /// Area covered by every cell and indicator.
    pub fn scene_bounds(&self) -> Option<Rect> {
        let rects = self
            .grid
            .cells()
            .map(|(_, _, cell)| self.layout.cell_bounds(cell))
            .chain(
                self.overlay
                    .indicators()
                    .iter()
                    .map(|i| Rect::from_corners(i.position(), i.position())),
            );
        let corners: Vec<Point> = rects
            .flat_map(|r| [r.top_left(), Point::new(r.right(), r.bottom())])
            .collect();
        Polygon::new(corners).bounding_rect()
    }

    /// Anchor points for the demo watermark tiled over the chart.
    pub fn demo_watermarks(&self, spacing: Size) -> Vec<Point> {
        self.scene_bounds()
            .map(|bounds| geometry::demo_watermarks(bounds, spacing))
            .unwrap_or_default()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn rubber_band(&self) -> &RubberBand {
        &self.rubber_band
    }

    /// Stretch the active rubber band by (dx, dy) from its start point.
    pub fn update_rubber_band(&mut self, dx: f64, dy: f64) {
        self.rubber_band.update_rubber_band(dx, dy);
    }

    /// Select every cell touching `polygon`.
    pub fn update_selection(&mut self, polygon: &Polygon) -> &[CellId] {
        self.selection.update_selection(polygon, &self.grid, &self.layout)
    }

    pub fn select_cell(&mut self, id: CellId) -> bool {
        if !self.grid.contains(id) {
            return false;
        }
        self.selection.select_only(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Set the edit stitch on every selected cell as one undo step.
    pub fn apply_stitch_to_selection(&mut self) -> bool {
        let stitch = self.edit_stitch.clone();
        let commands = self
            .selection
            .cells()
            .iter()
            .filter_map(|&id| Command::set_cell_stitch(&self.grid, id, stitch.clone()))
            .collect();
        self.execute_batch("Change stitches", commands)
    }

    /// Set the edit color for `role` on every selected cell as one undo step.
    pub fn apply_color_to_selection(&mut self, role: ColorRole) -> bool {
        let color = match role {
            ColorRole::Foreground => self.edit_fg_color,
            ColorRole::Background => self.edit_bg_color,
        };
        let commands = self
            .selection
            .cells()
            .iter()
            .filter_map(|&id| Command::set_cell_color(&self.grid, id, role, color))
            .collect();
        self.execute_batch("Change colors", commands)
    }

    /// Remove every selected cell as one undo step.
    pub fn remove_selected_cells(&mut self) -> bool {
        let removed = self.selection.cells().to_vec();
        let mut commands = Vec::with_capacity(removed.len());
        // Capture each cell's slot as it will be once the earlier removals
        // ran, so undo reinserts at exactly the right columns.
        let mut scratch = self.grid.clone();
        for id in removed {
            if let Some(command) = Command::remove_cell(&scratch, id) {
                scratch.remove_cell(id);
                commands.push(command);
            }
        }
        let changed = self.execute_batch("Remove stitches", commands);
        if changed {
            self.selection.clear();
        }
        changed
    }

    pub(crate) fn execute_batch(&mut self, text: &str, commands: Vec<Command>) -> bool {
        let commands: Vec<Command> = commands.into_iter().filter(|c| !c.is_noop()).collect();
        match Command::batch(text, commands) {
            Some(command) => self.execute(command),
            None => false,
        }
    }

    // =========================================================================
    // Indicators
    // =========================================================================

    pub fn add_indicator(&mut self, indicator: Indicator) -> IndicatorId {
        self.overlay.add_indicator(indicator, &self.grid)
    }

    pub fn remove_indicator(&mut self, id: IndicatorId) -> Option<Indicator> {
        self.overlay.remove_indicator(id)
    }

    pub fn indicator(&self, id: IndicatorId) -> Option<&Indicator> {
        self.overlay.indicator(id)
    }

    pub fn indicators(&self) -> &[Indicator] {
        self.overlay.indicators()
    }

    pub fn indicator_at(&self, point: Point) -> Option<IndicatorId> {
        self.overlay.indicator_at(point)
    }

    pub fn move_indicator(&mut self, id: IndicatorId, to: Point) -> bool {
        self.overlay.move_indicator(id, to, &self.grid)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Owned copy of the document for a save worker. Edit mode, selection
    /// and history are not part of it.
    pub fn snapshot(&self) -> ChartSnapshot {
        ChartSnapshot {
            style: self.style(),
            metrics: *self.metrics(),
            grid: self.grid.clone(),
            indicators: self.overlay.indicators().to_vec(),
        }
    }

    /// Rebuild a chart from a snapshot, with an empty history. History
    /// limit, indicator hit radius and edit context are the defaults; use
    /// [`Chart::restore_with_settings`] to take them from settings.
    pub fn restore(snapshot: ChartSnapshot) -> Self {
        let chart = Self::new(snapshot.style, snapshot.metrics);
        chart.load(snapshot)
    }

    /// Rebuild a chart from a snapshot using `settings` for everything the
    /// snapshot doesn't carry. The snapshot's metrics win over the
    /// settings' cell size.
    pub fn restore_with_settings(snapshot: ChartSnapshot, settings: &ChartSettings) -> Self {
        let mut chart = Self::new(snapshot.style, snapshot.metrics);
        chart.apply_settings(settings);
        chart.load(snapshot)
    }

    fn load(mut self, snapshot: ChartSnapshot) -> Self {
        self.grid = snapshot.grid;
        self.grid.reseat_ids();
        for row in 0..self.grid.row_count() {
            self.layout.redistribute_cells(&mut self.grid, row);
        }
        self.overlay.restore(snapshot.indicators);
        self.overlay.sync_to_cells(&self.grid);
        self
    }
}

/// Serializable state of a chart document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSnapshot {
    pub style: ChartStyle,
    pub metrics: ChartMetrics,
    pub grid: Grid,
    pub indicators: Vec<Indicator>,
}

impl ChartSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCollector;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rounds_metrics() -> ChartMetrics {
        ChartMetrics {
            origin: Point::ORIGIN,
            cell_size: Size::new(8.0, 8.0),
            row_spacing: 10.0,
            base_radius: 10.0,
        }
    }

    fn rows_metrics() -> ChartMetrics {
        ChartMetrics {
            origin: Point::ORIGIN,
            cell_size: Size::new(10.0, 10.0),
            row_spacing: 10.0,
            base_radius: 10.0,
        }
    }

    fn angles(chart: &Chart, row: usize) -> Vec<f64> {
        chart
            .grid()
            .row(row)
            .unwrap()
            .iter()
            .map(|c| geometry::scene_pos_to_angle(c.position(), Point::ORIGIN).round())
            .collect()
    }

    fn collect_events(chart: &mut Chart) -> Rc<RefCell<EventCollector>> {
        let collector = Rc::new(RefCell::new(EventCollector::new()));
        let sink = Rc::clone(&collector);
        chart.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));
        collector
    }

    #[test]
    fn test_rounds_create_row_and_remove() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        chart.create_row(0, 4, "sc").unwrap();

        for cell in chart.grid().row(0).unwrap() {
            assert!((cell.position().length() - 10.0).abs() < 1e-9);
        }
        assert_eq!(angles(&chart, 0), vec![0.0, 90.0, 180.0, 270.0]);

        let id = chart.cell(0, 1).unwrap().id();
        chart.remove_cell(id).unwrap();
        chart.redistribute_cells(0);
        assert_eq!(angles(&chart, 0), vec![0.0, 120.0, 240.0]);
    }

    #[test]
    fn test_append_cell_respaces_round() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        chart.create_row(0, 3, "sc").unwrap();
        let id = chart.append_cell(0, Cell::new("inc")).unwrap();

        assert_eq!(chart.find_grid_position(id), Some((0, 3)));
        assert_eq!(angles(&chart, 0), vec![0.0, 90.0, 180.0, 270.0]);
        assert!(!chart.undo_stack().can_undo());
        assert_eq!(
            chart.append_cell(4, Cell::new("sc")),
            Err(ChartError::OutOfRange { row: 4, column: 0 })
        );
    }

    #[test]
    fn test_out_of_range_lookup_is_none() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(3, 4, "ch", None).unwrap();
        assert_eq!(chart.row_count(), 3);
        assert!(chart.cell(5, 2).is_none());
        assert_eq!(chart.column_count(5), 0);
        assert!(chart.cell_at(Point::new(-100.0, -100.0)).is_none());
    }

    #[test]
    fn test_create_row_rejects_gap() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        assert_eq!(
            chart.create_row(1, 3, "sc"),
            Err(ChartError::OutOfRange { row: 1, column: 0 })
        );
        chart.create_row(0, 3, "sc").unwrap();
        chart.create_row(1, 2, "dc").unwrap();
        assert_eq!(chart.column_count(1), 2);
    }

    #[test]
    fn test_create_row_in_middle_repositions_later_rows() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_row(0, 2, "a").unwrap();
        chart.create_row(1, 2, "c").unwrap();
        chart.create_row(1, 2, "b").unwrap();

        let moved = chart.cell(2, 0).unwrap();
        assert_eq!(moved.stitch(), "c");
        assert_eq!(moved.position(), Point::new(0.0, 20.0));
    }

    #[test]
    fn test_create_row_uses_edit_colors() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        let red = Color::from_hex(0xFF0000);
        chart.set_edit_fg_color(red);
        chart.create_row(0, 1, "sc").unwrap();
        assert_eq!(chart.cell(0, 0).unwrap().fg_color(), red);
    }

    #[test]
    fn test_add_then_remove_restores_counts() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(2, 3, "ch", None).unwrap();
        let (rows, cols) = (chart.row_count(), chart.column_count(1));

        let id = chart.add_cell(Point::new(15.0, 15.0), Cell::new("sc")).unwrap();
        assert_eq!(chart.find_grid_position(id), Some((1, 1)));
        assert_eq!(chart.column_count(1), cols + 1);

        chart.remove_cell(id).unwrap();
        assert_eq!(chart.row_count(), rows);
        assert_eq!(chart.column_count(1), cols);
    }

    #[test]
    fn test_add_cell_on_empty_chart_fails() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        assert_eq!(
            chart.add_cell(Point::new(1.0, 1.0), Cell::new("sc")),
            Err(ChartError::EmptyChart)
        );
        assert!(!chart.undo_stack().can_undo());
    }

    #[test]
    fn test_add_cell_is_undoable() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        chart.create_row(0, 3, "sc").unwrap();
        let before = chart.grid().clone();

        let id = chart.add_cell(Point::new(10.0, 0.0), Cell::new("inc")).unwrap();
        assert_eq!(chart.column_count(0), 4);
        assert_eq!(chart.cell_by_id(id).unwrap().stitch(), "inc");

        assert!(chart.undo());
        assert_eq!(chart.column_count(0), 3);
        // Only the id counter moved on
        assert_eq!(chart.grid().rows(), before.rows());

        assert!(chart.redo());
        assert_eq!(chart.find_grid_position(id), Some((0, 0)));
    }

    #[test]
    fn test_remove_unknown_cell() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        assert_eq!(chart.remove_cell(CellId(42)), Err(ChartError::CellNotFound(CellId(42))));
    }

    #[test]
    fn test_blank_add_cell_keeps_point() {
        let mut chart = Chart::new(ChartStyle::Blank, rows_metrics());
        chart.create_chart(1, 10, "ch", None).unwrap();
        assert_eq!(chart.grid().cell_count(), 0);

        let p = Point::new(37.5, -12.0);
        let id = chart.add_cell(p, Cell::new("sc")).unwrap();
        assert_eq!(chart.cell_by_id(id).unwrap().position(), p);
        assert_eq!(chart.cell_at(p).map(Cell::id), Some(id));
        assert!(chart.position(0, 0).is_none());
    }

    #[test]
    fn test_stitch_edit_undo_redo_and_events() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(1, 2, "ch", None).unwrap();
        let events = collect_events(&mut chart);
        let id = chart.cell(0, 0).unwrap().id();

        chart.set_cell_stitch(id, "sc").unwrap();
        assert!(chart.undo());
        assert!(chart.redo());

        assert_eq!(
            events.borrow().stitch_changes(),
            vec![("ch", "sc"), ("sc", "ch"), ("ch", "sc")]
        );
        assert_eq!(chart.cell(0, 0).unwrap().stitch(), "sc");
    }

    #[test]
    fn test_noop_edit_not_recorded() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(1, 1, "ch", None).unwrap();
        let id = chart.cell(0, 0).unwrap().id();
        chart.set_cell_stitch(id, "ch").unwrap();
        assert!(!chart.undo_stack().can_undo());
        assert!(!chart.undo());
        assert!(!chart.redo());
    }

    #[test]
    fn test_create_chart_emits_cell_added() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        let events = collect_events(&mut chart);
        chart.create_chart(2, 3, "ch", None).unwrap();
        assert_eq!(events.borrow().structure_changes(), (6, 0));
    }

    #[test]
    fn test_color_batch_is_one_undo_step() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(2, 2, "ch", None).unwrap();
        let events = collect_events(&mut chart);

        let everything = Polygon::from(Rect::from_corners(Point::new(-1.0, -1.0), Point::new(50.0, 50.0)));
        assert_eq!(chart.update_selection(&everything).len(), 4);

        let blue = Color::from_hex(0x0000FF);
        chart.set_edit_bg_color(blue);
        assert!(chart.apply_color_to_selection(ColorRole::Background));
        assert_eq!(chart.undo_stack().count(), 1);
        assert!(chart.grid().cells().all(|(_, _, c)| c.bg_color() == blue));
        assert_eq!(events.borrow().color_changes().len(), 4);

        chart.undo();
        assert!(chart.grid().cells().all(|(_, _, c)| c.bg_color() == Color::WHITE));
    }

    #[test]
    fn test_remove_selected_cells_undo_restores_order() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(1, 5, "ch", None).unwrap();
        let ids: Vec<_> = chart.grid().row(0).unwrap().iter().map(Cell::id).collect();
        let before = chart.grid().clone();

        chart.selection.insert(ids[3]);
        chart.selection.insert(ids[1]);
        assert!(chart.remove_selected_cells());
        assert_eq!(chart.column_count(0), 3);
        assert!(chart.selection().is_empty());

        assert!(chart.undo());
        assert_eq!(chart.grid(), &before);
    }

    #[test]
    fn test_tracking_indicator_follows_redistribution() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        chart.create_row(0, 4, "sc").unwrap();
        let tracked = chart.cell(0, 2).unwrap().id();
        let at = chart.cell(0, 2).unwrap().position();
        let ind = chart.add_indicator(Indicator::new(at, "here").tracking(tracked));

        let removed = chart.cell(0, 1).unwrap().id();
        chart.remove_cell(removed).unwrap();
        let now = chart.cell_by_id(tracked).unwrap().position();
        assert!(chart.indicator(ind).unwrap().position().approx_eq(now, 1e-9));

        assert!(chart.remove_indicator(ind).is_some());
        assert!(chart.indicators().is_empty());
        // Indicators are not part of the history
        assert_eq!(chart.undo_stack().count(), 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut chart = Chart::new(ChartStyle::Rounds, rounds_metrics());
        chart.create_chart(2, 6, "sc", None).unwrap();
        let id = chart.cell(1, 3).unwrap().id();
        chart.set_cell_rotation(id, 30.0).unwrap();
        chart.add_indicator(Indicator::new(Point::new(1.0, 2.0), "start"));

        let json = chart.snapshot().to_json().unwrap();
        let restored = Chart::restore(ChartSnapshot::from_json(&json).unwrap());

        assert_eq!(restored.snapshot(), chart.snapshot());
        assert_eq!(restored.cell_by_id(id).unwrap().rotation(), 30.0);
        assert!(!restored.undo_stack().can_undo());
    }

    #[test]
    fn test_modified_tracking() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(1, 1, "ch", None).unwrap();
        assert!(!chart.is_modified());

        let id = chart.cell(0, 0).unwrap().id();
        chart.set_cell_rotation(id, 90.0).unwrap();
        assert!(chart.is_modified());
        chart.set_clean();
        assert!(!chart.is_modified());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = ChartSettings::default();
        settings.default_stitch = "dc".to_string();
        settings.history_limit = 3;
        let chart = Chart::from_settings(ChartStyle::Rows, &settings);
        assert_eq!(chart.edit_stitch(), "dc");
        assert_eq!(chart.undo_stack().limit(), 3);
        assert_eq!(chart.metrics().cell_size, settings.cell_size());
    }

    #[test]
    fn test_demo_watermarks_cover_chart() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        assert!(chart.demo_watermarks(Size::new(10.0, 10.0)).is_empty());

        chart.create_chart(2, 2, "ch", None).unwrap();
        let bounds = chart.scene_bounds().unwrap();
        assert_eq!(bounds, Rect::new(Point::ORIGIN, Size::new(20.0, 20.0)));
        let marks = chart.demo_watermarks(Size::new(10.0, 10.0));
        assert!(!marks.is_empty());
        assert!(marks.iter().all(|p| bounds.contains(*p)));
    }

    #[test]
    fn test_execute_settles_ids_of_inserted_cells() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(1, 3, "ch", None).unwrap();

        assert!(chart.execute(Command::add_cell(0, 1, Cell::new("inc"))));
        assert_eq!(chart.column_count(0), 4);
        let added = chart.cell(0, 1).unwrap().id();
        assert!(added.is_assigned());

        assert!(chart.undo());
        assert_eq!(chart.column_count(0), 3);
        assert!(chart.cell_by_id(added).is_none());
        assert!(chart.redo());
        assert_eq!(chart.find_grid_position(added), Some((0, 1)));
    }

    #[test]
    fn test_execute_rejects_bad_structure_edits() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(2, 2, "ch", None).unwrap();
        let existing = chart.cell(0, 0).unwrap().clone();

        assert!(!chart.execute(Command::add_cell(1, 0, existing.clone())));
        assert!(!chart.execute(Command::add_cell(4, 0, Cell::new("sc"))));

        let stale = Command::remove_cell(&chart.grid, existing.id()).unwrap();
        chart.remove_cell(existing.id()).unwrap();
        assert!(!chart.execute(stale));

        assert_eq!(chart.undo_stack().count(), 1);
        assert_eq!(chart.column_count(0), 1);
        assert_eq!(chart.column_count(1), 2);
        assert!(chart.undo());
        assert_eq!(chart.find_grid_position(existing.id()), Some((0, 0)));
        assert!(!chart.undo());
    }

    #[test]
    fn test_undo_after_row_inserted_above() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_row(0, 1, "a").unwrap();
        chart.create_row(1, 1, "b").unwrap();
        let b = chart.cell(1, 0).unwrap().id();
        chart.remove_cell(b).unwrap();

        chart.create_row(0, 3, "new").unwrap();
        assert!(chart.undo());
        assert_eq!(chart.find_grid_position(b), Some((2, 0)));
        assert_eq!(chart.column_count(0), 3);
        assert_eq!(chart.column_count(1), 1);
        assert_eq!(chart.cell(1, 0).unwrap().stitch(), "a");

        chart.create_row(1, 2, "mid").unwrap();
        assert!(chart.redo());
        assert_eq!(chart.column_count(3), 0);
        assert!(chart.undo());
        assert_eq!(chart.find_grid_position(b), Some((3, 0)));
        assert_eq!(chart.cell(3, 0).unwrap().stitch(), "b");
    }

    #[test]
    fn test_restore_with_settings() {
        let mut chart = Chart::new(ChartStyle::Rows, rows_metrics());
        chart.create_chart(2, 2, "ch", None).unwrap();
        chart.add_indicator(Indicator::new(Point::new(50.0, 50.0), "here"));

        let mut settings = ChartSettings::default();
        settings.history_limit = 2;
        settings.indicator_hit_radius = 20.0;
        settings.default_stitch = "dc".to_string();
        settings.cell_width = 33.0;

        let near = Point::new(65.0, 50.0);
        let plain = Chart::restore(chart.snapshot());
        assert!(plain.indicator_at(near).is_none());
        assert_eq!(plain.undo_stack().limit(), DEFAULT_HISTORY_LIMIT);

        let restored = Chart::restore_with_settings(chart.snapshot(), &settings);
        assert!(restored.indicator_at(near).is_some());
        assert_eq!(restored.undo_stack().limit(), 2);
        assert_eq!(restored.edit_stitch(), "dc");
        assert_eq!(restored.metrics(), chart.metrics());
        assert_eq!(restored.grid(), chart.grid());
    }
}
