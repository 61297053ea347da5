//! Rubber-band dragging and the resulting cell selection.

use rustc_hash::FxHashSet;
use stitchchart_core::{Point, Polygon, Rect};

use crate::cell_id::CellId;
use crate::grid::Grid;
use crate::layout::ChartLayout;

/// The drag rectangle shown while the pointer is down over empty space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RubberBand {
    start: Option<Point>,
    rect: Option<Rect>,
}

impl RubberBand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a band at `start` with zero size.
    pub fn begin(&mut self, start: Point) {
        self.start = Some(start);
        self.rect = Some(Rect::from_corners(start, start));
    }

    /// Stretch the band to `start + (dx, dy)`. No-op when no band is active.
    pub fn update_rubber_band(&mut self, dx: f64, dy: f64) {
        if let Some(start) = self.start {
            self.rect = Some(Rect::from_corners(start, start + Point::new(dx, dy)));
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// End the drag, returning the area it covered.
    pub fn finish(&mut self) -> Option<Polygon> {
        self.start = None;
        self.rect.take().map(Polygon::from)
    }

    pub fn cancel(&mut self) {
        self.start = None;
        self.rect = None;
    }
}

/// Selected cells, in the order they were selected.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    order: Vec<CellId>,
    members: FxHashSet<CellId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with every cell whose footprint touches `polygon`.
    pub fn update_selection<L: ChartLayout + ?Sized>(&mut self, polygon: &Polygon, grid: &Grid, layout: &L) -> &[CellId] {
        self.clear();
        for (_, _, cell) in grid.cells() {
            if polygon.intersects_rect(&layout.cell_bounds(cell)) {
                self.insert(cell.id());
            }
        }
        log::debug!("selection: {} cell(s)", self.order.len());
        &self.order
    }

    pub fn select_only(&mut self, id: CellId) {
        self.clear();
        self.insert(id);
    }

    pub fn insert(&mut self, id: CellId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, id: CellId) -> bool {
        if self.members.remove(&id) {
            self.order.retain(|&c| c != id);
            true
        } else {
            false
        }
    }

    /// Drop ids whose cells have left the grid.
    pub fn retain_existing(&mut self, grid: &Grid) {
        self.order.retain(|&id| grid.contains(id));
        self.members.retain(|id| grid.contains(*id));
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.members.contains(&id)
    }

    pub fn cells(&self) -> &[CellId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
