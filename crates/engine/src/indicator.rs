//! Indicator overlay: annotation markers placed over the chart.
//!
//! Indicators live beside the grid, not in it. They are ephemeral editing
//! aids and are not recorded in the undo history. An indicator may track a
//! cell, in which case it keeps a fixed offset from that cell as the cell
//! moves.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use stitchchart_core::Point;

use crate::cell_id::CellId;
use crate::grid::Grid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorId(pub(crate) u64);

impl IndicatorId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    id: IndicatorId,
    position: Point,
    text: String,
    /// Cell this indicator follows, if any
    cell: Option<CellId>,
    /// Distance from the tracked cell's scene position
    offset: Point,
}

impl Indicator {
    pub fn new(position: Point, text: impl Into<String>) -> Self {
        Self {
            id: IndicatorId::default(),
            position,
            text: text.into(),
            cell: None,
            offset: Point::ORIGIN,
        }
    }

    /// Follow `cell`. The offset is fixed when the indicator is added.
    pub fn tracking(mut self, cell: CellId) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn id(&self) -> IndicatorId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorOverlay {
    indicators: Vec<Indicator>,
    next_id: u64,
    hit_radius: f64,
}

impl Default for IndicatorOverlay {
    fn default() -> Self {
        Self::new(8.0)
    }
}

impl IndicatorOverlay {
    pub fn new(hit_radius: f64) -> Self {
        Self {
            indicators: Vec::new(),
            next_id: 1,
            hit_radius,
        }
    }

    /// Take ownership of `indicator`, returning the id it is known by.
    pub fn add_indicator(&mut self, mut indicator: Indicator, grid: &Grid) -> IndicatorId {
        indicator.id = IndicatorId(self.next_id);
        self.next_id += 1;
        if let Some(anchor) = indicator.cell.and_then(|id| grid.find_cell(id)) {
            indicator.offset = indicator.position - anchor.scene_pos();
        }
        let id = indicator.id;
        self.indicators.push(indicator);
        id
    }

    /// Hand the indicator back to the caller.
    pub fn remove_indicator(&mut self, id: IndicatorId) -> Option<Indicator> {
        let index = self.indicators.iter().position(|i| i.id == id)?;
        Some(self.indicators.remove(index))
    }

    pub fn indicator(&self, id: IndicatorId) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.id == id)
    }

    pub fn indicator_mut(&mut self, id: IndicatorId) -> Option<&mut Indicator> {
        self.indicators.iter_mut().find(|i| i.id == id)
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Nearest indicator within the hit radius of `pt`.
    pub fn indicator_at(&self, pt: Point) -> Option<IndicatorId> {
        self.indicators
            .iter()
            .map(|i| (i.id, i.position.distance_to(pt)))
            .filter(|(_, d)| *d <= self.hit_radius)
            .min_by_key(|(_, d)| OrderedFloat(*d))
            .map(|(id, _)| id)
    }

    /// Move an indicator; a tracking indicator keeps the new offset.
    pub fn move_indicator(&mut self, id: IndicatorId, to: Point, grid: &Grid) -> bool {
        let Some(indicator) = self.indicator_mut(id) else {
            return false;
        };
        indicator.position = to;
        if let Some(anchor) = indicator.cell.and_then(|c| grid.find_cell(c)) {
            indicator.offset = to - anchor.scene_pos();
        }
        true
    }

    /// Reposition tracking indicators after their cells moved. Indicators
    /// whose cell is gone stay where they are.
    pub fn sync_to_cells(&mut self, grid: &Grid) {
        for indicator in &mut self.indicators {
            if let Some(anchor) = indicator.cell.and_then(|c| grid.find_cell(c)) {
                indicator.position = anchor.scene_pos() + indicator.offset;
            }
        }
    }

    /// Rebuild from saved indicators, keeping their ids.
    pub(crate) fn restore(&mut self, indicators: Vec<Indicator>) {
        self.next_id = indicators.iter().map(|i| i.id.0).max().unwrap_or(0) + 1;
        self.indicators = indicators;
    }
}
