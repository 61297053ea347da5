//! Event types for chart change notifications.
//!
//! Events are produced by commands as they are applied, undone or redone,
//! and delivered synchronously to every subscriber before the mutating call
//! returns. Undo reports the reverse transition (`old` is the value being
//! replaced, `new` the value restored).

use stitchchart_core::Color;

use crate::cell::ColorRole;
use crate::cell_id::CellId;

/// Events emitted by a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    /// A cell's stitch changed.
    StitchChanged {
        cell: CellId,
        old: String,
        new: String,
    },

    /// One of a cell's colors changed.
    ColorChanged {
        cell: CellId,
        role: ColorRole,
        old: Color,
        new: Color,
    },

    /// A cell was inserted at (row, column).
    CellAdded { cell: CellId, row: usize, column: usize },

    /// A cell was taken out of (row, column).
    CellRemoved { cell: CellId, row: usize, column: usize },
}

/// Callback type for receiving chart events.
pub type EventCallback = Box<dyn FnMut(&ChartEvent)>;

/// Simple event collector for testing.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<ChartEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: ChartEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ChartEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// (old, new) pairs of every StitchChanged event.
    pub fn stitch_changes(&self) -> Vec<(&str, &str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ChartEvent::StitchChanged { old, new, .. } => Some((old.as_str(), new.as_str())),
                _ => None,
            })
            .collect()
    }

    /// (old, new) pairs of every ColorChanged event.
    pub fn color_changes(&self) -> Vec<(Color, Color)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ChartEvent::ColorChanged { old, new, .. } => Some((*old, *new)),
                _ => None,
            })
            .collect()
    }

    /// Number of CellAdded / CellRemoved events.
    pub fn structure_changes(&self) -> (usize, usize) {
        self.events.iter().fold((0, 0), |(added, removed), e| match e {
            ChartEvent::CellAdded { .. } => (added + 1, removed),
            ChartEvent::CellRemoved { .. } => (added, removed + 1),
            _ => (added, removed),
        })
    }
}
