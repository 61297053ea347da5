use serde::{Deserialize, Serialize};
use stitchchart_core::{Color, Point};

use crate::cell_id::CellId;

/// Which of a cell's two colors an edit targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRole {
    /// The stitch symbol itself
    Foreground,
    /// The fill drawn behind the stitch
    #[default]
    Background,
}

/// Per-axis scale applied to a cell's footprint (Stretch mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stretch {
    pub x: f64,
    pub y: f64,
}

impl Stretch {
    pub const NONE: Stretch = Stretch { x: 1.0, y: 1.0 };
    /// Smallest factor Stretch mode will produce.
    pub const MIN: f64 = 0.1;

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Stretch {
    fn default() -> Self {
        Stretch::NONE
    }
}

/// One stitch on the chart.
///
/// Fields are read-only outside the crate: every change a caller can make
/// goes through a [`Command`](crate::command::Command) so it lands in the
/// undo history. The builder methods only configure cells that are not in
/// a grid yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) id: CellId,
    pub(crate) stitch: String,
    pub(crate) fg_color: Color,
    pub(crate) bg_color: Color,
    /// Degrees
    pub(crate) rotation: f64,
    #[serde(default)]
    pub(crate) stretch: Stretch,
    /// Layout position (or caller-given position on Blank charts)
    pub(crate) position: Point,
    /// User displacement from the layout position (Position mode)
    #[serde(default)]
    pub(crate) offset: Point,
    pub(crate) column_span: usize,
}

impl Cell {
    pub fn new(stitch: impl Into<String>) -> Self {
        Self {
            id: CellId::UNASSIGNED,
            stitch: stitch.into(),
            fg_color: Color::BLACK,
            bg_color: Color::WHITE,
            rotation: 0.0,
            stretch: Stretch::NONE,
            position: Point::ORIGIN,
            offset: Point::ORIGIN,
            column_span: 1,
        }
    }

    pub fn with_colors(mut self, fg: Color, bg: Color) -> Self {
        self.fg_color = fg;
        self.bg_color = bg;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_stretch(mut self, stretch: Stretch) -> Self {
        self.stretch = stretch;
        self
    }

    /// Span is clamped to at least one column.
    pub fn with_column_span(mut self, span: usize) -> Self {
        self.column_span = span.max(1);
        self
    }

    /// Only meaningful on Blank charts; Rows and Rounds overwrite it on insert.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn stitch(&self) -> &str {
        &self.stitch
    }

    pub fn fg_color(&self) -> Color {
        self.fg_color
    }

    pub fn bg_color(&self) -> Color {
        self.bg_color
    }

    pub fn color(&self, role: ColorRole) -> Color {
        match role {
            ColorRole::Foreground => self.fg_color,
            ColorRole::Background => self.bg_color,
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn stretch(&self) -> Stretch {
        self.stretch
    }

    /// Position computed by the chart layout.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Where the cell is drawn: layout position plus user offset.
    pub fn scene_pos(&self) -> Point {
        self.position + self.offset
    }

    pub fn column_span(&self) -> usize {
        self.column_span
    }

    pub(crate) fn set_color(&mut self, role: ColorRole, color: Color) {
        match role {
            ColorRole::Foreground => self.fg_color = color,
            ColorRole::Background => self.bg_color = color,
        }
    }
}
