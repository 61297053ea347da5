pub mod cell;
pub mod cell_id;
pub mod chart;
pub mod command;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod grid;
pub mod history;
pub mod indicator;
pub mod layout;
pub mod mode;
pub mod selection;

pub use cell::{Cell, ColorRole, Stretch};
pub use cell_id::CellId;
pub use chart::{Chart, ChartSnapshot};
pub use command::Command;
pub use error::ChartError;
pub use events::{ChartEvent, EventCallback, EventCollector};
pub use geometry::ChartMetrics;
pub use gesture::{GesturePreview, Key};
pub use grid::Grid;
pub use history::UndoStack;
pub use indicator::{Indicator, IndicatorId, IndicatorOverlay};
pub use layout::{ChartLayout, ChartStyle, Layout};
pub use mode::EditMode;
pub use selection::{RubberBand, Selection};
