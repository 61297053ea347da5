// Framework-agnostic value types shared by the chart engine and config

pub mod color;
pub mod geometry;

pub use color::Color;
pub use geometry::{Point, Polygon, Rect, Size};
