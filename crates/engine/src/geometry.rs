//! Pure geometry for the two computed chart layouts.
//!
//! Rows charts are Cartesian: column and row multiply the cell size.
//! Rounds charts are polar: each row is a circle around `origin` whose
//! radius grows with the row index, and a row's columns split 360° evenly.
//!
//! Angles are degrees at the API and radians only inside the trig calls.
//! Angles grow from the +x axis toward +y.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use stitchchart_config::ChartSettings;
use stitchchart_core::{Point, Rect, Size};

/// Tolerance used when snapping computed coordinates back to slots.
pub const EPSILON: f64 = 1e-9;

/// Layout parameters shared by every chart style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartMetrics {
    /// Center of a Rounds chart; top-left of a Rows chart.
    pub origin: Point,
    /// Footprint of a single-column cell.
    pub cell_size: Size,
    /// Radial distance between consecutive rounds.
    pub row_spacing: f64,
    /// Radius of round 0.
    pub base_radius: f64,
}

impl Default for ChartMetrics {
    fn default() -> Self {
        Self::from_settings(&ChartSettings::default())
    }
}

impl ChartMetrics {
    pub fn from_settings(settings: &ChartSettings) -> Self {
        Self {
            origin: settings.origin(),
            cell_size: settings.cell_size(),
            row_spacing: settings.row_spacing,
            base_radius: settings.base_radius,
        }
    }

    /// Radius of round `row`.
    pub fn radius(&self, row: usize) -> f64 {
        self.base_radius + row as f64 * self.row_spacing
    }
}

/// `origin + (r·cos θ, r·sin θ)` with θ given in degrees.
pub fn calc_point(radius: f64, angle_in_degrees: f64, origin: Point) -> Point {
    let radians = angle_in_degrees.to_radians();
    Point::new(
        origin.x + radius * radians.cos(),
        origin.y + radius * radians.sin(),
    )
}

/// Fold any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let folded = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if folded >= 360.0 - EPSILON {
        0.0
    } else {
        folded
    }
}

/// Angle of `pt` around `origin`, in `[0, 360)`.
pub fn scene_pos_to_angle(pt: Point, origin: Point) -> f64 {
    let d = pt - origin;
    normalize_degrees(d.y.atan2(d.x).to_degrees())
}

/// Angular width of one column in a round of `column_count` cells.
///
/// An empty round has no meaningful width; it reports 0° rather than
/// dividing by zero.
pub fn angle_per_column(column_count: usize) -> f64 {
    if column_count == 0 {
        log::debug!("angle_per_column: zero-column round, using 0°");
        0.0
    } else {
        360.0 / column_count as f64
    }
}

/// Scene position of a Rows cell: top-left corner of its slot.
pub fn rows_position(row: usize, column: usize, metrics: &ChartMetrics) -> Point {
    Point::new(
        metrics.origin.x + column as f64 * metrics.cell_size.width,
        metrics.origin.y + row as f64 * metrics.cell_size.height,
    )
}

/// Scene position of a Rounds cell: the point on its round at its column's angle.
pub fn rounds_position(row: usize, column: usize, column_count: usize, metrics: &ChartMetrics) -> Point {
    let degrees = column as f64 * angle_per_column(column_count);
    calc_point(metrics.radius(row), degrees, metrics.origin)
}

/// Unclamped slot index along one axis; negative when before the origin.
fn slot_index(offset: f64, extent: f64) -> i64 {
    if extent <= 0.0 {
        return 0;
    }
    (offset / extent + EPSILON).floor() as i64
}

fn clamp_index(index: i64, count: usize) -> usize {
    index.clamp(0, count.saturating_sub(1) as i64) as usize
}

/// Rows inverse: the slot containing `pt`, clamped into the grid.
/// `column_count(row)` supplies each row's width. `None` when there are no rows.
pub fn rows_locate(
    pt: Point,
    metrics: &ChartMetrics,
    row_count: usize,
    column_count: impl Fn(usize) -> usize,
) -> Option<(usize, usize)> {
    if row_count == 0 {
        return None;
    }
    let row = clamp_index(slot_index(pt.y - metrics.origin.y, metrics.cell_size.height), row_count);
    let column = clamp_index(
        slot_index(pt.x - metrics.origin.x, metrics.cell_size.width),
        column_count(row),
    );
    Some((row, column))
}

/// Round whose radius is nearest the distance of `pt` from the origin.
pub fn closest_row(pt: Point, metrics: &ChartMetrics, row_count: usize) -> Option<usize> {
    let distance = pt.distance_to(metrics.origin);
    (0..row_count).min_by_key(|&row| OrderedFloat((metrics.radius(row) - distance).abs()))
}

/// Column of a round with `column_count` cells nearest the angle of `pt`.
pub fn closest_column(pt: Point, origin: Point, column_count: usize) -> usize {
    let width = angle_per_column(column_count);
    if width == 0.0 {
        return 0;
    }
    let slot = (scene_pos_to_angle(pt, origin) / width).round() as usize;
    slot % column_count
}

/// Anchor points for the tiled demo watermark covering `bounds`.
///
/// Points start at the top-left of `bounds` and step by `spacing`; rows are
/// staggered by half a step. Empty bounds or spacing produce no points.
pub fn demo_watermarks(bounds: Rect, spacing: Size) -> Vec<Point> {
    if spacing.is_empty() || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Vec::new();
    }

    let mut points = Vec::new();
    let mut row = 0usize;
    let mut y = bounds.y;
    while y <= bounds.bottom() {
        let stagger = if row % 2 == 1 { spacing.width / 2.0 } else { 0.0 };
        let mut x = bounds.x + stagger;
        while x <= bounds.right() {
            points.push(Point::new(x, y));
            x += spacing.width;
        }
        y += spacing.height;
        row += 1;
    }
    points
}
