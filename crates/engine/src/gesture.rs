//! Pointer and keyboard gestures.
//!
//! The edit mode decides what a press, drag and release do. While the
//! pointer is down nothing in the grid changes; `gesture_preview` reports
//! what a release at the current point would commit. Release builds the
//! commands and runs them through the chart's history.

use stitchchart_core::{Point, Rect};

use crate::cell::{ColorRole, Stretch};
use crate::cell_id::CellId;
use crate::chart::Chart;
use crate::command::Command;
use crate::geometry::{normalize_degrees, scene_pos_to_angle};
use crate::indicator::{Indicator, IndicatorId};
use crate::layout::ChartLayout;
use crate::mode::EditMode;

/// Pointer travel below which a press and release count as a click.
const CLICK_SLOP: f64 = 2.0;

/// Keys the chart reacts to on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
}

/// What the current gesture would commit if released now.
#[derive(Debug, Clone, PartialEq)]
pub enum GesturePreview {
    Idle,
    RubberBand(Rect),
    Move { cells: Vec<CellId>, delta: Point },
    Rotate { cell: CellId, rotation: f64 },
    Stretch { cell: CellId, stretch: Stretch },
    MoveIndicator { indicator: IndicatorId, position: Point },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GestureState {
    pressed: bool,
    /// Cell under the pointer at press
    cur_cell: Option<CellId>,
    cell_center: Point,
    left_button_down_pos: Point,
    current_pos: Point,
    cur_cell_rotation: f64,
    press_angle: f64,
    start_stretch: Stretch,
    cur_indicator: Option<IndicatorId>,
    moving: bool,
    /// Offsets of the cells being moved, at press
    old_positions: Vec<(CellId, Point)>,
}

impl GestureState {
    fn delta(&self) -> Point {
        self.current_pos - self.left_button_down_pos
    }

    fn is_click(&self) -> bool {
        self.delta().length() < CLICK_SLOP
    }
}

impl Chart {
    /// Primary button pressed at `pos`.
    pub fn press(&mut self, pos: Point) {
        self.gesture = GestureState {
            pressed: true,
            left_button_down_pos: pos,
            current_pos: pos,
            ..GestureState::default()
        };
        let mode = self.edit_mode();

        if mode == EditMode::Indicator {
            self.gesture.cur_indicator = self.overlay.indicator_at(pos);
            return;
        }

        let Some(id) = self.layout.hit_test(pos, &self.grid) else {
            if mode.selects_by_rubber_band() {
                self.rubber_band.begin(pos);
            }
            return;
        };
        self.gesture.cur_cell = Some(id);
        if !mode.transforms_cell() {
            return;
        }
        let Some(cell) = self.grid.find_cell(id) else {
            return;
        };

        let center = self.layout.cell_bounds(cell).center();
        let gesture = &mut self.gesture;
        gesture.cell_center = center;
        gesture.cur_cell_rotation = cell.rotation();
        gesture.start_stretch = cell.stretch();
        gesture.press_angle = scene_pos_to_angle(pos, center);

        if mode == EditMode::Position {
            if !self.selection.contains(id) {
                self.selection.select_only(id);
            }
            self.gesture.old_positions = self
                .selection
                .cells()
                .iter()
                .filter_map(|&c| self.grid.find_cell(c).map(|cell| (c, cell.offset())))
                .collect();
        }
    }

    /// Pointer moved to `pos` with the button held.
    pub fn drag(&mut self, pos: Point) {
        if !self.gesture.pressed {
            return;
        }
        self.gesture.current_pos = pos;

        if self.rubber_band.is_active() {
            let d = self.gesture.delta();
            self.rubber_band.update_rubber_band(d.x, d.y);
        } else if self.gesture.cur_indicator.is_some() && !self.gesture.is_click() {
            self.gesture.moving = true;
        }
    }

    /// Primary button released at `pos`; commits the gesture.
    pub fn release(&mut self, pos: Point) {
        if !self.gesture.pressed {
            return;
        }
        self.drag(pos);
        let gesture = std::mem::take(&mut self.gesture);
        let mode = self.edit_mode();

        if let Some(polygon) = self.rubber_band.finish() {
            if mode == EditMode::Grid && gesture.is_click() {
                self.add_cell_at(pos);
            } else {
                self.update_selection(&polygon);
            }
            return;
        }

        match mode {
            EditMode::Stitch => {
                if let Some(id) = self.released_on_pressed_cell(&gesture, pos) {
                    let stitch = self.edit_stitch().to_string();
                    if let Some(command) = Command::set_cell_stitch(&self.grid, id, stitch) {
                        self.execute(command);
                    }
                }
            }
            EditMode::Color => {
                if let Some(id) = self.released_on_pressed_cell(&gesture, pos) {
                    let color = self.edit_bg_color();
                    if let Some(command) = Command::set_cell_color(&self.grid, id, ColorRole::Background, color) {
                        self.execute(command);
                    }
                }
            }
            EditMode::Grid => {}
            EditMode::Position => {
                let delta = gesture.delta();
                let commands = gesture
                    .old_positions
                    .iter()
                    .filter_map(|&(id, old)| Command::set_cell_offset(&self.grid, id, old + delta))
                    .collect();
                self.execute_batch("Move stitches", commands);
            }
            EditMode::Angle => {
                if let Some(id) = gesture.cur_cell {
                    let rotation = rotation_for(&gesture);
                    if let Some(command) = Command::set_cell_rotation(&self.grid, id, rotation) {
                        self.execute(command);
                    }
                }
            }
            EditMode::Stretch => {
                if let Some((id, stretch)) = self.stretch_for(&gesture) {
                    if let Some(command) = Command::set_cell_stretch(&self.grid, id, stretch) {
                        self.execute(command);
                    }
                }
            }
            EditMode::Indicator => match gesture.cur_indicator {
                Some(id) if gesture.moving => {
                    self.move_indicator(id, pos);
                }
                Some(_) => {}
                None => {
                    let mut indicator = Indicator::new(pos, "");
                    if let Some(cell) = self.layout.hit_test(pos, &self.grid) {
                        indicator = indicator.tracking(cell);
                    }
                    self.add_indicator(indicator);
                }
            },
        }
    }

    /// Key released while the chart has focus.
    pub fn key_release(&mut self, key: Key) {
        match key {
            Key::Delete | Key::Backspace => {
                self.remove_selected_cells();
            }
            Key::Escape => {
                self.rubber_band.cancel();
                self.gesture = GestureState::default();
                self.clear_selection();
            }
        }
    }

    /// What releasing now would commit.
    pub fn gesture_preview(&self) -> GesturePreview {
        let gesture = &self.gesture;
        if !gesture.pressed {
            return GesturePreview::Idle;
        }
        if let Some(rect) = self.rubber_band.rect() {
            return GesturePreview::RubberBand(rect);
        }

        match self.edit_mode() {
            EditMode::Position if !gesture.old_positions.is_empty() => GesturePreview::Move {
                cells: gesture.old_positions.iter().map(|(id, _)| *id).collect(),
                delta: gesture.delta(),
            },
            EditMode::Angle => match gesture.cur_cell {
                Some(cell) => GesturePreview::Rotate { cell, rotation: rotation_for(gesture) },
                None => GesturePreview::Idle,
            },
            EditMode::Stretch => match self.stretch_for(gesture) {
                Some((cell, stretch)) => GesturePreview::Stretch { cell, stretch },
                None => GesturePreview::Idle,
            },
            EditMode::Indicator => match gesture.cur_indicator {
                Some(indicator) if gesture.moving => GesturePreview::MoveIndicator {
                    indicator,
                    position: gesture.current_pos,
                },
                _ => GesturePreview::Idle,
            },
            _ => GesturePreview::Idle,
        }
    }

    fn released_on_pressed_cell(&self, gesture: &GestureState, pos: Point) -> Option<CellId> {
        let pressed = gesture.cur_cell?;
        (self.layout.hit_test(pos, &self.grid) == Some(pressed)).then_some(pressed)
    }

    /// Stretch grows by one factor per base footprint dragged.
    fn stretch_for(&self, gesture: &GestureState) -> Option<(CellId, Stretch)> {
        let id = gesture.cur_cell?;
        let size = self.layout.span_size(self.grid.find_cell(id)?);
        if size.is_empty() {
            return None;
        }
        let d = gesture.delta();
        let stretch = Stretch::new(
            (gesture.start_stretch.x + d.x / size.width).max(Stretch::MIN),
            (gesture.start_stretch.y + d.y / size.height).max(Stretch::MIN),
        );
        Some((id, stretch))
    }

    fn add_cell_at(&mut self, pos: Point) {
        let cell = self.new_cell(self.edit_stitch().to_string());
        if let Err(e) = self.add_cell(pos, cell) {
            log::debug!("no stitch added at ({}, {}): {}", pos.x, pos.y, e);
        }
    }
}

fn rotation_for(gesture: &GestureState) -> f64 {
    let angle = scene_pos_to_angle(gesture.current_pos, gesture.cell_center);
    normalize_degrees(gesture.cur_cell_rotation + angle - gesture.press_angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ChartMetrics;
    use crate::layout::ChartStyle;
    use stitchchart_core::{Color, Size};

    fn chart() -> Chart {
        let metrics = ChartMetrics {
            origin: Point::ORIGIN,
            cell_size: Size::new(10.0, 10.0),
            row_spacing: 10.0,
            base_radius: 10.0,
        };
        let mut chart = Chart::new(ChartStyle::Rows, metrics);
        chart.create_chart(3, 3, "ch", None).unwrap();
        chart
    }

    fn click(chart: &mut Chart, at: Point) {
        chart.press(at);
        chart.release(at);
    }

    #[test]
    fn test_stitch_click_sets_edit_stitch() {
        let mut chart = chart();
        chart.set_edit_stitch("dc");
        click(&mut chart, Point::new(15.0, 5.0));
        assert_eq!(chart.cell(0, 1).unwrap().stitch(), "dc");
        assert_eq!(chart.undo_stack().undo_text().as_deref(), Some("Change stitch"));
    }

    #[test]
    fn test_stitch_release_elsewhere_does_nothing() {
        let mut chart = chart();
        chart.set_edit_stitch("dc");
        chart.press(Point::new(5.0, 5.0));
        chart.drag(Point::new(25.0, 25.0));
        chart.release(Point::new(25.0, 25.0));
        assert!(!chart.undo_stack().can_undo());
    }

    #[test]
    fn test_color_click_sets_background() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Color);
        let green = Color::from_hex(0x00FF00);
        chart.set_edit_bg_color(green);
        click(&mut chart, Point::new(5.0, 25.0));

        let cell = chart.cell(2, 0).unwrap();
        assert_eq!(cell.bg_color(), green);
        assert_eq!(cell.fg_color(), Color::BLACK);
    }

    #[test]
    fn test_rubber_band_selects() {
        let mut chart = chart();
        chart.press(Point::new(-5.0, -5.0));
        chart.drag(Point::new(12.0, 3.0));
        assert_eq!(
            chart.gesture_preview(),
            GesturePreview::RubberBand(Rect::from_corners(Point::new(-5.0, -5.0), Point::new(12.0, 3.0)))
        );
        chart.release(Point::new(12.0, 3.0));

        assert_eq!(chart.selection().len(), 2);
        assert!(!chart.rubber_band().is_active());
        assert_eq!(chart.gesture_preview(), GesturePreview::Idle);
    }

    #[test]
    fn test_grid_click_on_empty_adds_cell() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Grid);
        chart.set_edit_stitch("sc");
        // Past the end of row 1: locate clamps to the row
        click(&mut chart, Point::new(45.0, 15.0));

        assert_eq!(chart.column_count(1), 4);
        assert!(chart.undo());
        assert_eq!(chart.column_count(1), 3);
    }

    #[test]
    fn test_delete_key_removes_selection_as_one_step() {
        let mut chart = chart();
        chart.press(Point::new(-1.0, -1.0));
        chart.release(Point::new(29.0, 9.0));
        assert_eq!(chart.selection().len(), 3);

        chart.key_release(Key::Delete);
        assert_eq!(chart.column_count(0), 0);
        assert_eq!(chart.undo_stack().count(), 1);

        chart.undo();
        assert_eq!(chart.column_count(0), 3);
    }

    #[test]
    fn test_position_drag_moves_selection() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Position);
        let id = chart.cell(1, 1).unwrap().id();
        let layout_pos = chart.cell(1, 1).unwrap().position();

        chart.press(Point::new(15.0, 15.0));
        chart.drag(Point::new(18.0, 19.0));
        assert_eq!(
            chart.gesture_preview(),
            GesturePreview::Move { cells: vec![id], delta: Point::new(3.0, 4.0) }
        );
        chart.release(Point::new(18.0, 19.0));

        let cell = chart.cell_by_id(id).unwrap();
        assert_eq!(cell.offset(), Point::new(3.0, 4.0));
        // The layout position is untouched
        assert_eq!(cell.position(), layout_pos);

        chart.undo();
        assert_eq!(chart.cell_by_id(id).unwrap().offset(), Point::ORIGIN);
    }

    #[test]
    fn test_press_tracks_geometry_only_for_transform_modes() {
        let mut chart = chart();
        let at = Point::new(9.0, 5.0);
        chart.press(at);
        assert_eq!(chart.gesture.cur_cell, chart.cell(0, 0).map(|c| c.id()));
        assert_eq!(chart.gesture.cell_center, Point::default());
        chart.release(at);

        chart.set_edit_mode(EditMode::Stretch);
        chart.press(at);
        assert_eq!(chart.gesture.cell_center, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_angle_drag_rotates_around_center() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Angle);
        // Center of cell (0,0) is (5,5)
        chart.press(Point::new(9.0, 5.0));
        chart.release(Point::new(5.0, 9.0));

        let rotation = chart.cell(0, 0).unwrap().rotation();
        assert!((rotation - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_stretch_drag() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Stretch);
        chart.press(Point::new(5.0, 5.0));
        chart.drag(Point::new(10.0, 5.0));
        let id = chart.cell(0, 0).unwrap().id();
        assert_eq!(
            chart.gesture_preview(),
            GesturePreview::Stretch { cell: id, stretch: Stretch::new(1.5, 1.0) }
        );
        chart.release(Point::new(10.0, 5.0));
        assert_eq!(chart.cell(0, 0).unwrap().stretch(), Stretch::new(1.5, 1.0));
    }

    #[test]
    fn test_indicator_place_and_move() {
        let mut chart = chart();
        chart.set_edit_mode(EditMode::Indicator);
        click(&mut chart, Point::new(50.0, 50.0));
        assert_eq!(chart.indicators().len(), 1);
        let id = chart.indicators()[0].id();

        chart.press(Point::new(51.0, 50.0));
        chart.drag(Point::new(70.0, 60.0));
        assert_eq!(
            chart.gesture_preview(),
            GesturePreview::MoveIndicator { indicator: id, position: Point::new(70.0, 60.0) }
        );
        chart.release(Point::new(70.0, 60.0));

        assert_eq!(chart.indicators().len(), 1);
        assert_eq!(chart.indicator(id).unwrap().position(), Point::new(70.0, 60.0));
        assert!(!chart.undo_stack().can_undo());
    }

    #[test]
    fn test_escape_clears_selection() {
        let mut chart = chart();
        let id = chart.cell(0, 0).unwrap().id();
        chart.select_cell(id);
        chart.key_release(Key::Escape);
        assert!(chart.selection().is_empty());
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut chart = chart();
        chart.release(Point::new(5.0, 5.0));
        chart.drag(Point::new(5.0, 5.0));
        assert!(!chart.undo_stack().can_undo());
    }
}
