//! Reversible chart edits.
//!
//! A `Command` captures both the prior and the new state at construction
//! time, so applying and reverting are symmetric: apply → revert restores
//! the cell exactly, and revert → apply reproduces the edit. Commands name
//! cells by [`CellId`] and resolve the slot when they run, which keeps them
//! valid across inserts and removals elsewhere in the row.

use rustc_hash::FxHashSet;
use stitchchart_core::{Color, Point};

use crate::cell::{Cell, ColorRole, Stretch};
use crate::cell_id::CellId;
use crate::error::ChartError;
use crate::events::ChartEvent;
use crate::grid::Grid;
use crate::layout::{ChartLayout, Layout};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetCellStitch {
        cell: CellId,
        old: String,
        new: String,
    },
    SetCellColor {
        cell: CellId,
        role: ColorRole,
        old: Color,
        new: Color,
    },
    SetCellRotation {
        cell: CellId,
        old: f64,
        new: f64,
    },
    /// Position mode: displacement from the layout position
    SetCellOffset {
        cell: CellId,
        old: Point,
        new: Point,
    },
    SetCellStretch {
        cell: CellId,
        old: Stretch,
        new: Stretch,
    },
    /// `cell` carries its assigned id and full state.
    AddCell {
        row: usize,
        column: usize,
        cell: Cell,
    },
    /// `cell` is the full state at removal time, so undo puts back exactly what left.
    RemoveCell {
        row: usize,
        column: usize,
        cell: Cell,
    },
    /// Several commands recorded as one history entry.
    Batch {
        text: String,
        commands: Vec<Command>,
    },
}

impl Command {
    pub fn set_cell_stitch(grid: &Grid, cell: CellId, stitch: impl Into<String>) -> Option<Command> {
        let old = grid.find_cell(cell)?.stitch().to_string();
        Some(Command::SetCellStitch { cell, old, new: stitch.into() })
    }

    pub fn set_cell_color(grid: &Grid, cell: CellId, role: ColorRole, color: Color) -> Option<Command> {
        let old = grid.find_cell(cell)?.color(role);
        Some(Command::SetCellColor { cell, role, old, new: color })
    }

    pub fn set_cell_rotation(grid: &Grid, cell: CellId, degrees: f64) -> Option<Command> {
        let old = grid.find_cell(cell)?.rotation();
        Some(Command::SetCellRotation { cell, old, new: degrees })
    }

    pub fn set_cell_offset(grid: &Grid, cell: CellId, offset: Point) -> Option<Command> {
        let old = grid.find_cell(cell)?.offset();
        Some(Command::SetCellOffset { cell, old, new: offset })
    }

    pub fn set_cell_stretch(grid: &Grid, cell: CellId, stretch: Stretch) -> Option<Command> {
        let old = grid.find_cell(cell)?.stretch();
        Some(Command::SetCellStretch { cell, old, new: stretch })
    }

    /// Insert `cell` at (`row`, `column`). An unassigned cell gets its id
    /// when the command is executed; an assigned id must not be in use.
    pub fn add_cell(row: usize, column: usize, cell: Cell) -> Command {
        Command::AddCell { row, column, cell }
    }

    pub fn remove_cell(grid: &Grid, cell: CellId) -> Option<Command> {
        let (row, column) = grid.find_grid_position(cell)?;
        let cell = grid.cell(row, column)?.clone();
        Some(Command::RemoveCell { row, column, cell })
    }

    /// Group commands into one undo step. An empty group is `None`; a group
    /// of one is just that command.
    pub fn batch(text: impl Into<String>, mut commands: Vec<Command>) -> Option<Command> {
        match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(Command::Batch { text: text.into(), commands }),
        }
    }

    /// Menu label ("Undo <text>").
    pub fn text(&self) -> String {
        match self {
            Command::SetCellStitch { .. } => "Change stitch".to_string(),
            Command::SetCellColor { .. } => "Change color".to_string(),
            Command::SetCellRotation { .. } => "Rotate stitch".to_string(),
            Command::SetCellOffset { .. } => "Move stitch".to_string(),
            Command::SetCellStretch { .. } => "Stretch stitch".to_string(),
            Command::AddCell { .. } => "Add stitch".to_string(),
            Command::RemoveCell { .. } => "Remove stitch".to_string(),
            Command::Batch { text, .. } => text.clone(),
        }
    }

    /// True when applying would change nothing.
    pub fn is_noop(&self) -> bool {
        match self {
            Command::SetCellStitch { old, new, .. } => old == new,
            Command::SetCellColor { old, new, .. } => old == new,
            Command::SetCellRotation { old, new, .. } => old == new,
            Command::SetCellOffset { old, new, .. } => old == new,
            Command::SetCellStretch { old, new, .. } => old == new,
            Command::AddCell { .. } | Command::RemoveCell { .. } => false,
            Command::Batch { commands, .. } => commands.iter().all(Command::is_noop),
        }
    }

    /// Check structural edits against `grid` before they are recorded, and
    /// settle the ids they insert. Ids given by the caller are reserved so
    /// the grid never hands them out again.
    pub(crate) fn prepare(mut self, grid: &mut Grid) -> Result<Command, ChartError> {
        let mut live = Liveness::default();
        self.prepare_in(grid, &mut live)?;
        Ok(self)
    }

    fn prepare_in(&mut self, grid: &mut Grid, live: &mut Liveness) -> Result<(), ChartError> {
        match self {
            Command::AddCell { row, column, cell } => {
                if *row >= grid.row_count() {
                    return Err(ChartError::OutOfRange { row: *row, column: *column });
                }
                if !cell.id.is_assigned() {
                    cell.id = grid.allocate_id();
                } else if live.contains(grid, cell.id) {
                    return Err(ChartError::DuplicateCell(cell.id));
                } else {
                    grid.reserve_id(cell.id);
                }
                live.add(cell.id);
            }
            Command::RemoveCell { cell, .. } => {
                if !live.contains(grid, cell.id) {
                    return Err(ChartError::CellNotFound(cell.id));
                }
                live.remove(cell.id);
            }
            Command::Batch { commands, .. } => {
                for command in commands {
                    command.prepare_in(grid, live)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// A row was inserted at `at`; structural edits recorded against rows
    /// at or below it move down one.
    pub(crate) fn shift_rows_from(&mut self, at: usize) {
        match self {
            Command::AddCell { row, .. } | Command::RemoveCell { row, .. } => {
                if *row >= at {
                    *row += 1;
                }
            }
            Command::Batch { commands, .. } => {
                for command in commands {
                    command.shift_rows_from(at);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn apply(&self, grid: &mut Grid, layout: &Layout) -> Vec<ChartEvent> {
        self.run(grid, layout, true)
    }

    pub(crate) fn revert(&self, grid: &mut Grid, layout: &Layout) -> Vec<ChartEvent> {
        self.run(grid, layout, false)
    }

    fn run(&self, grid: &mut Grid, layout: &Layout, forward: bool) -> Vec<ChartEvent> {
        match self {
            Command::SetCellStitch { cell, old, new } => {
                let (from, to) = pick(forward, old, new);
                update(grid, *cell, |c| c.stitch = to.clone())
                    .then(|| ChartEvent::StitchChanged {
                        cell: *cell,
                        old: from.clone(),
                        new: to.clone(),
                    })
                    .into_iter()
                    .collect()
            }
            Command::SetCellColor { cell, role, old, new } => {
                let (from, to) = pick(forward, old, new);
                update(grid, *cell, |c| c.set_color(*role, *to))
                    .then(|| ChartEvent::ColorChanged {
                        cell: *cell,
                        role: *role,
                        old: *from,
                        new: *to,
                    })
                    .into_iter()
                    .collect()
            }
            Command::SetCellRotation { cell, old, new } => {
                let (_, to) = pick(forward, old, new);
                update(grid, *cell, |c| c.rotation = *to);
                Vec::new()
            }
            Command::SetCellOffset { cell, old, new } => {
                let (_, to) = pick(forward, old, new);
                update(grid, *cell, |c| c.offset = *to);
                Vec::new()
            }
            Command::SetCellStretch { cell, old, new } => {
                let (_, to) = pick(forward, old, new);
                update(grid, *cell, |c| c.stretch = *to);
                Vec::new()
            }
            Command::AddCell { row, column, cell } => {
                if forward {
                    insert(grid, layout, *row, *column, cell)
                } else {
                    take(grid, layout, cell.id())
                }
            }
            Command::RemoveCell { row, column, cell } => {
                if forward {
                    take(grid, layout, cell.id())
                } else {
                    insert(grid, layout, *row, *column, cell)
                }
            }
            Command::Batch { commands, .. } => {
                let mut events = Vec::new();
                if forward {
                    for command in commands {
                        events.extend(command.run(grid, layout, true));
                    }
                } else {
                    for command in commands.iter().rev() {
                        events.extend(command.run(grid, layout, false));
                    }
                }
                events
            }
        }
    }
}

/// Cells added and removed so far while preparing a batch.
#[derive(Default)]
struct Liveness {
    added: FxHashSet<CellId>,
    removed: FxHashSet<CellId>,
}

impl Liveness {
    fn contains(&self, grid: &Grid, id: CellId) -> bool {
        self.added.contains(&id) || (grid.contains(id) && !self.removed.contains(&id))
    }

    fn add(&mut self, id: CellId) {
        self.removed.remove(&id);
        self.added.insert(id);
    }

    fn remove(&mut self, id: CellId) {
        self.added.remove(&id);
        self.removed.insert(id);
    }
}

fn pick<'a, T>(forward: bool, old: &'a T, new: &'a T) -> (&'a T, &'a T) {
    if forward {
        (old, new)
    } else {
        (new, old)
    }
}

/// Run `f` on the cell; false (and a warning) when it's gone.
fn update(grid: &mut Grid, id: CellId, f: impl FnOnce(&mut Cell)) -> bool {
    match grid.cell_mut(id) {
        Some(cell) => {
            f(cell);
            true
        }
        None => {
            log::warn!("command target {} is not in the grid", id);
            false
        }
    }
}

fn insert(grid: &mut Grid, layout: &Layout, row: usize, column: usize, cell: &Cell) -> Vec<ChartEvent> {
    let column = column.min(grid.column_count(row));
    match grid.insert_cell(row, column, cell.clone()) {
        Ok(id) => {
            layout.redistribute_cells(grid, row);
            vec![ChartEvent::CellAdded { cell: id, row, column }]
        }
        Err(e) => {
            log::warn!("cannot insert {}: {}", cell.id(), e);
            Vec::new()
        }
    }
}

fn take(grid: &mut Grid, layout: &Layout, id: CellId) -> Vec<ChartEvent> {
    match grid.remove_cell(id) {
        Some((row, column, _)) => {
            layout.redistribute_cells(grid, row);
            vec![ChartEvent::CellRemoved { cell: id, row, column }]
        }
        None => {
            log::warn!("cannot remove {}: not in the grid", id);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ChartMetrics;
    use crate::layout::ChartStyle;

    fn setup(style: ChartStyle) -> (Grid, Layout) {
        let mut layout = Layout::new(style, ChartMetrics::default());
        let mut grid = Grid::new();
        let proto = Cell::new("ch").with_colors(Color::BLACK, Color::WHITE);
        layout.create_chart(&mut grid, 2, 4, &proto, None).unwrap();
        (grid, layout)
    }

    #[test]
    fn test_set_stitch_apply_revert() {
        let (mut grid, layout) = setup(ChartStyle::Rows);
        let id = grid.cell(0, 1).unwrap().id();
        let cmd = Command::set_cell_stitch(&grid, id, "dc").unwrap();

        let events = cmd.apply(&mut grid, &layout);
        assert_eq!(grid.find_cell(id).unwrap().stitch(), "dc");
        assert_eq!(
            events,
            vec![ChartEvent::StitchChanged { cell: id, old: "ch".into(), new: "dc".into() }]
        );

        let events = cmd.revert(&mut grid, &layout);
        assert_eq!(grid.find_cell(id).unwrap().stitch(), "ch");
        assert_eq!(
            events,
            vec![ChartEvent::StitchChanged { cell: id, old: "dc".into(), new: "ch".into() }]
        );
    }

    #[test]
    fn test_set_color_targets_role() {
        let (mut grid, layout) = setup(ChartStyle::Rows);
        let id = grid.cell(1, 0).unwrap().id();
        let red = Color::from_hex(0xFF0000);
        let cmd = Command::set_cell_color(&grid, id, ColorRole::Foreground, red).unwrap();

        cmd.apply(&mut grid, &layout);
        let cell = grid.find_cell(id).unwrap();
        assert_eq!(cell.fg_color(), red);
        assert_eq!(cell.bg_color(), Color::WHITE);

        cmd.revert(&mut grid, &layout);
        assert_eq!(grid.find_cell(id).unwrap().fg_color(), Color::BLACK);
    }

    #[test]
    fn test_unknown_cell_builds_nothing() {
        let (grid, _) = setup(ChartStyle::Rows);
        assert!(Command::set_cell_stitch(&grid, CellId(999), "sc").is_none());
        assert!(Command::remove_cell(&grid, CellId(999)).is_none());
    }

    #[test]
    fn test_remove_then_revert_restores_slot_and_state() {
        let (mut grid, layout) = setup(ChartStyle::Rounds);
        let id = grid.cell(0, 2).unwrap().id();
        Command::set_cell_rotation(&grid, id, 45.0)
            .unwrap()
            .apply(&mut grid, &layout);
        let before = grid.clone();

        let cmd = Command::remove_cell(&grid, id).unwrap();
        cmd.apply(&mut grid, &layout);
        assert_eq!(grid.column_count(0), 3);
        assert!(!grid.contains(id));

        cmd.revert(&mut grid, &layout);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_batch_reverts_in_reverse_order() {
        let (mut grid, layout) = setup(ChartStyle::Rows);
        let a = grid.cell(0, 0).unwrap().id();
        // Two edits of the same cell: reverting must land on the first old value
        let first = Command::set_cell_stitch(&grid, a, "sc").unwrap();
        first.apply(&mut grid, &layout);
        let second = Command::set_cell_stitch(&grid, a, "dc").unwrap();
        first.revert(&mut grid, &layout);

        let batch = Command::batch("Edit", vec![first, second]).unwrap();
        batch.apply(&mut grid, &layout);
        assert_eq!(grid.find_cell(a).unwrap().stitch(), "dc");
        batch.revert(&mut grid, &layout);
        assert_eq!(grid.find_cell(a).unwrap().stitch(), "ch");
    }

    #[test]
    fn test_batch_collapses_trivial_groups() {
        assert!(Command::batch("Nothing", Vec::new()).is_none());

        let single = Command::SetCellRotation { cell: CellId(1), old: 0.0, new: 90.0 };
        assert_eq!(Command::batch("One", vec![single.clone()]), Some(single));
    }

    #[test]
    fn test_noop_detection() {
        let (grid, _) = setup(ChartStyle::Rows);
        let id = grid.cell(0, 0).unwrap().id();
        assert!(Command::set_cell_stitch(&grid, id, "ch").unwrap().is_noop());
        assert!(!Command::set_cell_stitch(&grid, id, "sc").unwrap().is_noop());
        assert!(!Command::remove_cell(&grid, id).unwrap().is_noop());
    }

    #[test]
    fn test_color_and_rotation_reapply_after_revert() {
        let (mut grid, layout) = setup(ChartStyle::Rounds);
        let id = grid.cell(1, 3).unwrap().id();
        let original = grid.clone();
        let blue = Color::from_hex(0x0000FF);

        for cmd in [
            Command::set_cell_color(&grid, id, ColorRole::Background, blue).unwrap(),
            Command::set_cell_rotation(&grid, id, 135.0).unwrap(),
        ] {
            cmd.apply(&mut grid, &layout);
            let applied = grid.clone();
            cmd.revert(&mut grid, &layout);
            cmd.apply(&mut grid, &layout);
            assert_eq!(grid, applied);
        }
        assert_eq!(grid.find_cell(id).unwrap().bg_color(), blue);
        assert_eq!(grid.find_cell(id).unwrap().rotation(), 135.0);
        assert_ne!(grid, original);
    }

    #[test]
    fn test_prepare_assigns_missing_id() {
        let (mut grid, _) = setup(ChartStyle::Rows);
        let cmd = Command::add_cell(0, 1, Cell::new("inc")).prepare(&mut grid).unwrap();
        let Command::AddCell { cell, .. } = &cmd else {
            panic!("expected AddCell, got {:?}", cmd);
        };
        assert!(cell.id().is_assigned());
        assert!(!grid.contains(cell.id()));
        assert_ne!(grid.allocate_id(), cell.id());
    }

    #[test]
    fn test_prepare_rejects_live_ids_and_missing_rows() {
        let (mut grid, _) = setup(ChartStyle::Rows);
        let taken = grid.cell(0, 0).unwrap().clone();

        let dup = Command::add_cell(1, 0, taken.clone()).prepare(&mut grid);
        assert_eq!(dup, Err(ChartError::DuplicateCell(taken.id())));

        let outside = Command::add_cell(2, 0, Cell::new("sc")).prepare(&mut grid);
        assert_eq!(outside, Err(ChartError::OutOfRange { row: 2, column: 0 }));

        // Removing then re-adding the same cell inside one batch is fine
        let remove = Command::remove_cell(&grid, taken.id()).unwrap();
        let batch = Command::batch("Move", vec![remove.clone(), Command::add_cell(1, 0, taken.clone())]).unwrap();
        assert!(batch.prepare(&mut grid).is_ok());

        let twice = Command::batch("Twice", vec![remove.clone(), remove]).unwrap();
        assert_eq!(twice.prepare(&mut grid), Err(ChartError::CellNotFound(taken.id())));
    }

    #[test]
    fn test_shift_rows_reaches_into_batches() {
        let mut cmd = Command::batch(
            "Edit",
            vec![
                Command::add_cell(0, 0, Cell::new("sc")),
                Command::add_cell(2, 1, Cell::new("sc")),
                Command::SetCellRotation { cell: CellId(1), old: 0.0, new: 90.0 },
            ],
        )
        .unwrap();
        cmd.shift_rows_from(1);

        let Command::Batch { commands, .. } = &cmd else {
            panic!("expected Batch, got {:?}", cmd);
        };
        assert!(matches!(commands[0], Command::AddCell { row: 0, .. }));
        assert!(matches!(commands[1], Command::AddCell { row: 3, .. }));
    }
}
