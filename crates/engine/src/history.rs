//! Undo/redo history for chart edits.
//!
//! A single linear list of commands with a cursor: everything before
//! `index` is applied, everything from `index` on can be redone. Pushing a
//! new command discards the redo tail.

use crate::command::Command;
use crate::events::ChartEvent;
use crate::grid::Grid;
use crate::layout::Layout;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct UndoStack {
    commands: Vec<Command>,
    /// Number of applied commands; `commands[index]` is the next redo.
    index: usize,
    max_entries: usize,
    /// Index at the last save. `None` once that state can't be reached.
    clean_index: Option<usize>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            max_entries: max_entries.max(1),
            clean_index: Some(0),
        }
    }

    /// Apply `command` and record it, dropping anything that could be redone.
    pub(crate) fn push(&mut self, command: Command, grid: &mut Grid, layout: &Layout) -> Vec<ChartEvent> {
        log::debug!("execute: {}", command.text());
        let events = command.apply(grid, layout);

        self.commands.truncate(self.index);
        if self.clean_index.is_some_and(|clean| clean > self.index) {
            self.clean_index = None;
        }
        self.commands.push(command);
        self.index += 1;

        // Limit history size
        if self.commands.len() > self.max_entries {
            self.commands.remove(0);
            self.index -= 1;
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean) => Some(clean - 1),
            };
        }
        events
    }

    /// Revert the last applied command. `None` when there is nothing to undo.
    pub(crate) fn undo(&mut self, grid: &mut Grid, layout: &Layout) -> Option<Vec<ChartEvent>> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        let command = &self.commands[self.index];
        log::debug!("undo: {}", command.text());
        Some(command.revert(grid, layout))
    }

    /// Re-apply the next undone command. `None` when there is nothing to redo.
    pub(crate) fn redo(&mut self, grid: &mut Grid, layout: &Layout) -> Option<Vec<ChartEvent>> {
        let command = self.commands.get(self.index)?;
        log::debug!("redo: {}", command.text());
        let events = command.apply(grid, layout);
        self.index += 1;
        Some(events)
    }

    /// A row was inserted at `at` outside the history. Recorded inserts and
    /// removals keep pointing at the rows they were made in.
    pub(crate) fn row_inserted(&mut self, at: usize) {
        for command in &mut self.commands {
            command.shift_rows_from(at);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    /// Label of the command `undo` would revert.
    pub fn undo_text(&self) -> Option<String> {
        self.index.checked_sub(1).map(|i| self.commands[i].text())
    }

    /// Label of the command `redo` would apply.
    pub fn redo_text(&self) -> Option<String> {
        self.commands.get(self.index).map(Command::text)
    }

    /// Commands held, applied or not.
    pub fn count(&self) -> usize {
        self.commands.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn command(&self, i: usize) -> Option<&Command> {
        self.commands.get(i)
    }

    pub fn limit(&self) -> usize {
        self.max_entries
    }

    /// Mark the current state as saved.
    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.index);
    }

    /// True when the chart matches the last saved state.
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.index)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
        self.clean_index = Some(0);
    }
}
