use std::fmt;

use crate::cell_id::CellId;

/// Failures reported by chart mutators.
///
/// Read accessors never return these; they answer `None` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// Row/column address outside the grid, or a row that would leave a gap.
    OutOfRange { row: usize, column: usize },
    /// The cell is not (or no longer) in the grid.
    CellNotFound(CellId),
    /// A cell with this id is already in the grid.
    DuplicateCell(CellId),
    /// The chart has no rows to place a cell into.
    EmptyChart,
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { row, column } => {
                write!(f, "row {row}, column {column} is out of range")
            }
            Self::CellNotFound(id) => write!(f, "{id} is not in the chart"),
            Self::DuplicateCell(id) => write!(f, "{id} is already in the chart"),
            Self::EmptyChart => write!(f, "chart has no rows"),
        }
    }
}

impl std::error::Error for ChartError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ChartError::OutOfRange { row: 5, column: 2 }.to_string(),
            "row 5, column 2 is out of range"
        );
        assert_eq!(ChartError::CellNotFound(CellId(3)).to_string(), "cell#3 is not in the chart");
        assert_eq!(ChartError::DuplicateCell(CellId(4)).to_string(), "cell#4 is already in the chart");
    }
}
