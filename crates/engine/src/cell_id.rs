//! Cell identity.
//!
//! A `CellId` names one cell for its whole life in a chart, independent of
//! the (row, column) slot it currently occupies. Commands, selections and
//! indicators refer to cells by id so that inserts and removals elsewhere
//! in a row never leave them pointing at the wrong cell.

use serde::{Deserialize, Serialize};

/// Stable identifier for a cell in a chart.
///
/// Ids are handed out by the grid and never reused within one chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub(crate) u64);

impl CellId {
    /// Id carried by cells that have not been placed in a grid yet.
    pub const UNASSIGNED: CellId = CellId(0);

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}
