use serde::{Deserialize, Serialize};

/// Edit modes determine what a pointer gesture on the chart does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EditMode {
    #[default]
    Stitch,    // Place stitches on the chart
    Color,     // Place colors behind stitches
    Grid,      // Add stitches to the grid
    Position,  // Move stitches around on the chart
    Angle,     // Adjust the angle of a stitch
    Stretch,   // Stretch a stitch
    Indicator, // Place and move indicators
}

impl EditMode {
    pub const ALL: [EditMode; 7] = [
        EditMode::Stitch,
        EditMode::Color,
        EditMode::Grid,
        EditMode::Position,
        EditMode::Angle,
        EditMode::Stretch,
        EditMode::Indicator,
    ];

    /// Human-readable name for menus
    pub fn name(self) -> &'static str {
        match self {
            EditMode::Stitch => "Stitch Mode",
            EditMode::Color => "Color Mode",
            EditMode::Grid => "Grid Mode",
            EditMode::Position => "Position Mode",
            EditMode::Angle => "Angle Mode",
            EditMode::Stretch => "Stretch Mode",
            EditMode::Indicator => "Indicator Mode",
        }
    }

    /// Look up a mode by its menu name
    pub fn from_name(name: &str) -> Option<EditMode> {
        EditMode::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Names of all modes in menu order
    pub fn names() -> Vec<&'static str> {
        EditMode::ALL.iter().map(|m| m.name()).collect()
    }

    /// True if a press on empty space starts a rubber band
    pub fn selects_by_rubber_band(&self) -> bool {
        matches!(self, EditMode::Stitch | EditMode::Color | EditMode::Grid | EditMode::Position)
    }

    /// True if the gesture drags a single cell's geometry
    pub fn transforms_cell(&self) -> bool {
        matches!(self, EditMode::Position | EditMode::Angle | EditMode::Stretch)
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
