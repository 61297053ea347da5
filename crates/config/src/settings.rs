// Chart settings
// Loaded from ~/.config/stitchchart/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stitchchart_core::{Color, Point, Size};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    // Cell geometry
    #[serde(rename = "chart.cellWidth")]
    pub cell_width: f64,

    #[serde(rename = "chart.cellHeight")]
    pub cell_height: f64,

    #[serde(rename = "chart.rowSpacing")]
    pub row_spacing: f64,

    /// Radius of round 0 in a Rounds chart
    #[serde(rename = "chart.baseRadius")]
    pub base_radius: f64,

    #[serde(rename = "chart.originX")]
    pub origin_x: f64,

    #[serde(rename = "chart.originY")]
    pub origin_y: f64,

    // Editing defaults
    #[serde(rename = "edit.defaultStitch")]
    pub default_stitch: String,

    #[serde(rename = "edit.foregroundColor")]
    pub foreground_color: Color,

    #[serde(rename = "edit.backgroundColor")]
    pub background_color: Color,

    // History
    #[serde(rename = "history.limit")]
    pub history_limit: usize,

    // Indicators
    #[serde(rename = "indicator.hitRadius")]
    pub indicator_hit_radius: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            cell_width: 32.0,
            cell_height: 32.0,
            row_spacing: 32.0,
            base_radius: 32.0,
            origin_x: 0.0,
            origin_y: 0.0,
            default_stitch: String::from("ch"),
            foreground_color: Color::BLACK,
            background_color: Color::WHITE,
            history_limit: 100,
            indicator_hit_radius: 8.0,
        }
    }
}

const DEFAULT_CONFIG: &str = r##"{
    // Cell geometry (scene units)
    "chart.cellWidth": 32,
    "chart.cellHeight": 32,
    "chart.rowSpacing": 32,
    "chart.baseRadius": 32,
    "chart.originX": 0,
    "chart.originY": 0,

    // Editing defaults
    "edit.defaultStitch": "ch",
    "edit.foregroundColor": "#000000",
    "edit.backgroundColor": "#ffffff",

    // Undo history entries kept per chart
    "history.limit": 100,

    // Pointer distance that still picks an indicator
    "indicator.hitRadius": 8
}
"##;

impl ChartSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stitchchart");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, creating a commented
    /// default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            Self::create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines starting with `//`
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut settings: Self = serde_json::from_str(&cleaned)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Replace non-positive cell sizes and a zero history limit with defaults
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.cell_width > 0.0) {
            self.cell_width = defaults.cell_width;
        }
        if !(self.cell_height > 0.0) {
            self.cell_height = defaults.cell_height;
        }
        if self.row_spacing < 0.0 {
            self.row_spacing = defaults.row_spacing;
        }
        if self.base_radius < 0.0 {
            self.base_radius = defaults.base_radius;
        }
        if self.history_limit == 0 {
            self.history_limit = defaults.history_limit;
        }
    }

    pub fn cell_size(&self) -> Size {
        Size::new(self.cell_width, self.cell_height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.origin_x, self.origin_y)
    }
}
