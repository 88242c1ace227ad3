use serde::{Deserialize, Serialize};

use comicpage_raster::{ScreenAngles, MIN_CELL_SIZE};

use crate::border::MIN_GRID_SPACING;
use crate::error::SettingsError;
use crate::layer::{LayerColor, DEFAULT_HALFTONE_SIZE};

/// User-tunable configuration, persisted as JSON alongside a book.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub halftone: HalftoneSettings,
    #[serde(default)]
    pub render: RenderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Spacing applied when the grid is switched on.
    pub grid_spacing: u32,
    /// Pointer distance below which a vertex is grabbed.
    pub vertex_snap_distance: f64,
    /// Pointer distance below which an edge is targeted.
    pub edge_snap_distance: f64,
    /// Vertical drag, in pixels, that doubles or halves the size when scaling.
    pub scale_sensitivity: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_spacing: 20,
            vertex_snap_distance: 20.0,
            edge_snap_distance: 20.0,
            scale_sensitivity: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalftoneSettings {
    pub default_cell_size: u32,
    pub min_cell_size: u32,
    pub max_cell_size: u32,
    pub angles: ScreenAngles,
}

impl Default for HalftoneSettings {
    fn default() -> Self {
        Self {
            default_cell_size: DEFAULT_HALFTONE_SIZE,
            min_cell_size: MIN_CELL_SIZE,
            max_cell_size: 24,
            angles: ScreenAngles::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Alpha of the faint square drawn around each grid intersection.
    pub grid_dot_alpha: u8,
    /// Fill inside image layer borders, visible where the picture does not reach.
    pub image_background: LayerColor,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            grid_dot_alpha: 128,
            image_background: LayerColor::WHITE,
        }
    }
}

fn invalid(name: &'static str, message: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        name,
        message: message.into(),
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let editor = &self.editor;
        if editor.grid_spacing < MIN_GRID_SPACING {
            let message = format!("{} < {}", editor.grid_spacing, MIN_GRID_SPACING);
            return Err(invalid("editor.grid_spacing", message));
        }
        for (name, value) in [
            ("editor.vertex_snap_distance", editor.vertex_snap_distance),
            ("editor.edge_snap_distance", editor.edge_snap_distance),
            ("editor.scale_sensitivity", editor.scale_sensitivity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(name, format!("{value} is not a positive number")));
            }
        }

        let halftone = &self.halftone;
        if halftone.min_cell_size < MIN_CELL_SIZE {
            let message = format!("{} < {}", halftone.min_cell_size, MIN_CELL_SIZE);
            return Err(invalid("halftone.min_cell_size", message));
        }
        let cell_range = halftone.min_cell_size..=halftone.max_cell_size;
        if !cell_range.contains(&halftone.default_cell_size) {
            return Err(invalid(
                "halftone.default_cell_size",
                format!(
                    "{} outside [{}, {}]",
                    halftone.default_cell_size, halftone.min_cell_size, halftone.max_cell_size
                ),
            ));
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates. Missing sections fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }
}
