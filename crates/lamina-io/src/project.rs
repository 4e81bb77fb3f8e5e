use serde::{Deserialize, Serialize};

use lamina_core::polygon::TEXTURE_GRID;

/// Metadata for a Lamina project: a JSON sidecar next to the binary
/// document, kept human-readable for version control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    pub version: String,
    pub description: String,
    pub created: String,
    pub modified: String,
    pub document_file: String,
    pub settings: ProjectSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub snap_tolerance: f64,
    pub texture_grid: f64,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            grid_size: 1.0,
            snap_to_grid: true,
            snap_tolerance: 5.0,
            texture_grid: TEXTURE_GRID,
        }
    }
}

impl ProjectMeta {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            description: String::new(),
            created: String::new(),
            modified: String::new(),
            document_file: format!("{name}.lam"),
            settings: ProjectSettings::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
