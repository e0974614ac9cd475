//! Versioned editor settings: brush state plus the generation and erosion
//! parameter sets, persisted as JSON in the platform config directory.
//!
//! The parameter sets are opaque to this crate beyond round-tripping
//! losslessly; the backend owns their semantics.

use crate::backend::{HydraulicParams, NoiseParams, ThermalParams};
use crate::sculpt::BrushSettings;
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const SETTINGS_VERSION: u32 = 1;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    pub version: u32,
    pub brush: BrushSettings,
    pub noise: NoiseParams,
    pub thermal: ThermalParams,
    pub hydraulic: HydraulicParams,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            brush: BrushSettings::default(),
            noise: NoiseParams::default(),
            thermal: ThermalParams::default(),
            hydraulic: HydraulicParams::default(),
        }
    }
}

fn settings_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("io", "terracarve", "terracarve")
        .ok_or_else(|| anyhow!("no valid home directory for config storage"))?;
    Ok(dirs.config_dir().join(SETTINGS_FILE))
}

pub fn save_settings(settings: &EditorSettings) -> Result<()> {
    let path = settings_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

/// Load settings, falling back to defaults when no file exists yet.
/// A file written by a newer version is rejected rather than misread.
pub fn load_settings() -> Result<EditorSettings> {
    let path = settings_path()?;
    if !path.exists() {
        return Ok(EditorSettings::default());
    }
    let json = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let settings: EditorSettings = serde_json::from_str(&json)?;
    if settings.version > SETTINGS_VERSION {
        return Err(anyhow!(
            "settings version {} is newer than supported version {}",
            settings.version,
            SETTINGS_VERSION
        ));
    }
    Ok(settings)
}
