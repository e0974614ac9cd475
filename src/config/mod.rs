//! Editor configuration persistence.

pub mod settings;

pub use settings::{load_settings, save_settings, EditorSettings, SETTINGS_VERSION};
