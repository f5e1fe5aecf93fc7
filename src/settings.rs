// User preferences, persisted as one flat object

use crate::error::{Result, StoreError};
use crate::models::SETTINGS_KEY;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Display and behavior preferences
///
/// `auto_save` is informational: persistence is always on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub sound_enabled: bool,
    pub auto_save: bool,
    pub show_completed: bool,
    pub compact_view: bool,
    pub notifications: bool,
    pub background_blur: u32,
    pub glass_opacity: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sound_enabled: true,
            auto_save: true,
            show_completed: true,
            compact_view: false,
            notifications: true,
            background_blur: 20,
            glass_opacity: 0.1,
        }
    }
}

impl Settings {
    /// Option names accepted by `set`
    pub const NAMES: [&'static str; 8] = [
        "theme",
        "soundEnabled",
        "autoSave",
        "showCompleted",
        "compactView",
        "notifications",
        "backgroundBlur",
        "glassOpacity",
    ];

    /// Set one option by its name, parsing the value for its type
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = |reason: String| StoreError::InvalidSetting {
            name: name.to_string(),
            reason,
        };
        let parse_bool = |value: &str| {
            value
                .parse::<bool>()
                .map_err(|_| invalid(format!("expected true or false, got {}", value)))
        };

        match name {
            "theme" => {
                self.theme = match value {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    other => return Err(invalid(format!("expected light or dark, got {}", other))),
                }
            }
            "soundEnabled" => self.sound_enabled = parse_bool(value)?,
            "autoSave" => self.auto_save = parse_bool(value)?,
            "showCompleted" => self.show_completed = parse_bool(value)?,
            "compactView" => self.compact_view = parse_bool(value)?,
            "notifications" => self.notifications = parse_bool(value)?,
            "backgroundBlur" => {
                self.background_blur = value
                    .parse()
                    .map_err(|_| invalid(format!("expected a whole number, got {}", value)))?
            }
            "glassOpacity" => {
                let opacity: f64 = value
                    .parse()
                    .map_err(|_| invalid(format!("expected a number, got {}", value)))?;
                if !(0.0..=1.0).contains(&opacity) {
                    return Err(invalid(format!("must be between 0 and 1, got {}", opacity)));
                }
                self.glass_opacity = opacity;
            }
            _ => {
                return Err(invalid(format!(
                    "unknown setting, expected one of {}",
                    Self::NAMES.join(", ")
                )));
            }
        }

        Ok(())
    }
}

/// Owns the settings map and writes it through on every change
pub struct SettingsStore {
    storage: Rc<dyn Storage>,
    settings: Settings,
    warning: Option<StoreError>,
}

impl SettingsStore {
    /// Load persisted settings, falling back to defaults
    pub fn open(storage: Rc<dyn Storage>) -> Self {
        let mut warning = None;
        let settings = match storage.get(SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    let err = StoreError::MalformedStorageData {
                        key: SETTINGS_KEY.to_string(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Falling back to default settings");
                    warning = Some(err);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(err) => {
                warn!(error = %err, "Falling back to default settings");
                warning = Some(err);
                Settings::default()
            }
        };

        Self {
            storage,
            settings,
            warning,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set one option by name and persist
    pub fn set(&mut self, name: &str, value: &str) -> Result<&Settings> {
        self.settings.set(name, value)?;
        info!(name, value, "Updated setting");
        self.persist();
        Ok(&self.settings)
    }

    /// Mutate in place and persist
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> &Settings {
        f(&mut self.settings);
        self.persist();
        &self.settings
    }

    pub fn replace(&mut self, settings: Settings) {
        self.settings = settings;
        self.persist();
    }

    pub fn reset(&mut self) {
        self.replace(Settings::default());
    }

    /// Returns and clears the latest recoverable storage error
    pub fn take_warning(&mut self) -> Option<StoreError> {
        self.warning.take()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.settings)
            .map_err(|e| StoreError::MalformedStorageData {
                key: SETTINGS_KEY.to_string(),
                reason: e.to_string(),
            })
            .and_then(|json| self.storage.set(SETTINGS_KEY, &json));

        match result {
            Ok(()) => debug!("Persisted settings"),
            Err(err) => {
                warn!(error = %err, "Failed to persist settings, keeping them in memory");
                self.warning = Some(err);
            }
        }
    }
}
