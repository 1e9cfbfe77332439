// ── Process-wide notification settings ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_MAX_NOTIFICATIONS: usize = 100;

/// Categories known out of the box, all enabled.
pub const DEFAULT_CATEGORIES: &[&str] = &["system", "device", "sensor", "network", "security"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound_enabled: bool,
    pub desktop_notifications_enabled: bool,
    pub max_notifications: usize,
    /// Per-category switch. Categories not listed here are enabled.
    pub categories: IndexMap<String, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            desktop_notifications_enabled: false,
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|c| ((*c).to_owned(), true))
                .collect(),
        }
    }
}

impl Settings {
    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.categories.get(category).copied().unwrap_or(true)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_notifications == 0 {
            return Err(CoreError::validation(
                "max_notifications",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Apply a single change, validating it first.
    pub fn apply(&mut self, change: SettingChange) -> Result<(), CoreError> {
        match change {
            SettingChange::Sound(on) => self.sound_enabled = on,
            SettingChange::DesktopNotifications(on) => self.desktop_notifications_enabled = on,
            SettingChange::MaxNotifications(0) => {
                return Err(CoreError::validation(
                    "max_notifications",
                    "must be greater than zero",
                ));
            }
            SettingChange::MaxNotifications(max) => self.max_notifications = max,
            SettingChange::Category { category, enabled } => {
                if category.trim().is_empty() {
                    return Err(CoreError::validation("category", "must not be empty"));
                }
                self.categories.insert(category, enabled);
            }
        }
        Ok(())
    }
}

/// One settings mutation, as issued by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    Sound(bool),
    DesktopNotifications(bool),
    MaxNotifications(usize),
    Category { category: String, enabled: bool },
}
