//! Reading preferences: persisted record, partial updates, and the
//! projection onto presentation variables.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::catalog::{FONT_OPTIONS, HIGHLIGHT_COLORS};
use crate::storage::{read_json, write_json, KeyValueStore, SETTINGS_KEY};

pub const FONT_SIZE_RANGE: (u32, u32) = (14, 24);
pub const LINE_HEIGHT_RANGE: (f64, f64) = (1.4, 2.2);
pub const LETTER_SPACING_RANGE: (f64, f64) = (-0.02, 0.10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Paragraph,
    Verse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub theme: Theme,
    pub font_family: String,
    pub font_size: u32,
    pub line_height: f64,
    pub letter_spacing: f64,
    pub highlight_color: String,
    pub display_mode: DisplayMode,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_family: FONT_OPTIONS[0].value.to_string(),
            font_size: 18,
            line_height: 1.7,
            letter_spacing: 0.01,
            highlight_color: HIGHLIGHT_COLORS[0].to_string(),
            display_mode: DisplayMode::Paragraph,
        }
    }
}

/// A partial settings record. Used both for `update` and for reading a
/// persisted record that may predate newer fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub line_height: Option<f64>,
    pub letter_spacing: Option<f64>,
    pub highlight_color: Option<String>,
    pub display_mode: Option<DisplayMode>,
}

impl AppSettings {
    /// Shallow merge: every field present in `patch` wins.
    pub fn merged(&self, patch: SettingsPatch) -> Self {
        Self {
            theme: patch.theme.unwrap_or(self.theme),
            font_family: patch.font_family.unwrap_or_else(|| self.font_family.clone()),
            font_size: patch.font_size.unwrap_or(self.font_size),
            line_height: patch.line_height.unwrap_or(self.line_height),
            letter_spacing: patch.letter_spacing.unwrap_or(self.letter_spacing),
            highlight_color: patch
                .highlight_color
                .unwrap_or_else(|| self.highlight_color.clone()),
            display_mode: patch.display_mode.unwrap_or(self.display_mode),
        }
    }

    /// Clamp numeric fields into range and replace off-palette colors.
    /// Settings that are already valid come back unchanged.
    pub fn sanitized(mut self) -> Self {
        let defaults = AppSettings::default();
        self.font_size = self.font_size.clamp(FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1);
        self.line_height = clamp_finite(self.line_height, LINE_HEIGHT_RANGE, defaults.line_height);
        self.letter_spacing = clamp_finite(
            self.letter_spacing,
            LETTER_SPACING_RANGE,
            defaults.letter_spacing,
        );
        if !HIGHLIGHT_COLORS.contains(&self.highlight_color.as_str()) {
            self.highlight_color = defaults.highlight_color;
        }
        if self.font_family.trim().is_empty() {
            self.font_family = defaults.font_family;
        }
        self
    }
}

fn clamp_finite(value: f64, (min, max): (f64, f64), fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Global presentation variables derived from the settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationVars {
    pub theme_class: String,
    pub font_family: String,
    pub font_size: String,
    pub line_height: String,
    pub letter_spacing: String,
    pub highlight_bg: String,
}

impl PresentationVars {
    /// `(variable, value)` pairs in the order they are applied.
    pub fn properties(&self) -> [(&'static str, &str); 5] {
        [
            ("--font-family", self.font_family.as_str()),
            ("--font-size", self.font_size.as_str()),
            ("--line-height", self.line_height.as_str()),
            ("--letter-spacing", self.letter_spacing.as_str()),
            ("--color-highlight-bg", self.highlight_bg.as_str()),
        ]
    }
}

impl From<&AppSettings> for PresentationVars {
    fn from(s: &AppSettings) -> Self {
        Self {
            theme_class: s.theme.as_str().to_string(),
            font_family: s.font_family.clone(),
            font_size: format!("{}px", s.font_size),
            line_height: s.line_height.to_string(),
            letter_spacing: format!("{}em", s.letter_spacing),
            highlight_bg: s.highlight_color.clone(),
        }
    }
}

/// The rendering surface that settings are projected onto.
pub trait Presentation: Send {
    fn apply(&mut self, vars: &PresentationVars);
}

#[derive(Debug, Default)]
pub struct NoopPresentation;

impl Presentation for NoopPresentation {
    fn apply(&mut self, _vars: &PresentationVars) {}
}

/// Keeps every applied projection; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresentation {
    applied: Arc<Mutex<Vec<PresentationVars>>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<PresentationVars> {
        self.applied.lock().ok().and_then(|log| log.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.applied.lock().map(|log| log.len()).unwrap_or(0)
    }
}

impl Presentation for RecordingPresentation {
    fn apply(&mut self, vars: &PresentationVars) {
        if let Ok(mut log) = self.applied.lock() {
            log.push(vars.clone());
        }
    }
}

pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    presentation: Box<dyn Presentation>,
    current: AppSettings,
    tx: watch::Sender<AppSettings>,
}

impl SettingsStore {
    /// Read persisted settings, merge them over the defaults, and project the
    /// result once. Storage problems are logged and treated as "nothing saved".
    pub fn load(store: Arc<dyn KeyValueStore>, presentation: Box<dyn Presentation>) -> Self {
        let current = match read_json::<SettingsPatch>(store.as_ref(), SETTINGS_KEY) {
            Ok(Some(patch)) => {
                info!("Loaded persisted settings");
                AppSettings::default().merged(patch).sanitized()
            }
            Ok(None) => AppSettings::default(),
            Err(e) => {
                warn!("Failed to load settings, using defaults: {e}");
                AppSettings::default()
            }
        };

        let (tx, _rx) = watch::channel(current.clone());
        let mut this = Self {
            store,
            presentation,
            current,
            tx,
        };
        this.project();
        this
    }

    pub fn settings(&self) -> &AppSettings {
        &self.current
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }

    /// Merge `patch`, persist the full record, and re-apply every
    /// presentation variable.
    pub fn update(&mut self, patch: SettingsPatch) -> &AppSettings {
        self.current = self.current.merged(patch).sanitized();
        debug!(settings = ?self.current, "Settings updated");

        if let Err(e) = write_json(self.store.as_ref(), SETTINGS_KEY, &self.current) {
            warn!("Failed to save settings: {e}");
        }
        self.project();
        self.tx.send_replace(self.current.clone());
        &self.current
    }

    fn project(&mut self) {
        let vars = PresentationVars::from(&self.current);
        self.presentation.apply(&vars);
    }
}
