//! Per-input search configuration and the declarative attributes that select it.
//!
//! A bound input either uses the built-in defaults, a named alternate
//! configuration from a [`ConfigRegistry`], or either of those with a direct
//! engine override. Once resolved, the configuration is owned by one controller
//! and never shared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Identifier that always selects the built-in defaults.
pub const DEFAULT_CONFIG: &str = "default";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input is not marked for live search")]
    NotLive,

    #[error("unknown configuration '{name}' (known: {known})")]
    UnknownConfig { name: String, known: String },

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration document: {0}")]
    Parse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Effective configuration for one bound input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Engine profile the gateway should search.
    pub engine: String,
    pub input: InputConfig,
    pub results: ResultsConfig,
    /// Loading indicator appearance. `None` (`spinner = false`) disables the indicator.
    #[serde(deserialize_with = "deserialize_spinner", serialize_with = "serialize_spinner")]
    pub spinner: Option<SpinnerConfig>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_CONFIG.to_string(),
            input: InputConfig::default(),
            results: ResultsConfig::default(),
            spinner: Some(SpinnerConfig::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Quiet period before a search fires, in milliseconds.
    #[serde(rename = "delay")]
    pub delay_ms: u64,
    /// Minimum trimmed query length, in characters.
    pub min_chars: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { delay_ms: 500, min_chars: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub position: Placement,
    pub width: PanelWidth,
    pub offset: Offset,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self { position: Placement::Bottom, width: PanelWidth::Auto, offset: Offset { x: 0.0, y: 5.0 } }
    }
}

/// Vertical placement of the panel relative to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Panel bottom edge sits on the input's top edge.
    Top,
    /// Panel top edge sits on the input's bottom edge.
    #[default]
    Bottom,
}

/// Pixel offset applied on top of the computed anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// How the panel width is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "WidthSetting", into = "WidthSetting")]
pub enum PanelWidth {
    /// Match the input's outer width minus the panel's horizontal padding.
    #[default]
    Auto,
    /// Explicit width in pixels.
    Fixed(f64),
    /// Leave the width to the host stylesheet.
    Stylesheet,
}

/// Wire form of [`PanelWidth`]: `"auto"`, `"css"`, or a pixel number.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WidthSetting {
    Pixels(f64),
    Keyword(String),
}

impl TryFrom<WidthSetting> for PanelWidth {
    type Error = String;

    fn try_from(value: WidthSetting) -> Result<Self, Self::Error> {
        match value {
            WidthSetting::Pixels(px) if px >= 0.0 => Ok(PanelWidth::Fixed(px)),
            WidthSetting::Pixels(px) => Err(format!("width must be non-negative, got {px}")),
            WidthSetting::Keyword(k) => match k.as_str() {
                "auto" => Ok(PanelWidth::Auto),
                "css" => Ok(PanelWidth::Stylesheet),
                other => other
                    .trim_end_matches("px")
                    .parse::<f64>()
                    .map(PanelWidth::Fixed)
                    .map_err(|_| format!("unknown width '{other}' (expected auto, css or pixels)")),
            },
        }
    }
}

impl From<PanelWidth> for WidthSetting {
    fn from(value: PanelWidth) -> Self {
        match value {
            PanelWidth::Auto => WidthSetting::Keyword("auto".to_string()),
            PanelWidth::Stylesheet => WidthSetting::Keyword("css".to_string()),
            PanelWidth::Fixed(px) => WidthSetting::Pixels(px),
        }
    }
}

/// Loading indicator appearance. Purely cosmetic; handed to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinnerConfig {
    pub lines: u32,
    pub length: u32,
    pub width: u32,
    pub radius: u32,
    pub corners: f32,
    pub rotate: i32,
    pub direction: i8,
    pub color: String,
    pub speed: f32,
    pub trail: u32,
    pub shadow: bool,
    pub hwaccel: bool,
    pub class_name: String,
    pub z_index: u64,
    pub top: String,
    pub left: String,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            lines: 10,
            length: 8,
            width: 4,
            radius: 8,
            corners: 1.0,
            rotate: 0,
            direction: 1,
            color: "#000".to_string(),
            speed: 1.0,
            trail: 60,
            shadow: false,
            hwaccel: false,
            class_name: "spinner".to_string(),
            z_index: 2_000_000_000,
            top: "50%".to_string(),
            left: "50%".to_string(),
        }
    }
}

/// `spinner = false` disables the indicator, `spinner = true` keeps the defaults,
/// a table customizes it.
#[derive(Deserialize)]
#[serde(untagged)]
enum SpinnerSetting {
    Toggle(bool),
    Custom(SpinnerConfig),
}

fn deserialize_spinner<'de, D>(deserializer: D) -> Result<Option<SpinnerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match SpinnerSetting::deserialize(deserializer)? {
        SpinnerSetting::Toggle(true) => Some(SpinnerConfig::default()),
        SpinnerSetting::Toggle(false) => None,
        SpinnerSetting::Custom(spinner) => Some(spinner),
    })
}

fn serialize_spinner<S>(spinner: &Option<SpinnerConfig>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match spinner {
        Some(spinner) => spinner.serialize(serializer),
        None => serializer.serialize_bool(false),
    }
}

// ---------------------------------------------------------------------------
// Named alternate configurations
// ---------------------------------------------------------------------------

/// Alternate configurations addressable by identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigRegistry {
    #[serde(default)]
    configs: BTreeMap<String, SearchConfig>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document with one `[configs.<name>]` table per configuration.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml(&source)
    }

    pub fn insert(&mut self, name: impl Into<String>, config: SearchConfig) {
        self.configs.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&SearchConfig> {
        self.configs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Declarative per-input attributes
// ---------------------------------------------------------------------------

/// The attributes a host page attaches to an input to opt it into live search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputAttributes {
    /// Marker attribute present.
    pub live: bool,
    /// Identifier of an alternate configuration.
    pub config: Option<String>,
    /// Direct engine override.
    pub engine: Option<String>,
}

impl InputAttributes {
    /// Attributes of an input that opted in with defaults only.
    pub fn live() -> Self {
        Self { live: true, ..Self::default() }
    }

    pub fn with_config(mut self, name: impl Into<String>) -> Self {
        self.config = Some(name.into());
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Resolve the effective configuration.
    ///
    /// An alternate configuration replaces the defaults wholesale; the engine
    /// override is applied afterwards. Empty overrides are ignored.
    pub fn resolve(&self, registry: &ConfigRegistry) -> Result<SearchConfig, ConfigError> {
        if !self.live {
            return Err(ConfigError::NotLive);
        }

        let mut config = match self.config.as_deref() {
            None | Some(DEFAULT_CONFIG) | Some("") => SearchConfig::default(),
            Some(name) => registry.get(name).cloned().ok_or_else(|| ConfigError::UnknownConfig {
                name: name.to_string(),
                known: registry.names().collect::<Vec<_>>().join(", "),
            })?,
        };

        if let Some(engine) = self.engine.as_deref().filter(|e| !e.is_empty()) {
            config.engine = engine.to_string();
        }

        Ok(config)
    }
}
