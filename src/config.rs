//! Configuration management for Pagemark
//!
//! Handles loading, saving, and managing application configuration.
//! Configuration is persisted as JSON in the platform configuration directory.

use crate::error::{ConfigError, ConfigResult};
use crate::export::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "io.pagemark.Pagemark";

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Quiet period before a preview recomputation runs
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// CSS pixels per inch, the unit block heights are measured in
pub const PX_PER_INCH: f32 = 96.0;

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Live preview configuration
    pub preview: PreviewConfig,

    /// Physical page format
    pub page: PageGeometry,

    /// Export configuration
    pub export: ExportConfig,

    /// Text enhancement configuration
    pub enhance: EnhanceConfig,
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join(SETTINGS_FILE);
        Self::load_from(&path)
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> ConfigResult<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        self.save_to(&dir.join(SETTINGS_FILE))
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::file_handler::write_file_atomic_sync(path, &json)
            .map_err(|e| ConfigError::SaveError(e.to_string()))
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Reject geometry that leaves no room for content
    pub fn validate(&self) -> ConfigResult<()> {
        let page = &self.page;
        if page.width_mm <= 2.0 * page.margin_mm {
            return Err(ConfigError::InvalidValue {
                key: "page.margin_mm".to_string(),
                reason: "margins are wider than the page".to_string(),
            });
        }
        if page.max_content_height_px() <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "page.height_mm".to_string(),
                reason: "margins and header/footer leave no content height".to_string(),
            });
        }
        if page.font_size_px <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "page.font_size_px".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Live preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Quiet period in milliseconds before recomputing pages
    pub debounce_ms: u64,

    /// Font used when none is selected explicitly
    pub font: FontChoice,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            font: FontChoice::default(),
        }
    }
}

/// Physical page format. Defaults to A4 portrait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,

    /// Uniform margin, applied as padding inside each page container
    pub margin_mm: f32,

    /// Space reserved at the top of the content box for the header line
    pub header_reserve_mm: f32,

    /// Space reserved at the bottom of the content box for the footer line
    pub footer_reserve_mm: f32,

    /// Base body font size in CSS pixels
    pub font_size_px: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 20.0,
            header_reserve_mm: 10.0,
            footer_reserve_mm: 10.0,
            font_size_px: 16.0,
        }
    }
}

impl PageGeometry {
    /// Convert millimeters to CSS pixels
    pub fn mm_to_px(mm: f32) -> f32 {
        mm * PX_PER_INCH / MM_PER_INCH
    }

    /// Width available to block content
    pub fn content_width_px(&self) -> f32 {
        Self::mm_to_px(self.width_mm - 2.0 * self.margin_mm)
    }

    /// The page content height budget
    pub fn max_content_height_px(&self) -> f32 {
        Self::mm_to_px(
            self.height_mm
                - 2.0 * self.margin_mm
                - self.header_reserve_mm
                - self.footer_reserve_mm,
        )
    }
}

/// Export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Explicit Chrome/Chromium binary for PDF export
    pub chrome_binary: Option<PathBuf>,

    /// Format used when the output path has no recognised extension
    pub default_format: ExportFormat,
}

/// Text enhancement configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Program and leading arguments. The instruction prompt is appended as the
    /// last argument and the document is written to stdin.
    pub command: Vec<String>,
}

/// Fonts offered by the preview. Each carries the metrics the layout
/// approximation needs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum FontChoice {
    #[default]
    Inter,
    Roboto,
    OpenSans,
    Lora,
    Merriweather,
    SourceCodePro,
}

impl FontChoice {
    /// All selectable fonts
    pub const ALL: [FontChoice; 6] = [
        FontChoice::Inter,
        FontChoice::Roboto,
        FontChoice::OpenSans,
        FontChoice::Lora,
        FontChoice::Merriweather,
        FontChoice::SourceCodePro,
    ];

    /// CSS font-family stack
    pub fn css_family(&self) -> &'static str {
        match self {
            FontChoice::Inter => "'Inter', sans-serif",
            FontChoice::Roboto => "'Roboto', sans-serif",
            FontChoice::OpenSans => "'Open Sans', sans-serif",
            FontChoice::Lora => "'Lora', serif",
            FontChoice::Merriweather => "'Merriweather', serif",
            FontChoice::SourceCodePro => "'Source Code Pro', monospace",
        }
    }

    /// Average glyph advance as a fraction of the font size
    pub fn average_advance(&self) -> f32 {
        match self {
            FontChoice::Inter => 0.53,
            FontChoice::Roboto => 0.50,
            FontChoice::OpenSans => 0.54,
            FontChoice::Lora => 0.50,
            FontChoice::Merriweather => 0.57,
            FontChoice::SourceCodePro => 0.60,
        }
    }

    /// Line height as a multiple of the font size
    pub fn line_height(&self) -> f32 {
        match self {
            FontChoice::Merriweather => 1.7,
            FontChoice::Lora => 1.65,
            _ => 1.6,
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            FontChoice::Inter => "Inter",
            FontChoice::Roboto => "Roboto",
            FontChoice::OpenSans => "Open Sans",
            FontChoice::Lora => "Lora",
            FontChoice::Merriweather => "Merriweather",
            FontChoice::SourceCodePro => "Source Code Pro",
        }
    }
}
