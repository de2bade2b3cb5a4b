//! Register layout of the output-mapping block, loaded from TOML.
//!
//! Defaults follow the MRM event generator: front-panel mapping registers at
//! `0x400 + 2n`, universal ones at `0x440 + 2n`, 16 bits wide.

use crate::traits::RegisterWidth;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid layout TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid layout: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardLayout {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_front_panel")]
    pub front_panel: RegisterBlock,
    #[serde(default = "default_universal")]
    pub universal: RegisterBlock,
}

/// A run of equally spaced mapping registers, one per output id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterBlock {
    pub base: usize,
    pub count: u32,
    #[serde(default)]
    pub stride: Option<usize>,
    #[serde(default = "default_width")]
    pub width: WidthConfig,
    #[serde(default = "default_max_code")]
    pub max_code: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthConfig {
    U8,
    U16,
}

impl From<WidthConfig> for RegisterWidth {
    fn from(width: WidthConfig) -> Self {
        match width {
            WidthConfig::U8 => RegisterWidth::U8,
            WidthConfig::U16 => RegisterWidth::U16,
        }
    }
}

fn default_window_size() -> usize {
    0x1000
}

fn default_width() -> WidthConfig {
    WidthConfig::U16
}

fn default_max_code() -> u16 {
    0xFF
}

fn default_front_panel() -> RegisterBlock {
    RegisterBlock {
        base: 0x400,
        count: 4,
        stride: None,
        width: default_width(),
        max_code: default_max_code(),
    }
}

fn default_universal() -> RegisterBlock {
    RegisterBlock {
        base: 0x440,
        count: 16,
        stride: None,
        width: default_width(),
        max_code: default_max_code(),
    }
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            front_panel: default_front_panel(),
            universal: default_universal(),
        }
    }
}

impl RegisterBlock {
    pub fn width(&self) -> RegisterWidth {
        self.width.into()
    }

    pub fn stride(&self) -> usize {
        self.stride.unwrap_or_else(|| self.width().bytes())
    }

    /// Byte offset of the register for output `id`, if the block has one.
    pub fn offset_of(&self, id: u32) -> Option<usize> {
        if id >= self.count {
            return None;
        }
        self.stride()
            .checked_mul(id as usize)
            .and_then(|delta| self.base.checked_add(delta))
    }

    /// Byte range `[start, end)` covered by the whole block.
    fn span(&self) -> Option<(usize, usize)> {
        if self.count == 0 {
            return None;
        }
        let last = self.offset_of(self.count - 1)?;
        Some((self.base, last.checked_add(self.width().bytes())?))
    }

    fn validate(&self, name: &str, window_size: usize) -> Result<(), ConfigError> {
        let width = self.width();
        if self.stride() == 0 {
            return Err(ConfigError::Invalid(format!("{name}: stride must be non-zero")));
        }
        if self.stride() < width.bytes() {
            return Err(ConfigError::Invalid(format!(
                "{name}: stride {} overlaps {width} registers",
                self.stride()
            )));
        }
        if self.base % width.bytes() != 0 || self.stride() % width.bytes() != 0 {
            return Err(ConfigError::Invalid(format!(
                "{name}: registers are not aligned for {width} access"
            )));
        }
        if !width.fits(self.max_code) {
            return Err(ConfigError::Invalid(format!(
                "{name}: max_code {:#x} does not fit a {width} register",
                self.max_code
            )));
        }
        if let Some((_, end)) = self.span() {
            if end > window_size {
                return Err(ConfigError::Invalid(format!(
                    "{name}: registers end at {end:#x}, past the {window_size:#x}-byte window"
                )));
            }
        } else if self.count > 0 {
            return Err(ConfigError::Invalid(format!("{name}: register offsets overflow")));
        }
        Ok(())
    }
}

impl CardLayout {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let layout: Self = toml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.front_panel.validate("front_panel", self.window_size)?;
        self.universal.validate("universal", self.window_size)?;

        if let (Some(fp), Some(univ)) = (self.front_panel.span(), self.universal.span()) {
            if fp.0 < univ.1 && univ.0 < fp.1 {
                return Err(ConfigError::Invalid(format!(
                    "front_panel [{:#x}, {:#x}) overlaps universal [{:#x}, {:#x})",
                    fp.0, fp.1, univ.0, univ.1
                )));
            }
        }
        Ok(())
    }
}
