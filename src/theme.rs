use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;

use crate::paths::{ensure_parent_dir, scoped_path};

const THEME_FILE: &str = "theme.json";

/// Card colours, stored on disk as `#RRGGBB` strings. Missing keys keep
/// their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemePalette {
    #[serde(with = "hex_color")]
    pub text: Color,
    #[serde(with = "hex_color")]
    pub muted: Color,
    #[serde(with = "hex_color")]
    pub border: Color,
    #[serde(with = "hex_color")]
    pub selected: Color,
    #[serde(with = "hex_color")]
    pub accent: Color,
    #[serde(with = "hex_color")]
    pub motion: Color,
    #[serde(with = "hex_color")]
    pub recording: Color,
    #[serde(with = "hex_color")]
    pub error: Color,
}

impl Default for ThemePalette {
    fn default() -> Self {
        Self {
            text: Color::Rgb(231, 235, 243),
            muted: Color::Rgb(145, 152, 170),
            border: Color::Rgb(88, 98, 120),
            selected: Color::Rgb(114, 140, 255),
            accent: Color::Rgb(102, 216, 255),
            motion: Color::Rgb(255, 198, 109),
            recording: Color::Rgb(255, 85, 99),
            error: Color::Rgb(255, 121, 134),
        }
    }
}

/// Reads `theme.json` from the data dir, writing the defaults on first run.
pub fn load_or_create_theme() -> Result<ThemePalette> {
    let path = scoped_path(THEME_FILE)?;
    match fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing theme config at {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let palette = ThemePalette::default();
            ensure_parent_dir(&path)?;
            let payload =
                serde_json::to_string_pretty(&palette).context("failed serializing theme")?;
            fs::write(&path, payload)
                .with_context(|| format!("failed writing theme config at {}", path.display()))?;
            log::info!("wrote default theme to {}", path.display());
            Ok(palette)
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed reading theme config at {}", path.display())),
    }
}

mod hex_color {
    use ratatui::style::Color;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        match color {
            Color::Rgb(r, g, b) => serializer.serialize_str(&format!("#{r:02X}{g:02X}{b:02X}")),
            other => serializer.serialize_str(&format!("{other:?}")),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            D::Error::custom(format!("expected a hex color like #RRGGBB, got '{raw}'"))
        })
    }

    pub(super) fn parse(raw: &str) -> Option<Color> {
        let hex = raw.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let rgb = u32::from_str_radix(hex, 16).ok()?;
        let [_, r, g, b] = rgb.to_be_bytes();
        Some(Color::Rgb(r, g, b))
    }
}
