use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::timer::Millis;

const DEFAULT_THUMB_INTERVAL_SECS: f64 = 10.0;
const DEFAULT_UPDATE_INTERVAL_SECS: f64 = 1.0;
const DEFAULT_RECORDING_DURATION_SECS: f64 = 10.0;
const DEFAULT_THUMB_POSITION: &str = "left";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("you need to define cameras")]
    MissingCameras,
    #[error("camera #{index} has an empty entity id")]
    BlankEntity { index: usize },
}

/// Card configuration as written by the user, before defaults are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(default)]
    pub cameras: Option<Vec<CameraConfig>>,
    #[serde(default)]
    pub focus_motion: Option<bool>,
    #[serde(default)]
    pub thumb_interval: Option<f64>,
    #[serde(default)]
    pub update_interval: Option<f64>,
    #[serde(default)]
    pub recording_duration: Option<f64>,
    #[serde(default)]
    pub show_capture_buttons: Option<bool>,
    #[serde(default)]
    pub camera_view: Option<String>,
    #[serde(default)]
    pub thumb_position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub entity: String,
    #[serde(default)]
    pub motion_entity: Option<MotionEntity>,
}

/// `motion_entity` accepts a single id or a list of ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MotionEntity {
    One(String),
    Many(Vec<String>),
}

impl MotionEntity {
    #[must_use]
    pub fn into_ids(self) -> Vec<String> {
        let ids = match self {
            Self::One(id) => vec![id],
            Self::Many(ids) => ids,
        };
        ids.into_iter()
            .filter(|id| !id.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CameraView {
    Thumbnails,
    Live,
}

/// Normalized card settings with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSettings {
    pub cameras: Vec<CameraConfig>,
    pub focus_motion: bool,
    pub thumb_interval_ms: Millis,
    pub update_interval_secs: f64,
    pub recording_duration_secs: f64,
    pub show_capture_buttons: bool,
    pub camera_view: CameraView,
    pub thumb_position: String,
}

impl CardSettings {
    pub fn from_config(config: CardConfig) -> Result<Self, ConfigurationError> {
        let cameras = config.cameras.ok_or(ConfigurationError::MissingCameras)?;
        if let Some(index) = cameras
            .iter()
            .position(|camera| camera.entity.trim().is_empty())
        {
            return Err(ConfigurationError::BlankEntity { index });
        }

        let thumb_interval_secs = positive_or(config.thumb_interval, DEFAULT_THUMB_INTERVAL_SECS);
        let camera_view = match config.camera_view.as_deref() {
            Some("live") => CameraView::Live,
            _ => CameraView::Thumbnails,
        };
        let thumb_position = config
            .thumb_position
            .filter(|position| !position.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THUMB_POSITION.to_owned());

        Ok(Self {
            cameras,
            focus_motion: config.focus_motion.unwrap_or(true),
            thumb_interval_ms: (thumb_interval_secs * 1000.0).round() as Millis,
            update_interval_secs: positive_or(config.update_interval, DEFAULT_UPDATE_INTERVAL_SECS),
            recording_duration_secs: positive_or(
                config.recording_duration,
                DEFAULT_RECORDING_DURATION_SECS,
            ),
            show_capture_buttons: config.show_capture_buttons.unwrap_or(true),
            camera_view,
            thumb_position,
        })
    }

    #[must_use]
    pub fn thumb_interval_secs(&self) -> f64 {
        self.thumb_interval_ms as f64 / 1000.0
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.camera_view == CameraView::Live
    }
}

// Zero, negative and non-finite values count as unset.
fn positive_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => default,
    }
}

pub fn load_config(path: &Path) -> Result<CardConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading card config at {}", path.display()))?;
    parse_config(path, &raw)
}

fn parse_config(path: &Path, raw: &str) -> Result<CardConfig> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str::<CardConfig>(raw)
            .with_context(|| format!("failed parsing card config at {}", path.display()))
    } else {
        serde_json::from_str::<CardConfig>(raw)
            .with_context(|| format!("failed parsing card config at {}", path.display()))
    }
}
