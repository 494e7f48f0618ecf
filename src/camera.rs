use serde::Serialize;
use std::cmp::Ordering;
use url::form_urlencoded;

use crate::config::{CameraConfig, CardSettings, MotionEntity};
use crate::host::HostStates;
use crate::timer::Millis;

/// Width hint requested from the host's camera proxy for thumbnails.
pub const THUMB_WIDTH_HINT: u32 = 1280;
const STREAM_PROXY_PATH: &str = "/api/camera_proxy_stream";

/// View-model for one configured camera.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraModel {
    pub entity: String,
    pub motion_entities: Vec<String>,
    pub access_token: Option<String>,
    pub name: Option<String>,
    pub has_motion: bool,
    pub last_motion: Millis,
    pub last_update: Millis,
    pub url: Option<String>,
    pub stream_url: Option<String>,
    /// Index of the camera in the configuration.
    pub position: usize,
}

impl CameraModel {
    /// Builds a camera from its config entry and whatever host state exists.
    #[must_use]
    pub fn from_config(
        position: usize,
        config: &CameraConfig,
        states: &HostStates,
        settings: &CardSettings,
        now: Millis,
    ) -> Self {
        let motion_entities = config
            .motion_entity
            .clone()
            .map(MotionEntity::into_ids)
            .unwrap_or_default();
        let mut camera = Self {
            entity: config.entity.clone(),
            has_motion: any_motion(&motion_entities, states),
            motion_entities,
            access_token: None,
            name: None,
            last_motion: now,
            last_update: now,
            url: None,
            stream_url: None,
            position,
        };
        camera.apply_host_state(states, settings);
        camera
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.entity)
    }

    /// Re-derives motion, timestamps and URLs for one refresh tick.
    /// Returns `true` when motion went from off to on.
    pub fn refresh(&mut self, states: &HostStates, settings: &CardSettings, now: Millis) -> bool {
        let had_motion = self.has_motion;
        self.has_motion = any_motion(&self.motion_entities, states);
        let activated = self.has_motion && !had_motion;
        if activated {
            self.last_motion = now;
        }

        let thumb_is_stale = now.saturating_sub(self.last_update) >= settings.thumb_interval_ms;
        if activated || thumb_is_stale {
            self.last_update = now;
        }

        self.apply_host_state(states, settings);
        activated
    }

    fn apply_host_state(&mut self, states: &HostStates, settings: &CardSettings) {
        let attributes = states.get(&self.entity).map(|object| &object.attributes);
        self.access_token = attributes
            .and_then(|attrs| attrs.access_token.clone())
            .filter(|token| !token.is_empty());
        self.name = attributes.and_then(|attrs| attrs.friendly_name.clone());
        self.url = attributes
            .and_then(|attrs| attrs.entity_picture.as_deref())
            .map(|picture| thumbnail_url(picture, self.last_update));
        self.stream_url = self
            .access_token
            .as_deref()
            .map(|token| stream_url(&self.entity, token, settings.update_interval_secs));
    }
}

fn any_motion(motion_entities: &[String], states: &HostStates) -> bool {
    motion_entities.iter().any(|entity| states.is_on(entity))
}

/// Appends the cache-buster and resolution hint to the host's picture URL.
#[must_use]
pub fn thumbnail_url(picture: &str, last_update: Millis) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("last_update", &last_update.to_string())
        .append_pair("width", &THUMB_WIDTH_HINT.to_string())
        .finish();
    append_query(picture, &query)
}

#[must_use]
pub fn stream_url(entity: &str, token: &str, update_interval_secs: f64) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .append_pair("interval", &update_interval_secs.to_string())
        .finish();
    format!("{STREAM_PROXY_PATH}/{entity}?{query}")
}

fn append_query(base: &str, query: &str) -> String {
    let separator = match base.find('?') {
        Some(idx) if idx + 1 == base.len() || base.ends_with('&') => "",
        Some(_) => "&",
        None => "?",
    };
    format!("{base}{separator}{query}")
}

/// Motion first, then most recently updated first.
#[must_use]
pub fn compare_cameras(a: &CameraModel, b: &CameraModel) -> Ordering {
    b.has_motion
        .cmp(&a.has_motion)
        .then_with(|| b.last_update.cmp(&a.last_update))
}

pub fn sort_cameras(cameras: &mut [CameraModel]) {
    cameras.sort_by(compare_cameras);
}
