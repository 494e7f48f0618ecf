use std::sync::Arc;

use crate::camera::{CameraModel, compare_cameras, sort_cameras};
use crate::config::{CardConfig, CardSettings, ConfigurationError};
use crate::host::HostStates;
use crate::recording::{RecordingSequence, RecordingStep};
use crate::snapshot::SnapshotRequest;
use crate::throttle::Throttle;
use crate::timer::{IntervalTimer, Millis};
use crate::view::{CardView, MainPane, ScreenSize, ThumbnailView};

/// Host environment facts injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Running inside the host's mobile app shell (no capture support).
    pub mobile_app: bool,
    /// The host can put the main pane into fullscreen.
    pub fullscreen: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            mobile_app: false,
            fullscreen: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    Refreshed { generation: u64 },
    SelectionChanged { entity: String },
    Snapshot(SnapshotRequest),
    RecordingFinished { entity: String },
}

/// The surveillance card component.
pub struct SurveillanceCard {
    capabilities: Capabilities,
    settings: Option<CardSettings>,
    host: Arc<HostStates>,
    cameras: Arc<Vec<CameraModel>>,
    generation: u64,
    selected: Option<String>,
    refresh: Throttle<Arc<HostStates>>,
    refresh_timer: IntervalTimer,
    recordings: Vec<RecordingSequence>,
    fullscreen: bool,
    connected: bool,
}

impl SurveillanceCard {
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            settings: None,
            host: Arc::new(HostStates::default()),
            cameras: Arc::new(Vec::new()),
            generation: 0,
            selected: None,
            refresh: Throttle::new(0),
            refresh_timer: IntervalTimer::new(1),
            recordings: Vec::new(),
            fullscreen: false,
            connected: false,
        }
    }

    #[must_use]
    pub fn settings(&self) -> Option<&CardSettings> {
        self.settings.as_ref()
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn cameras(&self) -> &Arc<Vec<CameraModel>> {
        &self.cameras
    }

    /// Bumped every time the camera list is replaced.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn selected_entity(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn selected_camera(&self) -> Option<&CameraModel> {
        let entity = self.selected.as_deref()?;
        self.camera(entity)
    }

    #[must_use]
    pub fn camera(&self, entity: &str) -> Option<&CameraModel> {
        self.cameras.iter().find(|camera| camera.entity == entity)
    }

    #[must_use]
    pub fn is_recording(&self, entity: &str) -> bool {
        self.recordings
            .iter()
            .any(|sequence| sequence.entity() == entity && sequence.is_active())
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Applies a configuration, rebuilding the camera list.
    pub fn set_config(&mut self, config: CardConfig, now: Millis) -> Result<(), ConfigurationError> {
        let settings = CardSettings::from_config(config)?;

        for sequence in &mut self.recordings {
            sequence.stop();
        }
        self.recordings.clear();
        self.fullscreen = false;

        let cameras = settings
            .cameras
            .iter()
            .enumerate()
            .map(|(position, config)| {
                CameraModel::from_config(position, config, &self.host, &settings, now)
            })
            .collect::<Vec<_>>();

        self.refresh = Throttle::new(settings.thumb_interval_ms);
        self.refresh_timer = IntervalTimer::new(settings.thumb_interval_ms);
        if self.connected {
            self.refresh_timer.start(now);
        }

        log::info!(
            "applied card config: {} camera(s), thumb interval {}s, {:?} view",
            cameras.len(),
            settings.thumb_interval_secs(),
            settings.camera_view
        );
        self.settings = Some(settings);
        self.replace_cameras(cameras);
        self.selected = None;
        self.select_camera(None);
        Ok(())
    }

    /// Starts the refresh timer. Calling it again restarts the period.
    pub fn connect(&mut self, now: Millis) {
        self.connected = true;
        if self.settings.is_some() {
            self.refresh_timer.start(now);
        }
    }

    /// Stops every timer. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.refresh_timer.stop();
        if self.refresh.has_pending() {
            log::debug!("dropping pending refresh");
        }
        self.refresh.cancel();
        for sequence in &mut self.recordings {
            sequence.stop();
        }
        self.recordings.clear();
    }

    /// Receives new host state and requests a throttled refresh.
    pub fn set_host_states(&mut self, states: Arc<HostStates>, now: Millis) -> Vec<CardEvent> {
        self.host = states.clone();
        self.request_refresh(states, now)
    }

    /// Fires due timers and pending throttled work up to `now`.
    pub fn advance(&mut self, now: Millis) -> Vec<CardEvent> {
        let mut events = Vec::new();
        if self.settings.is_none() {
            return events;
        }

        if self.refresh_timer.fire_due(now) > 0 {
            events.extend(self.request_refresh(self.host.clone(), now));
        }
        if let Some(states) = self.refresh.poll(now) {
            events.extend(self.refresh_cameras(&states, now));
        }
        events.extend(self.advance_recordings(now));
        events
    }

    fn request_refresh(&mut self, states: Arc<HostStates>, now: Millis) -> Vec<CardEvent> {
        if self.settings.is_none() {
            return Vec::new();
        }
        match self.refresh.call(now, states) {
            Some(states) => self.refresh_cameras(&states, now),
            None => {
                log::trace!("refresh coalesced into pending window");
                Vec::new()
            }
        }
    }

    fn refresh_cameras(&mut self, states: &HostStates, now: Millis) -> Vec<CardEvent> {
        let Some(settings) = self.settings.as_ref() else {
            return Vec::new();
        };

        let mut cameras = self.cameras.as_ref().clone();
        let mut activated = Vec::new();
        for camera in &mut cameras {
            if camera.refresh(states, settings, now) {
                activated.push((camera.position, camera.entity.clone()));
            }
        }
        activated.sort_by_key(|(position, _)| *position);
        sort_cameras(&mut cameras);
        let focus_motion = settings.focus_motion;
        self.replace_cameras(cameras);

        let mut events = vec![CardEvent::Refreshed {
            generation: self.generation,
        }];
        let previous = self.selected.clone();

        for (_, entity) in &activated {
            log::info!("motion detected on {entity}");
        }
        if focus_motion && !activated.is_empty() {
            let selected_activated = self
                .selected
                .as_deref()
                .is_some_and(|selected| activated.iter().any(|(_, entity)| entity == selected));
            if !selected_activated {
                let first = activated[0].1.clone();
                self.select_camera(Some(&first));
            }
        }

        if self
            .selected_camera()
            .is_none_or(|camera| !camera.is_available())
        {
            self.select_camera(None);
        }

        if self.selected != previous
            && let Some(entity) = self.selected.clone()
        {
            events.push(CardEvent::SelectionChanged { entity });
        }
        log::debug!(
            "refreshed {} camera(s), generation {}",
            self.cameras.len(),
            self.generation
        );
        events
    }

    fn replace_cameras(&mut self, cameras: Vec<CameraModel>) {
        self.cameras = Arc::new(cameras);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Selects `candidate`, falling back when it is missing or has no token.
    /// Returns `true` if the selection changed.
    pub fn select_camera(&mut self, candidate: Option<&str>) -> bool {
        let resolved = self.resolve_selection(candidate);
        if resolved == self.selected {
            return false;
        }
        if let Some(entity) = resolved.as_deref() {
            log::debug!("selected camera {entity}");
        }
        self.selected = resolved;
        true
    }

    fn resolve_selection(&self, candidate: Option<&str>) -> Option<String> {
        if let Some(camera) = candidate.and_then(|entity| self.camera(entity))
            && camera.is_available()
        {
            return Some(camera.entity.clone());
        }

        let motion_pick = self
            .cameras
            .iter()
            .filter(|camera| camera.is_available() && camera.has_motion)
            .min_by(|a, b| compare_cameras(a, b));
        motion_pick
            .or_else(|| self.cameras.iter().find(|camera| camera.is_available()))
            .or_else(|| self.cameras.first())
            .map(|camera| camera.entity.clone())
    }

    /// Requests a single snapshot of a visible camera.
    pub fn snapshot(&self, entity: &str, now: Millis) -> Option<SnapshotRequest> {
        if !self.capture_enabled() {
            return None;
        }
        let camera = self.camera(entity).filter(|camera| camera.is_available())?;
        let url = camera.url.as_deref()?;
        let request = SnapshotRequest::new(&camera.entity, camera.display_name(), url, now);
        log::info!("snapshot requested: {}", request.file_name);
        Some(request)
    }

    /// Starts a simulated recording and returns its first snapshot.
    pub fn record(&mut self, entity: &str, now: Millis) -> Option<SnapshotRequest> {
        let settings = self.settings.as_ref()?;
        if self.is_recording(entity) {
            return None;
        }
        let first = self.snapshot(entity, now)?;
        let sequence = RecordingSequence::start(
            entity,
            settings.recording_duration_secs,
            settings.thumb_interval_ms,
            now,
        );
        log::info!(
            "recording {entity} for {}s every {} ms",
            settings.recording_duration_secs,
            settings.thumb_interval_ms
        );
        self.recordings.push(sequence);
        Some(first)
    }

    fn advance_recordings(&mut self, now: Millis) -> Vec<CardEvent> {
        let mut steps = Vec::new();
        for sequence in &mut self.recordings {
            for step in sequence.advance(now) {
                if step == RecordingStep::SnapshotAndFinish {
                    log::info!(
                        "recording of {} finished after {} snapshot(s)",
                        sequence.entity(),
                        sequence.snapshots_taken()
                    );
                }
                steps.push((sequence.entity().to_owned(), step));
            }
        }
        self.recordings.retain(RecordingSequence::is_active);

        let mut events = Vec::new();
        for (entity, step) in steps {
            if let Some(request) = self.snapshot(&entity, now) {
                events.push(CardEvent::Snapshot(request));
            }
            if step == RecordingStep::SnapshotAndFinish {
                events.push(CardEvent::RecordingFinished { entity });
            }
        }
        events
    }

    /// Toggles fullscreen for the live pane. Does nothing when unsupported.
    pub fn toggle_fullscreen(&mut self) -> bool {
        let live = self.settings.as_ref().is_some_and(CardSettings::is_live);
        if !live || !self.capabilities.fullscreen {
            return false;
        }
        self.fullscreen = !self.fullscreen;
        true
    }

    pub fn exit_fullscreen(&mut self) {
        self.fullscreen = false;
    }

    fn capture_enabled(&self) -> bool {
        !self.capabilities.mobile_app
            && self
                .settings
                .as_ref()
                .is_some_and(|settings| settings.show_capture_buttons)
    }

    /// Builds the render model for the given screen width in pixels.
    #[must_use]
    pub fn view(&self, screen_width: u32) -> CardView {
        let Some(settings) = self.settings.as_ref() else {
            return CardView::Loading;
        };

        let thumbnails = self
            .cameras
            .iter()
            .filter(|camera| camera.is_available())
            .map(|camera| ThumbnailView {
                entity: camera.entity.clone(),
                name: camera.display_name().to_owned(),
                url: camera.url.clone(),
                has_motion: camera.has_motion,
                selected: self.selected.as_deref() == Some(camera.entity.as_str()),
                recording: self.is_recording(&camera.entity),
            })
            .collect();

        let main = match self.selected_camera() {
            None => MainPane::Empty,
            Some(camera) if settings.is_live() => match self.host.get(&camera.entity) {
                Some(state) => MainPane::Live {
                    entity: camera.entity.clone(),
                    name: camera.display_name().to_owned(),
                    state: state.clone(),
                    fullscreen: self.fullscreen,
                },
                None => MainPane::Empty,
            },
            Some(camera) => match camera.stream_url.as_deref() {
                Some(url) => MainPane::Image {
                    entity: camera.entity.clone(),
                    url: url.to_owned(),
                    alt: camera.display_name().to_owned(),
                },
                None => MainPane::Empty,
            },
        };

        CardView::Ready {
            thumb_position: settings.thumb_position.clone(),
            screen: ScreenSize::from_width(screen_width),
            toolbar_visible: self.capture_enabled(),
            thumbnails,
            main,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, MotionEntity};
    use crate::host::{StateAttributes, StateObject};

    const INTERVAL: Millis = 10_000;

    fn camera_config(entity: &str, motion: &[&str]) -> CameraConfig {
        CameraConfig {
            entity: entity.to_owned(),
            motion_entity: Some(MotionEntity::Many(
                motion.iter().map(|id| (*id).to_owned()).collect(),
            )),
        }
    }

    fn config(cameras: Vec<CameraConfig>) -> CardConfig {
        CardConfig {
            cameras: Some(cameras),
            thumb_interval: Some(INTERVAL as f64 / 1000.0),
            ..CardConfig::default()
        }
    }

    fn camera_state(entity: &str, token: Option<&str>) -> StateObject {
        StateObject {
            state: "idle".to_owned(),
            attributes: StateAttributes {
                access_token: token.map(str::to_owned),
                friendly_name: Some(format!("{entity} cam")),
                entity_picture: Some(format!("/api/camera_proxy/{entity}")),
                ..StateAttributes::default()
            },
        }
    }

    fn sensor(on: bool) -> StateObject {
        StateObject {
            state: if on { "on" } else { "off" }.to_owned(),
            ..StateObject::default()
        }
    }

    struct Fixture {
        card: SurveillanceCard,
        states: HostStates,
        now: Millis,
    }

    impl Fixture {
        fn new(cameras: Vec<CameraConfig>) -> Self {
            let mut states = HostStates::default();
            for camera in &cameras {
                states.insert(camera.entity.clone(), camera_state(&camera.entity, Some("tok")));
                for motion in camera
                    .motion_entity
                    .clone()
                    .map(MotionEntity::into_ids)
                    .unwrap_or_default()
                {
                    states.insert(motion, sensor(false));
                }
            }
            let mut card = SurveillanceCard::new(Capabilities::default());
            card.set_host_states(Arc::new(states.clone()), 0);
            card.set_config(config(cameras), 0).unwrap();
            card.connect(0);
            Self {
                card,
                states,
                now: 0,
            }
        }

        fn push_states(&mut self) -> Vec<CardEvent> {
            self.card
                .set_host_states(Arc::new(self.states.clone()), self.now)
        }

        fn tick(&mut self) -> Vec<CardEvent> {
            self.now += INTERVAL;
            self.card.host = Arc::new(self.states.clone());
            self.card.advance(self.now)
        }
    }

    fn assert_sorted(cameras: &[CameraModel]) {
        for pair in cameras.windows(2) {
            assert!(pair[0].has_motion >= pair[1].has_motion);
            if pair[0].has_motion == pair[1].has_motion {
                assert!(pair[0].last_update >= pair[1].last_update);
            }
        }
    }

    #[test]
    fn config_without_cameras_is_rejected_before_rendering() {
        let mut card = SurveillanceCard::new(Capabilities::default());
        assert_eq!(
            card.set_config(CardConfig::default(), 0),
            Err(ConfigurationError::MissingCameras)
        );
        assert_eq!(card.view(1200), CardView::Loading);
    }

    #[test]
    fn config_before_host_state_builds_placeholders_then_heals() {
        let mut card = SurveillanceCard::new(Capabilities::default());
        card.set_config(
            config(vec![camera_config("camera.a", &[]), camera_config("camera.b", &[])]),
            0,
        )
        .unwrap();
        assert_eq!(card.selected_entity(), Some("camera.a"));
        let CardView::Ready { thumbnails, .. } = card.view(1200) else {
            panic!("expected ready view");
        };
        assert!(thumbnails.is_empty());

        let mut states = HostStates::default();
        states.insert("camera.a", camera_state("camera.a", None));
        states.insert("camera.b", camera_state("camera.b", Some("tok")));
        card.set_host_states(Arc::new(states), 1_000);

        assert_eq!(card.selected_entity(), Some("camera.b"));
        let CardView::Ready { thumbnails, .. } = card.view(1200) else {
            panic!("expected ready view");
        };
        let visible: Vec<&str> = thumbnails.iter().map(|t| t.entity.as_str()).collect();
        assert_eq!(visible, vec!["camera.b"]);
    }

    #[test]
    fn tokenless_camera_selected_only_when_nothing_else_exists() {
        let mut card = SurveillanceCard::new(Capabilities::default());
        let mut states = HostStates::default();
        states.insert("camera.only", camera_state("camera.only", None));
        card.set_host_states(Arc::new(states), 0);
        card.set_config(config(vec![camera_config("camera.only", &[])]), 0)
            .unwrap();
        assert_eq!(card.selected_entity(), Some("camera.only"));
        assert_eq!(
            card.view(1200),
            CardView::Ready {
                thumb_position: "left".to_owned(),
                screen: ScreenSize::Regular,
                toolbar_visible: true,
                thumbnails: Vec::new(),
                main: MainPane::Empty,
            }
        );
    }

    #[test]
    fn explicit_tokenless_candidate_falls_back() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &[]),
            camera_config("camera.b", &[]),
        ]);
        assert_eq!(fixture.card.selected_entity(), Some("camera.a"));
        fixture
            .states
            .insert("camera.a", camera_state("camera.a", None));
        fixture.push_states();
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));

        assert!(!fixture.card.select_camera(Some("camera.a")));
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn thumbnails_refresh_on_every_tick() {
        let mut fixture = Fixture::new(vec![camera_config("camera.a", &[])]);
        for k in 1..=4 {
            fixture.tick();
            let camera = &fixture.card.cameras()[0];
            assert_eq!(camera.last_update, k * INTERVAL);
            let cache_buster = format!("last_update={}", k * INTERVAL);
            assert!(camera.url.as_deref().unwrap().contains(&cache_buster));
        }
    }

    #[test]
    fn image_pane_shows_stream_url_and_empties_without_token() {
        let mut fixture = Fixture::new(vec![camera_config("camera.a", &[])]);
        let camera = fixture.card.cameras()[0].clone();
        assert_ne!(camera.stream_url, camera.url);
        assert_eq!(
            fixture.card.view(1200),
            CardView::Ready {
                thumb_position: "left".to_owned(),
                screen: ScreenSize::Regular,
                toolbar_visible: true,
                thumbnails: vec![ThumbnailView {
                    entity: "camera.a".to_owned(),
                    name: "camera.a cam".to_owned(),
                    url: camera.url.clone(),
                    has_motion: false,
                    selected: true,
                    recording: false,
                }],
                main: MainPane::Image {
                    entity: "camera.a".to_owned(),
                    url: camera.stream_url.clone().unwrap(),
                    alt: "camera.a cam".to_owned(),
                },
            }
        );

        fixture
            .states
            .insert("camera.a", camera_state("camera.a", None));
        fixture.tick();
        assert_eq!(fixture.card.selected_entity(), Some("camera.a"));
        assert!(matches!(
            fixture.card.view(1200),
            CardView::Ready {
                main: MainPane::Empty,
                ..
            }
        ));
    }

    #[test]
    fn selecting_current_camera_is_a_no_op() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &[]),
            camera_config("camera.b", &[]),
        ]);
        let generation = fixture.card.generation();
        assert!(fixture.card.select_camera(Some("camera.b")));
        assert!(!fixture.card.select_camera(Some("camera.b")));
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
        assert_eq!(fixture.card.generation(), generation);
    }

    #[test]
    fn tick_without_motion_keeps_selection() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
        ]);
        fixture.card.select_camera(Some("camera.b"));
        let events = fixture.tick();
        assert!(matches!(events.first(), Some(CardEvent::Refreshed { .. })));
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn motion_activation_moves_selection() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
        ]);
        fixture.card.select_camera(Some("camera.b"));
        fixture.states.insert("binary_sensor.a", sensor(true));

        let events = fixture.tick();

        assert_eq!(fixture.card.selected_entity(), Some("camera.a"));
        assert!(events.contains(&CardEvent::SelectionChanged {
            entity: "camera.a".to_owned()
        }));
        assert_eq!(fixture.card.cameras()[0].entity, "camera.a");
        assert_sorted(fixture.card.cameras());
    }

    #[test]
    fn selected_camera_keeps_focus_when_it_also_activates() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
        ]);
        fixture.card.select_camera(Some("camera.b"));
        fixture.states.insert("binary_sensor.a", sensor(true));
        fixture.states.insert("binary_sensor.b", sensor(true));
        fixture.tick();
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn first_activated_in_configured_order_wins() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
            camera_config("camera.c", &["binary_sensor.c"]),
        ]);
        // List order differs from configured order.
        fixture.card.cameras = Arc::new(fixture.card.cameras.iter().rev().cloned().collect());
        assert_eq!(fixture.card.selected_entity(), Some("camera.a"));

        fixture.states.insert("binary_sensor.c", sensor(true));
        fixture.states.insert("binary_sensor.b", sensor(true));
        fixture.tick();
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn motion_follow_disabled_keeps_selection() {
        let cameras = vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
        ];
        let mut fixture = Fixture::new(cameras.clone());
        fixture
            .card
            .set_config(
                CardConfig {
                    focus_motion: Some(false),
                    ..config(cameras)
                },
                0,
            )
            .unwrap();
        fixture.card.select_camera(Some("camera.b"));
        fixture.states.insert("binary_sensor.a", sensor(true));
        fixture.tick();
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn motion_clears_when_all_entities_report_off() {
        let mut fixture = Fixture::new(vec![camera_config(
            "camera.a",
            &["binary_sensor.a", "binary_sensor.a2"],
        )]);
        fixture.states.insert("binary_sensor.a2", sensor(true));
        fixture.tick();
        assert!(fixture.card.cameras()[0].has_motion);

        fixture.states.insert("binary_sensor.a2", sensor(false));
        fixture.tick();
        assert!(!fixture.card.cameras()[0].has_motion);
    }

    #[test]
    fn empty_motion_list_is_never_focused() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.quiet", &[]),
            camera_config("camera.b", &["binary_sensor.b"]),
        ]);
        fixture.card.select_camera(Some("camera.b"));
        fixture.states.insert("binary_sensor.b", sensor(true));
        fixture.tick();
        fixture.states.insert("binary_sensor.b", sensor(false));
        fixture.tick();
        assert!(
            fixture
                .card
                .cameras()
                .iter()
                .all(|camera| camera.entity != "camera.quiet" || !camera.has_motion)
        );
        assert_eq!(fixture.card.selected_entity(), Some("camera.b"));
    }

    #[test]
    fn host_pushes_inside_window_are_throttled() {
        let mut fixture = Fixture::new(vec![camera_config("camera.a", &["binary_sensor.a"])]);
        let initial = fixture.push_states();
        assert!(matches!(initial.first(), Some(CardEvent::Refreshed { .. })));
        let start_generation = fixture.card.generation();

        let mut refreshes = 0;
        for step in 1..=5 {
            fixture.now = step * 1_000;
            fixture
                .states
                .insert("binary_sensor.a", sensor(step % 2 == 1));
            refreshes += fixture
                .push_states()
                .iter()
                .chain(fixture.card.advance(fixture.now).iter())
                .filter(|event| matches!(event, CardEvent::Refreshed { .. }))
                .count();
        }
        assert_eq!(refreshes, 0);
        assert_eq!(fixture.card.generation(), start_generation);

        let events = fixture.card.advance(INTERVAL);
        let executed = events
            .iter()
            .filter(|event| matches!(event, CardEvent::Refreshed { .. }))
            .count();
        assert_eq!(executed, 1);
        // Step 5 pushed motion on; its states are the ones replayed.
        assert!(fixture.card.cameras()[0].has_motion);
    }

    #[test]
    fn refresh_replaces_list_identity() {
        let mut fixture = Fixture::new(vec![camera_config("camera.a", &[])]);
        let before = fixture.card.cameras().clone();
        fixture.tick();
        assert!(!Arc::ptr_eq(&before, fixture.card.cameras()));
    }

    #[test]
    fn sort_order_holds_after_every_refresh() {
        let mut fixture = Fixture::new(vec![
            camera_config("camera.a", &["binary_sensor.a"]),
            camera_config("camera.b", &["binary_sensor.b"]),
            camera_config("camera.c", &["binary_sensor.c"]),
            camera_config("camera.d", &[]),
        ]);
        let pattern = [
            (true, false, false),
            (true, true, false),
            (false, true, true),
            (false, false, false),
            (false, false, true),
        ];
        for (a, b, c) in pattern {
            fixture.states.insert("binary_sensor.a", sensor(a));
            fixture.states.insert("binary_sensor.b", sensor(b));
            fixture.states.insert("binary_sensor.c", sensor(c));
            fixture.tick();
            assert_sorted(fixture.card.cameras());
        }
    }

    #[test]
    fn recording_emits_six_snapshots_then_clears_flag() {
        let cameras = vec![camera_config("camera.a", &[])];
        let mut fixture = Fixture::new(cameras.clone());
        fixture
            .card
            .set_config(
                CardConfig {
                    thumb_interval: Some(2.0),
                    recording_duration: Some(10.0),
                    ..config(cameras)
                },
                0,
            )
            .unwrap();

        let mut snapshots = 0;
        assert!(fixture.card.record("camera.a", 0).is_some());
        snapshots += 1;
        assert!(fixture.card.is_recording("camera.a"));
        assert!(fixture.card.record("camera.a", 10).is_none());

        let mut finished = false;
        let mut now = 0;
        while !finished {
            now += 2_000;
            for event in fixture.card.advance(now) {
                match event {
                    CardEvent::Snapshot(_) => snapshots += 1,
                    CardEvent::RecordingFinished { .. } => finished = true,
                    _ => {}
                }
            }
            assert!(now <= 60_000);
        }
        assert_eq!(snapshots, 6);
        assert!(!fixture.card.is_recording("camera.a"));
    }

    #[test]
    fn capture_suppressed_in_mobile_app() {
        let mut card = SurveillanceCard::new(Capabilities {
            mobile_app: true,
            fullscreen: true,
        });
        let mut states = HostStates::default();
        states.insert("camera.a", camera_state("camera.a", Some("tok")));
        card.set_host_states(Arc::new(states), 0);
        card.set_config(config(vec![camera_config("camera.a", &[])]), 0)
            .unwrap();

        assert!(card.snapshot("camera.a", 0).is_none());
        assert!(card.record("camera.a", 0).is_none());
        let CardView::Ready {
            toolbar_visible, ..
        } = card.view(800)
        else {
            panic!("expected ready view");
        };
        assert!(!toolbar_visible);
    }

    #[test]
    fn live_view_uses_host_state_and_fullscreen_capability() {
        let cameras = vec![camera_config("camera.a", &[])];
        let mut fixture = Fixture::new(cameras.clone());
        fixture
            .card
            .set_config(
                CardConfig {
                    camera_view: Some("live".to_owned()),
                    ..config(cameras.clone())
                },
                0,
            )
            .unwrap();

        assert!(fixture.card.toggle_fullscreen());
        match fixture.card.view(1200) {
            CardView::Ready {
                main: MainPane::Live {
                    entity, fullscreen, ..
                },
                ..
            } => {
                assert_eq!(entity, "camera.a");
                assert!(fullscreen);
            }
            other => panic!("unexpected view {other:?}"),
        }

        let mut no_fullscreen = SurveillanceCard::new(Capabilities {
            mobile_app: false,
            fullscreen: false,
        });
        no_fullscreen
            .set_config(
                CardConfig {
                    camera_view: Some("live".to_owned()),
                    ..config(cameras)
                },
                0,
            )
            .unwrap();
        assert!(!no_fullscreen.toggle_fullscreen());
        assert!(!no_fullscreen.is_fullscreen());
        // No host state object for the selected camera yet.
        assert!(matches!(
            no_fullscreen.view(1200),
            CardView::Ready {
                main: MainPane::Empty,
                ..
            }
        ));
    }

    #[test]
    fn disconnect_stops_timers_idempotently() {
        let mut fixture = Fixture::new(vec![camera_config("camera.a", &[])]);
        fixture.card.record("camera.a", 0);
        fixture.card.disconnect();
        fixture.card.disconnect();
        assert!(!fixture.card.is_connected());
        assert!(!fixture.card.is_recording("camera.a"));
        assert!(fixture.card.advance(100_000).is_empty());
    }
}
