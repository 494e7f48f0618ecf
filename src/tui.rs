#![allow(clippy::too_many_lines, clippy::uninlined_format_args)]

#[path = "tui_helpers.rs"]
mod helpers;

use self::helpers::{
    cursor_index, elide_middle, format_clock, move_cursor, screen_width_px, split_card_area,
};
use crate::card::{Capabilities, CardEvent, SurveillanceCard};
use crate::cli::CardArgs;
use crate::config;
use crate::host::{self, HostStateFeed};
use crate::snapshot::{self, SnapshotRequest};
use crate::theme::{self, ThemePalette};
use crate::timer::{Millis, now_millis};
use crate::view::{CardView, MainPane, ScreenSize, ThumbnailView};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

const UI_IDLE_SLEEP: Duration = Duration::from_millis(16);
const UI_CLOCK_MS: Millis = 1_000;
const MIN_STATE_POLL_MS: u64 = 50;

const GLYPH_ACTIVE: &str = "▸";
const GLYPH_MOTION: &str = "●";
const GLYPH_IDLE: &str = "○";
const GLYPH_RECORDING: &str = "◉";

static THEME: OnceLock<ThemePalette> = OnceLock::new();

pub async fn run_tui(args: &CardArgs) -> Result<()> {
    let loaded_theme = match theme::load_or_create_theme() {
        Ok(palette) => palette,
        Err(err) => {
            log::warn!("failed to load theme config ({err:#}), using defaults");
            ThemePalette::default()
        }
    };
    let _ = THEME.set(loaded_theme);

    // Config errors surface here, before the terminal is taken over.
    let mut app = App::load(args)?;
    let mut terminal = init_terminal()?;

    let run_result = run_loop(&mut terminal, &mut app).await;
    let restore_result = restore_terminal(&mut terminal);
    app.shutdown();

    run_result?;
    restore_result?;
    Ok(())
}

async fn run_loop(terminal: &mut AppTerminal, app: &mut App) -> Result<()> {
    let mut running = true;
    let mut force_ui_draw = true;
    let mut last_ui_signature = None;

    while running {
        let now = now_millis();
        app.poll_host_states(now);
        let events = app.card.advance(now);
        app.apply_events(events);

        let current_ui_signature = app.ui_state_signature(now);
        let should_draw_ui =
            force_ui_draw || last_ui_signature.is_none_or(|prev| prev != current_ui_signature);
        if should_draw_ui {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed drawing TUI frame")?;
            last_ui_signature = Some(current_ui_signature);
            force_ui_draw = false;
        }

        while event::poll(Duration::ZERO).context("failed to poll input")? {
            match event::read().context("failed reading input")? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match app.handle_key(key, now_millis()) {
                        AppCommand::None => {}
                        AppCommand::Quit => {
                            running = false;
                            break;
                        }
                    }
                    force_ui_draw = true;
                }
                Event::Resize(_, _) => {
                    // Size class may have changed; redraw everything.
                    force_ui_draw = true;
                    last_ui_signature = None;
                }
                _ => {}
            }
        }

        if !running {
            break;
        }
        tokio::time::sleep(UI_IDLE_SLEEP).await;
    }

    app.card.disconnect();
    Ok(())
}

type AppTerminal = Terminal<CrosstermBackend<io::Stdout>>;

fn active_theme() -> &'static ThemePalette {
    THEME.get_or_init(ThemePalette::default)
}

fn init_terminal() -> Result<AppTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed creating terminal")
}

fn restore_terminal(terminal: &mut AppTerminal) -> Result<()> {
    disable_raw_mode().context("failed disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed leaving alternate screen")?;
    terminal.show_cursor().context("failed showing cursor")?;
    Ok(())
}

#[must_use]
pub fn capabilities_from_args(args: &CardArgs) -> Capabilities {
    Capabilities {
        mobile_app: args.mobile_app,
        fullscreen: !args.no_fullscreen,
    }
}

struct App {
    card: SurveillanceCard,
    feed: Arc<HostStateFeed>,
    feed_seq: u64,
    watcher: Option<JoinHandle<()>>,
    cursor: Option<String>,
    status: String,
    manifest: Option<PathBuf>,
    snapshots_saved: u64,
}

impl App {
    fn load(args: &CardArgs) -> Result<Self> {
        let card_config = config::load_config(&args.config)?;
        let feed = Arc::new(HostStateFeed::new());
        if let Some(path) = &args.states {
            match host::load_states(path) {
                Ok(states) => {
                    if states.is_empty() {
                        log::warn!("host state file {} has no entities", path.display());
                    }
                    feed.publish(states);
                }
                Err(err) => {
                    log::warn!("{err:#}");
                    feed.set_error(format!("{err:#}"));
                }
            }
        }

        let now = now_millis();
        let mut card = SurveillanceCard::new(capabilities_from_args(args));
        let mut feed_seq = 0;
        if let Some((seq, states)) = feed.take_newer(feed_seq) {
            card.set_host_states(states, now);
            feed_seq = seq;
        }
        card.set_config(card_config, now)
            .with_context(|| format!("invalid card config at {}", args.config.display()))?;
        card.connect(now);

        let watcher = args.states.clone().map(|path| {
            let watcher_feed = feed.clone();
            let poll = Duration::from_millis(args.poll_ms.max(MIN_STATE_POLL_MS));
            tokio::spawn(async move {
                host::run_state_file_watcher(path, poll, watcher_feed).await;
            })
        });
        if watcher.is_none() {
            log::warn!("no host state file given; cameras stay unavailable");
        }

        let manifest = match snapshot::manifest_path() {
            Ok(path) => Some(path),
            Err(err) => {
                log::warn!("snapshot manifest disabled: {err:#}");
                None
            }
        };

        let mut app = Self::new(card, manifest);
        app.feed = feed;
        app.feed_seq = feed_seq;
        app.watcher = watcher;
        Ok(app)
    }

    fn new(card: SurveillanceCard, manifest: Option<PathBuf>) -> Self {
        Self {
            card,
            feed: Arc::new(HostStateFeed::new()),
            feed_seq: 0,
            watcher: None,
            cursor: None,
            status: String::new(),
            manifest,
            snapshots_saved: 0,
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
        if self.card.is_connected() {
            self.card.disconnect();
        }
    }

    fn poll_host_states(&mut self, now: Millis) {
        let Some((seq, states)) = self.feed.take_newer(self.feed_seq) else {
            return;
        };
        self.feed_seq = seq;
        let events = self.card.set_host_states(states, now);
        self.apply_events(events);
    }

    fn apply_events(&mut self, events: Vec<CardEvent>) {
        for event in events {
            match event {
                CardEvent::Snapshot(request) => self.save_snapshot(&request),
                CardEvent::RecordingFinished { entity } => {
                    let name = self.camera_name(&entity);
                    self.status = format!("Recording of {name} finished.");
                }
                CardEvent::SelectionChanged { entity } => {
                    log::debug!("selection moved to {entity}");
                }
                CardEvent::Refreshed { generation } => {
                    log::trace!("cameras refreshed, generation {generation}");
                }
            }
        }
    }

    fn save_snapshot(&mut self, request: &SnapshotRequest) {
        let Some(path) = self.manifest.as_deref() else {
            self.status = format!("Snapshot {} not saved (no data directory).", request.file_name);
            return;
        };
        match snapshot::append_snapshot(path, request) {
            Ok(()) => {
                self.snapshots_saved = self.snapshots_saved.saturating_add(1);
                self.status = format!("Snapshot queued: {}", request.file_name);
            }
            Err(err) => {
                log::warn!("{err:#}");
                self.status = format!("Snapshot failed: {err:#}");
            }
        }
    }

    fn camera_name(&self, entity: &str) -> String {
        self.card
            .camera(entity)
            .map_or_else(|| entity.to_owned(), |camera| camera.display_name().to_owned())
    }

    fn visible_thumbnails(&self) -> Vec<ThumbnailView> {
        match self.card.view(0) {
            CardView::Ready { thumbnails, .. } => thumbnails,
            CardView::Loading => Vec::new(),
        }
    }

    fn cursor_entity(&self, thumbnails: &[ThumbnailView]) -> Option<String> {
        if let Some(idx) = cursor_index(thumbnails, self.cursor.as_deref()) {
            return Some(thumbnails[idx].entity.clone());
        }
        if let Some(idx) = cursor_index(thumbnails, self.card.selected_entity()) {
            return Some(thumbnails[idx].entity.clone());
        }
        thumbnails.first().map(|thumbnail| thumbnail.entity.clone())
    }

    fn handle_key(&mut self, key: KeyEvent, now: Millis) -> AppCommand {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('q' | 'c'))
        {
            return AppCommand::Quit;
        }

        let thumbnails = self.visible_thumbnails();
        let cursor = self.cursor_entity(&thumbnails);
        match key.code {
            KeyCode::Char('q') => return AppCommand::Quit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = move_cursor(&thumbnails, cursor.as_deref(), -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = move_cursor(&thumbnails, cursor.as_deref(), 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(entity) = cursor
                    && self.card.select_camera(Some(&entity))
                {
                    self.status = format!("Viewing {}.", self.camera_name(&entity));
                }
            }
            KeyCode::Char('s') => {
                if let Some(entity) = cursor
                    && let Some(request) = self.card.snapshot(&entity, now)
                {
                    self.save_snapshot(&request);
                }
            }
            KeyCode::Char('r') => {
                if let Some(entity) = cursor {
                    if let Some(request) = self.card.record(&entity, now) {
                        self.save_snapshot(&request);
                        self.status = format!("Recording {}...", self.camera_name(&entity));
                    } else if self.card.is_recording(&entity) {
                        self.status = format!("{} is already recording.", self.camera_name(&entity));
                    }
                }
            }
            KeyCode::Char('f') => {
                self.card.toggle_fullscreen();
            }
            KeyCode::Esc => self.card.exit_fullscreen(),
            _ => {}
        }
        AppCommand::None
    }

    fn ui_state_signature(&self, now: Millis) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.card.generation().hash(&mut hasher);
        self.card.selected_entity().hash(&mut hasher);
        self.card.is_fullscreen().hash(&mut hasher);
        self.cursor.hash(&mut hasher);
        self.status.hash(&mut hasher);
        self.feed.error().hash(&mut hasher);
        self.snapshots_saved.hash(&mut hasher);
        for thumbnail in self.visible_thumbnails() {
            thumbnail.hash(&mut hasher);
        }
        (now / UI_CLOCK_MS).hash(&mut hasher);
        hasher.finish()
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let area = frame.area();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(4)])
            .split(area);

        let view = self.card.view(screen_width_px(area.width));
        let mut toolbar_visible = false;
        match &view {
            CardView::Loading => {
                let loading = Paragraph::new(Line::from(Span::styled(
                    "Loading Cameras...",
                    Style::default()
                        .fg(color_muted())
                        .add_modifier(Modifier::BOLD),
                )))
                .alignment(Alignment::Center)
                .block(panel_block("◌", "Surveillance", false));
                frame.render_widget(loading, layout[0]);
            }
            CardView::Ready {
                thumb_position,
                screen,
                toolbar_visible: toolbar,
                thumbnails,
                main,
            } => {
                toolbar_visible = *toolbar;
                let fullscreen = matches!(
                    main,
                    MainPane::Live {
                        fullscreen: true,
                        ..
                    }
                );
                if fullscreen {
                    self.draw_main_pane(frame, layout[0], main);
                } else {
                    let (thumbs_area, main_area) =
                        split_card_area(layout[0], thumb_position, *screen);
                    self.draw_thumbnails(frame, thumbs_area, thumbnails, *toolbar, *screen);
                    self.draw_main_pane(frame, main_area, main);
                }
            }
        }

        self.draw_footer(frame, layout[1], toolbar_visible);
    }

    fn draw_thumbnails(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        thumbnails: &[ThumbnailView],
        toolbar_visible: bool,
        screen: ScreenSize,
    ) {
        let cursor = self.cursor_entity(thumbnails);
        let url_width = usize::from(area.width.saturating_sub(6));
        let mut lines = Vec::new();

        if thumbnails.is_empty() {
            lines.push(Line::from(Span::styled(
                "No cameras available yet.",
                Style::default().fg(color_muted()),
            )));
            if let Some(err) = self.feed.error() {
                lines.push(Line::from(Span::styled(
                    err,
                    Style::default().fg(color_error()),
                )));
            }
        }

        for thumbnail in thumbnails {
            let is_cursor = cursor.as_deref() == Some(thumbnail.entity.as_str());
            let (glyph, glyph_color) = if thumbnail.recording {
                (GLYPH_RECORDING, color_recording())
            } else if thumbnail.has_motion {
                (GLYPH_MOTION, color_motion())
            } else {
                (GLYPH_IDLE, color_muted())
            };
            let mut name_style = Style::default().fg(if thumbnail.selected {
                color_selected()
            } else {
                color_text()
            });
            if thumbnail.selected || thumbnail.has_motion {
                name_style = name_style.add_modifier(Modifier::BOLD);
            }

            let mut spans = vec![
                Span::styled(
                    format!("{} ", focus_marker(is_cursor)),
                    Style::default().fg(color_accent()),
                ),
                Span::styled(format!("{glyph} "), Style::default().fg(glyph_color)),
                Span::styled(thumbnail.name.clone(), name_style),
            ];
            if thumbnail.recording {
                spans.push(Span::styled(
                    " REC",
                    Style::default()
                        .fg(color_recording())
                        .add_modifier(Modifier::BOLD),
                ));
            }
            if toolbar_visible && screen != ScreenSize::Tiny {
                spans.extend(toolbar_spans());
            }
            lines.push(Line::from(spans));

            if toolbar_visible && screen == ScreenSize::Tiny {
                let mut toolbar = vec![Span::raw("    ")];
                toolbar.extend(toolbar_spans());
                lines.push(Line::from(toolbar));
            }
            if screen == ScreenSize::Regular
                && let Some(url) = thumbnail.url.as_deref()
            {
                lines.push(Line::from(Span::styled(
                    format!("    {}", elide_middle(url, url_width)),
                    Style::default().fg(color_muted()),
                )));
            }
        }

        let panel = Paragraph::new(lines)
            .style(Style::default().fg(color_text()))
            .block(panel_block("◉", "Cameras", true))
            .wrap(Wrap { trim: false });
        frame.render_widget(panel, area);
    }

    fn draw_main_pane(&self, frame: &mut ratatui::Frame<'_>, area: Rect, main: &MainPane) {
        let value_width = usize::from(area.width.saturating_sub(16));
        let panel = match main {
            MainPane::Empty => Paragraph::new(Line::default()).block(panel_block("◌", "", false)),
            MainPane::Image { entity, url, alt } => {
                let mut lines = vec![Line::from(vec![
                    Span::styled("image       ", Style::default().fg(color_muted())),
                    Span::styled(
                        elide_middle(url, value_width),
                        Style::default().fg(color_text()),
                    ),
                ])];
                if let Some(camera) = self.card.camera(entity) {
                    let (motion_text, motion_color) = if camera.has_motion {
                        ("motion detected", color_motion())
                    } else {
                        ("clear", color_muted())
                    };
                    lines.push(Line::from(vec![
                        Span::styled("status      ", Style::default().fg(color_muted())),
                        Span::styled(
                            motion_text,
                            Style::default()
                                .fg(motion_color)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ]));
                    lines.push(labelled_line("last motion ", format_clock(camera.last_motion)));
                    lines.push(labelled_line("updated     ", format_clock(camera.last_update)));
                }
                if self.card.is_recording(entity) {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        format!("{GLYPH_RECORDING} recording"),
                        Style::default()
                            .fg(color_recording())
                            .add_modifier(Modifier::BOLD),
                    )));
                }
                Paragraph::new(lines).block(panel_block("◉", alt, true))
            }
            MainPane::Live {
                name,
                state,
                fullscreen,
                ..
            } => {
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("stream      ", Style::default().fg(color_muted())),
                        Span::styled(
                            "live",
                            Style::default()
                                .fg(color_accent())
                                .add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    labelled_line("state       ", state.state.clone()),
                ];
                for (key, value) in &state.attributes.extra {
                    let rendered = match value {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    };
                    lines.push(labelled_line(
                        &format!("{:<12}", elide_middle(key, 11)),
                        elide_middle(&rendered, value_width),
                    ));
                }
                if *fullscreen {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        "[Esc] exit fullscreen",
                        Style::default().fg(color_muted()),
                    )));
                }
                Paragraph::new(lines).block(panel_block("◉", name, true))
            }
        };
        frame.render_widget(
            panel
                .style(Style::default().fg(color_text()))
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect, toolbar_visible: bool) {
        let mut hints: Vec<(&'static str, &'static str)> =
            vec![("↑/↓", "Move"), ("Enter", "View")];
        if toolbar_visible {
            hints.push(("s", "Snapshot"));
            hints.push(("r", "Record"));
        }
        let live = self
            .card
            .settings()
            .is_some_and(crate::config::CardSettings::is_live);
        if live && self.card.capabilities().fullscreen {
            hints.push(("f", "Fullscreen"));
        }
        hints.push(("Ctrl+Q", "Quit"));

        let mut lines = vec![Line::from(action_hint_spans(&hints))];
        if !self.status.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("status ", Style::default().fg(color_muted())),
                Span::styled(
                    &self.status,
                    status_message_style(&self.status).add_modifier(Modifier::BOLD),
                ),
            ]));
        }
        let footer = Paragraph::new(lines)
            .style(Style::default().fg(color_text()))
            .block(panel_block("⌘", "Actions", false));
        frame.render_widget(footer, area);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum AppCommand {
    None,
    Quit,
}

fn color_text() -> Color {
    active_theme().text
}

fn color_muted() -> Color {
    active_theme().muted
}

fn color_border() -> Color {
    active_theme().border
}

fn color_selected() -> Color {
    active_theme().selected
}

fn color_accent() -> Color {
    active_theme().accent
}

fn color_motion() -> Color {
    active_theme().motion
}

fn color_recording() -> Color {
    active_theme().recording
}

fn color_error() -> Color {
    active_theme().error
}

fn panel_block<'a>(glyph: &'a str, title: &'a str, focused: bool) -> Block<'a> {
    let border_color = if focused {
        color_selected()
    } else {
        color_border()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(vec![
            Span::styled(
                format!(" {glyph} "),
                Style::default()
                    .fg(color_accent())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                title,
                Style::default()
                    .fg(color_text())
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
}

fn labelled_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label.to_owned(), Style::default().fg(color_muted())),
        Span::styled(value, Style::default().fg(color_text())),
    ])
}

fn toolbar_spans() -> Vec<Span<'static>> {
    vec![
        Span::styled("  [s]", Style::default().fg(color_accent())),
        Span::styled(" snap", Style::default().fg(color_muted())),
        Span::styled(" [r]", Style::default().fg(color_recording())),
        Span::styled(" rec", Style::default().fg(color_muted())),
    ]
}

fn action_hint_spans(hints: &[(&'static str, &'static str)]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (idx, (key, label)) in hints.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  |  ", Style::default().fg(color_border())));
        }
        spans.push(Span::styled(
            format!("[{key}]"),
            Style::default()
                .fg(color_accent())
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {label}"),
            Style::default().fg(color_muted()),
        ));
    }
    spans
}

fn status_message_style(status: &str) -> Style {
    let lower = status.to_ascii_lowercase();
    if lower.contains("fail") || lower.contains("not saved") {
        Style::default().fg(color_error())
    } else if lower.contains("recording") {
        Style::default().fg(color_recording())
    } else if lower.contains("snapshot") {
        Style::default().fg(color_accent())
    } else {
        Style::default().fg(color_muted())
    }
}

fn focus_marker(focused: bool) -> &'static str {
    if focused { GLYPH_ACTIVE } else { " " }
}
