use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::view::{ScreenSize, ThumbnailView};

// Used when the terminal does not report its pixel size.
const FALLBACK_CELL_WIDTH_PX: u32 = 8;

/// Screen width in pixels for the card's responsive size classes.
pub(crate) fn screen_width_px(columns: u16) -> u32 {
    terminal_pixel_width().unwrap_or_else(|| u32::from(columns) * FALLBACK_CELL_WIDTH_PX)
}

fn terminal_pixel_width() -> Option<u32> {
    let window = crossterm::terminal::window_size().ok()?;
    if window.columns == 0 || window.width == 0 {
        return None;
    }
    Some(u32::from(window.width))
}

/// Splits the card into (thumbnails, main pane) by the configured position.
pub(crate) fn split_card_area(area: Rect, thumb_position: &str, screen: ScreenSize) -> (Rect, Rect) {
    // Narrow screens give the thumbnails a bigger share, like the card's mobile layout.
    let (thumb_share, main_share) = match screen {
        ScreenSize::Tiny => (1, 2),
        ScreenSize::Small | ScreenSize::Regular => (1, 4),
    };
    let total = thumb_share + main_share;
    let thumbs = Constraint::Ratio(thumb_share, total);
    let main = Constraint::Ratio(main_share, total);

    let (direction, thumbs_first) = match thumb_position.trim().to_ascii_lowercase().as_str() {
        "right" => (Direction::Horizontal, false),
        "top" => (Direction::Vertical, true),
        "bottom" => (Direction::Vertical, false),
        _ => (Direction::Horizontal, true),
    };

    if thumbs_first {
        let chunks = Layout::default()
            .direction(direction)
            .constraints([thumbs, main])
            .split(area);
        (chunks[0], chunks[1])
    } else {
        let chunks = Layout::default()
            .direction(direction)
            .constraints([main, thumbs])
            .split(area);
        (chunks[1], chunks[0])
    }
}

/// Moves the cursor by `delta` rows, keeping it on the same camera across re-sorts.
pub(crate) fn move_cursor(
    thumbnails: &[ThumbnailView],
    current: Option<&str>,
    delta: isize,
) -> Option<String> {
    if thumbnails.is_empty() {
        return None;
    }
    let Some(index) = cursor_index(thumbnails, current) else {
        return Some(thumbnails[0].entity.clone());
    };
    let last = thumbnails.len() - 1;
    let next = index.saturating_add_signed(delta).min(last);
    Some(thumbnails[next].entity.clone())
}

pub(crate) fn cursor_index(thumbnails: &[ThumbnailView], current: Option<&str>) -> Option<usize> {
    let current = current?;
    thumbnails
        .iter()
        .position(|thumbnail| thumbnail.entity == current)
}

/// Shortens long URLs by eliding their middle.
pub(crate) fn elide_middle(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars || max_chars < 5 {
        return text.to_owned();
    }
    let keep = max_chars - 1;
    let head = keep / 2;
    let tail = keep - head;
    let mut out: String = text.chars().take(head).collect();
    out.push('…');
    out.extend(text.chars().skip(count - tail));
    out
}

pub(crate) fn format_clock(at_ms: u64) -> String {
    let at = i64::try_from(at_ms).unwrap_or(i64::MAX);
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(at)
        .map(|time| {
            time.with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "--:--:--".to_owned())
}
