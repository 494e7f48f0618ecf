use crate::host::StateObject;

const TINY_SCREEN_MAX_PX: u32 = 520;
const SMALL_SCREEN_MAX_PX: u32 = 1000;

/// Responsive layout class. Styling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenSize {
    Tiny,
    Small,
    Regular,
}

impl ScreenSize {
    #[must_use]
    pub fn from_width(width_px: u32) -> Self {
        if width_px < TINY_SCREEN_MAX_PX {
            Self::Tiny
        } else if width_px < SMALL_SCREEN_MAX_PX {
            Self::Small
        } else {
            Self::Regular
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailView {
    pub entity: String,
    pub name: String,
    pub url: Option<String>,
    pub has_motion: bool,
    pub selected: bool,
    pub recording: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MainPane {
    Empty,
    Image {
        entity: String,
        url: String,
        alt: String,
    },
    Live {
        entity: String,
        name: String,
        state: StateObject,
        fullscreen: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardView {
    Loading,
    Ready {
        thumb_position: String,
        screen: ScreenSize,
        toolbar_visible: bool,
        thumbnails: Vec<ThumbnailView>,
        main: MainPane,
    },
}

#[cfg(test)]
mod tests {
    use super::ScreenSize;

    #[test]
    fn breakpoints_map_to_size_classes() {
        assert_eq!(ScreenSize::from_width(0), ScreenSize::Tiny);
        assert_eq!(ScreenSize::from_width(519), ScreenSize::Tiny);
        assert_eq!(ScreenSize::from_width(520), ScreenSize::Small);
        assert_eq!(ScreenSize::from_width(999), ScreenSize::Small);
        assert_eq!(ScreenSize::from_width(1000), ScreenSize::Regular);
    }
}
