use crate::apod::ItemRecord;

pub const EMPTY_MESSAGE: &str = "No space images found for the selected date range.";
pub const LOADING_MESSAGE: &str = "Space images loading...";
pub const ERROR_RETRY_HINT: &str = "Please try again with a different date range.";
pub const VIDEO_PLACEHOLDER: &str = "🎥 Video Content";

const ICON_EMPTY: &str = "😕";
const ICON_LOADING: &str = "⏳";
const ICON_ERROR: &str = "❌";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub icon: &'static str,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Image { url: String, alt: String },
    VideoPlaceholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub thumbnail: Thumbnail,
    pub title: String,
    pub date_label: String,
    record: ItemRecord,
}

impl Card {
    fn from_record(record: ItemRecord) -> Self {
        let thumbnail = if record.is_image() {
            Thumbnail::Image {
                url: record.url.clone(),
                alt: record.title.clone(),
            }
        } else {
            Thumbnail::VideoPlaceholder
        };
        Self {
            thumbnail,
            title: record.title.clone(),
            date_label: record.date_label(),
            record,
        }
    }

    pub fn record(&self) -> &ItemRecord {
        &self.record
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryContents {
    Placeholder(Placeholder),
    Cards(Vec<Card>),
}

/// Owner of the gallery container. Every call replaces what was shown
/// before; nothing is diffed.
#[derive(Debug, Clone)]
pub struct GalleryRenderer {
    contents: GalleryContents,
    loading: bool,
    selected: usize,
}

impl Default for GalleryRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryRenderer {
    pub fn new() -> Self {
        Self {
            contents: GalleryContents::Placeholder(Placeholder {
                icon: "🔭",
                lines: vec![
                    "Select a date range and press Enter to explore the cosmos.".to_string(),
                ],
            }),
            loading: false,
            selected: 0,
        }
    }

    pub fn show_loading(&mut self) {
        self.replace(placeholder(ICON_LOADING, vec![LOADING_MESSAGE.to_string()]));
        self.loading = true;
    }

    pub fn show_error(&mut self, message: &str) {
        self.replace(placeholder(
            ICON_ERROR,
            vec![
                format!("Sorry, something went wrong: {message}"),
                ERROR_RETRY_HINT.to_string(),
            ],
        ));
    }

    pub fn show_empty(&mut self) {
        self.replace(placeholder(ICON_EMPTY, vec![EMPTY_MESSAGE.to_string()]));
    }

    pub fn render(&mut self, items: Vec<ItemRecord>) {
        if items.is_empty() {
            self.show_empty();
            return;
        }
        let cards = items.into_iter().map(Card::from_record).collect();
        self.replace(GalleryContents::Cards(cards));
    }

    fn replace(&mut self, contents: GalleryContents) {
        self.contents = contents;
        self.loading = false;
        self.selected = 0;
    }

    pub fn contents(&self) -> &GalleryContents {
        &self.contents
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn cards(&self) -> &[Card] {
        match &self.contents {
            GalleryContents::Cards(cards) => cards,
            GalleryContents::Placeholder(_) => &[],
        }
    }

    pub fn selected(&self) -> Option<usize> {
        if self.cards().is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.cards().len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    /// Moves the cursor through a grid `columns` wide. Horizontal moves wrap
    /// across rows; vertical moves stay in the column and stop at its ends.
    pub fn move_selection(&mut self, dx: i32, dy: i32, columns: usize) -> bool {
        let len = self.cards().len();
        if len == 0 {
            return false;
        }
        let columns = columns.max(1) as i64;
        let current = self.selected as i64;
        let mut target = current + i64::from(dx);
        let vertical = current + i64::from(dy) * columns;
        if dy != 0 {
            let column = current % columns;
            target = if vertical < 0 {
                column
            } else if vertical >= len as i64 {
                column + (len as i64 - 1 - column) / columns * columns
            } else {
                vertical
            };
        }
        let target = target.clamp(0, len as i64 - 1) as usize;
        if target == self.selected {
            return false;
        }
        self.selected = target;
        true
    }

    /// Record behind the card at `index`, for handing to the detail view.
    pub fn activate(&self, index: usize) -> Option<ItemRecord> {
        self.cards().get(index).map(|card| card.record().clone())
    }
}

fn placeholder(icon: &'static str, lines: Vec<String>) -> GalleryContents {
    GalleryContents::Placeholder(Placeholder { icon, lines })
}

pub fn columns_for_width(width: u16, card_width: u16) -> usize {
    usize::from((width / card_width.max(1)).max(1))
}
