//! Detail overlay for a single feed entry.
//!
//! Transitions live in [`ModalState`], driven by [`ModalEvent`]s, so the
//! open/replace/close rules can be exercised without a terminal. [`DetailModal`]
//! turns the state into something drawable and owns the page's scroll lock.

use crate::apod::ItemRecord;

/// Whether the page under the overlay may scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Auto,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTrigger {
    CloseControl,
    Backdrop,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    Open(ItemRecord),
    Dismiss(DismissTrigger),
    /// Pointer activation inside the content area; never dismisses.
    ContentClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Replaced,
    Closed,
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    pub is_open: bool,
    pub current: Option<ItemRecord>,
}

impl ModalState {
    pub fn apply(&mut self, event: ModalEvent) -> Transition {
        match event {
            ModalEvent::Open(record) => {
                let transition = if self.is_open {
                    Transition::Replaced
                } else {
                    Transition::Opened
                };
                self.is_open = true;
                self.current = Some(record);
                transition
            }
            ModalEvent::Dismiss(_) if self.is_open => {
                self.is_open = false;
                self.current = None;
                Transition::Closed
            }
            ModalEvent::Dismiss(_) | ModalEvent::ContentClick => Transition::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalImage {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub title: String,
    pub date_label: String,
    pub explanation: String,
    pub image: Option<ModalImage>,
    pub copyright: Option<String>,
    pub link: String,
}

impl ModalView {
    fn from_record(record: &ItemRecord) -> Self {
        let image = record.is_image().then(|| ModalImage {
            url: record.url.clone(),
            alt: record.title.clone(),
        });
        Self {
            title: record.title.clone(),
            date_label: record.date_label(),
            explanation: record.explanation.clone(),
            image,
            copyright: record
                .copyright
                .as_ref()
                .map(|owner| owner.trim().to_string())
                .filter(|owner| !owner.is_empty()),
            link: record.preferred_url().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailModal {
    state: ModalState,
    view: Option<ModalView>,
    page_overflow: Overflow,
    scroll: u16,
}

impl Default for DetailModal {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailModal {
    pub fn new() -> Self {
        Self {
            state: ModalState::default(),
            view: None,
            page_overflow: Overflow::Auto,
            scroll: 0,
        }
    }

    pub fn open(&mut self, record: ItemRecord) -> Transition {
        self.dispatch(ModalEvent::Open(record))
    }

    pub fn close(&mut self) -> Transition {
        self.dispatch(ModalEvent::Dismiss(DismissTrigger::CloseControl))
    }

    pub fn dispatch(&mut self, event: ModalEvent) -> Transition {
        let transition = self.state.apply(event);
        match transition {
            Transition::Opened | Transition::Replaced => {
                self.view = self.state.current.as_ref().map(ModalView::from_record);
                self.scroll = 0;
                self.page_overflow = Overflow::Hidden;
            }
            Transition::Closed => {
                self.view = None;
                self.scroll = 0;
                self.page_overflow = Overflow::Auto;
            }
            Transition::Ignored => {}
        }
        transition
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn view(&self) -> Option<&ModalView> {
        self.view.as_ref()
    }

    pub fn background_overflow(&self) -> Overflow {
        self.page_overflow
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Scrolls the explanation, keeping at least one line in view.
    pub fn scroll_by(&mut self, delta: i32, content_lines: usize) -> bool {
        if !self.is_open() {
            return false;
        }
        let max = content_lines.saturating_sub(1).min(u16::MAX as usize) as i32;
        let next = (i32::from(self.scroll) + delta).clamp(0, max) as u16;
        if next == self.scroll {
            return false;
        }
        self.scroll = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apod::MediaType;

    fn nebula() -> ItemRecord {
        ItemRecord {
            date: "2024-01-01".into(),
            title: "Nebula".into(),
            media_type: MediaType::Image,
            url: "x.jpg".into(),
            explanation: "A cloud of gas and dust.".into(),
            hdurl: None,
            copyright: Some("  ".into()),
        }
    }

    fn launch() -> ItemRecord {
        ItemRecord {
            date: "2024-01-02".into(),
            title: "Launch".into(),
            media_type: MediaType::Video,
            url: "https://www.youtube.com/embed/abc".into(),
            explanation: "Liftoff.".into(),
            hdurl: None,
            copyright: Some("Jane Doe".into()),
        }
    }

    #[test]
    fn open_shows_image_record_in_full() {
        let mut modal = DetailModal::new();
        assert_eq!(modal.open(nebula()), Transition::Opened);
        let view = modal.view().unwrap();
        assert_eq!(view.title, "Nebula");
        assert_eq!(view.date_label, "Date: 2024-01-01");
        assert_eq!(view.explanation, "A cloud of gas and dust.");
        assert_eq!(
            view.image,
            Some(ModalImage {
                url: "x.jpg".into(),
                alt: "Nebula".into()
            })
        );
        assert!(view.copyright.is_none());
        assert_eq!(modal.background_overflow(), Overflow::Hidden);
    }

    #[test]
    fn video_records_suppress_the_image_area() {
        let mut modal = DetailModal::new();
        modal.open(launch());
        let view = modal.view().unwrap();
        assert!(view.image.is_none());
        assert_eq!(view.explanation, "Liftoff.");
        assert_eq!(view.copyright.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn second_open_replaces_without_closing() {
        let mut modal = DetailModal::new();
        modal.open(nebula());
        assert_eq!(modal.open(launch()), Transition::Replaced);
        assert!(modal.is_open());
        assert_eq!(modal.state().current.as_ref().unwrap().title, "Launch");
        assert_eq!(modal.view().unwrap().title, "Launch");
        assert_eq!(modal.background_overflow(), Overflow::Hidden);
    }

    #[test]
    fn every_dismissal_restores_scroll() {
        for trigger in [
            DismissTrigger::CloseControl,
            DismissTrigger::Backdrop,
            DismissTrigger::Escape,
        ] {
            let mut modal = DetailModal::new();
            modal.open(nebula());
            assert_eq!(
                modal.dispatch(ModalEvent::Dismiss(trigger)),
                Transition::Closed
            );
            assert!(!modal.is_open());
            assert!(modal.view().is_none());
            assert_eq!(modal.state(), &ModalState::default());
            assert_eq!(modal.background_overflow(), Overflow::Auto);
        }
    }

    #[test]
    fn content_clicks_keep_the_overlay_open() {
        let mut modal = DetailModal::new();
        modal.open(nebula());
        assert_eq!(modal.dispatch(ModalEvent::ContentClick), Transition::Ignored);
        assert!(modal.is_open());
    }

    #[test]
    fn dismissing_a_closed_modal_is_a_no_op() {
        let mut modal = DetailModal::new();
        assert_eq!(
            modal.dispatch(ModalEvent::Dismiss(DismissTrigger::Escape)),
            Transition::Ignored
        );
        assert_eq!(modal.close(), Transition::Ignored);
        assert_eq!(modal.background_overflow(), Overflow::Auto);
    }

    #[test]
    fn scrolling_is_bounded_and_reset_on_open() {
        let mut modal = DetailModal::new();
        assert!(!modal.scroll_by(1, 10));
        modal.open(nebula());
        assert!(!modal.scroll_by(-1, 10));
        assert!(modal.scroll_by(20, 10));
        assert_eq!(modal.scroll(), 9);
        modal.open(launch());
        assert_eq!(modal.scroll(), 0);
    }
}
