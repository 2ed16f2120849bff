use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{info, warn};

use crate::apod::{FetchError, ItemRecord};
use crate::data::FeedService;
use crate::dates::{DateRange, DateRangeInput, ValidationError};
use crate::gallery::GalleryRenderer;
use crate::modal::{DetailModal, Transition};

struct FeedResponse {
    generation: u64,
    range: DateRange,
    result: Result<Vec<ItemRecord>, FetchError>,
}

/// Outcome of a finished fetch, as reported by [`Controller::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded { range: DateRange, count: usize },
    Failed { range: DateRange, message: String },
}

/// Wires the date fields, the feed, the gallery and the detail overlay.
///
/// Each submit is tagged with a generation number. A response that arrives
/// for anything but the latest generation is dropped, so the most recent
/// submit always owns the gallery no matter which request finishes last.
pub struct Controller {
    dates: DateRangeInput,
    gallery: GalleryRenderer,
    modal: DetailModal,
    service: Arc<dyn FeedService + Send + Sync>,
    response_tx: Sender<FeedResponse>,
    response_rx: Receiver<FeedResponse>,
    generation: u64,
}

impl Controller {
    pub fn new(
        dates: DateRangeInput,
        gallery: GalleryRenderer,
        modal: DetailModal,
        service: Arc<dyn FeedService + Send + Sync>,
    ) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            dates,
            gallery,
            modal,
            service,
            response_tx,
            response_rx,
            generation: 0,
        }
    }

    pub fn on_submit(&mut self) -> Result<DateRange, ValidationError> {
        let range = self.dates.read()?;

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        info!(%range, generation, "fetching feed");
        self.gallery.show_loading();

        let service = self.service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.fetch_items(range.start, range.end);
            let _ = tx.send(FeedResponse {
                generation,
                range,
                result,
            });
        });

        Ok(range)
    }

    /// Applies every response that has arrived so far.
    pub fn poll(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(response) = self.response_rx.try_recv() {
            if let Some(outcome) = self.apply_response(response) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn apply_response(&mut self, response: FeedResponse) -> Option<FetchOutcome> {
        let FeedResponse {
            generation,
            range,
            result,
        } = response;
        if generation != self.generation {
            warn!(%range, generation, latest = self.generation, "discarding stale feed response");
            return None;
        }

        match result {
            Ok(items) => {
                let count = items.len();
                info!(%range, count, "feed loaded");
                self.gallery.render(items);
                Some(FetchOutcome::Loaded { range, count })
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%range, error = %message, "feed request failed");
                self.gallery.show_error(&message);
                Some(FetchOutcome::Failed { range, message })
            }
        }
    }

    /// Opens the detail overlay for the card at `index`.
    pub fn select(&mut self, index: usize) -> Option<Transition> {
        let record = self.gallery.activate(index)?;
        self.gallery.select(index);
        Some(self.modal.open(record))
    }

    pub fn open_selected(&mut self) -> Option<Transition> {
        let index = self.gallery.selected()?;
        self.select(index)
    }

    pub fn is_loading(&self) -> bool {
        self.gallery.is_loading()
    }

    pub fn dates(&self) -> &DateRangeInput {
        &self.dates
    }

    pub fn dates_mut(&mut self) -> &mut DateRangeInput {
        &mut self.dates
    }

    pub fn gallery(&self) -> &GalleryRenderer {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut GalleryRenderer {
        &mut self.gallery
    }

    pub fn modal(&self) -> &DetailModal {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut DetailModal {
        &mut self.modal
    }

    #[cfg(test)]
    fn wait_for_response(&mut self, timeout: std::time::Duration) -> Option<FetchOutcome> {
        let response = self.response_rx.recv_timeout(timeout).ok()?;
        self.apply_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::NaiveDate;

    use crate::apod::{MediaType, DATE_FORMAT};
    use crate::data::MockFeedService;
    use crate::dates::DateField;
    use crate::gallery::{GalleryContents, Thumbnail, EMPTY_MESSAGE};
    use crate::modal::{DismissTrigger, ModalEvent, Overflow};

    const WAIT: Duration = Duration::from_secs(5);

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap()
    }

    fn nebula() -> ItemRecord {
        ItemRecord {
            date: "2024-01-01".into(),
            title: "Nebula".into(),
            media_type: MediaType::Image,
            url: "x.jpg".into(),
            explanation: "Stars are born here.".into(),
            hdurl: None,
            copyright: None,
        }
    }

    fn controller_with(service: Arc<MockFeedService>, start: &str, end: &str) -> Controller {
        let mut dates = DateRangeInput::with_defaults(date("2024-06-30"), 9);
        dates.set(DateField::Start, start);
        dates.set(DateField::End, end);
        Controller::new(dates, GalleryRenderer::new(), DetailModal::new(), service)
    }

    #[test]
    fn submit_fetches_exactly_once_with_the_range() {
        let service = Arc::new(MockFeedService::with_items(vec![nebula()]));
        let mut controller = controller_with(service.clone(), "2024-01-01", "2024-01-05");

        let range = controller.on_submit().unwrap();
        assert!(controller.is_loading());
        let outcome = controller.wait_for_response(WAIT).unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Loaded {
                range,
                count: 1
            }
        );
        assert_eq!(
            service.calls(),
            vec![(date("2024-01-01"), date("2024-01-05"))]
        );
        assert!(!controller.is_loading());
    }

    #[test]
    fn reversed_range_never_reaches_the_feed() {
        let service = Arc::new(MockFeedService::with_items(vec![nebula()]));
        let mut controller = controller_with(service.clone(), "2024-02-10", "2024-02-01");

        let err = controller.on_submit().unwrap_err();
        assert_eq!(err, ValidationError::StartAfterEnd);
        assert!(controller.wait_for_response(Duration::from_millis(50)).is_none());
        assert!(service.calls().is_empty());
        assert!(!controller.is_loading());
    }

    #[test]
    fn missing_date_never_reaches_the_feed() {
        let service = Arc::new(MockFeedService::default());
        let mut controller = controller_with(service.clone(), "", "2024-02-01");
        assert_eq!(controller.on_submit(), Err(ValidationError::MissingDates));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn empty_feed_shows_the_empty_placeholder() {
        let service = Arc::new(MockFeedService::with_items(Vec::new()));
        let mut controller = controller_with(service, "2024-01-01", "2024-01-03");
        let range = controller.on_submit().unwrap();
        let outcome = controller.wait_for_response(WAIT).unwrap();

        assert_eq!(outcome, FetchOutcome::Loaded { range, count: 0 });
        assert!(controller.gallery().cards().is_empty());
        match controller.gallery().contents() {
            GalleryContents::Placeholder(p) => assert_eq!(p.lines, vec![EMPTY_MESSAGE.to_string()]),
            other => panic!("unexpected contents: {other:?}"),
        }
    }

    #[test]
    fn failures_replace_the_gallery_with_the_message() {
        let service = Arc::new(MockFeedService::failing(FetchError::Status(500)));
        let mut controller = controller_with(service, "2024-01-01", "2024-01-02");
        controller.on_submit().unwrap();
        let outcome = controller.wait_for_response(WAIT).unwrap();
        assert!(matches!(outcome, FetchOutcome::Failed { ref message, .. } if message == "API request failed: 500"));
        match controller.gallery().contents() {
            GalleryContents::Placeholder(p) => {
                assert_eq!(p.lines[0], "Sorry, something went wrong: API request failed: 500")
            }
            other => panic!("unexpected contents: {other:?}"),
        }
    }

    #[test]
    fn nebula_scenario_end_to_end() {
        let service = Arc::new(MockFeedService::with_items(vec![nebula()]));
        let mut controller = controller_with(service, "2024-01-01", "2024-01-01");
        controller.on_submit().unwrap();
        controller.wait_for_response(WAIT).unwrap();

        let cards = controller.gallery().cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Nebula");
        assert_eq!(cards[0].date_label, "Date: 2024-01-01");
        assert!(matches!(cards[0].thumbnail, Thumbnail::Image { .. }));

        assert_eq!(controller.select(0), Some(Transition::Opened));
        let view = controller.modal().view().unwrap();
        assert_eq!(view.title, "Nebula");
        assert_eq!(view.date_label, "Date: 2024-01-01");
        assert_eq!(view.explanation, "Stars are born here.");
        assert_eq!(view.image.as_ref().unwrap().alt, "Nebula");
        assert_eq!(controller.modal().background_overflow(), Overflow::Hidden);

        controller
            .modal_mut()
            .dispatch(ModalEvent::Dismiss(DismissTrigger::Backdrop));
        assert_eq!(controller.modal().background_overflow(), Overflow::Auto);
    }

    #[test]
    fn selecting_a_missing_card_does_nothing() {
        let service = Arc::new(MockFeedService::default());
        let mut controller = controller_with(service, "2024-01-01", "2024-01-01");
        assert!(controller.select(0).is_none());
        assert!(controller.open_selected().is_none());
        assert!(!controller.modal().is_open());
    }

    /// Answers the first request slowly so it resolves after the second.
    struct SlowFirstService {
        slow_start: NaiveDate,
    }

    impl FeedService for SlowFirstService {
        fn fetch_items(&self, start: NaiveDate, _end: NaiveDate) -> Result<Vec<ItemRecord>, FetchError> {
            if start == self.slow_start {
                thread::sleep(Duration::from_millis(200));
            }
            let mut record = nebula();
            record.date = start.format(DATE_FORMAT).to_string();
            record.title = format!("from {}", record.date);
            Ok(vec![record])
        }
    }

    #[test]
    fn latest_submit_wins_over_slow_earlier_request() {
        let service = Arc::new(SlowFirstService {
            slow_start: date("2024-01-01"),
        });
        let mut dates = DateRangeInput::with_defaults(date("2024-06-30"), 9);
        dates.set(DateField::Start, "2024-01-01");
        dates.set(DateField::End, "2024-01-03");
        let mut controller =
            Controller::new(dates, GalleryRenderer::new(), DetailModal::new(), service);

        controller.on_submit().unwrap();
        controller.dates_mut().set(DateField::Start, "2024-01-02");
        controller.on_submit().unwrap();

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            if let Some(outcome) = controller.wait_for_response(WAIT) {
                outcomes.push(outcome);
            }
        }

        assert_eq!(outcomes.len(), 1);
        assert_eq!(controller.gallery().cards()[0].title, "from 2024-01-02");
    }
}
