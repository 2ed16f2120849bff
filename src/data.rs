use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::apod::{self, FetchError, ItemRecord, MediaType, DATE_FORMAT};

pub trait FeedService: Send + Sync {
    fn fetch_items(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ItemRecord>, FetchError>;
}

pub struct ApodFeedService {
    client: Arc<apod::Client>,
}

impl ApodFeedService {
    pub fn new(client: Arc<apod::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for ApodFeedService {
    fn fetch_items(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ItemRecord>, FetchError> {
        self.client.fetch_items(start, end)
    }
}

/// In-memory feed. Remembers every range it was asked for.
#[derive(Default)]
pub struct MockFeedService {
    items: Vec<ItemRecord>,
    failure: Option<FetchError>,
    sample: bool,
    calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl MockFeedService {
    pub fn with_items(items: Vec<ItemRecord>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// One entry per day of the range, alternating images and videos.
    pub fn sample() -> Self {
        Self {
            sample: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls.lock().clone()
    }
}

impl FeedService for MockFeedService {
    fn fetch_items(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ItemRecord>, FetchError> {
        self.calls.lock().push((start, end));
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.sample {
            return Ok(sample_items(start, end));
        }
        Ok(self.items.clone())
    }
}

fn sample_items(start: NaiveDate, end: NaiveDate) -> Vec<ItemRecord> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .enumerate()
        .map(|(index, day)| {
            let date = day.format(DATE_FORMAT).to_string();
            if index % 3 == 2 {
                ItemRecord {
                    title: format!("Sample launch footage {date}"),
                    media_type: MediaType::Video,
                    url: "https://www.youtube.com/embed/sample".into(),
                    explanation: "Sample video entry provided for offline browsing.".into(),
                    hdurl: None,
                    copyright: None,
                    date,
                }
            } else {
                ItemRecord {
                    title: format!("Sample sky {date}"),
                    media_type: MediaType::Image,
                    url: format!("https://apod.nasa.gov/apod/image/sample-{date}.jpg"),
                    explanation: "Sample image entry provided for offline browsing.".into(),
                    hdurl: None,
                    copyright: Some("apod-gallery".into()),
                    date,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap()
    }

    #[test]
    fn sample_feed_has_one_entry_per_day() {
        let service = MockFeedService::sample();
        let items = service
            .fetch_items(date("2024-01-30"), date("2024-02-02"))
            .unwrap();
        let dates: Vec<&str> = items.iter().map(|item| item.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]);
        assert_eq!(items[2].media_type, MediaType::Video);
        assert_eq!(service.calls().len(), 1);
    }

    #[test]
    fn empty_feed_stays_empty() {
        let service = MockFeedService::with_items(Vec::new());
        let items = service
            .fetch_items(date("2024-01-01"), date("2024-01-03"))
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(service.calls().len(), 1);
    }

    #[test]
    fn failing_service_reports_its_error() {
        let service = MockFeedService::failing(FetchError::Status(429));
        let err = service
            .fetch_items(date("2024-01-01"), date("2024-01-01"))
            .unwrap_err();
        assert_eq!(err, FetchError::Status(429));
    }
}
