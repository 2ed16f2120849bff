use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const APOD_API_BASE: &str = "https://api.nasa.gov/planetary/apod";
pub const DEMO_API_KEY: &str = "DEMO_KEY";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: APOD_API_BASE.to_string(),
            api_key: DEMO_API_KEY.to_string(),
            user_agent: format!("apod-gallery/{}", crate::VERSION),
            timeout: Duration::from_secs(30),
            http_client: None,
        }
    }
}

/// Kind of media an APOD entry points at. Anything the feed labels other
/// than `image` is treated like a video: it cannot be drawn inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    #[serde(other)]
    Video,
}

/// One day of the feed, exactly as the endpoint returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub date: String,
    pub title: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hdurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl ItemRecord {
    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }

    pub fn date_label(&self) -> String {
        format!("Date: {}", self.date)
    }

    /// Link worth handing to a browser: the high resolution image when the
    /// feed has one, the plain url otherwise.
    pub fn preferred_url(&self) -> &str {
        match (&self.media_type, self.hdurl.as_deref()) {
            (MediaType::Image, Some(hd)) if !hd.trim().is_empty() => hd,
            _ => &self.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("API request failed: {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    api_key: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("apod client api key required");
        }
        if config.user_agent.trim().is_empty() {
            bail!("apod client user agent required");
        }
        let base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("parse apod base url {:?}", config.base_url))?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout)
                .build()
                .context("build apod http client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            api_key: config.api_key.trim().to_string(),
        })
    }

    pub fn request_url(&self, start: NaiveDate, end: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("start_date", &start.format(DATE_FORMAT).to_string())
            .append_pair("end_date", &end.format(DATE_FORMAT).to_string());
        url
    }

    /// Fetches every entry between `start` and `end` inclusive. Ordering of
    /// the two dates is the caller's concern.
    pub fn fetch_items(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<ItemRecord>, FetchError> {
        let url = self.request_url(start, end);
        debug!(%start, %end, endpoint = %self.base_url, "requesting apod feed");

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<Vec<ItemRecord>>().map_err(|err| {
            if err.is_decode() {
                FetchError::Decode(err.to_string())
            } else {
                FetchError::Transport(err.to_string())
            }
        })
    }
}
