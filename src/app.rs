use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::apod;
use crate::config;
use crate::controller::Controller;
use crate::data::{self, FeedService};
use crate::dates::{DateField, DateRangeInput};
use crate::gallery::GalleryRenderer;
use crate::logging;
use crate::modal::DetailModal;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub demo: bool,
}

pub fn run(options: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let log_path = logging::init(&cfg.log);
    info!(version = crate::VERSION, log = ?log_path, "starting apod-gallery");

    let config_path = options.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());

    let (feed_service, status): (Arc<dyn FeedService + Send + Sync>, String) = if options.demo {
        (
            Arc::new(data::MockFeedService::sample()),
            "Demo mode: showing sample entries. Press Enter to load the range.".to_string(),
        )
    } else {
        let client = apod::Client::new(apod::ClientConfig {
            base_url: cfg.api.base_url.clone(),
            api_key: cfg.api.key.clone(),
            user_agent: cfg.api.user_agent.clone(),
            timeout: cfg.api.timeout,
            http_client: None,
        })
        .context("create apod client")?;
        (
            Arc::new(data::ApodFeedService::new(Arc::new(client))),
            "Pick a date range and press Enter to fetch Astronomy Pictures of the Day.".to_string(),
        )
    };

    let today = Local::now().date_naive();
    let mut dates = DateRangeInput::with_defaults(today, cfg.gallery.default_days);
    if let Some(start) = options.start {
        dates.set(DateField::Start, start);
    }
    if let Some(end) = options.end {
        dates.set(DateField::End, end);
    }

    let controller = Controller::new(
        dates,
        GalleryRenderer::new(),
        DetailModal::new(),
        feed_service,
    );

    let mut model = ui::Model::new(ui::Options {
        status_message: status,
        controller,
        config_path: display_path,
    });
    model.run()?;

    info!("apod-gallery exited");
    Ok(())
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/apod-gallery/config.yaml".to_string()
    }
}
