//! UDS tracking page processor.
//!
//! UDS has no public API. The shipment's tracking page is fetched
//! anonymously and the status, expected delivery and location are read from
//! its markup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{local_datetime, CarrierTrackingProcessor, CarrierTrackingResult, TrackingError};
use crate::shipment::{status_keys, Shipment};

static CURRENT_STEP: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".multi-step.numbered li.current").expect("valid selector"));
static STEP_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".wrap > p.title").expect("valid selector"));
static EXPECTED_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".multi-step.numbered + table").expect("valid selector"));
static HEADER_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.dkBlue").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

static DELIVERED_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})\s*-\s*(\d{1,2}:\d{2}:\d{2}\s*[AP]M)").expect("valid regex")
});

const EXPECTED_MARKER: &str = "Expected Delivery Day:";
const DEPARTED_MARKER: &str = "The package has departed";
const OUT_FOR_DELIVERY_MARKER: &str = "sort facility and is out for delivery";
const DELIVERED_MARKER: &str = "The package is delivered.";

/// UDS client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdsConfig {
    /// Page fetch timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for UdsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Fields read from a UDS tracking page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingPage {
    /// Title of the current progress step.
    pub step_title: Option<String>,
    /// Last parsable row of the expected delivery table.
    pub expected_delivery: Option<NaiveDateTime>,
    pub last_location: Option<String>,
    pub delivered_at: Option<NaiveDateTime>,
}

impl TrackingPage {
    /// Delivery time if known, otherwise the expected one.
    pub fn window_end(&self) -> Option<NaiveDateTime> {
        self.delivered_at.or(self.expected_delivery)
    }

    pub fn status_key(&self) -> &'static str {
        status_key_for_title(self.step_title.as_deref().unwrap_or_default())
    }
}

/// UDS tracking page scraper.
pub struct UdsTrackingProcessor {
    client: Client,
}

impl UdsTrackingProcessor {
    pub fn new(config: UdsConfig) -> Result<Self, TrackingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, TrackingError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CarrierTrackingProcessor for UdsTrackingProcessor {
    async fn process(&self, shipment: &Shipment) -> Result<CarrierTrackingResult, TrackingError> {
        let url = shipment
            .tracking_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| TrackingError::MissingTrackingUrl(shipment.tracking_number.clone()))?;

        let body = self.fetch_page(url).await?;
        let now = Local::now();
        let page = parse_tracking_page(&body, now.year());

        debug!(
            tracking_number = %shipment.tracking_number,
            step = ?page.step_title,
            "Scraped UDS tracking page"
        );

        Ok(CarrierTrackingResult {
            tracking_number: shipment.tracking_number.clone(),
            delivery_window_start: None,
            delivery_window_end: page.window_end().and_then(local_datetime),
            last_location: page.last_location.clone(),
            last_checked_at: Some(now.fixed_offset()),
            status: page.status_key().to_string(),
        })
    }

    fn name(&self) -> &str {
        "uds"
    }
}

/// Map the current progress step title to a status key.
pub(crate) fn status_key_for_title(title: &str) -> &'static str {
    match title {
        "Shipment Notification" => status_keys::PENDING,
        "Received" => status_keys::IN_TRANSIT,
        "Out for Delivery" => status_keys::OUT_FOR_DELIVERY,
        "Delivered" => status_keys::DELIVERED,
        _ => status_keys::UNKNOWN,
    }
}

/// Extract tracking fields from a UDS page. Dates without a year use `year`.
pub fn parse_tracking_page(html: &str, year: i32) -> TrackingPage {
    let document = Html::parse_document(html);
    let mut page = TrackingPage::default();

    if let Some(step) = document.select(&CURRENT_STEP).last() {
        let title = step
            .select(&STEP_TITLE)
            .map(|t| normalize_text(&element_text(t)))
            .collect::<Vec<_>>()
            .join(" ");
        if !title.is_empty() {
            page.step_title = Some(title);
        }
    }

    for table in document.select(&EXPECTED_TABLE) {
        let is_expected = table
            .select(&HEADER_CELL)
            .next()
            .is_some_and(|h| element_text(h).contains(EXPECTED_MARKER));
        if !is_expected {
            continue;
        }

        for row in table.select(&ROW) {
            let cells: Vec<_> = row.select(&CELL).collect();
            if cells.len() != 2 {
                continue;
            }
            let day = element_text(cells[0]);
            let time = element_text(cells[1]);
            match parse_expected_delivery(&day, &time, year) {
                Some(expected) => page.expected_delivery = Some(expected),
                None => debug!(day = %day.trim(), time = %time.trim(), "Skipping expected delivery row"),
            }
        }
    }

    for cell in document.select(&CELL) {
        let text = normalize_text(&element_text(cell));

        if text.contains(DEPARTED_MARKER) && text.contains(OUT_FOR_DELIVERY_MARKER) {
            if let Some(place) = departed_place(&text) {
                page.last_location = Some(place);
            }
        }

        if text.contains(DELIVERED_MARKER) {
            if let Some(caps) = DELIVERED_AT.captures(&text) {
                let combined = format!("{} {}", &caps[1], normalize_text(&caps[2]));
                match NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %I:%M:%S %p") {
                    Ok(delivered) => page.delivered_at = Some(delivered),
                    Err(e) => {
                        warn!(datetime = %combined, error = %e, "Failed to parse delivery time")
                    }
                }
            }
        }
    }

    page
}

/// Parse a `("Mon Jun 9", "by 8:00 PM")` row of the expected delivery table.
fn parse_expected_delivery(day: &str, time: &str, year: i32) -> Option<NaiveDateTime> {
    // The weekday is dropped: it need not agree with `year`.
    let day = normalize_text(day);
    let month_day = day.split_once(' ').map(|(_, rest)| rest)?;

    let time = normalize_text(time);
    let time = time.strip_prefix("by").unwrap_or(&time).trim();

    let combined = format!("{} {} {}", month_day, year, time);
    NaiveDateTime::parse_from_str(&combined, "%b %d %Y %I:%M %p").ok()
}

/// Place between "departed " and " sort facility".
fn departed_place(text: &str) -> Option<String> {
    const PREFIX: &str = "departed ";
    const SUFFIX: &str = " sort facility";

    let start = text.find(PREFIX)? + PREFIX.len();
    let end = text.find(SUFFIX)?;
    if end <= start {
        return None;
    }

    let place = text[start..end].trim();
    (!place.is_empty()).then(|| place.to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
fn normalize_text(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
