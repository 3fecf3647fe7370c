//! UPS tracking API processor.
//!
//! Every tracking query is a two-step exchange: a client-credentials OAuth
//! grant for a bearer token, then the track details endpoint. Tokens are not
//! reused between queries.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{local_datetime, CarrierTrackingProcessor, CarrierTrackingResult, TrackingError};
use crate::shipment::{status_keys, Shipment};

/// Layout of `deliveryDate.date` + `deliveryTime.*Time` concatenated.
const DATETIME_LAYOUT: &str = "%Y%m%d%H%M%S";

/// UPS API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsConfig {
    /// API base URL (default: https://onlinetools.ups.com).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Request timeout in seconds (default: 20).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Value of the `transactionSrc` header.
    #[serde(default = "default_transaction_src")]
    pub transaction_src: String,
    /// Country whose addresses are qualified by state instead of country code.
    #[serde(default = "default_home_country")]
    pub home_country: String,
}

fn default_base_url() -> String {
    "https://onlinetools.ups.com".to_string()
}

fn default_timeout() -> u64 {
    20
}

fn default_transaction_src() -> String {
    "parcelwatch".to_string()
}

fn default_home_country() -> String {
    "US".to_string()
}

/// UPS tracking processor.
pub struct UpsTrackingProcessor {
    client: Client,
    config: UpsConfig,
}

impl UpsTrackingProcessor {
    /// Create a new UPS processor. Fails without client credentials.
    pub fn new(config: UpsConfig) -> Result<Self, TrackingError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(TrackingError::NotConfigured(
                "UPS client_id and client_secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Exchange the client credentials for a bearer token.
    async fn fetch_access_token(&self) -> Result<String, TrackingError> {
        let url = format!("{}/security/v1/oauth/token", self.base_url());

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                basic_auth_header(&self.config.client_id, &self.config.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: OAuthResponse = response.json().await.map_err(|e| {
            TrackingError::Parse(format!("Failed to parse OAuth response: {}", e))
        })?;

        Ok(token.access_token)
    }

    /// Query the track details endpoint for one tracking number.
    async fn fetch_tracking_details(
        &self,
        tracking_number: &str,
    ) -> Result<ApiResponse, TrackingError> {
        let url = format!(
            "{}/api/track/v1/details/{}",
            self.base_url(),
            urlencoding::encode(tracking_number)
        );

        let access_token = self.fetch_access_token().await?;
        let trans_id = uuid::Uuid::new_v4().to_string();

        debug!(tracking_number, trans_id = %trans_id, "UPS track details request");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("locale", "en_US"),
                ("returnSignature", "false"),
                ("returnMilestones", "false"),
                ("returnPOD", "false"),
            ])
            .bearer_auth(&access_token)
            .header("transId", trans_id)
            .header("transactionSrc", &self.config.transaction_src)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            TrackingError::Parse(format!("Failed to parse tracking response: {}", e))
        })
    }

    /// Track a single package by number.
    pub async fn track(
        &self,
        tracking_number: &str,
    ) -> Result<CarrierTrackingResult, TrackingError> {
        let details = self.fetch_tracking_details(tracking_number).await?;

        let package = details
            .track_response
            .shipment
            .into_iter()
            .next()
            .and_then(|s| s.package.into_iter().next())
            .ok_or_else(|| {
                TrackingError::Parse(format!("No package in response for {}", tracking_number))
            })?;

        let window = match expected_delivery_window(&package) {
            Ok(window) => window,
            Err(e) => {
                warn!(tracking_number, error = %e, "Failed to parse UPS delivery window");
                DeliveryWindow::default()
            }
        };

        let code = package
            .current_status
            .as_ref()
            .map(|s| s.code.as_str())
            .unwrap_or_default();

        Ok(CarrierTrackingResult {
            tracking_number: tracking_number.to_string(),
            delivery_window_start: window.start,
            delivery_window_end: window.end,
            last_location: last_location(&package.activity, &self.config.home_country),
            last_checked_at: Some(Local::now().fixed_offset()),
            status: status_key_for_code(code).to_string(),
        })
    }
}

#[async_trait]
impl CarrierTrackingProcessor for UpsTrackingProcessor {
    async fn process(&self, shipment: &Shipment) -> Result<CarrierTrackingResult, TrackingError> {
        self.track(&shipment.tracking_number).await
    }

    fn name(&self) -> &str {
        "ups"
    }
}

fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let credentials = format!("{client_id}:{client_secret}");
    format!("Basic {}", BASE64_STANDARD.encode(credentials))
}

/// Map a UPS activity status code to the shared status vocabulary.
pub(crate) fn status_key_for_code(code: &str) -> &'static str {
    match code {
        "003" => status_keys::PENDING,            // Shipment Ready for UPS
        "005" => status_keys::IN_TRANSIT,         // In Transit
        "006" => status_keys::OUT_FOR_DELIVERY,   // Out for Delivery Today
        "007" => status_keys::CANCELLED,          // Shipment Canceled
        "011" => status_keys::DELIVERED,          // Delivered
        "012" => status_keys::IN_TRANSIT,         // Clearance in Progress
        "013" => status_keys::IN_TRANSIT,         // Update
        "014" => status_keys::IN_TRANSIT,         // Cleared Customs
        "016" => status_keys::EXCEPTION,          // Held in Warehouse
        "017" => status_keys::DELIVERED,          // Held for Customer Pickup
        "018" => status_keys::EXCEPTION,          // Hold for Pickup Requested
        "019" => status_keys::DELAYED,            // Delivery Rescheduled
        "021" => status_keys::OUT_FOR_DELIVERY,   // Out for Delivery Today
        "022" => status_keys::ATTEMPTED_DELIVERY, // Delivery Attempted
        "023" => status_keys::ATTEMPTED_DELIVERY, // Delivery Attempted
        "024" => status_keys::ATTEMPTED_DELIVERY, // Final Delivery Attempt Made
        "025" => status_keys::IN_TRANSIT,         // In Transit
        "026" => status_keys::DELIVERED,          // Delivered by Local Post Office
        "027" => status_keys::IN_TRANSIT,         // Address Change Requested
        "028" => status_keys::IN_TRANSIT,         // Delivery Address Changed
        "029" => status_keys::EXCEPTION,          // Address Information Required
        "030" => status_keys::DELAYED,            // Local Post Office Delay
        "032" => status_keys::DELAYED,            // Weather May Cause Delay
        "033" => status_keys::RETURNED,           // Return Requested
        "035" => status_keys::RETURNED,           // Returning to Sender
        "038" => status_keys::ACCEPTED,           // Picked Up
        "040" => status_keys::DELIVERED,          // Delivered to UPS Access Point
        "042" => status_keys::IN_TRANSIT,         // Service Upgraded
        "044" => status_keys::IN_TRANSIT,         // On Its Way to UPS
        "045" => status_keys::IN_TRANSIT,         // Order Processed: On its Way to UPS
        "046" => status_keys::DELAYED,            // Delay
        "047" => status_keys::IN_TRANSIT,         // In Transit
        "048" => status_keys::DELAYED,            // Delay
        "049" => status_keys::EXCEPTION,          // Delay: Attention Needed
        "050" => status_keys::EXCEPTION,          // Address Information Required
        "051" => status_keys::DELAYED,            // Delay: Emergency Situation or Severe Weather
        "052" => status_keys::DELAYED,            // Severe Weather Delay
        "053" => status_keys::DELAYED,            // Severe Weather Delay
        "054" => status_keys::DELAYED,            // Delivery Change Requested
        "055" => status_keys::DELAYED,            // Rescheduled Delivery
        "057" => status_keys::IN_TRANSIT,         // On Its Way to a Local UPS Access Point
        "058" => status_keys::EXCEPTION,          // Clearance Information Required
        "065" => status_keys::ATTEMPTED_DELIVERY, // Pickup Attempted
        "070" => status_keys::IN_TRANSIT,         // On Its Way to a Local UPS Access Point
        "071" => status_keys::OUT_FOR_DELIVERY,   // Preparing for Delivery Today
        "072" => status_keys::OUT_FOR_DELIVERY,   // Loaded on Delivery Vehicle
        "077" => status_keys::DELIVERED,          // Scheduled for Pickup Today
        _ => status_keys::UNKNOWN,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DeliveryWindow {
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
}

/// Combine the package's delivery date with its start/end times.
///
/// An unparsable end time fails the whole window. A missing or unparsable
/// start time leaves an end-only window.
fn expected_delivery_window(package: &UpsPackage) -> Result<DeliveryWindow, TrackingError> {
    let Some(date) = package.delivery_date.first().map(|d| d.date.as_str()) else {
        return Ok(DeliveryWindow::default());
    };

    let times = package.delivery_time.as_ref();
    let end_time = times
        .and_then(|t| t.end_time.as_deref())
        .unwrap_or_default();
    let end = parse_ups_datetime(date, end_time)?;

    let start = match times
        .and_then(|t| t.start_time.as_deref())
        .filter(|s| !s.is_empty())
    {
        None => None,
        Some(start_time) => match parse_ups_datetime(date, start_time) {
            Ok(start) => Some(start),
            Err(e) => {
                warn!(date, start_time, error = %e, "Ignoring unparsable UPS window start");
                None
            }
        },
    };

    Ok(DeliveryWindow {
        start,
        end: Some(end),
    })
}

fn parse_ups_datetime(date: &str, time: &str) -> Result<DateTime<FixedOffset>, TrackingError> {
    let combined = format!("{}{}", date, time);
    let naive = NaiveDateTime::parse_from_str(&combined, DATETIME_LAYOUT).map_err(|e| {
        TrackingError::Parse(format!("Invalid UPS datetime '{}': {}", combined, e))
    })?;
    local_datetime(naive).ok_or_else(|| {
        TrackingError::Parse(format!("UPS datetime '{}' does not exist locally", combined))
    })
}

/// "City, Region" of the most recent activity.
fn last_location(activity: &[UpsActivity], home_country: &str) -> Option<String> {
    let address = activity.first()?.location.as_ref()?.address.as_ref()?;

    let region = if address.country_code == home_country {
        &address.state_province
    } else {
        &address.country_code
    };

    let parts: Vec<&str> = [address.city.as_str(), region.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

// ============================================================================
// UPS API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OAuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    track_response: UpsTrackResponse,
}

#[derive(Debug, Deserialize)]
struct UpsTrackResponse {
    #[serde(default)]
    shipment: Vec<UpsShipment>,
}

#[derive(Debug, Deserialize)]
struct UpsShipment {
    #[serde(default)]
    package: Vec<UpsPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsPackage {
    #[serde(default)]
    delivery_time: Option<UpsDeliveryTime>,
    #[serde(default)]
    delivery_date: Vec<UpsDeliveryDate>,
    #[serde(default)]
    current_status: Option<UpsStatus>,
    #[serde(default)]
    activity: Vec<UpsActivity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsDeliveryTime {
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpsDeliveryDate {
    date: String,
}

#[derive(Debug, Deserialize)]
struct UpsStatus {
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct UpsActivity {
    #[serde(default)]
    location: Option<UpsLocation>,
}

#[derive(Debug, Deserialize)]
struct UpsLocation {
    #[serde(default)]
    address: Option<UpsAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsAddress {
    #[serde(default)]
    city: String,
    #[serde(default)]
    state_province: String,
    #[serde(default)]
    country_code: String,
}
