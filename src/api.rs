// HTTP boundary to the trip-planning backend.
//
// `TripPlannerApi` is the seam the application state talks to; the reqwest
// client below is the production implementation and tests swap in fakes.

use crate::airports::Airport;
use crate::error::{ApiError, ClientError};
use crate::records::SearchContext;
use crate::response::TripResponse;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
// Itinerary generation is slow; the backend may take minutes
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_AIRPORT_LIMIT: usize = 2000;
pub const DEFAULT_LANGUAGE: &str = "en";

const BASE_URL_VAR: &str = "ITINERARY_API_BASE_URL";
const TIMEOUT_VAR: &str = "ITINERARY_API_TIMEOUT_MS";
const AIRPORT_LIMIT_VAR: &str = "ITINERARY_AIRPORT_LIMIT";
const LANGUAGE_VAR: &str = "ITINERARY_LANGUAGE";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub airport_limit: usize,
    pub language: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            airport_limit: DEFAULT_AIRPORT_LIMIT,
            language: DEFAULT_LANGUAGE.to_string(),
            user_agent: concat!("itinerary_client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

fn load<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ClientError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ClientError::ConfigError(format!("invalid {key}: {e}"))
        }),
    }
}

impl ClientConfig {
    /// Reads the `ITINERARY_*` environment variables, defaulting the unset ones.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            base_url: load(&lookup, BASE_URL_VAR, defaults.base_url)?,
            timeout_ms: load(&lookup, TIMEOUT_VAR, defaults.timeout_ms)?,
            airport_limit: load(&lookup, AIRPORT_LIMIT_VAR, defaults.airport_limit)?,
            language: load(&lookup, LANGUAGE_VAR, defaults.language)?,
            user_agent: defaults.user_agent,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::ConfigError("base URL is empty".to_string()));
        }
        let url = Url::parse(base)
            .map_err(|e| ClientError::ConfigError(format!("invalid base URL {base}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::ConfigError(format!(
                "base URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::ConfigError("timeout must be positive".to_string()));
        }
        if self.airport_limit == 0 {
            return Err(ClientError::ConfigError("airport limit must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Travelers {
    pub adults: u32,
    pub children: u32,
    pub seniors: u32,
    pub children_under_5: u32,
    pub itinerary_based_passengers: bool,
}

impl Default for Travelers {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            seniors: 0,
            children_under_5: 0,
            itinerary_based_passengers: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPreferences {
    pub avoid_red_eye: bool,
    pub avoid_early_morning: bool,
    pub child_friendly: bool,
    pub senior_friendly: bool,
    pub direct_flights_only: bool,
}

/// Body of `POST /plan-trip`, as the planning form submits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub from_city: String,
    pub to_city: String,
    pub additional_instructions: String,
    pub language: String,
    pub start_date: String,
    pub end_date: String,
    pub budget_amount: Option<f64>,
    pub currency: String,
    pub travelers: Travelers,
    pub flight_preferences: FlightPreferences,
    pub consider_toddler_friendly: bool,
    pub consider_senior_friendly: bool,
    pub safety_check: bool,
}

impl TripRequest {
    pub fn new(
        from_city: impl Into<String>,
        to_city: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            from_city: from_city.into(),
            to_city: to_city.into(),
            additional_instructions: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            budget_amount: None,
            currency: "USD".to_string(),
            travelers: Travelers::default(),
            flight_preferences: FlightPreferences::default(),
            consider_toddler_friendly: false,
            consider_senior_friendly: false,
            safety_check: true,
        }
    }

    pub fn search_context(&self) -> SearchContext {
        SearchContext {
            from: self.from_city.clone(),
            to: self.to_city.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AirportsEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    airports: Option<Vec<Airport>>,
}

#[derive(Debug, Serialize)]
struct ModifyRequest<'a> {
    itinerary_content: &'a str,
    modification_feedback: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModifyEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    modified_itinerary: Option<String>,
}

fn backend_failure(message: Option<String>, fallback: &str) -> ApiError {
    ApiError::Backend(
        message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    )
}

#[async_trait]
pub trait TripPlannerApi: Send + Sync {
    /// Requests a full trip plan. Only `status == "success"` responses are returned.
    async fn plan_trip(&self, request: &TripRequest) -> Result<TripResponse, ApiError>;

    async fn airports(&self, limit: usize) -> Result<Vec<Airport>, ApiError>;

    /// Sends the current itinerary markdown with the user's change request and
    /// returns the modified markdown.
    async fn modify_itinerary(
        &self,
        content: &str,
        feedback: &str,
        language: &str,
    ) -> Result<String, ApiError>;

    // Fire-and-forget download counter
    async fn log_download(&self);
}

pub struct HttpTripClient {
    client: Client,
    config: ClientConfig,
}

impl HttpTripClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }

    async fn read_json<R: DeserializeOwned>(
        &self,
        response: Response,
        path: &str,
    ) -> Result<R, ApiError> {
        let status = response.status();
        debug!("{} responded with {}", path, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("HTTP error").to_string()
            } else {
                body
            };
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl TripPlannerApi for HttpTripClient {
    async fn plan_trip(&self, request: &TripRequest) -> Result<TripResponse, ApiError> {
        info!(
            "Requesting trip plan {} -> {} ({} to {})",
            request.from_city, request.to_city, request.start_date, request.end_date
        );

        let response = self
            .client
            .post(self.endpoint("/plan-trip"))
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let trip: TripResponse = self.read_json(response, "/plan-trip").await?;

        if !trip.is_success() {
            error!("Trip planning failed: {:?}", trip.message);
            return Err(backend_failure(trip.message, "Unknown error occurred"));
        }
        info!("Trip plan received");
        Ok(trip)
    }

    async fn airports(&self, limit: usize) -> Result<Vec<Airport>, ApiError> {
        let response = self
            .client
            .get(self.endpoint("/airports"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let envelope: AirportsEnvelope = self.read_json(response, "/airports").await?;

        match (envelope.status.as_deref(), envelope.airports) {
            (Some("success"), Some(airports)) => {
                info!("Loaded {} airports", airports.len());
                Ok(airports)
            }
            _ => {
                error!("Failed to load airports: {:?}", envelope.message);
                Err(backend_failure(envelope.message, "Failed to load airports"))
            }
        }
    }

    async fn modify_itinerary(
        &self,
        content: &str,
        feedback: &str,
        language: &str,
    ) -> Result<String, ApiError> {
        info!("Requesting itinerary modification ({} chars of feedback)", feedback.len());

        let body = ModifyRequest {
            itinerary_content: content,
            modification_feedback: feedback,
            language,
        };
        let response = self
            .client
            .post(self.endpoint("/modify-itinerary"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let envelope: ModifyEnvelope = self.read_json(response, "/modify-itinerary").await?;

        let modified = envelope
            .modified_itinerary
            .filter(|m| !m.trim().is_empty());
        match (envelope.status.as_deref(), modified) {
            (Some("success"), Some(markdown)) => Ok(markdown),
            _ => Err(backend_failure(envelope.message, "Failed to modify itinerary")),
        }
    }

    async fn log_download(&self) {
        let result = self
            .client
            .post(self.endpoint("/log-download"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => debug!("Download logged"),
            Ok(response) => warn!("Failed to log download: HTTP {}", response.status()),
            Err(err) => warn!("Failed to log download: {}", err),
        }
    }
}
