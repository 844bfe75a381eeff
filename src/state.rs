// Shared client state: the airport list, the current itinerary and search,
// the downloadable document and the modify-itinerary flow.
//
// Shared as `Arc<AppState>`. Locks are held only for the duration of an
// accessor call and never across an `.await`.

use crate::airports::{self, Airport, AirportSuggestions};
use crate::api::{TripPlannerApi, TripRequest};
use crate::display::{render_results, RenderedResults};
use crate::error::{ApiError, ClientError};
use crate::markdown::format_itinerary_str;
use crate::pdf::PdfDocument;
use crate::placeholder::FillerPolicy;
use crate::records::SearchContext;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifyState {
    #[default]
    Idle,
    AwaitingModification,
}

#[derive(Debug, Default)]
struct Inner {
    airports: Vec<Airport>,
    itinerary_markdown: Option<String>,
    search_context: SearchContext,
    pdf_document: Option<PdfDocument>,
    modify_state: ModifyState,
}

#[derive(Debug, Default)]
pub struct AppState {
    inner: RwLock<Inner>,
    request_in_flight: AtomicBool,
}

/// Marks a trip request as in flight until dropped.
#[must_use = "the request is released as soon as the guard is dropped"]
pub struct RequestGuard<'a> {
    state: &'a AppState,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.state.finish_request();
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // Airports

    /// Replaces the airport list, ordered popular-first.
    pub fn set_airports(&self, mut list: Vec<Airport>) {
        airports::sort_by_popularity(&mut list);
        self.inner.write().airports = list;
    }

    pub fn airports(&self) -> Vec<Airport> {
        self.inner.read().airports.clone()
    }

    pub fn airport_count(&self) -> usize {
        self.inner.read().airports.len()
    }

    pub fn filter_airports(&self, term: &str) -> Vec<Airport> {
        let inner = self.inner.read();
        airports::filter_airports(&inner.airports, term)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn suggest_airports(&self, term: &str) -> AirportSuggestions {
        airports::suggest(&self.inner.read().airports, term)
    }

    /// Fetches the airport list. On failure the current list is kept.
    pub async fn load_airports<A>(&self, api: &A, limit: usize) -> Result<usize, ApiError>
    where
        A: TripPlannerApi + ?Sized,
    {
        match api.airports(limit).await {
            Ok(list) => {
                let count = list.len();
                self.set_airports(list);
                info!("Airport list ready with {} airports", count);
                Ok(count)
            }
            Err(err) => {
                warn!("Failed to load airports: {}", err);
                Err(err)
            }
        }
    }

    // Current trip

    pub fn itinerary_markdown(&self) -> Option<String> {
        self.inner.read().itinerary_markdown.clone()
    }

    pub fn set_itinerary_markdown(&self, markdown: Option<String>) {
        self.inner.write().itinerary_markdown = markdown.filter(|m| !m.trim().is_empty());
    }

    pub fn search_context(&self) -> SearchContext {
        self.inner.read().search_context.clone()
    }

    pub fn set_search_context(&self, ctx: SearchContext) {
        self.inner.write().search_context = ctx;
    }

    pub fn pdf_document(&self) -> Option<PdfDocument> {
        self.inner.read().pdf_document.clone()
    }

    pub fn set_pdf_document(&self, document: Option<PdfDocument>) {
        self.inner.write().pdf_document = document;
    }

    // Submit guard

    /// Claims the single trip-request slot.
    pub fn try_begin_request(&self) -> Result<RequestGuard<'_>, ClientError> {
        self.request_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RequestGuard { state: self })
            .map_err(|_| ClientError::RequestInFlight)
    }

    pub fn finish_request(&self) {
        self.request_in_flight.store(false, Ordering::Release);
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.request_in_flight.load(Ordering::Acquire)
    }

    /// Plans a trip and renders the result panes.
    pub async fn plan_trip<A>(
        &self,
        api: &A,
        request: &TripRequest,
        policy: FillerPolicy,
    ) -> Result<RenderedResults, ApiError>
    where
        A: TripPlannerApi + ?Sized,
    {
        let _guard = self.try_begin_request()?;
        self.set_search_context(request.search_context());

        let response = api.plan_trip(request).await?;
        Ok(render_results(&response, self, policy))
    }

    // Modify flow

    pub fn modify_state(&self) -> ModifyState {
        self.inner.read().modify_state
    }

    /// Opens the modification form; needs a rendered itinerary.
    pub fn show_modify(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.write();
        if inner.itinerary_markdown.is_none() {
            return Err(ClientError::NoItinerary);
        }
        inner.modify_state = ModifyState::AwaitingModification;
        Ok(())
    }

    pub fn cancel_modification(&self) {
        self.inner.write().modify_state = ModifyState::Idle;
    }

    /// Sends the stored itinerary and `feedback` to the backend. On success the
    /// modified markdown replaces the stored one and its HTML is returned.
    pub async fn apply_modification<A>(
        &self,
        api: &A,
        feedback: &str,
        language: &str,
    ) -> Result<String, ApiError>
    where
        A: TripPlannerApi + ?Sized,
    {
        let current = self.itinerary_markdown().ok_or(ClientError::NoItinerary)?;
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ClientError::EmptyFeedback.into());
        }

        let modified = api.modify_itinerary(&current, feedback, language).await?;
        info!("Itinerary modified ({} chars)", modified.len());

        let html = format_itinerary_str(&modified);
        self.set_itinerary_markdown(Some(modified));
        self.cancel_modification();
        Ok(html)
    }
}
