// Turns a trip response into the four result panes and records what the
// download and modify features need in the application state.

use crate::flights::parse_flights;
use crate::hotels::parse_hotels;
use crate::markdown::format_itinerary;
use crate::placeholder::{flights_or_fallback, hotels_with_minimum, places_with_minimum, FillerPolicy};
use crate::places::parse_places;
use crate::render::{format_flights_html, format_hotels_html, format_places_html};
use crate::response::TripResponse;
use crate::state::AppState;
use crate::error::ParseError;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const NO_ITINERARY_PANE_HTML: &str = "<div class=\"empty-state\">No itinerary available</div>";

pub const FLIGHTS_EMPTY_STATE_HTML: &str = concat!(
    "<div class=\"empty-state\" id=\"flights-empty-state\">",
    "<i class=\"fas fa-plane-departure mb-3\" style=\"font-size: 3rem; color: #ccc;\"></i>",
    "<p>No flight information available. Flight data might not have been generated.</p>",
    "<small class=\"text-muted d-block mt-2\">Flight data will appear here once your itinerary is generated.</small>",
    "</div>"
);

pub const HOTELS_EMPTY_STATE_HTML: &str = concat!(
    "<div class=\"empty-state\">",
    "<i class=\"fas fa-hotel mb-3\" style=\"font-size: 3rem; color: #ccc;\"></i>",
    "<p>No hotel information available. The hotels data might not have been generated ",
    "or there was an issue retrieving it.</p>",
    "</div>"
);

/// HTML for each result pane plus the visibility of the itinerary controls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedResults {
    pub itinerary_html: String,
    pub flights_html: String,
    pub hotels_html: String,
    pub places_html: String,
    pub show_itinerary_header: bool,
    pub show_modify_button: bool,
    pub has_document: bool,
}

// What gets sent back for modification
fn markdown_source(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders every pane of `response`.
///
/// The itinerary markdown and the downloadable document of the response
/// replace whatever the state held before, so a response without an
/// itinerary also disables modification.
pub fn render_results(
    response: &TripResponse,
    state: &AppState,
    policy: FillerPolicy,
) -> RenderedResults {
    let ctx = state.search_context();
    let mut rendered = RenderedResults::default();

    match response.itinerary_data() {
        Some(data) => {
            rendered.itinerary_html = format_itinerary(data);
            rendered.show_itinerary_header = true;
            rendered.show_modify_button = true;
            state.set_itinerary_markdown(Some(markdown_source(data)));
        }
        None => {
            debug!("Response has no itinerary");
            rendered.itinerary_html = NO_ITINERARY_PANE_HTML.to_string();
            state.set_itinerary_markdown(None);
        }
    }
    state.cancel_modification();

    rendered.flights_html = match response.flights_text() {
        Some(text) => {
            let flights = flights_or_fallback(parse_flights(&text), &ctx);
            format_flights_html(&flights, &ctx)
        }
        None => {
            debug!("No flight data in response");
            FLIGHTS_EMPTY_STATE_HTML.to_string()
        }
    };

    rendered.hotels_html = match response.hotels_text() {
        Some(text) => {
            let hotels = hotels_with_minimum(parse_hotels(&text), &text, policy);
            format_hotels_html(&hotels, &ctx)
        }
        None => {
            debug!("No hotel data in response");
            HOTELS_EMPTY_STATE_HTML.to_string()
        }
    };

    let places = match response.places_text() {
        Some(text) => places_with_minimum(parse_places(&text), &text, &ctx, policy),
        None => {
            warn!("No places data in response, using fallback places");
            places_with_minimum(Err(ParseError::Empty), "", &ctx, policy)
        }
    };
    rendered.places_html = format_places_html(&places);

    let document = response.document();
    rendered.has_document = document.is_some();
    if document.is_none() {
        warn!("No document data received");
    }
    state.set_pdf_document(document);

    info!(
        "Rendered results: itinerary={}, {} places, document={}",
        rendered.show_itinerary_header,
        places.len(),
        rendered.has_document
    );
    rendered
}
