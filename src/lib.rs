// Client-side core of the trip itinerary planner: backend calls, listing
// parsers with placeholder fallbacks, HTML rendering and PDF export.

pub mod airports;
pub mod api;
pub mod display;
pub mod error;
pub mod flights;
pub mod hotels;
pub mod markdown;
pub mod pdf;
pub mod placeholder;
pub mod places;
pub mod records;
pub mod render;
pub mod response;
pub mod state;

// Re-export key types for convenience
pub use airports::{filter_airports, sort_by_popularity, Airport, Debouncer};
pub use api::{ClientConfig, HttpTripClient, TripPlannerApi, TripRequest};
pub use display::{render_results, RenderedResults};
pub use error::{ApiError, ClientError, ExportError, ParseError};
pub use flights::parse_flights;
pub use hotels::parse_hotels;
pub use markdown::{format_itinerary, format_itinerary_str};
pub use pdf::{prepare_download, DownloadArtifact, PdfDocument, PdfPayload};
pub use placeholder::{flights_or_fallback, hotels_with_minimum, places_with_minimum, FillerPolicy};
pub use places::parse_places;
pub use records::{Flight, FlightSegment, Hotel, Place, RecordSource, SearchContext};
pub use response::TripResponse;
pub use state::{AppState, ModifyState};
