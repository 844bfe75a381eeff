// Trip response model. The backend has moved its listings around between
// versions, so everything except the envelope is kept as raw JSON and probed.

use crate::pdf::PdfDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub itinerary: Value,
    #[serde(default)]
    pub flights: Value,
    #[serde(default)]
    pub hotels: Value,
    #[serde(default)]
    pub places: Value,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

// Same notion of "present" as a JS truthiness check
fn present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |value, key| value.get(key))
        .filter(|value| present(value))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TripResponse {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    fn root(&self) -> Value {
        serde_json::json!({
            "itinerary": self.itinerary,
            "flights": self.flights,
            "hotels": self.hotels,
            "places": self.places,
        })
    }

    fn probe(&self, candidates: &[&[&str]], label: &str) -> Option<String> {
        let root = self.root();
        candidates.iter().find_map(|path| {
            lookup(&root, path).map(|value| {
                debug!("Found {} at {}", label, path.join("."));
                as_text(value)
            })
        })
    }

    /// The itinerary markdown (or JSON wrapper) at `itinerary.itinerary.data`.
    pub fn itinerary_data(&self) -> Option<&Value> {
        lookup(&self.itinerary, &["itinerary", "data"])
    }

    pub fn flights_text(&self) -> Option<String> {
        self.probe(
            &[
                &["itinerary", "flights", "data"],
                &["flights", "data"],
                &["flights"],
                &["itinerary", "flights"],
            ],
            "flights",
        )
    }

    pub fn hotels_text(&self) -> Option<String> {
        self.probe(
            &[
                &["itinerary", "hotels", "data"],
                &["hotels", "data"],
                &["hotels"],
            ],
            "hotels",
        )
    }

    pub fn places_text(&self) -> Option<String> {
        self.probe(
            &[
                &["itinerary", "places", "data"],
                &["places", "data"],
                &["places"],
                &["itinerary", "places"],
            ],
            "places",
        )
    }

    pub fn document(&self) -> Option<PdfDocument> {
        let data = self.document.as_deref().filter(|d| !d.is_empty())?;
        Some(PdfDocument {
            data: data.to_string(),
            document_type: self
                .document_type
                .clone()
                .unwrap_or_else(|| "markdown".to_string()),
        })
    }
}
