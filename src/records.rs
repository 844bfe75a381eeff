// Records rebuilt from the backend's free-text listings.
// Fields stay as display strings because the upstream text is prose, not data.

use serde::{Deserialize, Serialize};

// Where a record came from, so callers can tell real data from filler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordSource {
    #[default]
    Parsed,
    Inferred,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSegment {
    pub airline: String,
    pub flight_number: Option<String>,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub aircraft: Option<String>,
    pub layover: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub airline: String,
    pub flight_number: Option<String>,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub aircraft: Option<String>,
    pub layover: Option<String>,
    pub total_duration: Option<String>,
    pub price: Option<String>,
    pub is_connecting: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<FlightSegment>,
    #[serde(default)]
    pub source: RecordSource,
}

impl Flight {
    pub fn as_segment(&self) -> FlightSegment {
        FlightSegment {
            airline: self.airline.clone(),
            flight_number: self.flight_number.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_time: self.departure_time.clone(),
            arrival_time: self.arrival_time.clone(),
            duration: self.duration.clone(),
            aircraft: self.aircraft.clone(),
            layover: self.layover.clone(),
        }
    }

    pub fn is_priced(&self) -> bool {
        self.price.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub name: String,
    pub rate: String,
    pub rating: String,
    pub review_count: String,
    pub location: String,
    pub amenities: Vec<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub source: RecordSource,
}

impl Hotel {
    // Defaults for a block that has a name but few labelled lines
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rate: "Contact for rates".to_string(),
            rating: "4.0".to_string(),
            review_count: "Multiple reviews".to_string(),
            location: "Good location".to_string(),
            amenities: vec!["WiFi".to_string(), "Air Conditioning".to_string()],
            image: None,
            source: RecordSource::Parsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub description: String,
    pub rating: String,
    pub review_count: String,
    pub price: String,
    pub image: Option<String>,
    #[serde(default)]
    pub source: RecordSource,
}

impl Place {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rating: "0".to_string(),
            review_count: "0".to_string(),
            price: "Free Entry".to_string(),
            image: None,
            source: RecordSource::Parsed,
        }
    }
}

// Current trip as entered on the form; feeds fallback text and booking links
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContext {
    pub from: String,
    pub to: String,
    pub start_date: String,
    pub end_date: String,
    pub currency: String,
}

impl SearchContext {
    // "paris" / "PARIS" -> "Paris"; empty -> "your destination"
    pub fn destination_name(&self) -> String {
        let to = self.to.trim();
        if to.is_empty() {
            return "your destination".to_string();
        }
        let mut chars = to.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }
}

// Text after the first ':' up to the next one, as the listing format has it
pub(crate) fn label_value(line: &str) -> String {
    line.splitn(3, ':')
        .nth(1)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

// Shared by the hotel and place parsers
pub(crate) fn valid_image_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() || url == "N/A" {
        return None;
    }
    if url.starts_with("http") || url.starts_with("/static/") {
        Some(url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_name_capitalization() {
        let ctx = SearchContext {
            to: "pARIS".to_string(),
            ..Default::default()
        };
        assert_eq!(ctx.destination_name(), "Paris");

        let empty = SearchContext::default();
        assert_eq!(empty.destination_name(), "your destination");
    }

    #[test]
    fn test_valid_image_url() {
        assert_eq!(
            valid_image_url(" https://img.example.com/a.jpg "),
            Some("https://img.example.com/a.jpg".to_string())
        );
        assert_eq!(
            valid_image_url("/static/images/hotel.png"),
            Some("/static/images/hotel.png".to_string())
        );
        assert_eq!(valid_image_url("N/A"), None);
        assert_eq!(valid_image_url("ftp://nope"), None);
        assert_eq!(valid_image_url(""), None);
    }

    #[test]
    fn test_flight_serializes_camel_case() {
        let flight = Flight {
            airline: "Delta".to_string(),
            flight_number: Some("123".to_string()),
            total_duration: Some("8 hr".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&flight).unwrap();
        assert_eq!(json["flightNumber"], "123");
        assert_eq!(json["totalDuration"], "8 hr");
        assert_eq!(json["isConnecting"], false);
        assert!(json.get("segments").is_none());
    }
}
