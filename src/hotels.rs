// Hotel listing parser
//
// Hotels arrive as blank-line separated blocks: the name on the first line,
// then "Rate per night:", "Rating: 4.5 (300)", "Location Rating:",
// "Amenities:" and "Image:" lines in any order.

use crate::error::ParseError;
use crate::records::{label_value, valid_image_url, Hotel, RecordSource};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)").expect("valid rating pattern"));

static PARENTHESISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("valid review count pattern"));

static BLOCK_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid block separator pattern"));

const HEADER_MARKER: &str = "Accommodations in";

const LABELS: [&str; 6] = [
    "Rate per night:",
    "Rating:",
    "Location Rating:",
    "Location:",
    "Amenities:",
    "Image:",
];

const NAME_KEYWORDS: [&str; 5] = ["Hotel", "Resort", "Inn", "Lodge", "Suites"];

/// Upper bound on names returned by [`scan_hotel_names`].
pub const MAX_SCANNED_HOTELS: usize = 8;

fn apply_line(hotel: &mut Hotel, line: &str) {
    if line.contains("Rate per night:") {
        let rate = label_value(line);
        hotel.rate = if rate.is_empty() {
            "Price not available".to_string()
        } else {
            rate
        };
    } else if line.contains("Location Rating:") {
        let location = label_value(line);
        hotel.location = if location.is_empty() {
            "N/A".to_string()
        } else {
            location
        };
    } else if line.contains("Rating:") {
        if let Some(caps) = FIRST_NUMBER.captures(line) {
            hotel.rating = caps[1].to_string();
        }
        if let Some(caps) = PARENTHESISED.captures(line) {
            hotel.review_count = caps[1].trim().to_string();
        }
    } else if line.contains("Amenities:") {
        let amenities = label_value(line);
        if !amenities.is_empty() {
            hotel.amenities = amenities
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
        }
    } else if line.contains("Image:") {
        let raw = line.replacen("Image:", "", 1);
        match valid_image_url(&raw) {
            Some(url) => hotel.image = Some(url),
            None => debug!("Ignoring invalid hotel image URL: {}", raw.trim()),
        }
    }
}

fn parse_block(block: &str) -> Option<Hotel> {
    let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next()?;

    let mut hotel = Hotel::named(name);
    for line in lines {
        apply_line(&mut hotel, line);
    }
    Some(hotel)
}

/// Parses the hotel listing into records.
///
/// Blank input is not an error, it just has no hotels. Every block that has a
/// first line produces a record, so `NoRecords` only comes back when the text
/// holds nothing but the header.
pub fn parse_hotels(text: &str) -> Result<Vec<Hotel>, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let normalized = text.replace("\r\n", "\n");
    let mut blocks: Vec<&str> = BLOCK_SEPARATOR
        .split(&normalized)
        .filter(|b| !b.trim().is_empty())
        .collect();

    if blocks.first().is_some_and(|b| b.contains(HEADER_MARKER)) {
        let header = blocks.remove(0);
        // Header glued to the first hotel by a single newline
        if let Some((first, rest)) = header.trim().split_once('\n') {
            if first.contains(HEADER_MARKER) && !rest.trim().is_empty() {
                if let Some(hotel) = parse_block(rest) {
                    let mut hotels = vec![hotel];
                    hotels.extend(blocks.iter().filter_map(|b| parse_block(b)));
                    debug!("Parsed {} hotel blocks", hotels.len());
                    return Ok(hotels);
                }
            }
        }
    }

    let hotels: Vec<Hotel> = blocks.iter().filter_map(|b| parse_block(b)).collect();
    if hotels.is_empty() {
        warn!("Hotel listing held only a header");
        return Err(ParseError::NoRecords(normalized.lines().filter(|l| !l.trim().is_empty()).count()));
    }

    debug!("Parsed {} hotel blocks", hotels.len());
    Ok(hotels)
}

/// Secondary pass over every line, picking out lines that read like hotel
/// names and are not already among `existing`.
pub fn scan_hotel_names(text: &str, existing: &[Hotel]) -> Vec<String> {
    let known: Vec<String> = existing.iter().map(|h| h.name.to_lowercase()).collect();
    let mut names: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.len() < 3 || line.len() >= 100 || line.contains(HEADER_MARKER) {
            continue;
        }
        if LABELS.iter().any(|label| line.starts_with(label)) {
            continue;
        }

        let lower = line.to_lowercase();
        if known.iter().any(|name| name.contains(&lower)) {
            continue;
        }
        if names.iter().any(|n| n.to_lowercase() == lower) {
            continue;
        }

        let name_like = NAME_KEYWORDS.iter().any(|k| line.contains(k));
        if name_like || !line.contains(':') {
            names.push(line.to_string());
        }
        if names.len() == MAX_SCANNED_HOTELS {
            break;
        }
    }

    debug!("Name scan found {} extra hotel candidates", names.len());
    names
}

/// Hotel for a name found by [`scan_hotel_names`], before the placeholder
/// policy fills the fields the text never gave.
pub fn inferred_hotel(name: impl Into<String>) -> Hotel {
    Hotel {
        source: RecordSource::Inferred,
        location: "City center area".to_string(),
        amenities: vec![
            "WiFi".to_string(),
            "Air Conditioning".to_string(),
            "Room Service".to_string(),
        ],
        ..Hotel::named(name)
    }
}
