// Place listing parser
//
// Places arrive after a "Here are the top places to visit in X:" header as
// a name line followed by "Description:", "Rating: 4.7 (12,345)", "Price:"
// and "Image:" lines. When the backend fails it tends to send its error
// text in place of the listing, so that is detected up front.

use crate::error::ParseError;
use crate::records::{valid_image_url, Place, RecordSource};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static RATING_WITH_REVIEWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Rating:\s*([0-9.]+)\s*\(([^)]+)\)").expect("valid place rating pattern")
});

static RATING_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Rating:\s*([0-9.]+)").expect("valid rating value pattern"));

static PARENTHESISED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("valid review count pattern"));

const ERROR_INDICATORS: [&str; 6] = [
    "No places found",
    "Error",
    "Failed",
    "slice(None",
    "Traceback",
    "Exception",
];

const HEADER_MARKERS: [&str; 5] = [
    "Here are the top places",
    "Top sights",
    "Places to visit",
    "(toddler-friendly)",
    "(senior-friendly)",
];

const DETAIL_LABELS: [&str; 4] = ["Description:", "Rating:", "Price:", "Image:"];

const MIN_CONTENT_LEN: usize = 20;
const SCAN_LINE_LIMIT: usize = 50;
const LOOK_AHEAD: usize = 4;

fn is_header(line: &str) -> bool {
    HEADER_MARKERS.iter().any(|marker| line.contains(marker))
}

fn is_detail(line: &str) -> bool {
    DETAIL_LABELS.iter().any(|label| line.starts_with(label))
}

fn strip_label<'a>(line: &'a str, label: &str) -> &'a str {
    line.strip_prefix(label).unwrap_or(line).trim()
}

/// Rejects payloads that are not a listing at all.
pub fn check_payload(text: &str) -> Result<(), ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        return Err(ParseError::Empty);
    }

    if let Some(indicator) = ERROR_INDICATORS.iter().find(|i| text.contains(*i)) {
        warn!("Place listing carries an upstream error marker: {}", indicator);
        return Err(ParseError::UpstreamError(trimmed.chars().take(80).collect()));
    }
    if text.len() < MIN_CONTENT_LEN {
        warn!("Place listing too short to parse ({} bytes)", text.len());
        return Err(ParseError::UpstreamError(trimmed.to_string()));
    }
    Ok(())
}

// Trimmed lines after the leading header lines; blank lines kept as separators
fn body_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().map(str::trim).collect();
    while let Some(first) = lines.iter().position(|l| !l.is_empty()) {
        if is_header(lines[first]) {
            lines.drain(..=first);
        } else {
            lines.drain(..first);
            break;
        }
    }
    lines
}

fn apply_detail(place: &mut Place, line: &str) {
    if line.starts_with("Description:") {
        place.description = strip_label(line, "Description:").to_string();
    } else if line.starts_with("Rating:") {
        match RATING_WITH_REVIEWS.captures(line) {
            Some(caps) => {
                place.rating = caps[1].to_string();
                place.review_count = caps[2].trim().to_string();
            }
            None => {
                place.rating = "0".to_string();
                place.review_count = "0".to_string();
            }
        }
    } else if line.starts_with("Price:") {
        place.price = strip_label(line, "Price:").to_string();
    } else if line.starts_with("Image:") {
        let raw = strip_label(line, "Image:");
        place.image = valid_image_url(raw);
        if place.image.is_none() {
            debug!("Ignoring invalid place image URL: {}", raw);
        }
    }
}

/// Parses the place listing.
///
/// A line without a colon starts a new place; a blank line closes the
/// current one. Detail lines before any name are dropped.
pub fn parse_places(text: &str) -> Result<Vec<Place>, ParseError> {
    check_payload(text)?;

    let lines = body_lines(text);
    let mut places = Vec::new();
    let mut current: Option<Place> = None;

    for line in &lines {
        if line.is_empty() {
            if let Some(place) = current.take() {
                places.push(place);
            }
        } else if is_detail(line) {
            match current.as_mut() {
                Some(place) => apply_detail(place, line),
                None => debug!("Detail line without a place: {}", line),
            }
        } else if !line.contains(':') {
            if let Some(place) = current.take() {
                places.push(place);
            }
            current = Some(Place::named(*line));
        }
    }
    if let Some(place) = current.take() {
        places.push(place);
    }

    if places.is_empty() {
        let count = lines.iter().filter(|l| !l.is_empty()).count();
        warn!("No places recognised in {} lines", count);
        return Err(ParseError::NoRecords(count));
    }

    debug!("Parsed {} places", places.len());
    Ok(places)
}

/// Secondary pass for listings the block parser got little out of.
///
/// Looks at the first 50 lines for anything name-like, reading up to four
/// following lines for details. Ratings and review counts the text does not
/// give are left empty for the placeholder policy to fill.
pub fn scan_place_names(text: &str, existing: &[Place]) -> Vec<Place> {
    if check_payload(text).is_err() {
        return Vec::new();
    }

    let lines: Vec<&str> = body_lines(text).into_iter().filter(|l| !l.is_empty()).collect();
    let known: Vec<String> = existing.iter().map(|p| p.name.to_lowercase()).collect();
    let limit = lines.len().min(SCAN_LINE_LIMIT);
    let mut found: Vec<Place> = Vec::new();

    let mut i = 0;
    while i < limit {
        let line = lines[i];
        i += 1;

        if line.len() < 3 || line.len() >= 100 || is_header(line) || is_detail(line) {
            continue;
        }
        if line.contains("Here are the") || line.contains("http") {
            continue;
        }

        let mut place = Place {
            description: "Explore this attraction".to_string(),
            rating: String::new(),
            review_count: String::new(),
            source: RecordSource::Inferred,
            ..Place::named(line)
        };

        let end = (i + LOOK_AHEAD).min(lines.len());
        for next in &lines[i..end] {
            if next.starts_with("Description:") {
                place.description = strip_label(next, "Description:").to_string();
            } else if next.starts_with("Rating:") {
                if let Some(caps) = RATING_ONLY.captures(next) {
                    place.rating = caps[1].to_string();
                }
                if let Some(caps) = PARENTHESISED.captures(next) {
                    place.review_count = caps[1].trim().to_string();
                }
            } else if next.starts_with("Price:") {
                place.price = strip_label(next, "Price:").to_string();
            } else if next.starts_with("Image:") {
                place.image = valid_image_url(strip_label(next, "Image:"));
            }
        }

        let lower = line.to_lowercase();
        let duplicate = known.contains(&lower) || found.iter().any(|p| p.name.to_lowercase() == lower);
        if !duplicate {
            found.push(place);
        }

        while i < lines.len() && is_detail(lines[i]) {
            i += 1;
        }
    }

    debug!("Name scan found {} extra places", found.len());
    found
}
