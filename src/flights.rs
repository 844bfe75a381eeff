// Flight listing parser
//
// The backend emits one line per flight leg, e.g.
//   Delta 123 - JFK (10:00 AM) -> LAX (1:00 PM) [6 hr] - Boeing 737
// optionally followed by "Layover at X: ...", "Total Duration: ..." and a
// "Price (USD): $..." line that closes the record. Two leg lines before a
// price line form one connecting flight.

use crate::error::ParseError;
use crate::records::{label_value, Flight};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static FULL_DETAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+([A-Z0-9]+)\s+-\s+([A-Z]{3})\s+\(([^)]+)\)\s+->\s+([A-Z]{3})\s+\(([^)]+)\)\s+\[([^\]]+)\]\s+-\s+(.+)$")
        .expect("valid full detail pattern")
});

static NO_FLIGHT_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+-\s+([A-Z]{3})\s+\(([^)]+)\)\s+->\s+([A-Z]{3})\s+\(([^)]+)\)\s+\[([^\]]+)\]\s+-\s+(.+)$")
        .expect("valid no flight number pattern")
});

static NO_AIRCRAFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+([A-Z0-9]+)\s+-\s+([A-Z]{3})\s+\(([^)]+)\)\s+->\s+([A-Z]{3})\s+\(([^)]+)\)\s+\[([^\]]+)\]$")
        .expect("valid no aircraft pattern")
});

static BARE_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+-\s+([A-Z]{3})\s+->\s+([A-Z]{3})").expect("valid bare route pattern")
});

static FLEXIBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+-\s+([A-Z]{3})\s*\(([^)]+)\)\s*->\s*([A-Z]{3})\s*\(([^)]+)\)\s*\[([^\]]+)\]")
        .expect("valid flexible pattern")
});

static AIRLINE_WITH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+([A-Z0-9]+)$").expect("valid airline split pattern"));

static ROUTE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{3})\s*\(([^)]+)\)\s*->\s*([A-Z]{3})\s*\(([^)]+)\)\s*\[([^\]]+)\]")
        .expect("valid route fragment pattern")
});

static TRAILING_AIRCRAFT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- ([^-]+)$").expect("valid trailing aircraft pattern"));

static LAYOVER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Layover at|Layover:").expect("valid layover pattern"));

static PRICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Price \(").expect("valid price pattern"));

// Which rule recognised a flight line, strictest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPattern {
    FullDetail,
    NoFlightNumber,
    NoAircraft,
    BareRoute,
    Flexible,
    NaiveSplit,
}

fn capture(caps: &regex::Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn is_flight_line(line: &str) -> bool {
    line.contains(" - ") && (line.contains(" -> ") || (line.contains('(') && line.contains(')')))
}

/// Parses a single leg line, trying each pattern in priority order and
/// falling back to a split on `" - "`.
pub fn parse_flight_line(line: &str) -> Option<(Flight, FlightPattern)> {
    let line = line.trim();

    if let Some(caps) = FULL_DETAIL.captures(line) {
        let flight = Flight {
            airline: capture(&caps, 1),
            flight_number: non_empty(capture(&caps, 2)),
            origin: capture(&caps, 3),
            departure_time: capture(&caps, 4),
            destination: capture(&caps, 5),
            arrival_time: capture(&caps, 6),
            duration: capture(&caps, 7),
            aircraft: non_empty(capture(&caps, 8)),
            ..Default::default()
        };
        return Some((flight, FlightPattern::FullDetail));
    }

    if let Some(caps) = NO_FLIGHT_NUMBER.captures(line) {
        let flight = Flight {
            airline: capture(&caps, 1),
            origin: capture(&caps, 2),
            departure_time: capture(&caps, 3),
            destination: capture(&caps, 4),
            arrival_time: capture(&caps, 5),
            duration: capture(&caps, 6),
            aircraft: non_empty(capture(&caps, 7)),
            ..Default::default()
        };
        return Some((flight, FlightPattern::NoFlightNumber));
    }

    if let Some(caps) = NO_AIRCRAFT.captures(line) {
        let flight = Flight {
            airline: capture(&caps, 1),
            flight_number: non_empty(capture(&caps, 2)),
            origin: capture(&caps, 3),
            departure_time: capture(&caps, 4),
            destination: capture(&caps, 5),
            arrival_time: capture(&caps, 6),
            duration: capture(&caps, 7),
            ..Default::default()
        };
        return Some((flight, FlightPattern::NoAircraft));
    }

    if let Some(caps) = BARE_ROUTE.captures(line) {
        let flight = Flight {
            airline: capture(&caps, 1),
            origin: capture(&caps, 2),
            destination: capture(&caps, 3),
            ..Default::default()
        };
        return Some((flight, FlightPattern::BareRoute));
    }

    if let Some(caps) = FLEXIBLE.captures(line) {
        let airline_part = capture(&caps, 1);
        let (airline, flight_number) = match AIRLINE_WITH_NUMBER.captures(&airline_part) {
            Some(split) => (capture(&split, 1), non_empty(capture(&split, 2))),
            None => (airline_part, None),
        };
        let flight = Flight {
            airline,
            flight_number,
            origin: capture(&caps, 2),
            departure_time: capture(&caps, 3),
            destination: capture(&caps, 4),
            arrival_time: capture(&caps, 5),
            duration: capture(&caps, 6),
            ..Default::default()
        };
        return Some((flight, FlightPattern::Flexible));
    }

    let mut parts = line.split(" - ");
    let airline = parts.next()?.trim().to_string();
    let route_info = parts.next()?;

    let mut flight = Flight {
        airline,
        ..Default::default()
    };
    if let Some(route) = ROUTE_FRAGMENT.captures(route_info) {
        flight.origin = capture(&route, 1);
        flight.departure_time = capture(&route, 2);
        flight.destination = capture(&route, 3);
        flight.arrival_time = capture(&route, 4);
        flight.duration = capture(&route, 5);
    }
    if let Some(aircraft) = TRAILING_AIRCRAFT.captures(line) {
        flight.aircraft = non_empty(capture(&aircraft, 1));
    }

    debug!("No flight pattern matched, used naive split for: {}", line);
    Some((flight, FlightPattern::NaiveSplit))
}

// Builds the in-progress record and the unpriced legs that precede it
#[derive(Default)]
struct FlightAssembler {
    flights: Vec<Flight>,
    current: Option<Flight>,
    segments: Vec<Flight>,
}

impl FlightAssembler {
    fn start_leg(&mut self, leg: Flight) {
        if let Some(current) = self.current.take() {
            if current.is_priced() {
                self.flights.push(current);
                self.segments.clear();
            } else {
                self.segments.push(current);
            }
        }
        self.current = Some(leg);
    }

    fn is_connecting(&self) -> bool {
        !self.segments.is_empty()
    }

    fn attach_layover(&mut self, layover: String) {
        let connecting = self.is_connecting();
        match self.current.as_mut() {
            Some(current) => {
                current.layover = non_empty(layover);
                if connecting {
                    current.is_connecting = true;
                }
            }
            None => debug!("Ignoring layover line without a flight: {}", layover),
        }
    }

    // Folds earlier legs into the current record; origin comes from the first leg
    fn merge_segments(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        if let Some(current) = self.current.as_mut() {
            // Already merged on "Total Duration:"; the current leg's origin is rewritten by now
            if !current.segments.is_empty() {
                if let Some(last) = current.segments.last_mut() {
                    last.layover = current.layover.clone();
                }
                return;
            }
            let mut segments: Vec<_> = self.segments.iter().map(Flight::as_segment).collect();
            segments.push(current.as_segment());
            current.segments = segments;
            current.is_connecting = true;
            current.origin = self.segments[0].origin.clone();
            current.departure_time = self.segments[0].departure_time.clone();
        }
    }

    fn set_total_duration(&mut self, total: String) {
        if let Some(current) = self.current.as_mut() {
            current.total_duration = non_empty(total);
        }
        self.merge_segments();
    }

    fn close_with_price(&mut self, price: String) {
        if self.current.is_none() {
            warn!("Price line without a flight: {}", price);
            return;
        }
        if let Some(current) = self.current.as_mut() {
            current.price = Some(price);
        }
        self.merge_segments();
        if let Some(current) = self.current.take() {
            self.flights.push(current);
        }
        self.segments.clear();
    }

    fn finish(mut self) -> Vec<Flight> {
        if self.current.is_some() {
            self.merge_segments();
            if let Some(current) = self.current.take() {
                self.flights.push(current);
            }
        }
        self.flights
    }
}

/// Parses a flight listing into records.
///
/// Blank input yields an empty list. Input with content that produces no
/// record is a [`ParseError::NoRecords`]; substituting a placeholder is left
/// to the caller.
pub fn parse_flights(text: &str) -> Result<Vec<Flight>, ParseError> {
    let mut lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        debug!("Empty flights data");
        return Ok(Vec::new());
    }

    if lines[0].contains("Flights from") || lines[0].contains("filtered by preferences") {
        lines.remove(0);
    }
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let mut assembler = FlightAssembler::default();

    for line in &lines {
        if is_flight_line(line) {
            if let Some((leg, pattern)) = parse_flight_line(line) {
                if leg.departure_time.is_empty() || leg.arrival_time.is_empty() {
                    debug!("Missing time data ({:?}) for line: {}", pattern, line);
                }
                assembler.start_leg(leg);
            }
        } else if line.contains("Layover at") || line.contains("Layover:") {
            let layover = LAYOVER_PREFIX.replace(line, "").trim().to_string();
            assembler.attach_layover(layover);
        } else if line.contains("Total Duration:") {
            assembler.set_total_duration(label_value(line));
        } else if PRICE_LINE.is_match(line) {
            assembler.close_with_price(label_value(line));
        }
    }

    let flights = assembler.finish();
    debug!("Parsed {} flights", flights.len());

    if flights.is_empty() {
        return Err(ParseError::NoRecords(lines.len()));
    }
    Ok(flights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const SAMPLE_LISTING: &str = "Flights from JFK to LAX:
Delta 123 - JFK (10:00 AM) -> LAX (1:00 PM) [6 hr] - Boeing 737
Total Duration: 6 hr
Price (USD): $350

United UA200 - EWR (7:15 AM) -> ORD (8:45 AM) [2 hr 30 min] - Airbus A320
United UA201 - ORD (10:05 AM) -> LAX (12:40 PM) [4 hr 35 min] - Boeing 757
Layover at ORD: 1 hr 20 min
Total Duration: 8 hr 25 min
Price (USD): $289
";

    #[test]
    fn test_full_detail_pattern() {
        let (flight, pattern) =
            parse_flight_line("Delta 123 - JFK (10:00) -> LAX (13:00) [6h] - Boeing 737").unwrap();

        assert_eq!(pattern, FlightPattern::FullDetail);
        assert_eq!(flight.airline, "Delta");
        assert_eq!(flight.flight_number.as_deref(), Some("123"));
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.departure_time, "10:00");
        assert_eq!(flight.destination, "LAX");
        assert_eq!(flight.arrival_time, "13:00");
        assert_eq!(flight.duration, "6h");
        assert_eq!(flight.aircraft.as_deref(), Some("Boeing 737"));
    }

    #[test_case("Delta - JFK (10:00) -> LAX (13:00) [6h] - Boeing 737", FlightPattern::NoFlightNumber, "Delta"; "#1 no flight number")]
    #[test_case("American Airlines AA100 - JFK (10:00) -> LAX (13:00) [6h]", FlightPattern::NoAircraft, "American Airlines"; "#2 no aircraft")]
    #[test_case("Southwest - DAL -> HOU", FlightPattern::BareRoute, "Southwest"; "#3 bare route")]
    #[test_case("JetBlue B6 - BOS(06:00)->MCO(09:10) [3h 10m] extra", FlightPattern::Flexible, "JetBlue"; "#4 flexible spacing")]
    #[test_case("Some Carrier - route unknown (see site)", FlightPattern::NaiveSplit, "Some Carrier"; "#5 naive split")]
    fn test_pattern_cascade(line: &str, expected: FlightPattern, airline: &str) {
        let (flight, pattern) = parse_flight_line(line).unwrap();
        assert_eq!(pattern, expected);
        assert_eq!(flight.airline, airline);
    }

    #[test]
    fn test_flexible_pattern_splits_flight_number() {
        let (flight, _) =
            parse_flight_line("JetBlue B6 - BOS(06:00)->MCO(09:10) [3h 10m] extra").unwrap();
        assert_eq!(flight.flight_number.as_deref(), Some("B6"));
        assert_eq!(flight.origin, "BOS");
        assert_eq!(flight.destination, "MCO");
        assert_eq!(flight.duration, "3h 10m");
    }

    #[test]
    fn test_naive_split_recovers_aircraft() {
        let (flight, pattern) = parse_flight_line("Some Carrier - route unknown (see site)").unwrap();
        assert_eq!(pattern, FlightPattern::NaiveSplit);
        assert_eq!(flight.aircraft.as_deref(), Some("route unknown (see site)"));
        assert!(flight.origin.is_empty());
    }

    #[test]
    fn test_parse_listing_with_connecting_flight() {
        let flights = parse_flights(SAMPLE_LISTING).unwrap();
        assert_eq!(flights.len(), 2);

        let direct = &flights[0];
        assert_eq!(direct.airline, "Delta");
        assert_eq!(direct.price.as_deref(), Some("$350"));
        assert_eq!(direct.total_duration.as_deref(), Some("6 hr"));
        assert!(!direct.is_connecting);
        assert!(direct.segments.is_empty());

        let connecting = &flights[1];
        assert!(connecting.is_connecting);
        assert_eq!(connecting.segments.len(), 2);
        assert_eq!(connecting.origin, "EWR");
        assert_eq!(connecting.departure_time, "7:15 AM");
        assert_eq!(connecting.destination, "LAX");
        assert_eq!(connecting.layover.as_deref(), Some("ORD: 1 hr 20 min"));
        assert_eq!(connecting.total_duration.as_deref(), Some("8 hr 25 min"));
        assert_eq!(connecting.price.as_deref(), Some("$289"));
        assert_eq!(connecting.segments[0].flight_number.as_deref(), Some("UA200"));
        assert_eq!(connecting.segments[1].origin, "ORD");
    }

    #[test]
    fn test_every_priced_listing_has_price() {
        let flights = parse_flights(SAMPLE_LISTING).unwrap();
        assert!(flights.iter().all(|f| f.is_priced()));
    }

    #[test]
    fn test_unpriced_trailing_flight_is_kept() {
        let text = "Delta 123 - JFK (10:00) -> LAX (13:00) [6h] - Boeing 737";
        let flights = parse_flights(text).unwrap();
        assert_eq!(flights.len(), 1);
        assert!(flights[0].price.is_none());
    }

    #[test]
    fn test_blank_input_is_empty() {
        assert_eq!(parse_flights("").unwrap(), Vec::new());
        assert_eq!(parse_flights("  \n\n ").unwrap(), Vec::new());
        assert_eq!(parse_flights("Flights from JFK to LAX:").unwrap(), Vec::new());
    }

    #[test]
    fn test_unrecognised_text_is_an_error() {
        let result = parse_flights("Sorry, no flights could be found for these dates.");
        assert_eq!(result, Err(ParseError::NoRecords(1)));
    }

    #[test]
    fn test_orphan_price_line_does_not_panic() {
        let result = parse_flights("Price (USD): $100\nLayover at ORD: 1 hr");
        assert!(matches!(result, Err(ParseError::NoRecords(2))));
    }
}
