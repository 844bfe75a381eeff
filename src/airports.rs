// Airport list handling for the origin/destination pickers: popularity
// ordering, scored search and input debouncing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Airport {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl Airport {
    fn city_or_unknown(&self) -> &str {
        if self.city.is_empty() {
            "Unknown"
        } else {
            &self.city
        }
    }

    /// Text shown for the airport in a picker, e.g. `DEL - Indira Gandhi International (Delhi)`.
    pub fn option_label(&self) -> String {
        format!("{} - {} ({})", self.code, self.name, self.city_or_unknown())
    }

    pub fn tooltip(&self) -> String {
        let country = if self.country.is_empty() {
            "Unknown"
        } else {
            &self.country
        };
        format!(
            "{}\nCode: {}\nCity: {}\nCountry: {}",
            self.name,
            self.code,
            self.city_or_unknown(),
            country
        )
    }
}

// Tourist hubs, international then Indian
static POPULAR_CODES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "JFK", "LAX", "MIA", "LAS", "SFO", "LHR", "CDG", "AMS", "FRA", "MAD", "BCN", "FCO", "MXP",
        "VCE", "DXB", "ICN", "HKG", "SIN", "BKK", "NRT", "HND", "PEK", "PVG", "KUL", "DPS", "MNL",
        "DOH", "AUH", "SYD", "MEL", "AKL", "GRU", "GIG", "YYZ", "YVR", "JNB", "CPT", "CAI", "IST",
        "TLV", "DEL", "BOM", "BLR", "MAA", "HYD", "CCU", "GOI", "COK", "JAI", "UDR", "AGR", "VNS",
        "ATQ", "TRV",
    ]
    .into_iter()
    .collect()
});

pub fn is_popular(code: &str) -> bool {
    POPULAR_CODES.contains(code)
}

/// Orders airports with popular destinations first, then by name.
pub fn sort_by_popularity(airports: &mut [Airport]) {
    airports.sort_by(|a, b| {
        match (is_popular(&a.code), is_popular(&b.code)) {
            (true, false) => CmpOrdering::Less,
            (false, true) => CmpOrdering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    });
}

fn match_score(airport: &Airport, term_lower: &str, term_upper: &str) -> Option<u32> {
    let code = airport.code.to_uppercase();
    let city = airport.city.to_lowercase();

    let score = if code == term_upper {
        1000
    } else if code.starts_with(term_upper) {
        500
    } else if code.contains(term_upper) {
        400
    } else if city == term_lower {
        300
    } else if city.starts_with(term_lower) {
        200
    } else if city.contains(term_lower) {
        150
    } else if airport.name.to_lowercase().contains(term_lower) {
        100
    } else if airport.country.to_lowercase().contains(term_lower) {
        50
    } else {
        return None;
    };
    Some(score)
}

/// Airports matching `term`, best match first. Ties keep the input order, so
/// a popularity-sorted list stays popularity-sorted within each score.
pub fn filter_airports<'a>(airports: &'a [Airport], term: &str) -> Vec<&'a Airport> {
    let term = term.trim();
    if term.is_empty() {
        return airports.iter().collect();
    }

    let term_lower = term.to_lowercase();
    let term_upper = term.to_uppercase();

    let mut scored: Vec<(u32, &Airport)> = airports
        .iter()
        .filter_map(|airport| {
            match_score(airport, &term_lower, &term_upper).map(|score| (score, airport))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, airport)| airport).collect()
}

// Picker sizes: a short list of recommendations, a longer one while searching
pub const IDLE_SUGGESTIONS: usize = 5;
pub const SEARCH_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AirportSuggestions {
    pub shown: Vec<Airport>,
    /// Matches beyond the shown ones
    pub more: usize,
}

impl AirportSuggestions {
    pub fn more_label(&self) -> Option<String> {
        (self.more > 0).then(|| format!("... and {} more (refine your search)", self.more))
    }
}

pub fn suggest(airports: &[Airport], term: &str) -> AirportSuggestions {
    let matches = filter_airports(airports, term);
    let searching = !term.trim().is_empty();
    let limit = if searching {
        SEARCH_SUGGESTIONS
    } else {
        IDLE_SUGGESTIONS
    };

    AirportSuggestions {
        more: if searching {
            matches.len().saturating_sub(limit)
        } else {
            0
        },
        shown: matches.into_iter().take(limit).cloned().collect(),
    }
}

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Drops all but the last of a burst of inputs.
///
/// Each call waits for the delay and then yields its value only if no newer
/// call arrived in the meantime. Clones share the same generation counter.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn debounce<T>(&self, value: T) -> Option<T> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.generation.load(Ordering::SeqCst) == ticket).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn airport(code: &str, name: &str, city: &str, country: &str) -> Airport {
        Airport {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
        }
    }

    fn sample() -> Vec<Airport> {
        let mut airports = vec![
            airport("ZRH", "Zurich Airport", "Zurich", "Switzerland"),
            airport("DEL", "Indira Gandhi International", "Delhi", "India"),
            airport("IXD", "Bamrauli Airport", "Allahabad", "India"),
            airport("LHR", "Heathrow", "London", "United Kingdom"),
            airport("LCY", "London City Airport", "London", "United Kingdom"),
            airport("AAL", "Aalborg Airport", "Aalborg", "Denmark"),
        ];
        sort_by_popularity(&mut airports);
        airports
    }

    fn codes(airports: &[&Airport]) -> Vec<String> {
        airports.iter().map(|a| a.code.clone()).collect()
    }

    #[test]
    fn test_popular_airports_first_then_by_name() {
        let airports = sample();
        let order: Vec<&str> = airports.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(order, vec!["LHR", "DEL", "AAL", "IXD", "LCY", "ZRH"]);
    }

    #[test_case("lhr", &["LHR"]; "#1 exact code")]
    #[test_case("L", &["LHR", "LCY", "DEL", "AAL", "IXD", "ZRH"]; "#2 code prefix before code contains")]
    #[test_case("london", &["LHR", "LCY"]; "#3 city exact keeps popularity order")]
    #[test_case("zur", &["ZRH"]; "#4 city prefix")]
    #[test_case("gandhi", &["DEL"]; "#5 name contains")]
    #[test_case("denmark", &["AAL"]; "#6 country contains")]
    #[test_case("xyz", &[]; "#7 no match")]
    fn test_filter_airports(term: &str, expected: &[&str]) {
        let airports = sample();
        assert_eq!(codes(&filter_airports(&airports, term)), expected);
    }

    #[test]
    fn test_filter_scores_outrank_list_order() {
        let airports = sample();
        let found = filter_airports(&airports, "del");
        assert_eq!(codes(&found), vec!["DEL"]);

        let found = filter_airports(&airports, "al");
        // Code contains (AAL) beats city prefix (Allahabad) beats name contains (DEL)
        assert_eq!(codes(&found), vec!["AAL", "IXD", "DEL"]);
    }

    #[test]
    fn test_empty_term_returns_everything() {
        let airports = sample();
        assert_eq!(filter_airports(&airports, "   ").len(), airports.len());
    }

    #[test]
    fn test_suggestions_are_capped() {
        let airports: Vec<Airport> = (0..15)
            .map(|i| airport(&format!("X{:02}", i), &format!("Field {}", i), "Springfield", "USA"))
            .collect();

        let idle = suggest(&airports, "");
        assert_eq!(idle.shown.len(), IDLE_SUGGESTIONS);
        assert_eq!(idle.more_label(), None);

        let searching = suggest(&airports, "spring");
        assert_eq!(searching.shown.len(), SEARCH_SUGGESTIONS);
        assert_eq!(
            searching.more_label().as_deref(),
            Some("... and 5 more (refine your search)")
        );
    }

    #[test]
    fn test_labels_default_missing_city() {
        let a = airport("XXX", "Nowhere Strip", "", "");
        assert_eq!(a.option_label(), "XXX - Nowhere Strip (Unknown)");
        assert_eq!(
            a.tooltip(),
            "Nowhere Strip\nCode: XXX\nCity: Unknown\nCountry: Unknown"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_only_last_input() {
        let debouncer = Debouncer::default();
        let first = debouncer.debounce("de");
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            debouncer.debounce("del").await
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, None);
        assert_eq!(second, Some("del"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_spaced_inputs_both_pass() {
        let debouncer = Debouncer::default();
        assert_eq!(debouncer.debounce(1).await, Some(1));
        assert_eq!(debouncer.debounce(2).await, Some(2));
    }
}
