// HTML cards for the flight, hotel and place panes, plus booking links.

use crate::records::{Flight, Hotel, Place, SearchContext};
use std::fmt::Write as _;
use tracing::warn;
use url::Url;

const FLIGHT_SEARCH_URL: &str = "https://flight.easemytrip.com/FlightList/Index";
const HOTEL_SEARCH_URL: &str = "https://www.easemytrip.com/hotels/search";

pub const NO_FLIGHTS_HTML: &str = "<div class=\"empty-state\">No flight information available</div>";
pub const NO_HOTELS_HTML: &str = "<div class=\"empty-state\">No hotel information available</div>";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

// "$120" -> "$120 per night", but "Contact for rates" stays as is
fn nightly_rate(rate: &str) -> String {
    let starts_with_amount = rate.chars().next().is_some_and(|c| !c.is_alphabetic());
    if starts_with_amount && !rate.contains("per night") {
        format!("{} per night", rate)
    } else {
        rate.to_string()
    }
}

// "300" -> "300 reviews"; "Multiple reviews" is already a phrase
fn review_phrase(count: &str) -> String {
    if count.chars().any(char::is_alphabetic) {
        count.to_string()
    } else {
        format!("{} reviews", count)
    }
}

/// Full stars for the integer part, a half star from .5 up.
pub fn generate_stars(rating: f64) -> String {
    if !rating.is_finite() || rating <= 0.0 {
        return String::new();
    }
    let rating = rating.min(5.0);
    let full = rating.floor() as usize;
    let mut stars = "<i class=\"fas fa-star\"></i>".repeat(full);
    if rating.fract() >= 0.5 {
        stars.push_str("<i class=\"fas fa-star-half-alt\"></i>");
    }
    stars
}

pub fn amenity_icon(amenity: &str) -> &'static str {
    match amenity.trim().to_lowercase().as_str() {
        "wifi" => "fa-wifi",
        "pool" => "fa-swimming-pool",
        "parking" => "fa-parking",
        "restaurant" => "fa-utensils",
        _ => "fa-check",
    }
}

/// EaseMyTrip flight search for the current trip; round trip when there is
/// a return date.
pub fn flight_booking_url(ctx: &SearchContext) -> Result<Url, url::ParseError> {
    let from = ctx.from.trim().to_uppercase();
    let to = ctx.to.trim().to_uppercase();
    let outbound = format!("{}-{}-{}", from, to, ctx.start_date);

    if ctx.end_date.is_empty() {
        Url::parse_with_params(
            FLIGHT_SEARCH_URL,
            &[
                ("srch", outbound.as_str()),
                ("px", "1-0-0"),
                ("cbn", "0"),
                ("ar", "0"),
                ("isow", "1"),
            ],
        )
    } else {
        let inbound = format!("{}-{}-{}", to, from, ctx.end_date);
        Url::parse_with_params(
            FLIGHT_SEARCH_URL,
            &[
                ("srch", outbound.as_str()),
                ("rtn", inbound.as_str()),
                ("px", "1-0-0"),
                ("cbn", "0"),
                ("ar", "0"),
                ("isow", "0"),
            ],
        )
    }
}

pub fn hotel_booking_url(ctx: &SearchContext) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        HOTEL_SEARCH_URL,
        &[
            ("city", ctx.to.trim()),
            ("checkin", ctx.start_date.as_str()),
            ("checkout", ctx.end_date.as_str()),
            ("rooms", "1"),
            ("adults", "1"),
        ],
    )
}

fn href(url: Result<Url, url::ParseError>) -> String {
    match url {
        Ok(url) => escape_html(url.as_str()),
        Err(err) => {
            warn!("Could not build booking link: {}", err);
            "#".to_string()
        }
    }
}

fn segment_list(flight: &Flight) -> String {
    if flight.segments.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"flight-segments\">");
    for segment in &flight.segments {
        let _ = write!(
            html,
            "<li><strong>{} {}</strong> {} ({}) &rarr; {} ({}) <span class=\"segment-duration\">{}</span>{}</li>",
            escape_html(&segment.airline),
            escape_html(segment.flight_number.as_deref().unwrap_or("")),
            escape_html(&segment.origin),
            escape_html(&segment.departure_time),
            escape_html(&segment.destination),
            escape_html(&segment.arrival_time),
            escape_html(&segment.duration),
            segment
                .layover
                .as_deref()
                .map(|l| format!(" <span class=\"layover-info\">Layover at {}</span>", escape_html(l)))
                .unwrap_or_default(),
        );
    }
    html.push_str("</ul>");
    html
}

fn flight_card(flight: &Flight, index: usize, booking_href: &str) -> String {
    let flight_number = flight
        .flight_number
        .as_deref()
        .filter(|n| !n.is_empty())
        .map(|n| format!("<span class=\"flight-number\">Flight {}</span>", escape_html(n)))
        .unwrap_or_default();
    let aircraft = flight
        .aircraft
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(|a| format!("<span class=\"aircraft-type\">{}</span>", escape_html(a)))
        .unwrap_or_default();

    let route_label = if flight.is_connecting {
        "<span class=\"connecting-flight\"><i class=\"fas fa-exchange-alt me-1\"></i>Connecting</span>".to_string()
    } else {
        match flight.layover.as_deref().filter(|l| !l.is_empty()) {
            Some(layover) => format!("<span class=\"layover-info\">{}</span>", escape_html(layover)),
            None => "<span class=\"direct-flight\"><i class=\"fas fa-route me-1\"></i>Direct</span>".to_string(),
        }
    };
    let total = flight
        .total_duration
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| format!("<span class=\"total-time\">Total: {}</span>", escape_html(t)))
        .unwrap_or_default();

    format!(
        r#"<div class="flight-card modern-card" data-aos="fade-up" data-aos-delay="{delay}">
<div class="flight-header">
<div class="airline-info">
<div class="airline-logo"><i class="fas fa-plane-departure"></i></div>
<div class="airline-details"><h4 class="airline-name">{airline}</h4>{flight_number}{aircraft}</div>
</div>
<div class="price-badge"><span class="price-amount">{price}</span></div>
</div>
<div class="flight-route">
<div class="departure-info"><div class="airport-code">{origin}</div><div class="time-info">{departure}</div><div class="location-label">Departure</div></div>
<div class="flight-path"><div class="duration-info"><span class="duration-time">{duration}</span>{route_label}{total}</div></div>
<div class="arrival-info"><div class="airport-code">{destination}</div><div class="time-info">{arrival}</div><div class="location-label">Arrival</div></div>
</div>
<div class="flight-details" style="display: none;">{segments}</div>
<div class="flight-actions">
<div class="flight-details-btn"><button class="btn btn-outline-secondary btn-sm" onclick="toggleFlightDetails(this)"><i class="fas fa-info-circle me-1"></i>Details</button></div>
<div class="booking-action"><a href="{href}" target="_blank" rel="noopener" class="btn btn-primary btn-flight-book"><i class="fas fa-external-link-alt me-2"></i>Book Now</a></div>
</div>
</div>"#,
        delay = index * 100,
        airline = escape_html(or_default(&flight.airline, "Unknown Airline")),
        flight_number = flight_number,
        aircraft = aircraft,
        price = escape_html(or_default(flight.price.as_deref().unwrap_or(""), "Price not available")),
        origin = escape_html(or_default(&flight.origin, "N/A")),
        departure = escape_html(or_default(&flight.departure_time, "N/A")),
        duration = escape_html(or_default(&flight.duration, "N/A")),
        route_label = route_label,
        total = total,
        destination = escape_html(or_default(&flight.destination, "N/A")),
        arrival = escape_html(or_default(&flight.arrival_time, "N/A")),
        segments = segment_list(flight),
        href = booking_href,
    )
}

pub fn format_flights_html(flights: &[Flight], ctx: &SearchContext) -> String {
    if flights.is_empty() {
        return NO_FLIGHTS_HTML.to_string();
    }
    let booking_href = href(flight_booking_url(ctx));
    flights
        .iter()
        .enumerate()
        .map(|(i, flight)| flight_card(flight, i, &booking_href))
        .collect::<Vec<_>>()
        .join("\n")
}

fn amenity_badges(amenities: &[String]) -> String {
    amenities
        .iter()
        .map(|a| {
            format!(
                "<span class=\"amenity\"><i class=\"fas {}\"></i> {}</span>",
                amenity_icon(a),
                escape_html(a)
            )
        })
        .collect()
}

fn hotel_card(hotel: &Hotel, booking_href: &str) -> String {
    let name = escape_html(or_default(&hotel.name, "Hotel Name Not Available"));
    let image = match hotel.image.as_deref() {
        Some(src) => format!(
            r#"<img src="{}" alt="{}" onerror="this.onerror=null; this.parentElement.innerHTML='&lt;div class=&quot;fallback-image&quot;&gt;&lt;i class=&quot;fas fa-hotel&quot;&gt;&lt;/i&gt;&lt;/div&gt;';" onload="this.parentElement.classList.remove('loading')" loading="lazy">"#,
            escape_html(src),
            name
        ),
        None => "<div class=\"fallback-image\"><i class=\"fas fa-hotel\"></i></div>".to_string(),
    };
    let rating = or_default(&hotel.rating, "0");
    let stars = generate_stars(rating.parse().unwrap_or(0.0));

    format!(
        r#"<div class="hotel-card">
<div class="image-container loading">{image}</div>
<div class="hotel-details">
<h3>{name}</h3>
<p class="price"><i class="fas fa-tag"></i> {rate}</p>
<p class="rating"><span class="stars">{stars}</span> {rating} ({reviews})</p>
<p class="location"><i class="fas fa-map-marker-alt"></i> Location Rating: {location}</p>
<div class="amenities">{amenities}</div>
<div class="booking-links"><a href="{href}" target="_blank" rel="noopener"><i class="fas fa-external-link-alt me-1"></i>Book on EaseMyTrip</a></div>
</div>
</div>"#,
        image = image,
        name = name,
        rate = escape_html(&nightly_rate(or_default(&hotel.rate, "Price not available"))),
        stars = stars,
        rating = escape_html(rating),
        reviews = escape_html(&review_phrase(or_default(&hotel.review_count, "0"))),
        location = escape_html(or_default(&hotel.location, "N/A")),
        amenities = amenity_badges(&hotel.amenities),
        href = booking_href,
    )
}

pub fn format_hotels_html(hotels: &[Hotel], ctx: &SearchContext) -> String {
    if hotels.is_empty() {
        return NO_HOTELS_HTML.to_string();
    }
    let booking_href = href(hotel_booking_url(ctx));
    let cards: String = hotels.iter().map(|h| hotel_card(h, &booking_href)).collect();
    format!("<div class=\"hotels-grid\">{}</div>", cards)
}

fn place_card(place: &Place, index: usize) -> String {
    let name = escape_html(or_default(&place.name, "Place Name Not Available"));
    let (image, view_button) = match place.image.as_deref() {
        Some(src) => {
            let src = escape_html(src);
            (
                format!(
                    r#"<img src="{src}" alt="{name}" class="place-image" onerror="this.onerror=null; this.parentElement.innerHTML='&lt;div class=&quot;place-fallback-image&quot;&gt;&lt;i class=&quot;fas fa-map-marker-alt&quot;&gt;&lt;/i&gt;&lt;span&gt;Image Not Available&lt;/span&gt;&lt;/div&gt;';" onload="this.parentElement.classList.add('image-loaded')" loading="lazy">"#
                ),
                format!(
                    r#"<button class="btn btn-sm btn-outline-primary view-image-btn" data-image="{src}" data-name="{name}" onclick="viewPlaceImage(this.dataset.image, this.dataset.name)"><i class="fas fa-eye me-1"></i>View Image</button>"#
                ),
            )
        }
        None => (
            "<div class=\"place-fallback-image\"><i class=\"fas fa-map-marker-alt\"></i><span>No Image Available</span></div>".to_string(),
            "<span class=\"no-image-text\"><i class=\"fas fa-image-slash me-1\"></i>No image</span>".to_string(),
        ),
    };

    format!(
        r#"<div class="place-card modern-place-card" data-aos="fade-up" data-aos-delay="{delay}">
<div class="place-image-container">{image}
<div class="place-image-overlay"><div class="place-rating-badge"><i class="fas fa-star"></i><span>{rating}</span></div></div>
</div>
<div class="place-details">
<div class="place-header"><h3 class="place-name">{name}</h3><div class="place-meta"><span class="place-reviews"><i class="fas fa-users"></i> {reviews}</span></div></div>
<p class="place-description">{description}</p>
<div class="place-footer"><div class="place-price"><i class="fas fa-tag"></i><span>{price}</span></div>{view_button}</div>
</div>
</div>"#,
        delay = index * 100,
        image = image,
        rating = escape_html(or_default(&place.rating, "0")),
        name = name,
        reviews = escape_html(&review_phrase(or_default(&place.review_count, "0"))),
        description = escape_html(or_default(&place.description, "No description available")),
        price = escape_html(or_default(&place.price, "Free Entry")),
        view_button = view_button,
    )
}

pub fn format_places_html(places: &[Place]) -> String {
    let cards: String = places.iter().enumerate().map(|(i, p)| place_card(p, i)).collect();
    format!("<div class=\"places-grid\">{}</div>", cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordSource;
    use test_case::test_case;

    fn trip(end_date: &str) -> SearchContext {
        SearchContext {
            from: "jfk".to_string(),
            to: "new delhi".to_string(),
            start_date: "2025-03-01".to_string(),
            end_date: end_date.to_string(),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test_case(4.5, 4, true; "#1 half star")]
    #[test_case(3.2, 3, false; "#2 no half star")]
    #[test_case(0.0, 0, false; "#3 zero")]
    #[test_case(7.0, 5, false; "#4 clamped")]
    fn test_generate_stars(rating: f64, full: usize, half: bool) {
        let stars = generate_stars(rating);
        assert_eq!(stars.matches("fa-star\"").count(), full);
        assert_eq!(stars.contains("fa-star-half-alt"), half);
    }

    #[test_case("WiFi", "fa-wifi"; "#1 wifi")]
    #[test_case(" Pool ", "fa-swimming-pool"; "#2 pool trimmed")]
    #[test_case("Parking", "fa-parking"; "#3 parking")]
    #[test_case("Restaurant", "fa-utensils"; "#4 restaurant")]
    #[test_case("Spa", "fa-check"; "#5 default")]
    fn test_amenity_icon(amenity: &str, icon: &str) {
        assert_eq!(amenity_icon(amenity), icon);
    }

    #[test]
    fn test_flight_booking_urls() {
        let round = flight_booking_url(&trip("2025-03-10")).unwrap();
        let query: Vec<(String, String)> = round.query_pairs().into_owned().collect();
        assert!(query.contains(&("srch".to_string(), "JFK-NEW DELHI-2025-03-01".to_string())));
        assert!(query.contains(&("rtn".to_string(), "NEW DELHI-JFK-2025-03-10".to_string())));
        assert!(query.contains(&("isow".to_string(), "0".to_string())));

        let one_way = flight_booking_url(&trip("")).unwrap();
        assert!(one_way.query_pairs().all(|(k, _)| k != "rtn"));
        assert!(one_way.as_str().ends_with("isow=1"));
    }

    #[test]
    fn test_hotel_booking_url_encodes_city() {
        let url = hotel_booking_url(&trip("2025-03-10")).unwrap();
        assert!(url.as_str().starts_with(HOTEL_SEARCH_URL));
        assert!(url.as_str().contains("city=new+delhi"));
        assert!(url.as_str().contains("checkout=2025-03-10"));
    }

    #[test]
    fn test_flight_card_labels() {
        let direct = Flight {
            airline: "Delta".to_string(),
            flight_number: Some("123".to_string()),
            price: Some("$350".to_string()),
            ..Default::default()
        };
        let html = format_flights_html(&[direct], &trip(""));
        assert!(html.contains("Flight 123"));
        assert!(html.contains("$350"));
        assert!(html.contains("Direct"));
        assert!(html.contains("<div class=\"airport-code\">N/A</div>"));

        let connecting = Flight {
            airline: "United".to_string(),
            is_connecting: true,
            ..Default::default()
        };
        let html = format_flights_html(&[connecting], &trip(""));
        assert!(html.contains("Connecting"));
        assert!(html.contains("Price not available"));
    }

    #[test]
    fn test_empty_flights_and_hotels() {
        assert_eq!(format_flights_html(&[], &trip("")), NO_FLIGHTS_HTML);
        assert_eq!(format_hotels_html(&[], &trip("")), NO_HOTELS_HTML);
    }

    #[test]
    fn test_hotel_card_escapes_and_phrases() {
        let mut hotel = Hotel::named("<Hotel & Spa>");
        hotel.rate = "$120".to_string();
        hotel.review_count = "300".to_string();
        hotel.rating = "4.5".to_string();
        let html = format_hotels_html(&[hotel], &trip(""));
        assert!(html.contains("&lt;Hotel &amp; Spa&gt;"));
        assert!(html.contains("$120 per night"));
        assert!(html.contains("(300 reviews)"));
        assert!(html.contains("fa-star-half-alt"));
        assert!(html.contains("Book on EaseMyTrip"));

        let html = format_hotels_html(&[Hotel::named("Inn")], &trip(""));
        assert!(html.contains("Contact for rates</p>"));
        assert!(html.contains("(Multiple reviews)"));
    }

    #[test]
    fn test_place_card_image_and_defaults() {
        let with_image = Place {
            image: Some("https://img.example.com/p.jpg".to_string()),
            ..Place::named("Louvre")
        };
        let bare = Place {
            description: String::new(),
            source: RecordSource::Placeholder,
            ..Place::named("Somewhere")
        };
        let html = format_places_html(&[with_image, bare]);
        assert!(html.contains("View Image"));
        assert!(html.contains("No image"));
        assert!(html.contains("No description available"));
        assert!(html.contains("Free Entry"));
        assert!(html.contains("data-aos-delay=\"100\""));
    }
}
