// Itinerary markdown: clean-up of model output, rendering to HTML and the
// small HTML touch-ups the itinerary pane expects.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, error, warn};

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<img[^>]*>").expect("valid img tag pattern"));

static IMAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\*?\*?\s*Image:\s*\*?\*?\s*https?://[^\n]+$").expect("valid image line pattern")
});

static IMAGE_AFTER_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\*?\s*Image:\s*https?://\S+").expect("valid inline image pattern")
});

static BOLD_IMAGE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*Image:\*\*\s+https?://\S+").expect("valid bold image pattern")
});

static LONG_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S{100,}").expect("valid long url pattern"));

static BROKEN_FRAGMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bbrw-[A-Za-z0-9_-]{10,}|ZAxdA-eob4MR40Zy[A-Za-z0-9_-]*").expect("valid fragment pattern")
});

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").expect("valid newline pattern"));

static LOCATION_EMOJI: Lazy<Regex> = Lazy::new(|| Regex::new(r"📍|🏨").expect("valid location emoji pattern"));

static REPEATED_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(📍|🏨|🎭|🎨|🏛️|⛪|🗼|🌉){2,}").expect("valid emoji run pattern"));

static DAY_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^(?:#|###)\s+(Day\s+\d+)").expect("valid day header pattern")
});

static HEADER_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\n])\n(##\s)").expect("valid header spacing pattern"));

static TIME_RANGE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<li><strong>(\d{1,2}:\d{2}\s*-\s*\d{1,2}:\d{2}):</strong>").expect("valid time range pattern")
});

static SINGLE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<strong>(\d{1,2}:\d{2}(?:\s*(?:AM|PM))?)</strong>").expect("valid time pattern")
});

static IMG_WITH_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\s+([^>]*)src=["']([^"']+)["']([^>]*)>"#).expect("valid img src pattern")
});

const IMG_PLACEHOLDER: &str = "___IMG_PLACEHOLDER_";
const ASTERISK_ONLY: [&str; 4] = ["*", "**", "* *", "* **"];

const IMG_ONERROR: &str = r#"onerror="this.style.display='none'""#;
const IMG_FALLBACK_ONERROR: &str = r#"onerror="this.onerror=null; this.src='/static/images/fallbacks/no-image.png'; this.style.display='none'; this.parentElement.classList.add('image-error');""#;
const IMG_STYLE: &str =
    r#"style="max-width: 100%; height: auto; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); margin: 15px 0;""#;
const IMG_FALLBACK_STYLE: &str = r#"style="max-width: 100%; height: auto; border-radius: 8px;""#;

pub const NO_ITINERARY_HTML: &str = "<p>No itinerary data available</p>";

/// Strips image lines, overlong URLs and stray emphasis markers the model
/// tends to leave behind. `<img>` tags survive untouched.
pub fn clean_itinerary_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut saved: Vec<String> = Vec::new();
    let mut cleaned = IMG_TAG
        .replace_all(content, |caps: &Captures| {
            saved.push(caps[0].to_string());
            format!("{}{}___", IMG_PLACEHOLDER, saved.len() - 1)
        })
        .into_owned();

    cleaned = IMAGE_LINE.replace_all(&cleaned, "").into_owned();
    cleaned = IMAGE_AFTER_BREAK.replace_all(&cleaned, "").into_owned();
    cleaned = BOLD_IMAGE_LABEL.replace_all(&cleaned, "").into_owned();
    cleaned = strip_long_urls(&cleaned);
    cleaned = BROKEN_FRAGMENTS.replace_all(&cleaned, "").into_owned();
    cleaned = EXCESS_NEWLINES.replace_all(&cleaned, "\n\n").into_owned();

    cleaned = cleaned
        .split('\n')
        .filter(|line| {
            let stripped = line.trim();
            stripped.contains(IMG_PLACEHOLDER) || !ASTERISK_ONLY.contains(&stripped)
        })
        .collect::<Vec<_>>()
        .join("\n");

    for (i, tag) in saved.iter().enumerate() {
        cleaned = cleaned.replacen(&format!("{}{}___", IMG_PLACEHOLDER, i), tag, 1);
    }

    if cleaned.len() < 100 && content.len() > 1000 {
        error!("Cleaning removed almost all itinerary content, keeping the original");
        return content.to_string();
    }

    debug!(
        "Cleaned itinerary: {} -> {} bytes, {} images kept",
        content.len(),
        cleaned.len(),
        saved.len()
    );
    cleaned
}

// Long URLs outside src=/href= attributes
fn strip_long_urls(content: &str) -> String {
    LONG_URL
        .replace_all(content, |caps: &Captures| {
            let start = caps.get(0).map_or(0, |m| m.start());
            let prefix = &content[..start];
            if prefix.ends_with("src=\"") || prefix.ends_with("href=\"") {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, '&' | '\'' | '-')
}

// Length of "<ws>Name" after the emoji when the text before the emoji
// already ends with the same Name
fn repeated_name_len(before: &str, after: &str) -> Option<usize> {
    let run_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_name_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let ws: usize = after
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();

    for (offset, _) in before[run_start..].char_indices() {
        let name = &before[run_start + offset..];
        for skip in (0..=ws).rev() {
            if after.is_char_boundary(skip) && after[skip..].starts_with(name) {
                return Some(skip + name.len());
            }
        }
    }
    None
}

// "Louvre📍 Louvre" -> "Louvre"
fn collapse_repeated_locations(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(m) = LOCATION_EMOJI.find(rest) {
        let before = &rest[..m.start()];
        let after = &rest[m.end()..];
        match repeated_name_len(before, after) {
            Some(skip) => {
                out.push_str(before);
                rest = &after[skip..];
            }
            None => {
                out.push_str(&rest[..m.end()]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Fixes the markdown issues that break rendering: duplicated location
/// names, emoji runs, odd day header levels and missing blank lines.
pub fn preprocess_itinerary_content(content: &str) -> String {
    let mut text = collapse_repeated_locations(content);
    text = REPEATED_EMOJI.replace_all(&text, "$1").into_owned();
    text = DAY_HEADER.replace_all(&text, "## $1").into_owned();
    text = EXCESS_NEWLINES.replace_all(&text, "\n\n").into_owned();
    text = HEADER_SPACING.replace_all(&text, "${1}\n\n${2}").into_owned();
    text
}

fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION;

    // Single newlines render as line breaks
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn img_parts(caps: &Captures<'_>) -> (String, String, String) {
    let before = caps[1].trim().to_string();
    let src = caps[2].to_string();
    let after = caps[3].trim().trim_end_matches('/').trim_end().to_string();
    (before, src, after)
}

fn join_attrs(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decorate_image(caps: &Captures<'_>) -> String {
    let whole = &caps[0];
    if whole.contains("onerror") {
        return whole.to_string();
    }

    let (before, src, after) = img_parts(caps);
    let src_attr = format!("src=\"{}\"", src);
    let loading = if whole.contains("loading=") { "" } else { "loading=\"lazy\"" };
    let style = if whole.contains("style=") { "" } else { IMG_STYLE };

    format!(
        "<img {}>",
        join_attrs(&[loading, IMG_ONERROR, &before, &src_attr, &after, style])
    )
}

fn decorate_fallback_image(caps: &Captures<'_>) -> String {
    let (before, src, after) = img_parts(caps);
    let src_attr = format!("src=\"{}\"", src);
    format!(
        "<img {}>",
        join_attrs(&[&before, &src_attr, &after, IMG_FALLBACK_ONERROR, "loading=\"lazy\"", IMG_FALLBACK_STYLE])
    )
}

/// Renders markdown to HTML and styles times and images for the itinerary pane.
pub fn render_markdown(text: &str) -> String {
    let html = markdown_to_html(text);
    let html = TIME_RANGE_ITEM.replace_all(&html, r#"<li><span class="time-badge">$1</span>"#);
    let html = SINGLE_TIME.replace_all(&html, r#"<strong class="time-highlight">$1</strong>"#);
    let html = IMG_WITH_SRC.replace_all(&html, decorate_image).into_owned();

    if html.contains("**") {
        warn!("Rendered itinerary still contains bold markers");
    }
    if !(html.contains("<h2>") || html.contains("<h3>") || html.contains("<li>") || html.contains("<strong>")) {
        debug!("Rendered itinerary has no headers, lists or bold text");
    }
    html
}

fn wrap(body: &str) -> String {
    format!(
        "<div class=\"itinerary-content\">\n<div class=\"markdown-body\">\n{}\n</div>\n</div>",
        body
    )
}

// Markdown held by a `{ "content": ... }` wrapper, or the whole value
fn unwrap_content(value: Value) -> String {
    match value {
        Value::Object(map) => match map.get("content") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) if !is_blank(other) && !other.is_string() => other.to_string(),
            _ => Value::Object(map).to_string(),
        },
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn is_blank(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    }
}

fn render_content(content: &str) -> String {
    let cleaned = clean_itinerary_content(content);
    wrap(&render_markdown(&cleaned))
}

/// Itinerary pane HTML for whatever the backend sent as the itinerary.
///
/// A string that looks like JSON but does not parse is rendered as raw
/// markdown instead, with its images given a fallback source.
pub fn format_itinerary(data: &Value) -> String {
    if is_blank(data) {
        return NO_ITINERARY_HTML.to_string();
    }

    match data {
        Value::String(raw) if raw.trim_start().starts_with('{') => {
            match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => render_content(&unwrap_content(parsed)),
                Err(err) => {
                    warn!("Itinerary JSON did not parse ({}), rendering raw text", err);
                    let html = markdown_to_html(raw);
                    wrap(&IMG_WITH_SRC.replace_all(&html, decorate_fallback_image))
                }
            }
        }
        other => render_content(&unwrap_content(other.clone())),
    }
}

pub fn format_itinerary_str(markdown: &str) -> String {
    format_itinerary(&Value::String(markdown.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_clean_removes_image_lines_but_keeps_img_tags() {
        let content = "## Day 1\nImage: https://example.com/a.jpg\n<img src=\"https://example.com/b.jpg\">\n**Image:** https://example.com/c.jpg\nVisit the museum";
        let cleaned = clean_itinerary_content(content);
        assert!(!cleaned.contains("a.jpg"));
        assert!(!cleaned.contains("c.jpg"));
        assert!(cleaned.contains("<img src=\"https://example.com/b.jpg\">"));
        assert!(cleaned.contains("Visit the museum"));
    }

    #[test]
    fn test_clean_drops_long_urls_and_lone_asterisks() {
        let long = format!("https://example.com/{}", "x".repeat(120));
        let content = format!("See {long} now\n**\n* *\nText\n\n\n\n\nMore");
        let cleaned = clean_itinerary_content(&content);
        assert_eq!(cleaned, "See  now\nText\n\nMore");
    }

    #[test]
    fn test_clean_keeps_long_url_inside_href() {
        let long = format!("https://example.com/{}", "y".repeat(120));
        let content = format!("<a href=\"{long}\">link</a>");
        assert_eq!(clean_itinerary_content(&content), content);
    }

    #[test]
    fn test_clean_returns_original_when_too_much_is_lost() {
        let content = format!("Image: https://example.com/{}", "z".repeat(1200));
        assert_eq!(clean_itinerary_content(&content), content);
    }

    #[test_case("# Day 1\nMorning", "## Day 1\nMorning"; "#1 h1 day")]
    #[test_case("### day 2\nLunch", "## day 2\nLunch"; "#2 h3 day")]
    #[test_case("Intro\n## Day 3", "Intro\n\n## Day 3"; "#3 spacing")]
    #[test_case("Eiffel Tower📍 Eiffel Tower", "Eiffel Tower"; "#4 repeated location")]
    #[test_case("Stop 📍📍📍 here", "Stop 📍 here"; "#5 emoji run")]
    fn test_preprocess(input: &str, expected: &str) {
        assert_eq!(preprocess_itinerary_content(input), expected);
    }

    #[test]
    fn test_render_styles_time_ranges() {
        let html = render_markdown("- **9:00 - 11:00:** Museum\n- Lunch at **12:30 PM**");
        assert!(html.contains(r#"<li><span class="time-badge">9:00 - 11:00</span>"#));
        assert!(html.contains(r#"<strong class="time-highlight">12:30 PM</strong>"#));
    }

    #[test]
    fn test_render_decorates_images() {
        let html = render_markdown("![Tower](https://example.com/t.jpg)");
        assert!(html.contains("loading=\"lazy\""));
        assert!(html.contains(IMG_ONERROR));
        assert!(html.contains("src=\"https://example.com/t.jpg\""));
        assert!(html.contains("alt=\"Tower\""));
    }

    #[test]
    fn test_render_hard_breaks() {
        let html = render_markdown("line one\nline two");
        assert!(html.contains("<br />"));
    }

    #[test]
    fn test_format_itinerary_inputs() {
        assert_eq!(format_itinerary(&Value::Null), NO_ITINERARY_HTML);
        assert_eq!(format_itinerary(&json!("")), NO_ITINERARY_HTML);

        let html = format_itinerary(&json!("## Day 1\n- Walk"));
        assert!(html.starts_with("<div class=\"itinerary-content\">"));
        assert!(html.contains("<h2>Day 1</h2>"));

        let html = format_itinerary(&json!({"content": "## Day 2"}));
        assert!(html.contains("<h2>Day 2</h2>"));

        let html = format_itinerary(&json!("{\"content\": \"### Arrival\"}"));
        assert!(html.contains("<h3>Arrival</h3>"));
    }

    #[test]
    fn test_empty_content_renders_whole_object() {
        let html = format_itinerary(&json!({"content": "", "title": "Weekend in Porto"}));
        assert!(html.contains("markdown-body"));
        assert!(html.contains("Weekend in Porto"));

        let html = format_itinerary(&json!("{\"content\": null, \"title\": \"Lisbon\"}"));
        assert!(html.contains("Lisbon"));
    }

    #[test]
    fn test_format_itinerary_invalid_json_renders_raw() {
        let html = format_itinerary_str("{not json ![x](https://example.com/x.png)");
        assert!(html.contains("markdown-body"));
        assert!(html.contains("no-image.png"));
    }
}
