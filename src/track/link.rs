use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::TrackLink;

/// Ordered id-extraction patterns. The first match wins; the order is a
/// deliberate tie-break between the separator styles the source uses on
/// sound pages, not arbitrary.
fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // music/sound-name-<digits>
            r"music/([^/?#]*?)-(\d+)(?:[/?#]|$)",
            // music/sound-name--<digits>
            r"music/([^/?#]*?)--(\d+)(?:[/?#]|$)",
            // music/sound-name_<digits>
            r"music/([^/?#]*?)_(\d+)(?:[/?#]|$)",
            // music/<digits> with no name segment
            r"music/(\d+)(?:[/?#]|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid pattern"))
        .collect()
    })
}

/// Extracts a display name and track id from a sound-page URL.
///
/// Anything that is not an accepted sound-page or short-link shape fails
/// with `InvalidLink`; this function never panics past its boundary.
pub fn interpret(raw_url: &str) -> Result<TrackLink> {
    let url = Url::parse(raw_url.trim()).map_err(|_| AppError::InvalidLink)?;

    if url.scheme() != "https" {
        return Err(AppError::InvalidLink);
    }
    let host = url.host_str().ok_or(AppError::InvalidLink)?;
    if !matches!(host, "www.tiktok.com" | "tiktok.com" | "vm.tiktok.com") {
        return Err(AppError::InvalidLink);
    }

    let path = url.path();
    for pattern in patterns() {
        if let Some(caps) = pattern.captures(path) {
            let (raw_name, track_id) = match (caps.get(1), caps.get(2)) {
                (Some(name), Some(id)) => (name.as_str(), id.as_str()),
                // Bare-id pattern has a single group
                (Some(id), None) => ("", id.as_str()),
                _ => continue,
            };
            return Ok(TrackLink {
                name: display_name(raw_name, track_id),
                track_id: track_id.to_string(),
            });
        }
    }

    Err(AppError::InvalidLink)
}

/// Turns the matched name segment into a human-readable label, or a
/// synthetic `Track <id>` label when nothing usable is left.
fn display_name(raw: &str, track_id: &str) -> String {
    let cleaned = raw.replace(['-', '_'], " ");
    let name = title_case(&cleaned);
    if name.is_empty() {
        format!("Track {track_id}")
    } else {
        name
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
