use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

use crate::models::Candidate;

const MAX_DESCRIPTION_CHARS: usize = 200;
const FALLBACK_DESCRIPTION: &str = "Video using this sound";

/// Shortest description worth showing; anything under this is usually a
/// button label or counter scraped out of the page chrome.
const MIN_DESCRIPTION_CHARS: usize = 10;

fn video_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:https://www\.tiktok\.com)?/@([\w.\-]+)/video/(\d+)")
            .expect("valid pattern")
    })
}

fn description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""desc":"((?:[^"\\]|\\.)*)""#).expect("valid pattern"))
}

/// Scans a page for video links, both plain anchors and the embedded JSON
/// state blob. The page layout changes often; this extracts only what two
/// stable artifacts provide: `/@author/video/<id>` hrefs and `"desc"`
/// fields. Descriptions appear in render order, so they are paired with
/// links positionally and fall back to a generic label when counts diverge.
pub(crate) fn scan(html: &str, limit: usize) -> Vec<Candidate> {
    let descriptions: Vec<String> = description_re()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .filter(|d| d.chars().count() >= MIN_DESCRIPTION_CHARS)
        .collect();

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for caps in video_link_re().captures_iter(html) {
        let (author, video_id) = match (caps.get(1), caps.get(2)) {
            (Some(author), Some(id)) => (author.as_str(), id.as_str()),
            _ => continue,
        };
        let url = format!("https://www.tiktok.com/@{author}/video/{video_id}");
        if !seen.insert(url.clone()) {
            continue;
        }

        let description = descriptions
            .get(candidates.len())
            .map(|d| truncate_description(d))
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());

        candidates.push(Candidate {
            url,
            description,
            author: Some(author.to_string()),
            observed_at: Utc::now(),
        });

        if candidates.len() >= limit {
            break;
        }
    }

    candidates
}

/// JSON string unescape via serde; garbled escapes fall back to the raw text.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

pub(crate) fn truncate_description(s: &str) -> String {
    if s.chars().count() <= MAX_DESCRIPTION_CHARS {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{truncated}...")
    }
}
