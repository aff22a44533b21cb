use async_trait::async_trait;
use reqwest::Client;

use super::{html, ProbeStrategy};
use crate::error::Result;
use crate::models::Candidate;

/// Scans the track's own music page. The most direct strategy, and the
/// first to get blocked when the source decides it does not like us.
pub struct SoundPageStrategy {
    client: Client,
}

impl SoundPageStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeStrategy for SoundPageStrategy {
    fn name(&self) -> &'static str {
        "sound-page"
    }

    async fn fetch(&self, track_id: &str, hint_name: &str, limit: usize) -> Result<Vec<Candidate>> {
        let slug = slugify(hint_name);
        let url = if slug.is_empty() {
            format!("https://www.tiktok.com/music/original-sound-{track_id}")
        } else {
            format!("https://www.tiktok.com/music/{slug}-{track_id}")
        };

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("sound page returned HTTP {}", response.status()).into());
        }

        let body = response.text().await?;
        Ok(html::scan(&body, limit))
    }
}

/// Guesses a hashtag from the track name and scans the tag page. Videos
/// tagged with the sound's name frequently use the sound itself.
pub struct HashtagStrategy {
    client: Client,
}

impl HashtagStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeStrategy for HashtagStrategy {
    fn name(&self) -> &'static str {
        "hashtag"
    }

    async fn fetch(
        &self,
        _track_id: &str,
        hint_name: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let tag = hashtag(hint_name);
        if tag.is_empty() {
            // Nothing to guess from a synthetic name
            return Ok(Vec::new());
        }

        let url = format!("https://www.tiktok.com/tag/{tag}");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("tag page returned HTTP {}", response.status()).into());
        }

        let body = response.text().await?;
        Ok(html::scan(&body, limit))
    }
}

/// Free-text search page scan. The broadest net and the noisiest.
pub struct SearchStrategy {
    client: Client,
}

impl SearchStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeStrategy for SearchStrategy {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn fetch(&self, track_id: &str, hint_name: &str, limit: usize) -> Result<Vec<Candidate>> {
        let query = if hint_name.trim().is_empty() {
            track_id.to_string()
        } else {
            hint_name.to_string()
        };

        let url = format!(
            "https://www.tiktok.com/search?q={}",
            urlencoding::encode(&query)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("search returned HTTP {}", response.status()).into());
        }

        let body = response.text().await?;
        Ok(html::scan(&body, limit))
    }
}

/// Lowercase hyphenated path segment, e.g. "Lovely Song" -> "lovely-song".
fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Condensed lowercase tag, e.g. "Lovely Song" -> "lovelysong". Synthetic
/// "Track <id>" labels produce no usable tag and map to empty.
fn hashtag(name: &str) -> String {
    if name.starts_with("Track ") {
        return String::new();
    }
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
