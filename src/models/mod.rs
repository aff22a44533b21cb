use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (user, track) pairing the system actively monitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub url: String,
    pub track_id: String,
    pub created_at: DateTime<Utc>,
    pub last_probed_at: Option<DateTime<Utc>>,
}

/// A video surfaced by a probe strategy, not yet checked against the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub description: String,
    pub author: Option<String>,
    /// When we discovered it. The source exposes no trustworthy publish time.
    pub observed_at: DateTime<Utc>,
}

/// A video already recorded for a subscription. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenVideo {
    pub id: i64,
    pub subscription_id: i64,
    pub url: String,
    pub description: String,
    pub author: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Canonical identity extracted from a sound-page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLink {
    pub name: String,
    pub track_id: String,
}
