use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Candidate, SeenVideo, Subscription};

use super::schema::SCHEMA;

/// How many stored videos a listing returns per subscription.
const VIDEO_LIST_LIMIT: i64 = 20;

/// Durable record of subscriptions and the per-subscription seen-set.
///
/// Public operations never propagate storage errors into calling flows:
/// a failure is logged and the operation degrades to its safe default
/// (empty list, `false`, `None`). Only opening the store can fail hard,
/// since running without storage is not a meaningful mode.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Subscription operations

    /// Insert-if-absent on (owner, url). Returns the row id and whether the
    /// row was created by this call; `None` means storage was unavailable.
    pub async fn add_subscription(
        &self,
        owner_id: i64,
        name: &str,
        url: &str,
        track_id: &str,
    ) -> Option<(i64, bool)> {
        match self
            .try_add_subscription(owner_id, name.to_string(), url.to_string(), track_id.to_string())
            .await
        {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!("failed to add subscription: {e}");
                None
            }
        }
    }

    async fn try_add_subscription(
        &self,
        owner_id: i64,
        name: String,
        url: String,
        track_id: String,
    ) -> Result<(i64, bool)> {
        let result = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO subscriptions (owner_id, name, url, track_id) VALUES (?1, ?2, ?3, ?4)",
                    params![owner_id, name, url, track_id],
                )?;
                let id: i64 = conn.query_row(
                    "SELECT id FROM subscriptions WHERE owner_id = ?1 AND url = ?2",
                    params![owner_id, url],
                    |row| row.get(0),
                )?;
                Ok((id, inserted > 0))
            })
            .await?;
        Ok(result)
    }

    /// One owner's subscriptions, newest first.
    pub async fn list_subscriptions(&self, owner_id: i64) -> Vec<Subscription> {
        match self.try_list_subscriptions(owner_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::error!("failed to list subscriptions: {e}");
                Vec::new()
            }
        }
    }

    async fn try_list_subscriptions(&self, owner_id: i64) -> Result<Vec<Subscription>> {
        let subscriptions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, owner_id, name, url, track_id, created_at, last_probed_at
                     FROM subscriptions WHERE owner_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )?;
                let subscriptions = stmt
                    .query_map(params![owner_id], |row| Ok(subscription_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscriptions)
            })
            .await?;
        Ok(subscriptions)
    }

    /// Every subscription, for the poll scheduler. No ownership filter.
    pub async fn all_subscriptions_for_polling(&self) -> Vec<Subscription> {
        match self.try_all_subscriptions().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::error!("failed to load subscriptions for polling: {e}");
                Vec::new()
            }
        }
    }

    async fn try_all_subscriptions(&self) -> Result<Vec<Subscription>> {
        let subscriptions = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, owner_id, name, url, track_id, created_at, last_probed_at
                     FROM subscriptions ORDER BY id",
                )?;
                let subscriptions = stmt
                    .query_map([], |row| Ok(subscription_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscriptions)
            })
            .await?;
        Ok(subscriptions)
    }

    /// Deletes a subscription and its seen videos. Refuses rows the owner
    /// does not hold; returns whether a row was actually removed.
    pub async fn remove_subscription(&self, owner_id: i64, id: i64) -> bool {
        match self.try_remove_subscription(owner_id, id).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!("failed to remove subscription {id}: {e}");
                false
            }
        }
    }

    async fn try_remove_subscription(&self, owner_id: i64, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .call(move |conn| {
                let owned: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM subscriptions WHERE id = ?1 AND owner_id = ?2",
                        params![id, owner_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if owned.is_none() {
                    return Ok(false);
                }
                // Dependent rows first
                conn.execute("DELETE FROM videos WHERE subscription_id = ?1", params![id])?;
                let deleted = conn.execute(
                    "DELETE FROM subscriptions WHERE id = ?1 AND owner_id = ?2",
                    params![id, owner_id],
                )?;
                Ok(deleted > 0)
            })
            .await?;
        Ok(removed)
    }

    pub async fn touch_last_probed(&self, id: i64) {
        let result = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE subscriptions SET last_probed_at = datetime('now') WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::error!("failed to touch last_probed_at for {id}: {e}");
        }
    }

    // Video operations

    pub async fn video_exists(&self, subscription_id: i64, url: &str) -> bool {
        match self.try_video_exists(subscription_id, url.to_string()).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::error!("failed to check video existence: {e}");
                false
            }
        }
    }

    async fn try_video_exists(&self, subscription_id: i64, url: String) -> Result<bool> {
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM videos WHERE subscription_id = ?1 AND url = ?2",
                    params![subscription_id, url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Insert-if-absent on (subscription, url). The uniqueness constraint
    /// makes this atomic per row, so an existence check racing an insert
    /// cannot produce a duplicate. Returns whether a row was created.
    pub async fn add_video(&self, subscription_id: i64, candidate: &Candidate) -> bool {
        match self.try_add_video(subscription_id, candidate.clone()).await {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::error!("failed to add video: {e}");
                false
            }
        }
    }

    async fn try_add_video(&self, subscription_id: i64, candidate: Candidate) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO videos (subscription_id, url, description, author, observed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        subscription_id,
                        candidate.url,
                        candidate.description,
                        candidate.author,
                        candidate.observed_at.to_rfc3339(),
                    ],
                )?;
                Ok(inserted > 0)
            })
            .await?;
        Ok(inserted)
    }

    /// Stored videos for one of the owner's subscriptions, newest first.
    pub async fn list_videos(&self, owner_id: i64, subscription_id: i64) -> Vec<SeenVideo> {
        match self.try_list_videos(owner_id, subscription_id).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!("failed to list videos: {e}");
                Vec::new()
            }
        }
    }

    async fn try_list_videos(&self, owner_id: i64, subscription_id: i64) -> Result<Vec<SeenVideo>> {
        let videos = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT v.id, v.subscription_id, v.url, v.description, v.author, v.observed_at
                     FROM videos v
                     JOIN subscriptions s ON v.subscription_id = s.id
                     WHERE s.id = ?1 AND s.owner_id = ?2
                     ORDER BY v.observed_at DESC, v.id DESC
                     LIMIT ?3",
                )?;
                let videos = stmt
                    .query_map(params![subscription_id, owner_id, VIDEO_LIST_LIMIT], |row| {
                        Ok(video_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(videos)
            })
            .await?;
        Ok(videos)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn subscription_from_row(row: &Row) -> Subscription {
    Subscription {
        id: row.get(0).unwrap(),
        owner_id: row.get(1).unwrap(),
        name: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        track_id: row.get(4).unwrap(),
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        last_probed_at: row
            .get::<_, Option<String>>(6)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
    }
}

fn video_from_row(row: &Row) -> SeenVideo {
    SeenVideo {
        id: row.get(0).unwrap(),
        subscription_id: row.get(1).unwrap(),
        url: row.get(2).unwrap(),
        description: row.get::<_, Option<String>>(3).unwrap().unwrap_or_default(),
        author: row.get(4).unwrap(),
        observed_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
