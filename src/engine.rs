use std::sync::Arc;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Candidate, Subscription};
use crate::probe::Prober;
use crate::track;

/// Result of registering a track link for a user.
#[derive(Debug)]
pub enum AddOutcome {
    Added {
        subscription_id: i64,
        name: String,
        /// The back catalog absorbed at registration time. Reported to the
        /// registering user, never re-reported by later polls.
        new_videos: Vec<Candidate>,
    },
    /// The (owner, url) pair was already tracked. A no-op, not an error.
    AlreadyTracked { name: String },
    /// Storage was unavailable; nothing was recorded.
    Unavailable,
}

/// Classifies probed candidates as known or new against the store and
/// persists the new ones. The same probe cycle serves both registration
/// and re-checks; only the call sites differ.
pub struct Engine {
    repository: Arc<Repository>,
    prober: Prober,
    max_results: usize,
}

impl Engine {
    pub fn new(repository: Arc<Repository>, prober: Prober, max_results: usize) -> Self {
        Self {
            repository,
            prober,
            max_results,
        }
    }

    /// Registers a subscription from a raw sound-page URL and immediately
    /// runs one probe cycle, so existing videos land in the seen-set now
    /// instead of flooding the first scheduled poll as "new".
    pub async fn register(&self, owner_id: i64, raw_url: &str) -> Result<AddOutcome> {
        let link = track::interpret(raw_url)?;
        let canonical_url = raw_url.trim();

        let Some((subscription_id, is_new)) = self
            .repository
            .add_subscription(owner_id, &link.name, canonical_url, &link.track_id)
            .await
        else {
            return Ok(AddOutcome::Unavailable);
        };

        if !is_new {
            return Ok(AddOutcome::AlreadyTracked { name: link.name });
        }

        tracing::info!(owner_id, track_id = %link.track_id, "tracking new sound");
        let new_videos = self
            .probe_cycle(subscription_id, &link.track_id, &link.name)
            .await;

        Ok(AddOutcome::Added {
            subscription_id,
            name: link.name,
            new_videos,
        })
    }

    /// One probe cycle for an existing subscription. Returns only videos
    /// not previously seen under it, in discovery order.
    pub async fn process_subscription(&self, subscription: &Subscription) -> Vec<Candidate> {
        self.probe_cycle(subscription.id, &subscription.track_id, &subscription.name)
            .await
    }

    /// On-demand re-check across all of one user's subscriptions.
    pub async fn check_owner(&self, owner_id: i64) -> Vec<(Subscription, Vec<Candidate>)> {
        let mut results = Vec::new();
        for subscription in self.repository.list_subscriptions(owner_id).await {
            let fresh = self.process_subscription(&subscription).await;
            results.push((subscription, fresh));
        }
        results
    }

    async fn probe_cycle(
        &self,
        subscription_id: i64,
        track_id: &str,
        name: &str,
    ) -> Vec<Candidate> {
        let candidates = self.prober.probe(track_id, name, self.max_results).await;

        // Keep prober order; there is no trustworthy publish time to sort by.
        let mut fresh = Vec::new();
        for candidate in candidates {
            if self
                .repository
                .video_exists(subscription_id, &candidate.url)
                .await
            {
                continue;
            }
            if self.repository.add_video(subscription_id, &candidate).await {
                fresh.push(candidate);
            }
        }

        self.repository.touch_last_probed(subscription_id).await;

        if !fresh.is_empty() {
            tracing::info!(subscription_id, count = fresh.len(), "new videos found");
        }
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::probe::testing::FixedStrategy;

    async fn test_engine(dir: &tempfile::TempDir, urls: Vec<&'static str>) -> Engine {
        let path = dir.path().join("test.db");
        let repository = Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());
        let prober = Prober::with_strategies(vec![Box::new(FixedStrategy { urls })]);
        Engine::new(repository, prober, 20)
    }

    const SOUND_URL: &str = "https://www.tiktok.com/music/lovely-song-723415689123";

    #[tokio::test]
    async fn registration_absorbs_the_back_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir, vec!["https://t/a", "https://t/b", "https://t/c"]).await;

        let outcome = engine.register(1, SOUND_URL).await.unwrap();
        let AddOutcome::Added {
            name, new_videos, ..
        } = outcome
        else {
            panic!("expected Added");
        };
        assert_eq!(name, "Lovely Song");
        assert_eq!(new_videos.len(), 3);

        // An immediate re-check with the same probe result finds nothing new
        let subscription = engine.repository.list_subscriptions(1).await.remove(0);
        assert!(engine.process_subscription(&subscription).await.is_empty());
    }

    #[tokio::test]
    async fn re_registration_is_a_tracked_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir, vec!["https://t/a"]).await;

        engine.register(1, SOUND_URL).await.unwrap();
        let outcome = engine.register(1, SOUND_URL).await.unwrap();
        assert!(matches!(outcome, AddOutcome::AlreadyTracked { .. }));
        assert_eq!(engine.repository.list_subscriptions(1).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_link_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir, vec![]).await;

        let result = engine.register(1, "https://example.com/not-tiktok").await;
        assert!(matches!(result, Err(AppError::InvalidLink)));
        assert!(engine.repository.list_subscriptions(1).await.is_empty());
    }

    #[tokio::test]
    async fn owners_keep_independent_seen_sets() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir, vec!["https://t/a", "https://t/b"]).await;

        let first = engine.register(1, SOUND_URL).await.unwrap();
        let second = engine.register(2, SOUND_URL).await.unwrap();

        // The same track registered by a second user starts from scratch
        for outcome in [first, second] {
            let AddOutcome::Added { new_videos, .. } = outcome else {
                panic!("expected Added");
            };
            assert_eq!(new_videos.len(), 2);
        }
    }

    #[tokio::test]
    async fn check_owner_covers_every_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(&dir, vec!["https://t/a"]).await;

        engine.register(1, SOUND_URL).await.unwrap();
        engine
            .register(1, "https://www.tiktok.com/music/other-beat-55")
            .await
            .unwrap();

        let results = engine.check_owner(1).await;
        assert_eq!(results.len(), 2);
        // Back catalog was absorbed at registration, so nothing is new
        assert!(results.iter().all(|(_, fresh)| fresh.is_empty()));
    }
}
