use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::db::Repository;
use crate::engine::Engine;
use crate::models::{Candidate, Subscription};
use crate::services::Notifier;

/// Pause between notification sends, keeps the messaging API happy.
const DELIVERY_PAUSE: Duration = Duration::from_secs(1);

/// Fires the change-detection engine over all subscriptions on a fixed
/// interval and notifies owners of whatever came back new.
pub struct Poller<N: Notifier> {
    repository: Arc<Repository>,
    engine: Arc<Engine>,
    notifier: N,
    interval: Duration,
}

impl<N: Notifier> Poller<N> {
    pub fn new(
        repository: Arc<Repository>,
        engine: Arc<Engine>,
        notifier: N,
        interval: Duration,
    ) -> Self {
        Self {
            repository,
            engine,
            notifier,
            interval,
        }
    }

    /// Runs forever, one cycle per interval. The timer serializes cycles:
    /// a slow cycle delays the next tick rather than overlapping it.
    pub async fn run(&self) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            let delivered = self.run_cycle().await;
            tracing::info!(delivered, "poll cycle complete");
        }
    }

    /// One sequential pass over every subscription. Sequential on purpose:
    /// it bounds the outbound request rate and keeps writes to one track's
    /// seen-set from interleaving. Returns notifications delivered.
    pub async fn run_cycle(&self) -> usize {
        let subscriptions = self.repository.all_subscriptions_for_polling().await;
        tracing::debug!(count = subscriptions.len(), "starting poll cycle");

        let mut delivered = 0;
        for subscription in subscriptions {
            let fresh = self.engine.process_subscription(&subscription).await;
            for video in fresh {
                let text = format_notification(&subscription, &video);
                match self.notifier.deliver(subscription.owner_id, &text).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::error!(
                            owner_id = subscription.owner_id,
                            "notification delivery failed: {e}"
                        );
                    }
                }
                tokio::time::sleep(DELIVERY_PAUSE).await;
            }
        }

        delivered
    }
}

fn format_notification(subscription: &Subscription, video: &Candidate) -> String {
    let mut text = format!(
        "🎉 New video with your tracked sound!\n\n🎵 {}\n📹 {}",
        subscription.name, video.description
    );
    if let Some(author) = &video.author {
        text.push_str(&format!("\n👤 @{author}"));
    }
    text.push_str(&format!("\n🔗 {}", video.url));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::error::{AppError, Result};
    use crate::probe::testing::FixedStrategy;
    use crate::probe::Prober;

    /// Records deliveries; refuses every delivery to `failing_owner`.
    struct RecordingNotifier {
        failing_owner: Option<i64>,
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver(&self, owner_id: i64, text: &str) -> Result<()> {
            if self.failing_owner == Some(owner_id) {
                return Err(AppError::Notification("chat not found".to_string()));
            }
            self.sent.lock().unwrap().push((owner_id, text.to_string()));
            Ok(())
        }
    }

    async fn seeded_poller(
        dir: &tempfile::TempDir,
        failing_owner: Option<i64>,
    ) -> Poller<RecordingNotifier> {
        let path = dir.path().join("test.db");
        let repository = Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());

        // Subscriptions created directly, so the first cycle sees the
        // probe results as new
        repository
            .add_subscription(1, "Song A", "https://www.tiktok.com/music/song-a-1", "1")
            .await
            .unwrap();
        repository
            .add_subscription(2, "Song B", "https://www.tiktok.com/music/song-b-2", "2")
            .await
            .unwrap();

        let prober = Prober::with_strategies(vec![Box::new(FixedStrategy {
            urls: vec!["https://t/a", "https://t/b"],
        })]);
        let engine = Arc::new(Engine::new(Arc::clone(&repository), prober, 20));
        let notifier = RecordingNotifier {
            failing_owner,
            sent: Mutex::new(Vec::new()),
        };

        Poller::new(repository, engine, notifier, Duration::from_secs(1800))
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_notifies_each_owner_once_per_new_video() {
        let dir = tempfile::tempdir().unwrap();
        let poller = seeded_poller(&dir, None).await;

        assert_eq!(poller.run_cycle().await, 4);

        let sent = poller.notifier.sent.lock().unwrap();
        assert_eq!(sent.iter().filter(|(owner, _)| *owner == 1).count(), 2);
        assert_eq!(sent.iter().filter(|(owner, _)| *owner == 2).count(), 2);
        assert!(sent[0].1.contains("https://t/a"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_cycle_finds_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let poller = seeded_poller(&dir, None).await;

        poller.run_cycle().await;
        assert_eq!(poller.run_cycle().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_does_not_abort_the_fan_out() {
        let dir = tempfile::tempdir().unwrap();
        let poller = seeded_poller(&dir, Some(1)).await;

        assert_eq!(poller.run_cycle().await, 2);

        let sent = poller.notifier.sent.lock().unwrap();
        assert!(sent.iter().all(|(owner, _)| *owner == 2));
    }

    #[test]
    fn notification_mentions_track_and_link() {
        let subscription = Subscription {
            id: 1,
            owner_id: 1,
            name: "Lovely Song".to_string(),
            url: "https://www.tiktok.com/music/lovely-song-1".to_string(),
            track_id: "1".to_string(),
            created_at: Utc::now(),
            last_probed_at: None,
        };
        let video = Candidate {
            url: "https://www.tiktok.com/@a/video/1".to_string(),
            description: "a clip".to_string(),
            author: Some("a".to_string()),
            observed_at: Utc::now(),
        };

        let text = format_notification(&subscription, &video);
        assert!(text.contains("Lovely Song"));
        assert!(text.contains("@a"));
        assert!(text.contains("https://www.tiktok.com/@a/video/1"));
    }
}
