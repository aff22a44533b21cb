mod html;
mod strategies;

pub use strategies::{HashtagStrategy, SearchStrategy, SoundPageStrategy};

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::Candidate;

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// One way of discovering videos for a track. Strategies are independent
/// and interchangeable; adding a new one means implementing this trait and
/// appending it to the prober's list.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, track_id: &str, hint_name: &str, limit: usize)
        -> Result<Vec<Candidate>>;
}

/// Best-effort retrieval of videos for a track from an unreliable source.
///
/// Strategies run in order with a pause between remote calls. A failing
/// strategy is logged and skipped; the probe itself never fails, it just
/// returns whatever the surviving strategies produced.
pub struct Prober {
    strategies: Vec<Box<dyn ProbeStrategy>>,
    pause: Duration,
}

impl Prober {
    pub fn new(pause: Duration) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");

        let strategies: Vec<Box<dyn ProbeStrategy>> = vec![
            Box::new(SoundPageStrategy::new(client.clone())),
            Box::new(HashtagStrategy::new(client.clone())),
            Box::new(SearchStrategy::new(client)),
        ];

        Self { strategies, pause }
    }

    /// Custom strategy list with no inter-call pause. Used by tests and
    /// useful for embedding a reduced prober.
    pub fn with_strategies(strategies: Vec<Box<dyn ProbeStrategy>>) -> Self {
        Self {
            strategies,
            pause: Duration::ZERO,
        }
    }

    /// Collects up to `max_results` unique candidates across strategies,
    /// deduplicated by URL, preserving discovery order.
    pub async fn probe(&self, track_id: &str, hint_name: &str, max_results: usize) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (index, strategy) in self.strategies.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let candidates = match strategy.fetch(track_id, hint_name, max_results).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), "probe strategy failed: {e}");
                    continue;
                }
            };
            tracing::debug!(
                strategy = strategy.name(),
                count = candidates.len(),
                "strategy finished"
            );

            for candidate in candidates {
                if !seen.insert(candidate.url.clone()) {
                    continue;
                }
                found.push(candidate);
                if found.len() >= max_results {
                    return found;
                }
            }
        }

        found
    }
}

/// Canned strategies shared by the engine and scheduler tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::Utc;

    pub(crate) struct FixedStrategy {
        pub urls: Vec<&'static str>,
    }

    #[async_trait]
    impl ProbeStrategy for FixedStrategy {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(
            &self,
            _track_id: &str,
            _hint_name: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>> {
            Ok(self
                .urls
                .iter()
                .map(|url| Candidate {
                    url: url.to_string(),
                    description: "a clip".to_string(),
                    author: None,
                    observed_at: Utc::now(),
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedStrategy;
    use super::*;

    struct FailingStrategy;

    #[async_trait]
    impl ProbeStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch(
            &self,
            _track_id: &str,
            _hint_name: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>> {
            Err(anyhow::anyhow!("connection reset").into())
        }
    }

    #[tokio::test]
    async fn failing_strategy_is_invisible_to_the_caller() {
        let prober = Prober::with_strategies(vec![
            Box::new(FailingStrategy),
            Box::new(FixedStrategy {
                urls: vec!["https://t/1", "https://t/2"],
            }),
        ]);
        let found = prober.probe("1", "Song", 10).await;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url, "https://t/1");
    }

    #[tokio::test]
    async fn duplicates_across_strategies_count_once() {
        let prober = Prober::with_strategies(vec![
            Box::new(FixedStrategy {
                urls: vec!["https://t/1", "https://t/2"],
            }),
            Box::new(FixedStrategy {
                urls: vec!["https://t/2", "https://t/3"],
            }),
        ]);
        let found = prober.probe("1", "Song", 10).await;
        let urls: Vec<_> = found.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://t/1", "https://t/2", "https://t/3"]);
    }

    #[tokio::test]
    async fn stops_once_max_results_is_reached() {
        let prober = Prober::with_strategies(vec![
            Box::new(FixedStrategy {
                urls: vec!["https://t/1", "https://t/2", "https://t/3"],
            }),
            Box::new(FixedStrategy {
                urls: vec!["https://t/4"],
            }),
        ]);
        let found = prober.probe("1", "Song", 2).await;
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn all_strategies_empty_is_a_normal_outcome() {
        let prober = Prober::with_strategies(vec![
            Box::new(FailingStrategy),
            Box::new(FixedStrategy { urls: vec![] }),
        ]);
        assert!(prober.probe("1", "Song", 10).await.is_empty());
    }
}
