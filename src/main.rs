use std::sync::Arc;
use std::time::Duration;

mod config;
mod db;
mod engine;
mod error;
mod models;
mod probe;
mod scheduler;
mod services;
mod track;

use config::Config;
use db::Repository;
use engine::{AddOutcome, Engine};
use error::{AppError, Result};
use probe::Prober;
use scheduler::Poller;
use services::TelegramNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;

    let repository = Arc::new(Repository::new(&config.db_path).await?);
    let prober = Prober::new(Duration::from_millis(config.request_delay_ms));
    let engine = Arc::new(Engine::new(
        Arc::clone(&repository),
        prober,
        config.max_results,
    ));

    match args.get(1).map(String::as_str) {
        Some("--add") => {
            let owner_id = parse_id(args.get(2), "owner id")?;
            let url = args.get(3).map(String::as_str).unwrap_or_default();
            match engine.register(owner_id, url).await {
                Ok(AddOutcome::Added {
                    name, new_videos, ..
                }) => {
                    println!("Now tracking '{}', found {} videos", name, new_videos.len());
                }
                Ok(AddOutcome::AlreadyTracked { name }) => {
                    println!("'{name}' is already being tracked");
                }
                Ok(AddOutcome::Unavailable) => {
                    println!("Storage unavailable, nothing changed");
                }
                Err(AppError::InvalidLink) => {
                    println!("That does not look like a TikTok sound link");
                }
                Err(e) => return Err(e),
            }
        }

        Some("--list") => {
            let owner_id = parse_id(args.get(2), "owner id")?;
            for subscription in repository.list_subscriptions(owner_id).await {
                println!(
                    "{}\t{}\t{}",
                    subscription.id, subscription.name, subscription.url
                );
            }
        }

        Some("--videos") => {
            let owner_id = parse_id(args.get(2), "owner id")?;
            let subscription_id = parse_id(args.get(3), "subscription id")?;
            for video in repository.list_videos(owner_id, subscription_id).await {
                println!("{}\t{}", video.url, video.description);
            }
        }

        Some("--remove") => {
            let owner_id = parse_id(args.get(2), "owner id")?;
            let subscription_id = parse_id(args.get(3), "subscription id")?;
            if repository.remove_subscription(owner_id, subscription_id).await {
                println!("Subscription {subscription_id} removed");
            } else {
                println!("No such subscription");
            }
        }

        Some("--check") => {
            let owner_id = parse_id(args.get(2), "owner id")?;
            for (subscription, fresh) in engine.check_owner(owner_id).await {
                println!("{}: {} new videos", subscription.name, fresh.len());
                for video in fresh {
                    println!("  {}", video.url);
                }
            }
        }

        Some("--once") => {
            let notifier = TelegramNotifier::new(config.bot_token.clone());
            let poller = Poller::new(
                repository,
                engine,
                notifier,
                Duration::from_secs(config.check_interval_secs),
            );
            let delivered = poller.run_cycle().await;
            println!("Poll cycle complete, {delivered} notifications sent");
        }

        _ => {
            let notifier = TelegramNotifier::new(config.bot_token.clone());
            let poller = Poller::new(
                repository,
                engine,
                notifier,
                Duration::from_secs(config.check_interval_secs),
            );
            tracing::info!(
                interval_secs = config.check_interval_secs,
                "starting poll scheduler"
            );
            poller.run().await;
        }
    }

    Ok(())
}

fn parse_id(arg: Option<&String>, what: &str) -> Result<i64> {
    arg.ok_or_else(|| AppError::Config(format!("missing {what}")))?
        .parse()
        .map_err(|_| AppError::Config(format!("invalid {what}")))
}
