//! Market data feed via REST quote polling.
//!
//! Periodically fetches quotes for the configured instruments and emits
//! them over a channel. Fetch failures are logged and skipped; the feed
//! never dies on a bad poll.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::client::BrokerClient;
use crate::data::models::{Instrument, QuoteUpdate};

/// Configuration for the quote feed.
#[derive(Debug, Clone)]
pub struct QuoteFeedConfig {
    pub poll_interval_secs: f64,
    pub max_concurrency: usize,
}

impl Default for QuoteFeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60.0,
            max_concurrency: 4,
        }
    }
}

/// REST-based quote feed.
pub struct QuoteFeed {
    config: QuoteFeedConfig,
    instruments: Vec<Instrument>,
}

impl QuoteFeed {
    pub fn new(config: QuoteFeedConfig, instruments: Vec<Instrument>) -> Self {
        Self {
            config,
            instruments,
        }
    }

    /// Start the feed loop. Returns a channel receiver for quote updates.
    /// Runs in a background tokio task.
    pub fn start(self, client: Arc<BrokerClient>) -> mpsc::Receiver<QuoteUpdate> {
        let (tx, rx) = mpsc::channel(256);

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            instruments = self.instruments.len(),
            "Quote feed starting"
        );

        let config = self.config.clone();
        let instruments = self.instruments.clone();

        tokio::spawn(async move {
            let interval = Duration::from_secs_f64(config.poll_interval_secs);

            loop {
                let semaphore = Arc::new(tokio::sync::Semaphore::new(config.max_concurrency));
                let mut tasks = Vec::new();

                for inst in &instruments {
                    let client = client.clone();
                    let inst = inst.clone();
                    let sem = semaphore.clone();

                    tasks.push(tokio::spawn(async move {
                        let _permit = sem.acquire().await.ok()?;
                        match client.get_quote(&inst.exchange, &inst.token).await {
                            Ok(quote) => Some(quote),
                            Err(e) => {
                                debug!(instrument = %inst, error = %e, "Failed to fetch quote");
                                None
                            }
                        }
                    }));
                }

                for task in tasks {
                    if let Ok(Some(quote)) = task.await {
                        let update = QuoteUpdate {
                            quote,
                            received_at: chrono::Utc::now(),
                        };
                        if tx.send(update).await.is_err() {
                            info!("Quote feed receiver dropped, stopping");
                            return;
                        }
                    }
                }

                tokio::time::sleep(interval).await;
            }
        });

        rx
    }
}
