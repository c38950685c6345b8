//! AliceBlue TOTP Session Bot
//!
//! Logs into the AliceBlue brokerage API with TOTP two-factor
//! authentication, polls quotes for the configured instruments on a
//! timer, and sends rate-limited Telegram alerts.
//!
//! Architecture:
//! - Tokio async runtime for concurrent I/O
//! - One-shot session acquisition at startup (fresh one-time code per attempt)
//! - REST-polled quote feed over an mpsc channel
//! - Explicitly owned state passed by reference — no module-level globals

use std::sync::Arc;
use std::time::Duration;
use tokio::signal as tokio_signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use aliceblue_bot::api::SessionAcquirer;
use aliceblue_bot::config::Settings;
use aliceblue_bot::data::quote_feed::{QuoteFeed, QuoteFeedConfig};
use aliceblue_bot::notify::{AlertGate, TelegramNotifier};
use aliceblue_bot::signal::generate_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration.
    let settings = Settings::from_env();

    // Initialize logging.
    init_logging(&settings);

    info!("=== AliceBlue TOTP Session Bot ===");
    info!(base_url = %settings.base_url, "Configuration loaded");

    // Validate settings.
    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!(error = %e, "Configuration error");
        }
        anyhow::bail!("Configuration validation failed");
    }

    // Acquire the authenticated session once at startup. A fresh one-time
    // code is generated inside the call; on failure we exit and let the
    // supervisor restart us with another fresh code.
    let credentials = settings.credentials();
    let acquirer = SessionAcquirer::new(&settings.base_url, settings.login_timeout_secs)?;
    let client = acquirer.acquire_session(&credentials).await?;
    info!(user_id = %client.user_id(), "Authenticated session established");

    // Probe the profile endpoint to verify the session actually works.
    match client.get_profile().await {
        Ok(profile) => {
            info!(
                account_id = %profile.account_id,
                exchanges = profile.exchanges.len(),
                "Profile probe OK"
            );
        }
        Err(e) => {
            warn!(error = %e, "Profile probe failed");
        }
    }

    let client = Arc::new(client);

    // Start the quote feed.
    let instruments = settings
        .parsed_instruments()
        .map_err(anyhow::Error::msg)?;
    let feed_config = QuoteFeedConfig {
        poll_interval_secs: settings.poll_interval_secs,
        max_concurrency: settings.feed_concurrency,
    };
    let feed = QuoteFeed::new(feed_config, instruments);
    let mut quote_rx = feed.start(client.clone());

    // Alerting (optional).
    let notifier = if settings.alerts_enabled() {
        info!("Telegram alerts ENABLED");
        Some(TelegramNotifier::new(
            &settings.telegram_bot_token,
            &settings.telegram_chat_id,
        ))
    } else {
        None
    };
    let mut alert_gate = AlertGate::new(Duration::from_secs_f64(settings.alert_cooldown_secs));

    // Shutdown signal.
    let shutdown = Arc::new(Notify::new());
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        tokio_signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Shutdown signal received");
        shutdown_clone.notify_waiters();
    });

    info!(
        poll_interval_secs = settings.poll_interval_secs,
        "Starting main loop"
    );

    let tick_duration = Duration::from_secs_f64(settings.poll_interval_secs);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("Shutting down main loop...");
                break;
            }
            Some(update) = quote_rx.recv() => {
                info!(
                    instrument = %format!("{}:{}", update.quote.exchange, update.quote.token),
                    symbol = %update.quote.trading_symbol,
                    last_price = %update.quote.last_price,
                    "Quote"
                );
            }
            _ = tokio::time::sleep(tick_duration) => {
                let signal = generate_signal(chrono::Utc::now());
                info!(signal = signal.as_str(), "Signal generated");

                if let Some(ref notifier) = notifier {
                    if alert_gate.allow() {
                        let text = format!("Signal: {}", signal.as_str());
                        if let Err(e) = notifier.send_message(&text).await {
                            warn!(error = %e, "Failed to send alert");
                        }
                    }
                }
            }
        }
    }

    info!("Bot shutdown complete.");
    Ok(())
}

fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
