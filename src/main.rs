mod config;
mod error;
mod homework;
mod notifier;
mod poller;
mod practicum;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{check_tokens, Config, RawSecrets, Settings, DEFAULT_SETTINGS_PATH};
use crate::notifier::TelegramNotifier;
use crate::poller::{initial_cursor, Poller, TokioPacer};
use crate::practicum::PracticumClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,homework_notifier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    // An explicitly named settings file must exist; the default one is optional
    let (settings_path, required) = match std::env::args().nth(1) {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_PATH), false),
    };
    let settings = Settings::load(&settings_path, required)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    let secrets = RawSecrets::from_env();
    if !check_tokens(&secrets) {
        return Ok(());
    }
    let config = match Config::new(secrets, settings) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    info!("Configuration loaded successfully");
    info!("  Endpoint: {}", config.settings.endpoint);
    info!("  Homework: \"{}\"", config.settings.homework_name);
    info!("  Chat: {:?}", config.credentials.chat);

    let source = PracticumClient::new(
        &config.settings.endpoint,
        &config.credentials.practicum_token,
        config.settings.request_timeout(),
    )?;
    let notifier = TelegramNotifier::new(
        &config.credentials.telegram_token,
        config.credentials.chat.clone(),
    );
    let from_date = initial_cursor(Utc::now(), config.settings.lookback_days);

    info!("Bot is starting...");
    let poller = Poller::new(&config.settings, from_date, source, notifier, TokioPacer);
    let reason = poller.run().await;
    info!("Bot stopped: {}", reason);

    Ok(())
}
