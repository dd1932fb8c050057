use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{ApiError, PollError};
use crate::homework::{check_response, parse_status, select_homework, ResponseCheck};
use crate::notifier::{notify, Notifier};
use crate::practicum::HomeworkSource;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// `from_date` for the whole process lifetime: `now` minus the lookback window.
pub fn initial_cursor(now: DateTime<Utc>, lookback_days: u32) -> i64 {
    now.timestamp() - i64::from(lookback_days) * SECONDS_PER_DAY
}

/// Waits between polling cycles.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, period: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

/// What a single polling cycle ended with.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Status changed and the new message was sent.
    Notified,
    Unchanged,
    /// Response was malformed, lacked a key, or held no matching homework.
    Skipped,
    /// The selected record could not be turned into a message.
    ItemError,
    Fatal(PollError),
}

/// Polling loop state: one tracked homework, one chat.
pub struct Poller<S, N, P> {
    source: S,
    notifier: N,
    pacer: P,
    homework_name: String,
    retry_period: Duration,
    fetch_attempts: u32,
    from_date: i64,
    last_message: Option<String>,
    last_item_error: Option<String>,
}

impl<S: HomeworkSource, N: Notifier, P: Pacer> Poller<S, N, P> {
    pub fn new(settings: &Settings, from_date: i64, source: S, notifier: N, pacer: P) -> Self {
        Self {
            source,
            notifier,
            pacer,
            homework_name: settings.homework_name.clone(),
            retry_period: settings.retry_period(),
            fetch_attempts: settings.fetch_attempts(),
            from_date,
            last_message: None,
            last_item_error: None,
        }
    }

    /// Poll until a fatal error, pausing once after every cycle.
    /// Returns the error that stopped the loop.
    pub async fn run(mut self) -> PollError {
        info!(
            "Polling every {:?} for homework matching \"{}\"",
            self.retry_period, self.homework_name
        );
        loop {
            let outcome = self.run_cycle().await;
            self.pacer.pause(self.retry_period).await;
            if let CycleOutcome::Fatal(error) = outcome {
                return error;
            }
        }
    }

    /// One fetch → validate → select → map → deliver pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let response = match self.fetch().await {
            Ok(response) => response,
            Err(e) => return self.fail(e.into()).await,
        };

        let homeworks = match check_response(&response) {
            Ok(ResponseCheck::Valid(homeworks)) => homeworks,
            Ok(ResponseCheck::MissingKey(key)) => {
                warn!("Skipping cycle: response has no `{}` key", key);
                return self.skip_malformed().await;
            }
            Err(e) if !e.is_fatal() => {
                error!("Skipping cycle: {}", e);
                return self.skip_malformed().await;
            }
            Err(e) => return self.fail(e).await,
        };

        let Some(homework) = select_homework(homeworks, &self.homework_name) else {
            return CycleOutcome::Skipped;
        };

        match parse_status(homework) {
            Ok(message) if self.last_message.as_deref() == Some(message.as_str()) => {
                self.last_item_error = None;
                debug!("No status change. Current: \"{}\"", message);
                CycleOutcome::Unchanged
            }
            Ok(message) => {
                self.last_item_error = None;
                notify(&self.notifier, &message).await;
                debug!("New status: \"{}\"", message);
                self.last_message = Some(message);
                CycleOutcome::Notified
            }
            Err(e) => {
                error!("Failed to read homework status: {}", e);
                self.report_item_error(&e).await;
                CycleOutcome::ItemError
            }
        }
    }

    async fn fetch(&self) -> Result<Value, ApiError> {
        let mut attempt = 1;
        loop {
            match self.source.fetch(self.from_date).await {
                Err(e) if e.is_transport() && attempt < self.fetch_attempts => {
                    warn!(
                        "Fetch attempt {}/{} failed: {}; retrying",
                        attempt, self.fetch_attempts, e
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn skip_malformed(&self) -> CycleOutcome {
        // Repeat the last known status so the chat is not left silent.
        if let Some(previous) = &self.last_message {
            notify(&self.notifier, previous).await;
        }
        CycleOutcome::Skipped
    }

    async fn report_item_error(&mut self, error: &PollError) {
        let text = item_error_text(error);
        if self.last_item_error.as_deref() == Some(text.as_str()) {
            debug!("Item error already reported: \"{}\"", text);
            return;
        }
        notify(&self.notifier, &text).await;
        self.last_item_error = Some(text);
    }

    async fn fail(&self, error: PollError) -> CycleOutcome {
        error!("Fatal error, stopping: {}", error);
        notify(
            &self.notifier,
            &format!("Сбой в работе программы: \"{error}\""),
        )
        .await;
        CycleOutcome::Fatal(error)
    }
}

fn item_error_text(error: &PollError) -> String {
    match error {
        PollError::MissingField => "Ошибка: отсутствует ключ \"homework_name\".".to_string(),
        other => format!("Ошибка: {other}"),
    }
}
