use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::PollError;

pub const HOMEWORKS_KEY: &str = "homeworks";
pub const CURRENT_DATE_KEY: &str = "current_date";
pub const NAME_KEY: &str = "homework_name";
pub const STATUS_KEY: &str = "status";

const RESPONSE_KEYS: [&str; 2] = [HOMEWORKS_KEY, CURRENT_DATE_KEY];

/// Review states reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "approved" => Some(HomeworkStatus::Approved),
            "reviewing" => Some(HomeworkStatus::Reviewing),
            "rejected" => Some(HomeworkStatus::Rejected),
            _ => None,
        }
    }

    pub fn verdict(self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            HomeworkStatus::Reviewing => "Работа взята на проверку ревьюером.",
            HomeworkStatus::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

/// Result of a structurally sound response check.
#[derive(Debug, PartialEq)]
pub enum ResponseCheck<'a> {
    /// Both keys present, non-empty list of records.
    Valid(&'a [Value]),
    /// A top-level key is absent; skip this cycle.
    MissingKey(&'static str),
}

/// Validate the decoded API payload.
pub fn check_response(response: &Value) -> Result<ResponseCheck<'_>, PollError> {
    let map = response.as_object().ok_or_else(|| {
        PollError::Shape(format!("expected a JSON object, got {}", kind(response)))
    })?;

    let homeworks = match map.get(HOMEWORKS_KEY) {
        Some(Value::Array(items)) => Some(items.as_slice()),
        Some(other) => {
            return Err(PollError::Shape(format!(
                "`{HOMEWORKS_KEY}` must be a list, got {}",
                kind(other)
            )))
        }
        None => None,
    };

    if let Some(key) = RESPONSE_KEYS.into_iter().find(|key| !map.contains_key(*key)) {
        error!("API response is missing the expected key `{}`", key);
        return Ok(ResponseCheck::MissingKey(key));
    }

    match homeworks {
        Some([]) => Err(PollError::EmptyHomeworks),
        Some(items) => Ok(ResponseCheck::Valid(items)),
        None => Ok(ResponseCheck::MissingKey(HOMEWORKS_KEY)),
    }
}

/// First record whose name contains `target`. Records without a string name
/// are logged and passed over.
pub fn select_homework<'a>(homeworks: &'a [Value], target: &str) -> Option<&'a Value> {
    let found = homeworks
        .iter()
        .enumerate()
        .find(|(index, homework)| match homework.get(NAME_KEY).and_then(Value::as_str) {
            Some(name) => name.contains(target),
            None => {
                warn!("Skipping homework #{} without a `{}` string", index, NAME_KEY);
                false
            }
        })
        .map(|(_, homework)| homework);
    if found.is_none() {
        debug!("No homework matching \"{}\" in the response", target);
    }
    found
}

/// Build the chat message for a submission record.
pub fn parse_status(homework: &Value) -> Result<String, PollError> {
    let name = match homework.get(NAME_KEY) {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => return Err(PollError::MissingField),
    };

    let status_value = homework.get(STATUS_KEY).unwrap_or(&Value::Null);
    let status = HomeworkStatus::from_value(status_value).ok_or_else(|| {
        let shown = match status_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        PollError::UnknownStatus(shown)
    })?;

    Ok(format!(
        "Изменился статус проверки работы \"{name}\". {}",
        status.verdict()
    ))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
