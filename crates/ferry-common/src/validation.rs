//! Config validation
//!
//! Validators attach to inputs and to whole config groups. Running them over
//! an [`MConfigList`] yields a [`ConfigValidationResult`]: messages keyed by
//! `"config.input"` (or by config name for group checks) plus the worst
//! status seen.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{InputValue, MConfig, MConfigList, MInput};

/// Validation outcome, ordered by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Ok,
    Warning,
    Error,
}

impl Status {
    /// The more severe of two statuses
    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }

    /// Worst status of a sequence, `Ok` when empty
    pub fn worst_of<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        statuses.into_iter().fold(Status::Ok, Status::worst)
    }

    pub fn can_proceed(self) -> bool {
        self != Status::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Warning => f.write_str("WARNING"),
            Status::Error => f.write_str("ERROR"),
        }
    }
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: Status,
    pub message: String,
}

impl Message {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

/// Checks applied to a single input's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", content = "arg", rename_all = "snake_case")]
pub enum InputCheck {
    NotNull,
    NotEmpty,
    MaxLength(usize),
    InRange { min: i64, max: i64 },
    StartsWith(String),
    /// Whole-value regular expression match
    Matches(Pattern),
    NullOrContains(String),
}

/// A regular expression that must match a whole value. Compiled once when
/// built; an invalid expression is kept and reported on every check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, String>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&format!("^(?:{source})$")).map_err(|e| e.to_string());
        Self { source, compiled }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `None` when `value` matches, otherwise the message to report
    fn mismatch(&self, value: &str) -> Option<String> {
        match &self.compiled {
            Ok(re) if re.is_match(value) => None,
            Ok(_) => Some(format!("Must match pattern '{}'", self.source)),
            Err(e) => Some(format!("Invalid pattern '{}': {e}", self.source)),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// An input check with the severity it reports at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValidator {
    pub check: InputCheck,
    pub severity: Status,
}

impl InputValidator {
    pub fn error(check: InputCheck) -> Self {
        Self {
            check,
            severity: Status::Error,
        }
    }

    pub fn warning(check: InputCheck) -> Self {
        Self {
            check,
            severity: Status::Warning,
        }
    }

    /// Run the check; `None` means the value passed.
    ///
    /// Only `NotNull` and `NotEmpty` complain about a missing value.
    pub fn evaluate(&self, value: Option<&InputValue>) -> Option<Message> {
        let problem = match (&self.check, value) {
            (InputCheck::NotNull, None) => Some("Can't be null".to_string()),
            (InputCheck::NotEmpty, None) => Some("Can't be empty".to_string()),
            (InputCheck::NotEmpty, Some(v)) if v.is_empty() => Some("Can't be empty".to_string()),
            (InputCheck::MaxLength(max), Some(v)) => v
                .as_str()
                .filter(|s| s.chars().count() > *max)
                .map(|_| format!("Can't be longer than {max} characters")),
            (InputCheck::InRange { min, max }, Some(v)) => v
                .as_i64()
                .filter(|n| n < min || n > max)
                .map(|_| format!("Must be between {min} and {max}")),
            (InputCheck::StartsWith(prefix), Some(v)) => v
                .as_str()
                .filter(|s| !s.starts_with(prefix.as_str()))
                .map(|_| format!("Must start with '{prefix}'")),
            (InputCheck::Matches(pattern), Some(v)) => v.as_str().and_then(|s| pattern.mismatch(s)),
            (InputCheck::NullOrContains(needle), Some(v)) => v
                .as_str()
                .filter(|s| !s.contains(needle.as_str()))
                .map(|_| format!("Must contain '{needle}'")),
            _ => None,
        };
        problem.map(|text| Message::new(self.severity, text))
    }
}

/// Checks spanning several inputs of one config group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", content = "inputs", rename_all = "snake_case")]
pub enum ConfigCheck {
    /// At least one of the named inputs has a value
    AtLeastOneOf(Vec<String>),
    /// No more than one of the named inputs has a value
    MutuallyExclusive(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValidator {
    pub check: ConfigCheck,
    pub severity: Status,
}

impl ConfigValidator {
    pub fn error(check: ConfigCheck) -> Self {
        Self {
            check,
            severity: Status::Error,
        }
    }

    pub fn warning(check: ConfigCheck) -> Self {
        Self {
            check,
            severity: Status::Warning,
        }
    }

    pub fn evaluate(&self, config: &MConfig) -> Option<Message> {
        let is_set = |name: &String| {
            config
                .input(name)
                .and_then(|i| i.value.as_ref())
                .is_some_and(|v| !v.is_empty())
        };
        let problem = match &self.check {
            ConfigCheck::AtLeastOneOf(names) if !names.iter().any(is_set) => {
                Some(format!("One of {} must be set", names.join(", ")))
            },
            ConfigCheck::MutuallyExclusive(names) if names.iter().filter(|n| is_set(*n)).count() > 1 => {
                Some(format!("Only one of {} may be set", names.join(", ")))
            },
            _ => None,
        };
        problem.map(|text| Message::new(self.severity, text))
    }
}

/// Messages per config/input plus the aggregate status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigValidationResult {
    status: Status,
    /// Keys in the order they were first reported
    messages: Vec<(String, Vec<Message>)>,
}

impl ConfigValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, key: impl Into<String>, message: Message) {
        let key = key.into();
        self.status = self.status.worst(message.status);
        match self.messages.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(message),
            None => self.messages.push((key, vec![message])),
        }
    }

    /// Fold another result into this one; the worse status wins
    pub fn merge(&mut self, other: ConfigValidationResult) {
        for (key, list) in other.messages {
            for message in list {
                self.add_message(key.clone(), message);
            }
        }
        self.status = self.status.worst(other.status);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn can_proceed(&self) -> bool {
        self.status.can_proceed()
    }

    pub fn messages(&self) -> impl Iterator<Item = (&str, &[Message])> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn messages_for(&self, key: &str) -> &[Message] {
        self.messages
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or_default()
    }
}

fn validate_input(config: &MConfig, input: &MInput, result: &mut ConfigValidationResult) {
    let key = format!("{}.{}", config.name, input.name);
    let value = input.value.as_ref();

    // the declared maximum length is enforced without an explicit validator
    if let (Some(max), Some(text)) = (input.max_length, value.and_then(InputValue::as_str)) {
        if text.chars().count() > max {
            result.add_message(
                key.clone(),
                Message::new(Status::Error, format!("Can't be longer than {max} characters")),
            );
        }
    }

    for validator in &input.validators {
        if let Some(message) = validator.evaluate(value) {
            result.add_message(key.clone(), message);
        }
    }
}

/// Validate every input and config group in schema order
pub fn validate_configs(configs: &MConfigList) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::new();
    for config in &configs.configs {
        for input in &config.inputs {
            validate_input(config, input, &mut result);
        }
        for validator in &config.validators {
            if let Some(message) = validator.evaluate(config) {
                result.add_message(config.name.clone(), message);
            }
        }
    }
    result
}
