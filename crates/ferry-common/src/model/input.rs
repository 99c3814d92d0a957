//! Typed input fields

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};
use crate::validation::InputValidator;

/// The type of value an input accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    String,
    Map,
    Integer,
    Long,
    Boolean,
    Enum,
    List,
    DateTime,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::String => "string",
            InputType::Map => "map",
            InputType::Integer => "integer",
            InputType::Long => "long",
            InputType::Boolean => "boolean",
            InputType::Enum => "enum",
            InputType::List => "list",
            InputType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// A concrete value stored against an input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputValue {
    String(String),
    Map(BTreeMap<String, String>),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Enum(String),
    List(Vec<String>),
    DateTime(DateTime<Utc>),
}

impl InputValue {
    pub fn input_type(&self) -> InputType {
        match self {
            InputValue::String(_) => InputType::String,
            InputValue::Map(_) => InputType::Map,
            InputValue::Integer(_) => InputType::Integer,
            InputValue::Long(_) => InputType::Long,
            InputValue::Boolean(_) => InputType::Boolean,
            InputValue::Enum(_) => InputType::Enum,
            InputValue::List(_) => InputType::List,
            InputValue::DateTime(_) => InputType::DateTime,
        }
    }

    /// Textual view used by string-oriented validators
    pub fn as_str(&self) -> Option<&str> {
        match self {
            InputValue::String(s) | InputValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value carries no content (empty string, map or list)
    pub fn is_empty(&self) -> bool {
        match self {
            InputValue::String(s) | InputValue::Enum(s) => s.is_empty(),
            InputValue::Map(m) => m.is_empty(),
            InputValue::List(l) => l.is_empty(),
            _ => false,
        }
    }

    /// Numeric view used by range validators
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            InputValue::Integer(v) => Some(i64::from(*v)),
            InputValue::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::String(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::String(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Integer(value)
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Long(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Boolean(value)
    }
}

/// One named, typed field inside a config group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MInput {
    pub name: String,
    pub input_type: InputType,
    /// Sensitive values are never written to logs
    pub sensitive: bool,
    /// Maximum character count for string inputs
    pub max_length: Option<usize>,
    /// Allowed values for enum inputs
    pub options: Vec<String>,
    pub validators: Vec<InputValidator>,
    pub value: Option<InputValue>,
}

impl MInput {
    fn with_type(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            sensitive: false,
            max_length: None,
            options: Vec::new(),
            validators: Vec::new(),
            value: None,
        }
    }

    pub fn string(name: impl Into<String>, max_length: usize) -> Self {
        let mut input = Self::with_type(name, InputType::String);
        input.max_length = Some(max_length);
        input
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::Integer)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::Long)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::Boolean)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::Map)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::List)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::with_type(name, InputType::DateTime)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input = Self::with_type(name, InputType::Enum);
        input.options = options.into_iter().map(Into::into).collect();
        input
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn validator(mut self, validator: InputValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// A copy of this input's shape with no value
    pub fn clone_schema(&self) -> Self {
        Self {
            value: None,
            ..self.clone()
        }
    }

    /// Store a value after checking it against the input's type
    pub fn set_value(&mut self, value: InputValue) -> Result<()> {
        let actual = value.input_type();
        if actual != self.input_type {
            return Err(FerryError::InputTypeMismatch {
                input: self.name.clone(),
                expected: self.input_type,
                actual,
            });
        }
        if let InputValue::Enum(ref choice) = value {
            if !self.options.iter().any(|o| o == choice) {
                return Err(FerryError::InvalidEnumValue {
                    input: self.name.clone(),
                    value: choice.clone(),
                });
            }
        }
        self.value = Some(value);
        Ok(())
    }

    /// Parse a raw string according to the input's type and store it.
    ///
    /// Maps and lists are read as JSON, datetimes as RFC 3339.
    pub fn set_from_str(&mut self, raw: &str) -> Result<()> {
        let invalid = |reason: String| FerryError::InvalidValue {
            input: self.name.clone(),
            value: raw.to_string(),
            reason,
        };
        let value = match self.input_type {
            InputType::String => InputValue::String(raw.to_string()),
            InputType::Enum => InputValue::Enum(raw.to_string()),
            InputType::Integer => {
                InputValue::Integer(raw.trim().parse().map_err(|e| invalid(format!("{e}")))?)
            },
            InputType::Long => {
                InputValue::Long(raw.trim().parse().map_err(|e| invalid(format!("{e}")))?)
            },
            InputType::Boolean => {
                InputValue::Boolean(raw.trim().parse().map_err(|e| invalid(format!("{e}")))?)
            },
            InputType::Map => {
                InputValue::Map(serde_json::from_str(raw).map_err(|e| invalid(format!("{e}")))?)
            },
            InputType::List => {
                InputValue::List(serde_json::from_str(raw).map_err(|e| invalid(format!("{e}")))?)
            },
            InputType::DateTime => InputValue::DateTime(
                DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|e| invalid(format!("{e}")))?
                    .with_timezone(&Utc),
            ),
        };
        self.set_value(value)
    }

    /// Value rendering that masks sensitive inputs
    pub fn display_value(&self) -> String {
        match (&self.value, self.sensitive) {
            (None, _) => "<unset>".to_string(),
            (Some(_), true) => "********".to_string(),
            (Some(v), false) => format!("{v:?}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_rejects_wrong_type() {
        let mut input = MInput::integer("numExtractors");
        let err = input.set_value(InputValue::from("ten")).unwrap_err();
        assert!(matches!(
            err,
            FerryError::InputTypeMismatch {
                expected: InputType::Integer,
                actual: InputType::String,
                ..
            }
        ));
        assert!(input.value.is_none());
    }

    #[test]
    fn test_enum_value_must_be_an_option() {
        let mut input = MInput::enumeration("format", ["CSV", "PARQUET"]);
        input.set_value(InputValue::Enum("CSV".into())).unwrap();
        assert!(input.set_value(InputValue::Enum("XML".into())).is_err());
        assert_eq!(input.value, Some(InputValue::Enum("CSV".into())));
    }

    #[test]
    fn test_set_from_str_parses_by_type() {
        let mut props = MInput::map("jdbcProperties");
        props.set_from_str(r#"{"fetchSize":"100"}"#).unwrap();
        match props.value {
            Some(InputValue::Map(ref m)) => assert_eq!(m.get("fetchSize").unwrap(), "100"),
            ref other => panic!("unexpected value {other:?}"),
        }

        let mut flag = MInput::boolean("shouldClearStageTable");
        flag.set_from_str("true").unwrap();
        assert_eq!(flag.value, Some(InputValue::Boolean(true)));

        let mut count = MInput::long("rows");
        assert!(count.set_from_str("many").is_err());

        let mut at = MInput::datetime("createdAt");
        at.set_from_str("2013-01-01T01:01:01Z").unwrap();
        assert!(matches!(at.value, Some(InputValue::DateTime(_))));
    }

    #[test]
    fn test_malformed_json_reports_input_and_value() {
        let mut props = MInput::map("jdbcProperties");
        let err = props.set_from_str("{fetchSize: 100").unwrap_err();
        match err {
            FerryError::InvalidValue { input, value, reason } => {
                assert_eq!(input, "jdbcProperties");
                assert_eq!(value, "{fetchSize: 100");
                assert!(!reason.is_empty());
            },
            other => panic!("unexpected error {other:?}"),
        }
        assert!(props.value.is_none());

        let mut columns = MInput::list("columns");
        assert!(matches!(columns.set_from_str("id,name"), Err(FerryError::InvalidValue { .. })));
    }

    #[test]
    fn test_sensitive_value_is_masked() {
        let mut password = MInput::string("password", 40).sensitive();
        password.set_value("secret".into()).unwrap();
        assert_eq!(password.display_value(), "********");
        assert!(!password.clone_schema().display_value().contains("secret"));
    }
}
