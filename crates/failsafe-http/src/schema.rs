//! Declarative request body schemas.
//!
//! A [`Schema`] describes the JSON shape accepted by one versioned action.
//! Validation stops at the first violation and reports it as a
//! [`SchemaViolation`], which renders into the client-facing message:
//!
//! - violations on a field: `Invalid input for field/attribute {field}.
//!   Value: {value}. {reason}`
//! - violations on the object itself (missing or unexpected keys, failed
//!   `anyOf`) and on the document root: the bare reason.

use std::fmt;

use failsafe_model::ApiError;
use failsafe_model::input::{BOOL_FALSE_TOKENS, BOOL_TRUE_TOKENS, coerce_bool};
use regex::Regex;
use serde_json::Value;

/// Message reported for values failing the `name` format.
pub const INVALID_NAME_MESSAGE: &str = "An invalid 'name' value was provided. The name must be: \
                                        printable characters. Can not start or end with whitespace.";

/// A JSON schema node.
#[derive(Debug, Clone)]
pub enum Schema {
    Object(ObjectSchema),
    String(StringSchema),
    Integer(IntegerSchema),
    /// A real boolean or one of the closed set of boolean tokens.
    Boolean,
    /// `null` or the wrapped schema.
    Nullable(Box<Schema>),
    /// Any JSON value.
    Any,
}

impl Schema {
    #[must_use]
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    #[must_use]
    pub fn string() -> StringSchema {
        StringSchema::default()
    }

    #[must_use]
    pub fn integer() -> IntegerSchema {
        IntegerSchema::default()
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean
    }

    #[must_use]
    pub fn nullable(inner: impl Into<Schema>) -> Self {
        Self::Nullable(Box::new(inner.into()))
    }

    /// Validate `value` against this schema.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let mut path = Vec::new();
        self.check(value, &mut path)
    }

    fn check(&self, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
        match self {
            Self::Object(object) => object.check(value, path),
            Self::String(string) => string.check(value, path),
            Self::Integer(integer) => integer.check(value, path),
            Self::Boolean => check_boolean(value, path),
            Self::Nullable(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.check(value, path)
                }
            }
            Self::Any => Ok(()),
        }
    }
}

/// Constraints for a JSON object.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    properties: Vec<(String, Schema)>,
    pattern_properties: Vec<(Regex, Schema)>,
    required: Vec<String>,
    any_of_required: Vec<Vec<String>>,
    additional_properties: bool,
}

impl ObjectSchema {
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.properties.push((name.into(), schema.into()));
        self
    }

    /// Apply `schema` to every key matching `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn pattern_property(mut self, pattern: &str, schema: impl Into<Schema>) -> Self {
        let regex = Regex::new(pattern).expect("invalid schema property pattern");
        self.pattern_properties.push((regex, schema.into()));
        self
    }

    #[must_use]
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Require at least one of `names` to be present.
    #[must_use]
    pub fn any_of_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any_of_required
            .push(names.into_iter().map(Into::into).collect());
        self
    }

    /// Accept keys not described by `properties` or `pattern_properties`.
    #[must_use]
    pub fn allow_additional(mut self) -> Self {
        self.additional_properties = true;
        self
    }

    fn is_known_key(&self, key: &str) -> bool {
        self.properties.iter().any(|(name, _)| name == key)
            || self.pattern_properties.iter().any(|(re, _)| re.is_match(key))
    }

    fn check(&self, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
        let Value::Object(map) = value else {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{} is not of type 'object'", render(value)),
            ));
        };

        if let Some(missing) = self.required.iter().find(|name| !map.contains_key(*name)) {
            return Err(SchemaViolation::bare(format!(
                "'{missing}' is a required property"
            )));
        }

        if !self.any_of_required.is_empty()
            && !self
                .any_of_required
                .iter()
                .any(|group| group.iter().all(|name| map.contains_key(name)))
        {
            return Err(SchemaViolation::bare(format!(
                "{} is not valid under any of the given schemas",
                render(value)
            )));
        }

        if !self.additional_properties {
            if let Some(unexpected) = map.keys().find(|key| !self.is_known_key(key)) {
                return Err(SchemaViolation::bare(format!(
                    "Additional properties are not allowed ('{unexpected}' was unexpected)"
                )));
            }
        }

        for (name, schema) in &self.properties {
            if let Some(child) = map.get(name) {
                path.push(name.clone());
                schema.check(child, path)?;
                path.pop();
            }
        }

        for (key, child) in map {
            if self.properties.iter().any(|(name, _)| name == key) {
                continue;
            }
            if let Some((_, schema)) = self.pattern_properties.iter().find(|(re, _)| re.is_match(key)) {
                path.push(key.clone());
                schema.check(child, path)?;
                path.pop();
            }
        }

        Ok(())
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Self::Object(schema)
    }
}

/// Named string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// Printable characters without leading or trailing whitespace.
    Name,
    /// An RFC 3339 timestamp.
    DateTime,
    /// A hyphenated UUID.
    Uuid,
}

impl StringFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::DateTime => "date-time",
            Self::Uuid => "uuid",
        }
    }

    fn accepts(self, raw: &str) -> bool {
        match self {
            Self::Name => {
                !raw.chars().any(char::is_control)
                    && raw.trim() == raw
            }
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(raw).is_ok(),
            Self::Uuid => uuid::Uuid::parse_str(raw).is_ok(),
        }
    }
}

/// Constraints for a JSON string.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    format: Option<StringFormat>,
    allowed: Option<Vec<String>>,
}

impl StringSchema {
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(Regex::new(pattern).expect("invalid schema string pattern"));
        self
    }

    #[must_use]
    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Restrict the value to an enumeration.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn check(&self, value: &Value, path: &[String]) -> Result<(), SchemaViolation> {
        let Value::String(raw) = value else {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{} is not of type 'string'", render(value)),
            ));
        };

        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|a| a == raw) {
                let listed: Vec<String> = allowed.iter().map(|a| format!("'{a}'")).collect();
                return Err(SchemaViolation::located(
                    path,
                    value,
                    format!("{} is not one of [{}]", render(value), listed.join(", ")),
                ));
            }
        }

        let len = raw.chars().count();
        if self.min_length.is_some_and(|min| len < min) {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{} is too short", render(value)),
            ));
        }
        if self.max_length.is_some_and(|max| len > max) {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{} is too long", render(value)),
            ));
        }

        if let Some(re) = &self.pattern {
            if !re.is_match(raw) {
                return Err(SchemaViolation::located(
                    path,
                    value,
                    format!("{} does not match '{}'", render(value), re.as_str()),
                ));
            }
        }

        match self.format {
            Some(StringFormat::Name) if !StringFormat::Name.accepts(raw) => {
                Err(SchemaViolation::bare(INVALID_NAME_MESSAGE))
            }
            Some(format) if !format.accepts(raw) => Err(SchemaViolation::located(
                path,
                value,
                format!("{} is not a '{}'", render(value), format.as_str()),
            )),
            _ => Ok(()),
        }
    }
}

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Self::String(schema)
    }
}

/// Constraints for a JSON integer; bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct IntegerSchema {
    minimum: Option<i64>,
    maximum: Option<i64>,
}

impl IntegerSchema {
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        self.minimum = Some(min);
        self
    }

    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        self.maximum = Some(max);
        self
    }

    fn check(&self, value: &Value, path: &[String]) -> Result<(), SchemaViolation> {
        let Some(n) = value.as_i64() else {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{} is not of type 'integer'", render(value)),
            ));
        };
        if let Some(min) = self.minimum.filter(|min| n < *min) {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{n} is less than the minimum of {min}"),
            ));
        }
        if let Some(max) = self.maximum.filter(|max| n > *max) {
            return Err(SchemaViolation::located(
                path,
                value,
                format!("{n} is greater than the maximum of {max}"),
            ));
        }
        Ok(())
    }
}

impl From<IntegerSchema> for Schema {
    fn from(schema: IntegerSchema) -> Self {
        Self::Integer(schema)
    }
}

fn check_boolean(value: &Value, path: &[String]) -> Result<(), SchemaViolation> {
    if coerce_bool(value).is_some() {
        return Ok(());
    }
    let tokens: Vec<String> = std::iter::once("true".to_owned())
        .chain(BOOL_TRUE_TOKENS.iter().map(|t| format!("'{t}'")))
        .chain(std::iter::once("false".to_owned()))
        .chain(BOOL_FALSE_TOKENS.iter().map(|t| format!("'{t}'")))
        .collect();
    Err(SchemaViolation::located(
        path,
        value,
        format!("{} is not one of [{}]", render(value), tokens.join(", ")),
    ))
}

/// Render a value inside a reason: strings quoted, everything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

/// The first schema violation found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Name of the offending field; `None` for object-level violations.
    pub field: Option<String>,
    /// The offending value, rendered for the message.
    pub value: Option<String>,
    pub reason: String,
}

impl SchemaViolation {
    fn bare(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            value: None,
            reason: reason.into(),
        }
    }

    fn located(path: &[String], value: &Value, reason: String) -> Self {
        let Some(field) = path.last() else {
            return Self::bare(reason);
        };
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            field: Some(field.clone()),
            value: Some(value),
            reason,
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.value) {
            (Some(field), Some(value)) => write!(
                f,
                "Invalid input for field/attribute {field}. Value: {value}. {}",
                self.reason
            ),
            _ => f.write_str(&self.reason),
        }
    }
}

impl std::error::Error for SchemaViolation {}

impl From<SchemaViolation> for ApiError {
    fn from(violation: SchemaViolation) -> Self {
        ApiError::validation(violation.to_string())
    }
}
