//! Inbound query validation

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Query must be a string")]
    NotAString,

    #[error("Query cannot be empty")]
    Empty,

    #[error("Query length must not exceed {max} characters")]
    TooLong { max: usize },
}

/// A trimmed, non-empty query no longer than the configured maximum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Validate the raw `query` field of a request body
    pub fn from_json(raw: Option<&Value>, max_length: usize) -> Result<Self, QueryError> {
        match raw {
            Some(Value::String(s)) => Self::new(s, max_length),
            _ => Err(QueryError::NotAString),
        }
    }

    pub fn new(raw: &str, max_length: usize) -> Result<Self, QueryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        if trimmed.chars().count() > max_length {
            return Err(QueryError::TooLong { max: max_length });
        }
        Ok(Query(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
