use std::fmt;

use regex::Regex;

use crate::error::{FilterError, FilterResult};

/// How a leaf rule or matcher compares a candidate string.
#[derive(Clone)]
pub enum StringCondition {
    Exact { value: String, case_sensitive: bool },
    Regex(Regex),
}

impl StringCondition {
    pub fn exact(value: impl Into<String>, case_sensitive: bool) -> Self {
        StringCondition::Exact {
            value: value.into(),
            case_sensitive,
        }
    }

    /// Compiles `pattern` so that it must match the whole candidate.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})$", pattern)).map(StringCondition::Regex)
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            StringCondition::Exact {
                value,
                case_sensitive: true,
            } => value == candidate,
            StringCondition::Exact {
                value,
                case_sensitive: false,
            } => value.to_lowercase() == candidate.to_lowercase(),
            StringCondition::Regex(re) => re.is_match(candidate),
        }
    }

    /// Rejects an exact condition with nothing to compare against.
    pub fn validate(&self, component: &str) -> FilterResult<()> {
        match self {
            StringCondition::Exact { value, .. } if value.is_empty() => Err(
                FilterError::configuration(component, "no string to match against"),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for StringCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringCondition::Exact {
                value,
                case_sensitive,
            } => f
                .debug_struct("Exact")
                .field("value", value)
                .field("case_sensitive", case_sensitive)
                .finish(),
            StringCondition::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
        }
    }
}

impl fmt::Display for StringCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringCondition::Exact { value, .. } => write!(f, "'{}'", value),
            StringCondition::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}
