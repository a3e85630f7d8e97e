use std::fmt;

use tracing::trace;

use super::Matcher;
use crate::error::FilterResult;
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle};
use crate::filter::string_match::StringCondition;
use crate::model::attribute::{Attribute, AttributeValue, ValueSet};

/// Which part of a value a [`ValueMatcher`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTarget {
    /// String values and the value part of scoped values.
    Value,
    /// The scope of scoped values. Unscoped values never match.
    Scope,
}

impl ValueTarget {
    fn select(self, value: &AttributeValue) -> Option<&str> {
        match self {
            ValueTarget::Value => value.text(),
            ValueTarget::Scope => value.scope(),
        }
    }
}

impl fmt::Display for ValueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTarget::Value => write!(f, "value"),
            ValueTarget::Scope => write!(f, "scope"),
        }
    }
}

/// Selects values whose text or scope satisfies a string condition.
///
/// With `attribute_id` naming another attribute the matcher becomes a gate:
/// every value of the attribute under test is selected when some value of the
/// named prefiltered attribute satisfies the condition, and none otherwise.
#[derive(Debug)]
pub struct ValueMatcher {
    id: String,
    lifecycle: Lifecycle,
    target: ValueTarget,
    condition: StringCondition,
    attribute_id: Option<String>,
}

impl ValueMatcher {
    pub fn new(id: impl Into<String>, target: ValueTarget, condition: StringCondition) -> Self {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            target,
            condition,
            attribute_id: None,
        }
    }

    pub fn with_attribute_id(mut self, attribute_id: impl Into<String>) -> Self {
        self.attribute_id = Some(attribute_id.into());
        self
    }

    pub fn target(&self) -> ValueTarget {
        self.target
    }

    pub fn condition(&self) -> &StringCondition {
        &self.condition
    }

    pub fn attribute_id(&self) -> Option<&str> {
        self.attribute_id.as_deref()
    }

    fn accepts(&self, value: &AttributeValue) -> bool {
        self.target
            .select(value)
            .is_some_and(|candidate| self.condition.matches(candidate))
    }
}

impl Component for ValueMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn do_initialize(&self) -> FilterResult<()> {
        self.condition.validate(&self.id)
    }
}

impl Matcher for ValueMatcher {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        match self.attribute_id.as_deref() {
            Some(other) if other != attribute.id() => {
                let gate_open = ctx
                    .prefiltered_attribute(other)
                    .is_some_and(|a| a.values().iter().any(|v| self.accepts(v)));
                trace!(matcher = %self.id, attribute = other, gate_open, "evaluated targeted {}", self.target);
                Ok(if gate_open {
                    attribute.value_set()
                } else {
                    ValueSet::new()
                })
            }
            _ => Ok(attribute
                .values()
                .iter()
                .filter(|v| self.accepts(v))
                .cloned()
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::matcher::testing::set;

    fn affiliation() -> Attribute {
        Attribute::with_values(
            "eduPersonScopedAffiliation",
            [
                AttributeValue::scoped("member", "example.org"),
                AttributeValue::scoped("staff", "example.org"),
                AttributeValue::scoped("member", "other.org"),
                AttributeValue::string("student"),
            ],
        )
    }

    fn active(m: ValueMatcher) -> ValueMatcher {
        m.initialize().unwrap();
        m
    }

    #[test]
    fn value_string_matches_text_of_scoped_values() {
        let ctx = FilterContext::new();
        let m = active(ValueMatcher::new(
            "member",
            ValueTarget::Value,
            StringCondition::exact("member", true),
        ));
        let got = m.matching_values(&affiliation(), &ctx).unwrap();
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|v| v.text() == Some("member")));
    }

    #[test]
    fn value_string_case_insensitive() {
        let ctx = FilterContext::new();
        let m = active(ValueMatcher::new(
            "student",
            ValueTarget::Value,
            StringCondition::exact("STUDENT", false),
        ));
        assert_eq!(m.matching_values(&affiliation(), &ctx).unwrap(), set(&["student"]));
    }

    #[test]
    fn scope_regex_ignores_unscoped_values() {
        let ctx = FilterContext::new();
        let m = active(ValueMatcher::new(
            "scope",
            ValueTarget::Scope,
            StringCondition::regex("example\\.org").unwrap(),
        ));
        let got = m.matching_values(&affiliation(), &ctx).unwrap();
        assert_eq!(got.len(), 2);
        assert!(!got.contains(&AttributeValue::string("student")));
        assert!(!got.contains(&AttributeValue::scoped("member", "other.org")));
    }

    #[test]
    fn targeted_matcher_gates_on_other_attribute() {
        let uid = Attribute::with_values("uid", ["jdoe", "jsmith"]);
        let ctx = FilterContext::new().with_attribute(affiliation());
        let open = active(
            ValueMatcher::new("gate", ValueTarget::Value, StringCondition::exact("staff", true))
                .with_attribute_id("eduPersonScopedAffiliation"),
        );
        assert_eq!(open.matching_values(&uid, &ctx).unwrap(), set(&["jdoe", "jsmith"]));

        let closed = active(
            ValueMatcher::new("gate", ValueTarget::Value, StringCondition::exact("faculty", true))
                .with_attribute_id("eduPersonScopedAffiliation"),
        );
        assert!(closed.matching_values(&uid, &ctx).unwrap().is_empty());
    }

    #[test]
    fn targeted_matcher_with_absent_attribute_selects_nothing() {
        let uid = Attribute::with_values("uid", ["jdoe"]);
        let ctx = FilterContext::new();
        let m = active(
            ValueMatcher::new("gate", ValueTarget::Value, StringCondition::exact("staff", true))
                .with_attribute_id("eduPersonAffiliation"),
        );
        assert!(m.matching_values(&uid, &ctx).unwrap().is_empty());
    }

    #[test]
    fn targeting_own_attribute_filters_normally() {
        let uid = Attribute::with_values("uid", ["jdoe", "jsmith"]);
        let ctx = FilterContext::new();
        let m = active(
            ValueMatcher::new("self", ValueTarget::Value, StringCondition::exact("jdoe", true))
                .with_attribute_id("uid"),
        );
        assert_eq!(m.matching_values(&uid, &ctx).unwrap(), set(&["jdoe"]));
    }

    #[test]
    fn empty_exact_value_is_rejected_at_activation() {
        let m = ValueMatcher::new("empty", ValueTarget::Value, StringCondition::exact("", true));
        assert!(m.initialize().is_err());
    }
}
