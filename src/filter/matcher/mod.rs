//! Matchers select which values of an attribute a rule applies to.

pub mod logic;
pub mod metadata;
pub mod value;

use std::fmt;
use std::sync::Arc;

use crate::error::{FilterError, FilterResult};
use crate::filter::context::FilterContext;
use crate::filter::lifecycle::{Component, Lifecycle, BUILTIN};
use crate::model::attribute::{Attribute, AttributeValue, ValueSet};

pub use logic::{AndMatcher, NotMatcher, OrMatcher};
pub use metadata::AttributeInMetadataMatcher;
pub use value::{ValueMatcher, ValueTarget};

/// Selects the subset of an attribute's values that satisfies a condition.
///
/// The result is always a subset of `attribute`'s own values. A matcher that
/// cannot decide returns [`FilterError::Evaluation`], which is distinct from
/// an empty selection.
pub trait Matcher: Component + fmt::Debug {
    fn evaluate(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet>;

    /// Lifecycle-checked evaluation.
    fn matching_values(&self, attribute: &Attribute, ctx: &FilterContext) -> FilterResult<ValueSet> {
        self.ensure_active()?;
        self.evaluate(attribute, ctx)
    }
}

pub type SharedMatcher = Arc<dyn Matcher>;

/// Selects every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchesAll;

/// Selects nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchesNone;

/// Always fails to evaluate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatcherFails;

impl Component for MatchesAll {
    fn id(&self) -> &str {
        "MATCHES_ALL"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &BUILTIN
    }
}

impl Matcher for MatchesAll {
    fn evaluate(&self, attribute: &Attribute, _ctx: &FilterContext) -> FilterResult<ValueSet> {
        Ok(attribute.value_set())
    }
}

impl Component for MatchesNone {
    fn id(&self) -> &str {
        "MATCHES_NONE"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &BUILTIN
    }
}

impl Matcher for MatchesNone {
    fn evaluate(&self, _attribute: &Attribute, _ctx: &FilterContext) -> FilterResult<ValueSet> {
        Ok(ValueSet::new())
    }
}

impl Component for MatcherFails {
    fn id(&self) -> &str {
        "MATCHER_FAILS"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &BUILTIN
    }
}

impl Matcher for MatcherFails {
    fn evaluate(&self, _attribute: &Attribute, _ctx: &FilterContext) -> FilterResult<ValueSet> {
        Err(FilterError::evaluation(self.id(), "matcher always fails"))
    }
}

pub fn matches_all() -> SharedMatcher {
    Arc::new(MatchesAll)
}

pub fn matches_none() -> SharedMatcher {
    Arc::new(MatchesNone)
}

pub fn matcher_fails() -> SharedMatcher {
    Arc::new(MatcherFails)
}

type ValuePredicate = dyn Fn(&AttributeValue) -> bool + Send + Sync;

/// Selects the values accepted by a caller-supplied predicate.
///
/// This is the hook for logic that has no declarative form.
pub struct ValuePredicateMatcher {
    id: String,
    lifecycle: Lifecycle,
    predicate: Box<ValuePredicate>,
}

impl ValuePredicateMatcher {
    pub fn new<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&AttributeValue) -> bool + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            lifecycle: Lifecycle::new(),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for ValuePredicateMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuePredicateMatcher")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Component for ValuePredicateMatcher {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl Matcher for ValuePredicateMatcher {
    fn evaluate(&self, attribute: &Attribute, _ctx: &FilterContext) -> FilterResult<ValueSet> {
        Ok(attribute
            .values()
            .iter()
            .filter(|v| (self.predicate)(v))
            .cloned()
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::set;
    use super::*;

    fn attribute() -> Attribute {
        Attribute::with_values("attribute1", ["one", "two"])
    }

    #[test]
    fn builtins_need_no_initialization() {
        let ctx = FilterContext::new();
        assert_eq!(MatchesAll.matching_values(&attribute(), &ctx).unwrap(), set(&["one", "two"]));
        assert!(MatchesNone.matching_values(&attribute(), &ctx).unwrap().is_empty());
        assert!(MatcherFails
            .matching_values(&attribute(), &ctx)
            .unwrap_err()
            .is_recoverable());
    }

    #[test]
    fn builtins_survive_destroy() {
        MatchesAll.destroy();
        assert!(MatchesAll.ensure_active().is_ok());
    }

    #[test]
    fn predicate_matcher_requires_initialization() {
        let m = ValuePredicateMatcher::new("onlyOne", |v| v.text() == Some("one"));
        let ctx = FilterContext::new();
        assert!(matches!(
            m.matching_values(&attribute(), &ctx),
            Err(FilterError::Uninitialized { .. })
        ));
        m.initialize().unwrap();
        assert_eq!(m.matching_values(&attribute(), &ctx).unwrap(), set(&["one"]));
        m.destroy();
        assert!(matches!(
            m.matching_values(&attribute(), &ctx),
            Err(FilterError::Destroyed { .. })
        ));
    }
}
